//! Type-identity resolution for hstore.
//!
//! hstore is an extension type, so its OID differs between database
//! instances and has to be looked up in `pg_type` before binary values can be
//! routed to the right decoder. A [`TypeRegistry`] holds those lookups for one
//! connection or session: it starts empty, fills on first use and is dropped
//! with the session. Nothing here is process-global.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{DecodeError, ErrorKind, HstoreError, HstoreResult};
use crate::value::Hstore;

/// Transfer format of a column value: format code 0 is text, 1 is binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Text,
    Binary,
}

/// A server-assigned type OID. Only meaningful within one database instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The raw OID.
    pub fn oid(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of type OIDs, normally a live database connection.
#[async_trait]
pub trait TypeCatalog: Send + Sync {
    /// Return the OID for `type_name`, or `None` if the type does not exist.
    async fn lookup_type_oid(&self, type_name: &str) -> Result<Option<u32>, sqlx::Error>;
}

/// Look up a type OID once, without caching.
pub async fn resolve_type_id<C>(catalog: &C, type_name: &str) -> HstoreResult<TypeId>
where
    C: TypeCatalog + ?Sized,
{
    match catalog.lookup_type_oid(type_name).await {
        Ok(Some(oid)) => Ok(TypeId(oid)),
        Ok(None) => Err(HstoreError::not_installed(type_name)),
        Err(e) => Err(HstoreError::IdentifierLookupFailed(e)),
    }
}

/// Decoders a registered OID can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Hstore,
}

impl Codec {
    /// Format to request for values of this codec.
    pub fn preferred_format(self) -> Format {
        match self {
            Codec::Hstore => Format::Binary,
        }
    }

    /// Decode a value sent in `format`.
    pub fn decode(self, format: Format, bytes: &[u8]) -> HstoreResult<Hstore> {
        match (self, format) {
            (Codec::Hstore, Format::Binary) => Ok(crate::decoder::decode_binary(bytes)?),
            (Codec::Hstore, Format::Text) => decode_text_bytes(bytes),
        }
    }
}

fn decode_text_bytes(bytes: &[u8]) -> HstoreResult<Hstore> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::new(ErrorKind::InvalidUtf8, e.valid_up_to()))?;
    Ok(crate::parser::decode_text(text)?)
}

#[derive(Debug, Default)]
struct Entries {
    by_name: HashMap<String, TypeId>,
    codecs: HashMap<u32, Codec>,
}

/// Per-session cache of type name → OID → codec.
///
/// Reads take a shared lock. Cache misses are serialized so that concurrent
/// callers resolving the same name trigger a single catalog query.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: RwLock<Entries>,
    lookup: Mutex<()>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `type_name`, querying `catalog` only on a cache miss.
    ///
    /// On success the hstore codec is registered for the returned OID.
    /// A missing type is not cached, so a later call after
    /// `CREATE EXTENSION` will succeed.
    pub async fn resolve<C>(&self, catalog: &C, type_name: &str) -> HstoreResult<TypeId>
    where
        C: TypeCatalog + ?Sized,
    {
        if let Some(id) = self.type_id(type_name) {
            return Ok(id);
        }

        let _guard = self.lookup.lock().await;
        if let Some(id) = self.type_id(type_name) {
            return Ok(id);
        }

        debug!(type_name, "type id not cached, querying catalog");
        let id = resolve_type_id(catalog, type_name).await?;
        Ok(self.register(type_name, id))
    }

    /// Register a known OID for `type_name`. The first registration of a
    /// name wins; the returned id is the one in effect.
    pub fn register(&self, type_name: &str, id: TypeId) -> TypeId {
        let mut entries = self.write();
        let id = *entries.by_name.entry(type_name.to_string()).or_insert(id);
        entries.codecs.insert(id.0, Codec::Hstore);
        debug!(type_name, oid = id.0, "registered hstore codec");
        id
    }

    /// Cached OID for `type_name`, without any I/O.
    pub fn type_id(&self, type_name: &str) -> Option<TypeId> {
        self.read().by_name.get(type_name).copied()
    }

    /// Codec registered for `oid`, if any.
    pub fn codec(&self, oid: u32) -> Option<Codec> {
        self.read().codecs.get(&oid).copied()
    }

    /// Whether `oid` has a codec.
    pub fn is_registered(&self, oid: u32) -> bool {
        self.codec(oid).is_some()
    }

    /// Binary for registered OIDs, text for everything else.
    pub fn preferred_format(&self, oid: u32) -> Format {
        self.codec(oid)
            .map(Codec::preferred_format)
            .unwrap_or(Format::Text)
    }

    /// Decode a column value of type `oid` sent in `format`.
    ///
    /// Text needs no registration. Binary does, since without the OID there
    /// is no way to tell the payload is an hstore.
    pub fn decode(&self, oid: u32, format: Format, bytes: &[u8]) -> HstoreResult<Hstore> {
        trace!(oid, ?format, len = bytes.len(), "decoding value");
        match format {
            Format::Text => decode_text_bytes(bytes),
            Format::Binary => self
                .codec(oid)
                .ok_or(HstoreError::UnknownTypeId(oid))?
                .decode(format, bytes),
        }
    }

    /// Number of registered type names.
    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    /// True until the first successful resolve or register.
    pub fn is_empty(&self) -> bool {
        self.read().by_name.is_empty()
    }

    // Entries are plain data, so a panic elsewhere cannot leave them torn.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
