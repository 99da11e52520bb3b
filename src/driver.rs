//! PostgreSQL integration via sqlx.
//!
//! - `Hstore` implements sqlx's `Type`, `Encode` and `Decode`, so it can be
//!   bound and fetched directly (`Option<Hstore>` for nullable columns).
//! - `PgPool` and `Mutex<PgConnection>` act as a [`TypeCatalog`].
//! - [`HstoreDB`] bundles a pool with its own [`TypeRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgConnection, PgPool, PgPoolOptions, PgTypeInfo, PgValueFormat, PgValueRef,
    Postgres,
};
use sqlx::{Decode, Encode, Row, Type, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::decoder::decode_binary;
use crate::encoder::encode_binary;
use crate::error::HstoreResult;
use crate::parser::decode_text;
use crate::registry::{Format, TypeCatalog, TypeId, TypeRegistry};
use crate::value::Hstore;

/// Name of the hstore type in `pg_type`.
pub const HSTORE_TYPE_NAME: &str = "hstore";

const TYPE_OID_QUERY: &str = "select oid from pg_type where typname = $1";

// ==================== sqlx type mapping ====================

impl Type<Postgres> for Hstore {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name(HSTORE_TYPE_NAME)
    }
}

impl<'r> Decode<'r, Postgres> for Hstore {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let hstore = match Format::from(value.format()) {
            Format::Binary => decode_binary(value.as_bytes()?)?,
            Format::Text => decode_text(value.as_str()?)?,
        };
        Ok(hstore)
    }
}

impl Encode<'_, Postgres> for Hstore {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        buf.extend_from_slice(&encode_binary(self)?);
        Ok(IsNull::No)
    }
}

impl From<PgValueFormat> for Format {
    fn from(format: PgValueFormat) -> Self {
        match format {
            PgValueFormat::Text => Format::Text,
            PgValueFormat::Binary => Format::Binary,
        }
    }
}

// ==================== Catalog lookups ====================

#[async_trait]
impl TypeCatalog for PgPool {
    async fn lookup_type_oid(&self, type_name: &str) -> Result<Option<u32>, sqlx::Error> {
        let oid = sqlx::query_scalar::<_, Oid>(TYPE_OID_QUERY)
            .bind(type_name)
            .fetch_optional(self)
            .await?;
        Ok(oid.map(|o| o.0))
    }
}

#[async_trait]
impl TypeCatalog for Mutex<PgConnection> {
    async fn lookup_type_oid(&self, type_name: &str) -> Result<Option<u32>, sqlx::Error> {
        let mut conn = self.lock().await;
        let oid = sqlx::query_scalar::<_, Oid>(TYPE_OID_QUERY)
            .bind(type_name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(oid.map(|o| o.0))
    }
}

// ==================== Session ====================

/// A database session with its own type registry.
///
/// The registry lives exactly as long as the session. Clones share both the
/// pool and the registry.
#[derive(Clone)]
pub struct HstoreDB {
    pool: PgPool,
    registry: Arc<TypeRegistry>,
}

impl HstoreDB {
    /// Connect to a database using a connection URL.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let db = HstoreDB::connect("postgres://localhost/mydb").await?;
    /// let oid = db.resolve().await?;
    /// ```
    pub async fn connect(url: &str) -> HstoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool with a fresh, empty registry.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            registry: Arc::new(TypeRegistry::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Run `CREATE EXTENSION IF NOT EXISTS hstore`.
    pub async fn install_extension(&self) -> HstoreResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS hstore")
            .execute(&self.pool)
            .await?;
        info!("hstore extension installed");
        Ok(())
    }

    /// Resolve and cache the hstore OID for this database.
    pub async fn resolve(&self) -> HstoreResult<TypeId> {
        self.resolve_named(HSTORE_TYPE_NAME).await
    }

    /// Resolve and cache the OID of an hstore-compatible type by name.
    pub async fn resolve_named(&self, type_name: &str) -> HstoreResult<TypeId> {
        self.registry.resolve(&self.pool, type_name).await
    }

    /// Send a map to the server as a binary parameter and read it back.
    pub async fn echo(&self, hstore: &Hstore) -> HstoreResult<Hstore> {
        let back = sqlx::query_scalar::<_, Hstore>("SELECT $1::hstore")
            .bind(hstore)
            .fetch_one(&self.pool)
            .await?;
        Ok(back)
    }

    /// Have the server parse `text` as an hstore literal and return the result.
    pub async fn echo_text(&self, text: &str) -> HstoreResult<Hstore> {
        let back = sqlx::query_scalar::<_, Hstore>("SELECT $1::text::hstore")
            .bind(text)
            .fetch_one(&self.pool)
            .await?;
        Ok(back)
    }

    /// Run `sql` and decode its first column through the registry.
    ///
    /// Each value is routed by its column OID and transfer format, the way a
    /// driver with a registered codec would. SQL NULL comes back as `None`.
    pub async fn fetch_column(&self, sql: &str) -> HstoreResult<Vec<Option<Hstore>>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), "decoding hstore column");

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = row.try_get_raw(0)?;
            if raw.is_null() {
                out.push(None);
                continue;
            }
            let info = raw.type_info().into_owned();
            let oid = info.oid().map(|oid| oid.0).unwrap_or_default();
            let format = Format::from(raw.format());
            // First binary hstore value in this session: look the OID up once.
            if format == Format::Binary
                && info.name() == HSTORE_TYPE_NAME
                && !self.registry.is_registered(oid)
            {
                self.resolve().await?;
            }
            let bytes = raw.as_bytes().unwrap_or_default();
            out.push(Some(self.registry.decode(oid, format, bytes)?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_from_pg() {
        assert_eq!(Format::from(PgValueFormat::Text), Format::Text);
        assert_eq!(Format::from(PgValueFormat::Binary), Format::Binary);
    }

    #[test]
    fn test_type_info_is_named() {
        assert_eq!(<Hstore as Type<Postgres>>::type_info().name(), HSTORE_TYPE_NAME);
    }
}
