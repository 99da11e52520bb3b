//! The decoded hstore value.
//!
//! An [`Hstore`] keeps pairs in wire order. Keys are always present; values
//! may be SQL NULL. Duplicate keys are kept as-is since neither wire format
//! forbids them.

use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// An ordered sequence of key/value pairs with nullable values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hstore {
    pairs: Vec<(String, Option<String>)>,
}

impl Hstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
        }
    }

    /// Append a pair. A `None` value is SQL NULL.
    pub fn push(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        self.pairs.push((key.into(), value.map(Into::into)));
    }

    /// Look up a key.
    ///
    /// - `None`: the key is absent
    /// - `Some(None)`: the key is present with a NULL value
    /// - `Some(Some(v))`: the key maps to `v`
    ///
    /// With duplicate keys the first pair wins.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_inner(self) -> Vec<(String, Option<String>)> {
        self.pairs
    }
}

impl From<Vec<(String, Option<String>)>> for Hstore {
    fn from(pairs: Vec<(String, Option<String>)>) -> Self {
        Self { pairs }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for Hstore {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        }
    }
}

impl IntoIterator for Hstore {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<(String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<'a> IntoIterator for &'a Hstore {
    type Item = &'a (String, Option<String>);
    type IntoIter = std::slice::Iter<'a, (String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Formats as the text wire format, e.g. `"a"=>"1", "b"=>NULL`.
impl fmt::Display for Hstore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::encoder::encode_text(self))
    }
}

impl FromStr for Hstore {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::decode_text(s)
    }
}

// JSON objects map naturally onto hstore: string values, null for NULL.

impl Serialize for Hstore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in self {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Hstore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HstoreVisitor)
    }
}

struct HstoreVisitor;

impl<'de> Visitor<'de> for HstoreVisitor {
    type Value = Hstore;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of strings to strings or null")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Hstore, A::Error> {
        let mut hstore = Hstore::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, Option<String>>()? {
            hstore.pairs.push((k, v));
        }
        Ok(hstore)
    }
}
