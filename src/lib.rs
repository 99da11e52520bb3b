//! # qail-hstore
//!
//! Codec for PostgreSQL's `hstore` key/value type, in both wire formats.
//!
//! ## Quick Example
//!
//! ```
//! use qail_hstore::{decode_binary, decode_text, encode_binary, encode_text};
//!
//! let h = decode_text(r#""a"=>"1", "b"=>NULL"#).unwrap();
//! assert_eq!(h.get("a"), Some(Some("1")));
//! assert_eq!(h.get("b"), Some(None));
//! assert_eq!(h.get("c"), None);
//!
//! let bytes = encode_binary(&h).unwrap();
//! assert_eq!(decode_binary(&bytes).unwrap(), h);
//! assert_eq!(encode_text(&h), r#""a"=>"1", "b"=>NULL"#);
//! ```
//!
//! ## Formats
//!
//! | Format | Shape                                            | Module      |
//! |--------|--------------------------------------------------|-------------|
//! | Binary | `i32 n`, then `n × (i32 len, bytes)` pairs, `-1` = NULL | `decoder` / `encoder` |
//! | Text   | `"k"=>"v", "k2"=>NULL`                           | `parser` / `encoder` |
//!
//! Binary transfer needs the type's OID, which differs per database since
//! hstore is an extension. [`TypeRegistry`] looks it up once per session.

pub mod config;
pub mod decoder;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod registry;
pub mod value;

pub use decoder::decode_binary;
pub use driver::HstoreDB;
pub use encoder::{encode_binary, encode_binary_into, encode_text};
pub use error::{DecodeError, ErrorKind, HstoreError, HstoreResult};
pub use parser::decode_text;
pub use registry::{Format, TypeCatalog, TypeId, TypeRegistry, resolve_type_id};
pub use value::Hstore;

pub mod prelude {
    pub use crate::decoder::decode_binary;
    pub use crate::driver::{HSTORE_TYPE_NAME, HstoreDB};
    pub use crate::encoder::{encode_binary, encode_text};
    pub use crate::error::*;
    pub use crate::parser::decode_text;
    pub use crate::registry::{Format, TypeCatalog, TypeId, TypeRegistry, resolve_type_id};
    pub use crate::value::Hstore;
}
