//! Error types for qail-hstore.

use std::fmt;

use thiserror::Error;

/// Classification of every failure the crate can report.
///
/// Codec errors carry one of these inside a [`DecodeError`]; the remaining
/// variants come from encoding and type resolution. Use
/// [`HstoreError::kind`] to match on a failure without caring where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input ended before the declared pairs were read.
    TruncatedInput,
    /// Bytes remain after the declared pairs.
    TrailingBytes,
    /// A count or length field is negative (other than the `-1` null marker).
    NegativeLength,
    /// A key is null (`-1` length in binary, bare `NULL` in text).
    NullKey,
    /// A quoted string has no closing quote.
    UnterminatedQuote,
    /// A backslash is followed by something other than `"` or `\`.
    InvalidEscape,
    /// The `=>` token between key and value is missing.
    MissingSeparator,
    /// A `,` is not followed by another pair.
    DanglingComma,
    /// Input ended in the middle of a pair.
    UnexpectedEnd,
    /// A character that cannot start the expected token.
    UnexpectedCharacter,
    /// Key or value bytes are not valid UTF-8.
    InvalidUtf8,
    /// A count or length does not fit in the wire format's `i32`.
    LengthOverflow,
    /// Binary data arrived for a type OID with no registered codec.
    UnknownTypeId,
    /// The type is missing from the catalog.
    TypeNotInstalled,
    /// The catalog lookup itself failed.
    IdentifierLookupFailed,
    /// Any other query against the database failed.
    Database,
}

impl ErrorKind {
    /// Short lowercase description, as used in `Display`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TruncatedInput => "truncated input",
            ErrorKind::TrailingBytes => "trailing bytes",
            ErrorKind::NegativeLength => "negative length",
            ErrorKind::NullKey => "null key",
            ErrorKind::UnterminatedQuote => "unterminated quote",
            ErrorKind::InvalidEscape => "invalid escape",
            ErrorKind::MissingSeparator => "missing '=>' separator",
            ErrorKind::DanglingComma => "dangling comma",
            ErrorKind::UnexpectedEnd => "unexpected end of input",
            ErrorKind::UnexpectedCharacter => "unexpected character",
            ErrorKind::InvalidUtf8 => "invalid UTF-8",
            ErrorKind::LengthOverflow => "length overflow",
            ErrorKind::UnknownTypeId => "unknown type id",
            ErrorKind::TypeNotInstalled => "type not installed",
            ErrorKind::IdentifierLookupFailed => "identifier lookup failed",
            ErrorKind::Database => "database error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed binary or text hstore value.
///
/// `offset` is the byte position in the input where the problem was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct DecodeError {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl DecodeError {
    /// Create an error of `kind` at byte `offset`.
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// The main error type for hstore operations.
#[derive(Debug, Error)]
pub enum HstoreError {
    /// Malformed input to one of the decoders.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A length too large for the binary wire format.
    #[error("Length {len} does not fit in the hstore wire format")]
    LengthOverflow { len: usize },

    /// Binary data for an OID nobody registered.
    #[error("No codec registered for type OID {0}")]
    UnknownTypeId(u32),

    /// The type does not exist in this database.
    #[error("Postgres type '{type_name}' does not exist (the extension may not be loaded)")]
    TypeNotInstalled { type_name: String },

    /// The catalog query failed.
    #[error("Type identifier lookup failed: {0}")]
    IdentifierLookupFailed(#[source] sqlx::Error),

    /// Database error outside of type resolution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl HstoreError {
    /// Create a type-not-installed error.
    pub fn not_installed(type_name: impl Into<String>) -> Self {
        Self::TypeNotInstalled {
            type_name: type_name.into(),
        }
    }

    /// The [`ErrorKind`] of this error, looking through `Decode`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HstoreError::Decode(e) => e.kind,
            HstoreError::LengthOverflow { .. } => ErrorKind::LengthOverflow,
            HstoreError::UnknownTypeId(_) => ErrorKind::UnknownTypeId,
            HstoreError::TypeNotInstalled { .. } => ErrorKind::TypeNotInstalled,
            HstoreError::IdentifierLookupFailed(_) => ErrorKind::IdentifierLookupFailed,
            HstoreError::Database(_) => ErrorKind::Database,
        }
    }
}

/// Result type alias for hstore operations.
pub type HstoreResult<T> = Result<T, HstoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::new(ErrorKind::UnterminatedQuote, 7);
        assert_eq!(err.to_string(), "unterminated quote at byte 7");
    }

    #[test]
    fn test_kind_passes_through_decode() {
        let err: HstoreError = DecodeError::new(ErrorKind::TrailingBytes, 12).into();
        assert_eq!(err.kind(), ErrorKind::TrailingBytes);
        assert_eq!(err.to_string(), "Decode error: trailing bytes at byte 12");
    }

    #[test]
    fn test_not_installed_message() {
        let err = HstoreError::not_installed("hstore");
        assert_eq!(err.kind(), ErrorKind::TypeNotInstalled);
        assert_eq!(
            err.to_string(),
            "Postgres type 'hstore' does not exist (the extension may not be loaded)"
        );
    }

    #[test]
    fn test_lookup_failure_keeps_source() {
        use std::error::Error as _;

        let err = HstoreError::IdentifierLookupFailed(sqlx::Error::PoolClosed);
        assert_eq!(err.kind(), ErrorKind::IdentifierLookupFailed);
        assert!(err.source().is_some());
    }
}
