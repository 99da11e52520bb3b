//! hstore encoders for both wire formats.
//!
//! Binary output mirrors [`crate::decoder`] exactly; text output is what
//! PostgreSQL itself prints: every key quoted, every non-null value quoted,
//! bare `NULL` for null values, pairs joined by `", "`.

use bytes::{BufMut, BytesMut};

use crate::decoder::NULL_LENGTH;
use crate::error::{HstoreError, HstoreResult};
use crate::value::Hstore;

/// Encode to the binary wire format.
pub fn encode_binary(hstore: &Hstore) -> HstoreResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(binary_len(hstore));
    encode_binary_into(hstore, &mut buf)?;
    Ok(buf.to_vec())
}

/// Encode to the binary wire format, appending to `buf`.
///
/// On error `buf` is left as it was.
pub fn encode_binary_into(hstore: &Hstore, buf: &mut BytesMut) -> HstoreResult<()> {
    let start = buf.len();
    let result = write_pairs(hstore, buf);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

fn write_pairs(hstore: &Hstore, buf: &mut BytesMut) -> HstoreResult<()> {
    buf.put_i32(wire_len(hstore.len())?);
    for (key, value) in hstore.iter() {
        put_field(buf, key)?;
        match value {
            Some(v) => put_field(buf, v)?,
            None => buf.put_i32(NULL_LENGTH),
        }
    }
    Ok(())
}

fn put_field(buf: &mut BytesMut, s: &str) -> HstoreResult<()> {
    buf.put_i32(wire_len(s.len())?);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn wire_len(len: usize) -> HstoreResult<i32> {
    i32::try_from(len).map_err(|_| HstoreError::LengthOverflow { len })
}

/// Exact size of the binary encoding.
fn binary_len(hstore: &Hstore) -> usize {
    hstore.iter().fold(4, |acc, (k, v)| {
        acc + 8 + k.len() + v.map(str::len).unwrap_or(0)
    })
}

/// Encode to the text format. An empty map is the empty string.
pub fn encode_text(hstore: &Hstore) -> String {
    let mut out = String::with_capacity(hstore.len() * 16);
    for (i, (key, value)) in hstore.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted(&mut out, key);
        out.push_str("=>");
        match value {
            Some(v) => push_quoted(&mut out, v),
            None => out.push_str("NULL"),
        }
    }
    out
}

/// Append `s` in double quotes, escaping `"` and `\`.
fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
