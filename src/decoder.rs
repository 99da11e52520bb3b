//! Binary hstore decoder.
//!
//! Parses the payload PostgreSQL sends for an hstore column in binary format:
//!
//! ```text
//! i32 count
//! count × { i32 key_len, key bytes, i32 value_len (-1 = NULL), value bytes }
//! ```
//!
//! All integers are big-endian. A key length of `-1` would be a NULL key,
//! which hstore never produces, so it is rejected.

use bytes::Buf;

use crate::error::{DecodeError, ErrorKind};
use crate::value::Hstore;

/// Length marker for a NULL value.
pub const NULL_LENGTH: i32 = -1;

/// Smallest possible encoded pair: two length words and no payload.
const MIN_PAIR_LEN: usize = 8;

/// Decode a binary-format hstore payload.
///
/// Either the whole buffer is consumed and a map is returned, or nothing is.
pub fn decode_binary(buf: &[u8]) -> Result<Hstore, DecodeError> {
    let mut reader = Reader::new(buf);

    let count = reader.read_i32()?;
    if count < 0 {
        return Err(DecodeError::new(ErrorKind::NegativeLength, 0));
    }
    let count = count as usize;

    // Never trust the declared count further than the buffer can back it.
    let mut hstore = Hstore::with_capacity(count.min(reader.remaining() / MIN_PAIR_LEN));

    for _ in 0..count {
        let key_at = reader.offset();
        let key = match reader.read_i32()? {
            NULL_LENGTH => return Err(DecodeError::new(ErrorKind::NullKey, key_at)),
            len if len < 0 => return Err(DecodeError::new(ErrorKind::NegativeLength, key_at)),
            len => reader.read_string(len as usize)?,
        };

        let value_at = reader.offset();
        let value = match reader.read_i32()? {
            NULL_LENGTH => None,
            len if len < 0 => return Err(DecodeError::new(ErrorKind::NegativeLength, value_at)),
            len => Some(reader.read_string(len as usize)?),
        };

        hstore.push(key, value);
    }

    if reader.remaining() > 0 {
        return Err(DecodeError::new(ErrorKind::TrailingBytes, reader.offset()));
    }

    Ok(hstore)
}

/// Bounds-checked cursor over the input.
struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        if self.buf.remaining() < 4 {
            return Err(DecodeError::new(ErrorKind::TruncatedInput, self.offset()));
        }
        Ok(self.buf.get_i32())
    }

    fn read_string(&mut self, len: usize) -> Result<String, DecodeError> {
        let start = self.offset();
        if len > self.buf.remaining() {
            return Err(DecodeError::new(ErrorKind::TruncatedInput, start));
        }
        let (head, tail) = self.buf.split_at(len);
        let s = std::str::from_utf8(head)
            .map_err(|e| DecodeError::new(ErrorKind::InvalidUtf8, start + e.valid_up_to()))?;
        self.buf = tail;
        Ok(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Hand-assemble a payload so the tests don't depend on the encoder.
    fn payload(count: i32, fields: &[Option<&str>]) -> Vec<u8> {
        let mut out = count.to_be_bytes().to_vec();
        for field in fields {
            match field {
                Some(s) => {
                    out.extend_from_slice(&(s.len() as i32).to_be_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                None => out.extend_from_slice(&NULL_LENGTH.to_be_bytes()),
            }
        }
        out
    }

    #[test]
    fn test_empty() {
        let h = decode_binary(&[0, 0, 0, 0]).unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn test_pairs_in_order() {
        let buf = payload(2, &[Some("b"), Some("2"), Some("a"), Some("")]);
        let h = decode_binary(&buf).unwrap();
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![("b", Some("2")), ("a", Some(""))]);
    }

    #[test]
    fn test_null_value() {
        let buf = payload(1, &[Some("a"), None]);
        assert_eq!(
            buf,
            vec![0, 0, 0, 1, 0, 0, 0, 1, b'a', 0xff, 0xff, 0xff, 0xff]
        );
        let h = decode_binary(&buf).unwrap();
        assert_eq!(h.get("a"), Some(None));
    }

    #[test]
    fn test_multibyte_payload() {
        let buf = payload(1, &[Some("00"), Some("a😅b")]);
        let h = decode_binary(&buf).unwrap();
        assert_eq!(h.get("00"), Some(Some("a😅b")));
    }

    #[test]
    fn test_empty_buffer_is_truncated() {
        let err = decode_binary(&[]).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::TruncatedInput, 0));
    }

    #[test]
    fn test_declares_more_pairs_than_present() {
        let buf = payload(2, &[Some("a"), Some("1")]);
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::TruncatedInput, buf.len()));
    }

    #[test]
    fn test_length_past_end() {
        let mut buf = payload(1, &[]);
        buf.extend_from_slice(&100i32.to_be_bytes());
        buf.extend_from_slice(b"abc");
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::TruncatedInput, 8));
    }

    #[test]
    fn test_huge_length_does_not_overflow() {
        let mut buf = payload(i32::MAX, &[]);
        buf.extend_from_slice(&i32::MAX.to_be_bytes());
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TruncatedInput);
    }

    #[test]
    fn test_trailing_bytes() {
        let mut buf = payload(1, &[Some("a"), Some("1")]);
        let end = buf.len();
        buf.push(0);
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::TrailingBytes, end));
    }

    #[test]
    fn test_negative_count() {
        let err = decode_binary(&(-2i32).to_be_bytes()).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::NegativeLength, 0));
    }

    #[test]
    fn test_null_key() {
        let buf = payload(1, &[None, Some("1")]);
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::NullKey, 4));
    }

    #[test]
    fn test_negative_key_length() {
        let mut buf = payload(1, &[]);
        buf.extend_from_slice(&(-5i32).to_be_bytes());
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::NegativeLength, 4));
    }

    #[test]
    fn test_value_length_below_null_marker() {
        let mut buf = payload(1, &[Some("a")]);
        buf.extend_from_slice(&(-2i32).to_be_bytes());
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err, DecodeError::new(ErrorKind::NegativeLength, 9));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = payload(1, &[Some("ok")]);
        buf.extend_from_slice(&2i32.to_be_bytes());
        buf.extend_from_slice(&[b'x', 0xc3]);
        let err = decode_binary(&buf).unwrap_err();
        // count(4) + klen(4) + "ok"(2) + vlen(4) + 'x'(1)
        assert_eq!(err, DecodeError::new(ErrorKind::InvalidUtf8, 15));
    }
}
