//! RESP Value Types and Reply Builders
//!
//! `RespValue` is the structured form the parser produces. Handlers usually
//! don't build `RespValue`s for replies though: the `append_*` functions write
//! a reply straight onto the end of the output buffer the dispatch loop hands
//! them, which is what the dispatch contract (`handle(cmd, out) -> out`) wants.
//!
//! ## Wire Format
//!
//! | Prefix | Type          | Example                    |
//! |--------|---------------|----------------------------|
//! | `+`    | Simple String | `+OK\r\n`                  |
//! | `-`    | Error         | `-ERR unknown command\r\n` |
//! | `:`    | Integer       | `:1000\r\n`                |
//! | `$`    | Bulk String   | `$5\r\nhello\r\n`          |
//! | `*`    | Array         | `*1\r\n$4\r\nPING\r\n`     |
//!
//! A null bulk string is `$-1\r\n`, a null array `*-1\r\n`.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`, cannot contain CR or LF.
    SimpleString(String),

    /// `-<message>\r\n`
    Error(String),

    /// `:<integer>\r\n`
    Integer(i64),

    /// `$<length>\r\n<data>\r\n`, binary safe.
    BulkString(Bytes),

    /// Null bulk string or null array.
    Null,

    /// `*<count>\r\n<element>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string value.
    ///
    /// # Example
    /// ```
    /// use resphub::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Serializes the value into a fresh buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Appends the wire form of the value to `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => append_simple_string(buf, s),
            RespValue::Error(s) => append_error(buf, s),
            RespValue::Integer(n) => append_integer(buf, *n),
            RespValue::BulkString(data) => append_bulk(buf, data),
            RespValue::Null => append_null(buf),
            RespValue::Array(values) => {
                append_array_header(buf, values.len());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Attempts to extract the inner string from SimpleString or BulkString.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            RespValue::Array(values) => {
                writeln!(f)?;
                for (i, v) in values.iter().enumerate() {
                    writeln!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

/// Appends `+<s>\r\n`.
pub fn append_simple_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(prefix::SIMPLE_STRING);
    push_line(buf, s.as_bytes());
}

/// Appends `+OK\r\n`.
pub fn append_ok(buf: &mut Vec<u8>) {
    append_simple_string(buf, "OK");
}

/// Appends `-<message>\r\n`.
///
/// CR and LF inside `message` would end the line early and desync the client,
/// so they are replaced with spaces.
///
/// # Example
/// ```
/// let mut out = Vec::new();
/// resphub::protocol::append_error(&mut out, "ERR Client is closed");
/// assert_eq!(out, b"-ERR Client is closed\r\n");
/// ```
pub fn append_error(buf: &mut Vec<u8>, message: &str) {
    buf.push(prefix::ERROR);
    buf.extend(
        message
            .bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    buf.extend_from_slice(CRLF);
}

/// Appends `:<n>\r\n`.
pub fn append_integer(buf: &mut Vec<u8>, n: i64) {
    buf.push(prefix::INTEGER);
    push_line(buf, n.to_string().as_bytes());
}

/// Appends `$<len>\r\n<data>\r\n`.
pub fn append_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(prefix::BULK_STRING);
    push_line(buf, data.len().to_string().as_bytes());
    push_line(buf, data);
}

/// Appends the null bulk string `$-1\r\n`.
pub fn append_null(buf: &mut Vec<u8>) {
    buf.push(prefix::BULK_STRING);
    push_line(buf, b"-1");
}

/// Appends `*<len>\r\n`; the caller appends the elements.
pub fn append_array_header(buf: &mut Vec<u8>, len: usize) {
    buf.push(prefix::ARRAY);
    push_line(buf, len.to_string().as_bytes());
}

#[inline]
fn push_line(buf: &mut Vec<u8>, content: &[u8]) {
    buf.extend_from_slice(content);
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(RespValue::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(RespValue::integer(-42).serialize(), b":-42\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::integer(2), RespValue::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_append_builds_on_existing_output() {
        let mut out = b"+PONG\r\n".to_vec();
        append_bulk(&mut out, b"hi");
        append_integer(&mut out, 3);
        append_ok(&mut out);
        assert_eq!(out, b"+PONG\r\n$2\r\nhi\r\n:3\r\n+OK\r\n");
    }

    #[test]
    fn test_append_error_strips_line_breaks() {
        let mut out = Vec::new();
        append_error(&mut out, "ERR bad\r\nthing");
        assert_eq!(out, b"-ERR bad  thing\r\n");
    }

    #[test]
    fn test_array_header_then_elements() {
        let mut out = Vec::new();
        append_array_header(&mut out, 2);
        append_bulk(&mut out, b"GET");
        append_null(&mut out);
        assert_eq!(out, b"*2\r\n$3\r\nGET\r\n$-1\r\n");
    }
}
