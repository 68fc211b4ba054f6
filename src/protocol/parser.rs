//! Incremental RESP Parser
//!
//! The parser works on whatever bytes have been buffered for a connection and
//! never blocks for more. `RespParser::parse` returns:
//!
//! - `Ok(Some((value, consumed)))` when a whole value sits at the front of the buffer
//! - `Ok(None)` when the buffer ends mid-value
//! - `Err(ParseError)` when the bytes can never become a valid value
//!
//! [`read_commands`] builds on that to split a buffer into every complete
//! command it holds plus the unconsumed tail, which is the shape the frame
//! dispatch loop consumes.

use crate::protocol::command::Command;
use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string, error message or length line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, wrong value type, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum length of a line before its CRLF (inline commands, simple
/// strings and length headers), same as Redis' inline limit
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use resphub::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let buf = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI";
///
/// let (value, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(consumed, 14);
/// assert!(matches!(value, RespValue::Array(_)));
///
/// // The second command is still incomplete.
/// assert!(parser.parse(&buf[consumed..]).unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one RESP value from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => {
                parse_line(buf).map(|r| r.map(|(s, n)| (RespValue::SimpleString(s), n)))
            }
            prefix::ERROR => parse_line(buf).map(|r| r.map(|(s, n)| (RespValue::Error(s), n))),
            prefix::INTEGER => parse_integer(buf),
            prefix::BULK_STRING => parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            _ => parse_inline(buf),
        }
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let (count, header_len) = match parse_length(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, header_len)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        // Cap the preallocation; a hostile header must not reserve gigabytes.
        let mut elements = Vec::with_capacity(count.min(1024));
        let mut consumed = header_len;

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => return Ok(None),
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Parses the body of a `+` or `-` line.
fn parse_line(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    match find_line_end(&buf[1..])? {
        Some(pos) => {
            let s = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            // prefix + content + CRLF
            Ok(Some((s.to_string(), 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Parses the signed number following a type prefix, returning it together
/// with the length of the whole header line.
fn parse_length(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let end = match find_line_end(&buf[1..])? {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let s = std::str::from_utf8(&buf[1..1 + end])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    let n: i64 = s
        .parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(e.to_string()))?;

    Ok(Some((n, 1 + end + 2)))
}

/// Parses an integer: `:<integer>\r\n`
fn parse_integer(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    Ok(parse_length(buf)?.map(|(n, consumed)| (RespValue::Integer(n), consumed)))
}

/// Parses a bulk string: `$<length>\r\n<data>\r\n`
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let (length, data_start) = match parse_length(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if length == -1 {
        return Ok(Some((RespValue::Null, data_start)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total_needed = data_start + length + 2;
    if buf.len() < total_needed {
        return Ok(None);
    }

    if &buf[data_start + length..total_needed] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
    Ok(Some((RespValue::BulkString(data), total_needed)))
}

/// Parses a whitespace-separated inline command such as `PING\r\n`.
///
/// A blank line yields an empty array, which carries no command.
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let crlf_pos = match find_line_end(buf)? {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let line = std::str::from_utf8(&buf[..crlf_pos])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let elements = line
        .split_whitespace()
        .map(|s| RespValue::BulkString(Bytes::copy_from_slice(s.as_bytes())))
        .collect();

    Ok(Some((RespValue::Array(elements), crlf_pos + 2)))
}

/// Returns the position of the first `\r\n` in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Like [`find_crlf`], but only looks at the first `MAX_INLINE_SIZE` bytes of
/// line content. Fails once more than that is buffered without a terminator.
fn find_line_end(buf: &[u8]) -> ParseResult<Option<usize>> {
    let window = buf.len().min(MAX_INLINE_SIZE + CRLF.len());
    match find_crlf(&buf[..window]) {
        Some(pos) => Ok(Some(pos)),
        None if buf.len() >= MAX_INLINE_SIZE + CRLF.len() => Err(ParseError::MessageTooLarge {
            size: buf.len(),
            max: MAX_INLINE_SIZE,
        }),
        None => Ok(None),
    }
}

/// Parses a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

/// Splits `buf` into every complete command at its front and the unconsumed
/// remainder.
///
/// The remainder is empty exactly when `buf` ended on a command boundary.
/// Any malformed value, or a top-level value that is not a command, fails
/// the whole call.
///
/// ```
/// use resphub::protocol::read_commands;
///
/// let (cmds, rest) = read_commands(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI").unwrap();
/// assert_eq!(cmds.len(), 1);
/// assert_eq!(rest, b"*1\r\n$4\r\nPI");
/// ```
pub fn read_commands(buf: &[u8]) -> ParseResult<(Vec<Command>, &[u8])> {
    let mut parser = RespParser::new();
    let mut commands = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let (value, consumed) = match parser.parse(&buf[offset..])? {
            Some(parsed) => parsed,
            None => break,
        };

        let raw = Bytes::copy_from_slice(&buf[offset..offset + consumed]);
        if let Some(command) = Command::from_value(value, raw)? {
            commands.push(command);
        }
        offset += consumed;
    }

    Ok((commands, &buf[offset..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = parse_message(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_simple_string_incomplete() {
        assert!(parse_message(b"+OK").unwrap().is_none());
    }

    #[test]
    fn test_parse_error() {
        let (value, consumed) = parse_message(b"-ERR unknown command\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Error("ERR unknown command".to_string()));
        assert_eq!(consumed, 22);
    }

    #[test]
    fn test_parse_negative_integer() {
        let (value, _) = parse_message(b":-42\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(-42));
    }

    #[test]
    fn test_parse_null_and_empty_bulk_string() {
        assert_eq!(parse_message(b"$-1\r\n").unwrap(), Some((RespValue::Null, 5)));
        assert_eq!(
            parse_message(b"$0\r\n\r\n").unwrap(),
            Some((RespValue::BulkString(Bytes::new()), 6))
        );
    }

    #[test]
    fn test_parse_bulk_string_incomplete() {
        assert!(parse_message(b"$5\r\nhel").unwrap().is_none());
        assert!(parse_message(b"$5\r\nhello\r").unwrap().is_none());
    }

    #[test]
    fn test_parse_bulk_string_bad_terminator() {
        assert!(matches!(
            parse_message(b"$5\r\nhelloXY"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_parse_array_incomplete_at_element_boundary() {
        assert!(parse_message(b"*2\r\n$3\r\nGET\r\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_nested_array() {
        let (value, _) = parse_message(b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n").unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Integer(2), RespValue::Integer(3)]),
            ])
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut input = b"*1\r\n".repeat(MAX_NESTING_DEPTH + 2);
        input.extend_from_slice(b":1\r\n");
        assert!(matches!(
            parse_message(&input),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_parse_inline_command() {
        let (value, consumed) = parse_message(b"SET  key value\r\n").unwrap().unwrap();
        assert_eq!(consumed, 16);
        assert_eq!(value.into_array().map(|a| a.len()), Some(3));
    }

    #[test]
    fn test_parse_invalid_lengths() {
        assert!(matches!(
            parse_message(b":not_a_number\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            parse_message(b"$-2\r\n"),
            Err(ParseError::InvalidBulkLength(-2))
        );
        assert_eq!(
            parse_message(b"*-5\r\n"),
            Err(ParseError::InvalidArrayLength(-5))
        );
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let (value, _) = parse_message(b"$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from(&b"hel\x00o"[..])));
    }

    #[test]
    fn test_line_length_limit() {
        let mut line = vec![b'A'; MAX_INLINE_SIZE];
        assert!(parse_message(&line).unwrap().is_none());

        line.extend_from_slice(CRLF);
        let (value, consumed) = parse_message(&line).unwrap().unwrap();
        assert_eq!(consumed, MAX_INLINE_SIZE + 2);
        assert_eq!(value.into_array().map(|a| a.len()), Some(1));

        let long = vec![b'A'; MAX_INLINE_SIZE + 2];
        assert_eq!(
            parse_message(&long),
            Err(ParseError::MessageTooLarge {
                size: MAX_INLINE_SIZE + 2,
                max: MAX_INLINE_SIZE,
            })
        );
    }

    #[test]
    fn test_unterminated_header_is_rejected() {
        let mut header = b"*".to_vec();
        header.extend(std::iter::repeat(b'1').take(MAX_INLINE_SIZE + 2));
        assert!(matches!(
            read_commands(&header),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_read_commands_pipelined() {
        let input = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n";
        let (cmds, rest) = read_commands(input).unwrap();

        assert!(rest.is_empty());
        assert_eq!(cmds.len(), 2);
        assert!(cmds[0].is("set"));
        assert_eq!(cmds[1].args, vec![Bytes::from("GET"), Bytes::from("k")]);
        assert_eq!(&cmds[1].raw[..], &input[27..]);
    }

    #[test]
    fn test_read_commands_keeps_partial_tail() {
        let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI";
        let (cmds, rest) = read_commands(input).unwrap();

        assert_eq!(cmds.len(), 1);
        assert_eq!(&cmds[0].raw[..], b"*1\r\n$4\r\nPING\r\n");
        assert_eq!(rest, b"*1\r\n$4\r\nPI");
    }

    #[test]
    fn test_read_commands_incomplete_only() {
        let (cmds, rest) = read_commands(b"*2\r\n$3\r\nGE").unwrap();
        assert!(cmds.is_empty());
        assert_eq!(rest, b"*2\r\n$3\r\nGE");
    }

    #[test]
    fn test_read_commands_skips_blank_lines_and_empty_arrays() {
        let (cmds, rest) = read_commands(b"\r\n*0\r\nPING\r\n").unwrap();
        assert!(rest.is_empty());
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].is("ping"));
    }

    #[test]
    fn test_read_commands_rejects_non_command_values() {
        let err = read_commands(b"*1\r\n$4\r\nPING\r\n:5\r\n").unwrap_err();
        assert_eq!(err.to_string(), "protocol error: expected array, got integer");
    }
}
