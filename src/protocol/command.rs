//! Parsed client commands.

use crate::protocol::parser::ParseError;
use crate::protocol::types::RespValue;
use bytes::Bytes;

/// One complete client request.
///
/// `raw` holds the exact bytes the command was parsed from and `args` the
/// argument list, command name first. Neither is touched by the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub raw: Bytes,
    pub args: Vec<Bytes>,
}

impl Command {
    /// Builds a command from a parsed top-level value.
    ///
    /// Returns `Ok(None)` for empty and null arrays, which clients may send
    /// and which carry no request.
    pub(crate) fn from_value(value: RespValue, raw: Bytes) -> Result<Option<Self>, ParseError> {
        let elements = match value {
            RespValue::Array(elements) => elements,
            RespValue::Null => return Ok(None),
            other => {
                return Err(ParseError::ProtocolError(format!(
                    "expected array, got {}",
                    type_name(&other)
                )))
            }
        };

        if elements.is_empty() {
            return Ok(None);
        }

        let args = elements
            .into_iter()
            .map(|element| match element {
                RespValue::BulkString(b) => Ok(b),
                RespValue::SimpleString(s) => Ok(Bytes::from(s)),
                RespValue::Integer(n) => Ok(Bytes::from(n.to_string())),
                other => Err(ParseError::ProtocolError(format!(
                    "expected bulk string argument, got {}",
                    type_name(&other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Command { raw, args }))
    }

    /// The command name as sent, or an empty slice for a command without
    /// arguments.
    pub fn name(&self) -> &[u8] {
        self.args.first().map(|b| &b[..]).unwrap_or_default()
    }

    /// ASCII case-insensitive comparison of the command name.
    pub fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name.as_bytes())
    }

    /// Arguments after the command name.
    pub fn params(&self) -> &[Bytes] {
        self.args.get(1..).unwrap_or_default()
    }
}

fn type_name(value: &RespValue) -> &'static str {
    match value {
        RespValue::SimpleString(_) => "simple string",
        RespValue::Error(_) => "error",
        RespValue::Integer(_) => "integer",
        RespValue::BulkString(_) => "bulk string",
        RespValue::Null => "null",
        RespValue::Array(_) => "array",
    }
}
