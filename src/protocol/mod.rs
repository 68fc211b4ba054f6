//! RESP Protocol Support
//!
//! Everything the dispatch loop needs from the wire protocol: an incremental
//! parser, the [`Command`] type it yields, and helpers handlers use to append
//! replies to an output buffer.
//!
//! ## Example
//!
//! ```
//! use resphub::protocol::{append_simple_string, read_commands};
//!
//! let (commands, rest) = read_commands(b"*1\r\n$4\r\nPING\r\n").unwrap();
//! assert!(rest.is_empty());
//! assert!(commands[0].is("ping"));
//!
//! let mut out = Vec::new();
//! append_simple_string(&mut out, "PONG");
//! assert_eq!(out, b"+PONG\r\n");
//! ```

pub mod command;
pub mod parser;
pub mod types;

pub use command::Command;
pub use parser::{
    parse_message, read_commands, ParseError, ParseResult, RespParser, MAX_INLINE_SIZE,
};
pub use types::{
    append_array_header, append_bulk, append_error, append_integer, append_null, append_ok,
    append_simple_string, RespValue,
};
