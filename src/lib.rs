//! # RespHub - RESP Framing and Command Dispatch
//!
//! RespHub lets an application speak the Redis protocol without dealing with
//! sockets or framing. The application supplies a handler that turns one
//! command into one reply; RespHub makes sure it only ever sees complete
//! commands, in order, no matter how TCP chopped up the byte stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              RespHub                                 │
//! │                                                                      │
//! │  ┌─────────────┐  open/data/close  ┌──────────────┐   commands       │
//! │  │   Engine    │──────────────────>│  RespServer  │───────────────┐  │
//! │  │ (Tokio TCP) │<──────────────────│              │<───────┐      │  │
//! │  └─────────────┘   (out, action)   └──────┬───────┘        │      ▼  │
//! │                                           │          ┌──────────────┐│
//! │                    ┌──────────────────────┴───────┐  │   Handler    ││
//! │                    │     ConnectionRegistry       │  │ (user code)  ││
//! │                    │  ┌──────────┐ ┌──────────┐   │  └──────────────┘│
//! │                    │  │ConnState │ │ConnState │...│                  │
//! │                    │  └──────────┘ └──────────┘   │                  │
//! │                    └──────────────────────────────┘                  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use resphub::protocol::{append_error, append_simple_string, Command};
//! use resphub::{listen_and_serve, Action, Options};
//!
//! fn handle(cmd: Command, mut out: Vec<u8>) -> (Vec<u8>, Action) {
//!     if cmd.is("PING") {
//!         append_simple_string(&mut out, "PONG");
//!         (out, Action::None)
//!     } else if cmd.is("QUIT") {
//!         append_simple_string(&mut out, "OK");
//!         (out, Action::Close)
//!     } else {
//!         append_error(&mut out, "ERR unknown command");
//!         (out, Action::None)
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     listen_and_serve("127.0.0.1:6380", Options::default().multicore(true), handle)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP parser, [`Command`] and reply helpers
//! - [`connection`]: per-connection framing state and the registry
//! - [`server`]: the adapter that frames events and drives the handler
//! - [`engine`]: the Tokio TCP engine delivering connection events
//!
//! ## Guarantees
//!
//! - Commands reach the handler in arrival order, one at a time per connection.
//! - A command is dispatched only once no partial command trails it in the
//!   buffered input.
//! - A `Close` from the handler takes effect after every command already
//!   queued for that event has run and the output has been flushed.
//! - Protocol errors and data for closed connections become `-ERR` replies;
//!   nothing panics.

pub mod connection;
pub mod engine;
pub mod protocol;
pub mod server;

pub use connection::{ConnState, ConnectionRegistry, RegistryError};
pub use engine::{Conn, ConnId, EngineOptions, ServerError};
pub use protocol::{Command, ParseError, RespValue};
pub use server::{listen_and_serve, Action, Handler, Options, RespServer};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of RespHub
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
