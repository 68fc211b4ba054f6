//! Event Engine
//!
//! A small reactor-style TCP engine built on Tokio. It owns the sockets and
//! reports what happens on them through three callbacks:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │                                                              │
//! │  accept ──> on_open(conn) ──> on_data(conn, bytes) ... ──┐   │
//! │                                                          │   │
//! │                           on_close(conn, error) <────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every callback answers with bytes to write back and an [`Action`]. The
//! engine knows nothing about RESP: framing and command dispatch live in
//! [`crate::server`], which is itself just an [`EventHandler`].
//!
//! ## Example
//!
//! ```ignore
//! use resphub::engine::{serve, Action, Conn, EngineOptions, EventHandler};
//!
//! struct Echo;
//!
//! impl EventHandler for Echo {
//!     fn on_data(&self, _conn: &Conn, frame: &[u8]) -> (Vec<u8>, Action) {
//!         (frame.to_vec(), Action::Continue)
//!     }
//! }
//!
//! serve(Echo, "127.0.0.1:7000", EngineOptions::default())?;
//! ```

pub mod conn;
pub mod options;
pub mod runtime;

use std::io;

pub use conn::{Conn, ConnClosed, ConnId};
pub use options::EngineOptions;
pub use runtime::{serve, Engine, EngineStats, ServerError};

/// What the engine should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Keep the connection open
    #[default]
    Continue,
    /// Flush the output, then close this connection
    Close,
    /// Flush the output, then stop the whole engine
    Shutdown,
}

/// Callbacks the engine drives for each connection.
///
/// Events for one connection never overlap; events for different
/// connections may run concurrently. Callbacks run inline on the connection's
/// task and must not block.
pub trait EventHandler: Send + Sync + 'static {
    /// A connection was accepted.
    fn on_open(&self, _conn: &Conn) -> (Vec<u8>, Action) {
        (Vec::new(), Action::Continue)
    }

    /// The peer sent `frame`; it may hold any slice of the byte stream.
    fn on_data(&self, conn: &Conn, frame: &[u8]) -> (Vec<u8>, Action);

    /// The connection is gone. `err` is set when it ended on an I/O error
    /// rather than a clean EOF or a requested close.
    fn on_close(&self, _conn: &Conn, _err: Option<&io::Error>) -> Action {
        Action::Continue
    }
}
