//! RESP Server Adapter
//!
//! [`RespServer`] sits between the event engine and a user [`Handler`]. It
//! turns the engine's byte-level events into an ordered stream of complete
//! commands:
//!
//! ```text
//!   engine                    RespServer                        Handler
//! ┌─────────┐  on_open    ┌─────────────────────┐
//! │         │ ──────────> │ registry.register   │ ──────────> on_opened
//! │         │  on_data    │ lookup -> append -> │
//! │         │ ──────────> │ parse -> queue ->   │ ──────────> handle (per command)
//! │         │ <────────── │ drain if complete   │ <────────── (out, action)
//! │         │  on_close   │                     │
//! │         │ ──────────> │ registry.unregister │ ──────────> on_closed
//! └─────────┘             └─────────────────────┘
//! ```
//!
//! ## Handler Contract
//!
//! `handle` runs inline on the connection's task, once per command, in the
//! order the commands arrived. It receives the output built so far for the
//! current event and returns it extended with its reply. It must not block:
//! a slow handler stalls its connection and, on a single event loop, every
//! other connection too. Work that takes time belongs on another task, which
//! can reply later through [`Conn::write`].
//!
//! ## Example
//!
//! ```no_run
//! use resphub::protocol::{append_error, append_simple_string, Command};
//! use resphub::server::{listen_and_serve, Action, Options};
//!
//! fn handle(cmd: Command, mut out: Vec<u8>) -> (Vec<u8>, Action) {
//!     if cmd.is("PING") {
//!         append_simple_string(&mut out, "PONG");
//!     } else {
//!         append_error(&mut out, "ERR unknown command");
//!     }
//!     (out, Action::None)
//! }
//!
//! listen_and_serve("127.0.0.1:6380", Options::default(), handle).unwrap();
//! ```

pub mod dispatch;
pub mod lifecycle;
pub mod options;

use crate::connection::ConnectionRegistry;
use crate::engine::{self, Conn, EventHandler, ServerError};
use crate::protocol::Command;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub use dispatch::CLIENT_CLOSED_ERROR;
pub use options::Options;

/// Outcome a handler or lifecycle callback asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Keep the connection open
    #[default]
    None,
    /// Close this connection once the current event's output is flushed
    Close,
    /// Stop the whole server
    Shutdown,
}

/// Application callbacks.
///
/// Only `handle` is required. Any `Fn(Command, Vec<u8>) -> (Vec<u8>, Action)`
/// closure is a `Handler` with no-op lifecycle callbacks.
pub trait Handler: Send + Sync + 'static {
    /// Handles one command, appending its reply to `out`.
    fn handle(&self, cmd: Command, out: Vec<u8>) -> (Vec<u8>, Action);

    /// Runs after the connection is registered. Returned bytes are sent to the
    /// peer before anything else.
    fn on_opened(&self, _conn: &Conn) -> (Vec<u8>, Action) {
        (Vec::new(), Action::None)
    }

    /// Runs after the connection has been unregistered.
    fn on_closed(&self, _conn: &Conn, _err: Option<&io::Error>) -> Action {
        Action::None
    }
}

impl<F> Handler for F
where
    F: Fn(Command, Vec<u8>) -> (Vec<u8>, Action) + Send + Sync + 'static,
{
    fn handle(&self, cmd: Command, out: Vec<u8>) -> (Vec<u8>, Action) {
        self(cmd, out)
    }
}

/// Frames engine events into commands for a [`Handler`].
pub struct RespServer<H> {
    handler: H,
    registry: Arc<ConnectionRegistry>,
    commands_processed: AtomicU64,
}

impl<H: Handler> RespServer<H> {
    /// Creates a server with its own, empty registry.
    pub fn new(handler: H) -> Self {
        Self::with_registry(handler, Arc::new(ConnectionRegistry::new()))
    }

    /// Creates a server around an existing registry, e.g. one the handler
    /// also holds to inspect open connections.
    pub fn with_registry(handler: H, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            handler,
            registry,
            commands_processed: AtomicU64::new(0),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Total commands handed to the handler.
    pub fn commands_processed(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }
}

impl<H: Handler> EventHandler for RespServer<H> {
    fn on_open(&self, conn: &Conn) -> (Vec<u8>, engine::Action) {
        let (out, action) = self.opened(conn);
        (out, action.into())
    }

    fn on_data(&self, conn: &Conn, frame: &[u8]) -> (Vec<u8>, engine::Action) {
        let (out, action) = self.react(conn.id(), frame);
        (out, action.into())
    }

    fn on_close(&self, conn: &Conn, err: Option<&io::Error>) -> engine::Action {
        self.closed(conn, err).into()
    }
}

/// Serves `handler` on `addr` until it asks for shutdown or the process gets
/// Ctrl-C. Blocks the calling thread.
pub fn listen_and_serve<H: Handler>(
    addr: &str,
    options: Options,
    handler: H,
) -> Result<(), ServerError> {
    info!(addr = %addr, "Starting RESP server");
    engine::serve(RespServer::new(handler), addr, options.into())
}
