//! Frame Dispatch Loop
//!
//! Runs once per data event. The chunk is appended to the connection's
//! pending bytes, everything buffered is parsed, and the complete commands are
//! queued. The queue is drained through the handler only when the parse left
//! no partial command behind:
//!
//! ```text
//! chunk 1: *1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI   -> queue [PING], pending "*1\r\n$4\r\nPI", no dispatch
//! chunk 2: NG\r\n                             -> queue [PING, PING], pending "", dispatch both
//! ```
//!
//! So at most one partial command is ever buffered per connection, and the
//! handler never runs while the wire is mid-command.

use crate::engine::ConnId;
use crate::protocol::append_error;
use crate::server::{Action, Handler, RespServer};
use std::sync::atomic::Ordering;
use tracing::{debug, trace, warn};

/// Reply sent when data arrives for a connection that is no longer registered.
pub const CLIENT_CLOSED_ERROR: &str = "ERR Client is closed";

impl<H: Handler> RespServer<H> {
    /// Handles one data event for `id`, returning the bytes to write back and
    /// the resulting action.
    pub fn react(&self, id: ConnId, frame: &[u8]) -> (Vec<u8>, Action) {
        let mut out = Vec::new();

        let shared = match self.registry.lookup(id) {
            Ok(shared) => shared,
            Err(e) => {
                warn!(conn = %id, error = %e, "Data for a connection that is not open");
                append_error(&mut out, CLIENT_CLOSED_ERROR);
                return (out, Action::None);
            }
        };
        let mut state = shared.lock();

        match state.ingest(frame) {
            Ok(true) => {}
            Ok(false) => {
                trace!(
                    conn = %id,
                    pending = state.pending().len(),
                    queued = state.queued(),
                    "Partial command buffered, holding dispatch"
                );
                return (out, Action::None);
            }
            Err(e) => {
                warn!(
                    conn = %id,
                    error = %e,
                    queued = state.queued(),
                    "Protocol error, discarding buffered input"
                );
                append_error(&mut out, &format!("ERR {}", e));
                return (out, Action::None);
            }
        }

        let mut action = Action::None;
        while let Some(command) = state.next_command() {
            let (next, status) = self.handler.handle(command, out);
            out = next;
            self.commands_processed.fetch_add(1, Ordering::Relaxed);

            match status {
                Action::None => {}
                Action::Close => action = Action::Close,
                Action::Shutdown => {
                    debug!(conn = %id, dropped = state.queued(), "Shutdown requested by handler");
                    state.reset();
                    return (out, Action::Shutdown);
                }
            }
        }

        (out, action)
    }
}
