//! Open and close events.

use crate::engine::Conn;
use crate::server::{Action, Handler, RespServer};
use std::io;
use tracing::{debug, warn};

impl<H: Handler> RespServer<H> {
    /// Registers the connection, then runs the user's open callback.
    pub fn opened(&self, conn: &Conn) -> (Vec<u8>, Action) {
        let id = conn.id();
        match self.registry.register(id) {
            Ok(()) => debug!(conn = %id, peer = %conn.peer_addr(), "Connection registered"),
            // The engine never reuses a live id; keep the existing state.
            Err(e) => warn!(conn = %id, error = %e, "Open event for a live connection"),
        }

        self.handler.on_opened(conn)
    }

    /// Unregisters the connection, then runs the user's close callback.
    ///
    /// From the moment the callback starts, data events for this connection
    /// resolve to "not found".
    pub fn closed(&self, conn: &Conn, err: Option<&io::Error>) -> Action {
        let id = conn.id();
        match self.registry.unregister(id) {
            Ok(shared) => {
                let state = shared.lock();
                if !state.is_idle() {
                    debug!(
                        conn = %id,
                        pending = state.pending().len(),
                        queued = state.queued(),
                        "Discarding unfinished input"
                    );
                }
            }
            Err(e) => warn!(conn = %id, error = %e, "Close event for an unknown connection"),
        }

        match err {
            Some(e) => debug!(conn = %id, error = %e, "Connection unregistered after error"),
            None => debug!(conn = %id, "Connection unregistered"),
        }

        self.handler.on_closed(conn, err)
    }
}
