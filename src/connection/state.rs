//! Per-connection framing state.
//!
//! TCP hands us arbitrary slices of the byte stream, so a connection keeps
//! two things between events: the bytes that don't yet form a whole command,
//! and the commands that are complete but have not been dispatched.

use crate::protocol::{read_commands, Command, ParseError};
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use tracing::trace;

/// Initial capacity of the pending-bytes buffer
const INITIAL_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
pub struct ConnState {
    /// Received bytes not yet resolved into a complete command
    pending: BytesMut,
    /// Complete commands awaiting dispatch, oldest first
    queue: VecDeque<Command>,
}

impl Default for ConnState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnState {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            queue: VecDeque::new(),
        }
    }

    /// Appends `frame`, parses everything buffered so far and queues the
    /// commands it completes.
    ///
    /// Returns `Ok(true)` when the buffer ended exactly on a command boundary,
    /// i.e. nothing is left pending and the queue may be drained. On a parse
    /// error the pending bytes are dropped so the bad prefix is never re-read.
    /// Commands queued by earlier events are kept and drain at the next
    /// boundary.
    pub fn ingest(&mut self, frame: &[u8]) -> Result<bool, ParseError> {
        self.pending.extend_from_slice(frame);

        let (commands, remaining) = match read_commands(&self.pending) {
            Ok((commands, rest)) => (commands, rest.len()),
            Err(e) => {
                self.pending.clear();
                return Err(e);
            }
        };

        let consumed = self.pending.len() - remaining;
        self.pending.advance(consumed);
        trace!(
            parsed = commands.len(),
            consumed,
            remaining,
            "Framed buffered input"
        );
        self.queue.extend(commands);

        Ok(self.pending.is_empty())
    }

    /// Pops the oldest queued command.
    pub fn next_command(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }

    /// Drops all buffered bytes and queued commands.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.queue.clear();
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.queue.is_empty()
    }
}
