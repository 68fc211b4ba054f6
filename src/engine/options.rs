//! Engine configuration.

use std::num::NonZeroUsize;

/// Default size of a single socket read (64 KB)
pub const DEFAULT_READ_BUFFER_CAP: usize = 64 * 1024;

/// Options understood by the TCP engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Run connections on a multi-threaded runtime instead of a single loop.
    pub multicore: bool,

    /// Worker threads when `multicore` is set; 0 means one per CPU.
    pub num_event_loop: usize,

    /// Upper bound on the bytes handed to `on_data` per read.
    pub read_buffer_cap: usize,

    /// Disable Nagle's algorithm on accepted sockets.
    pub tcp_nodelay: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            multicore: false,
            num_event_loop: 0,
            read_buffer_cap: DEFAULT_READ_BUFFER_CAP,
            tcp_nodelay: true,
        }
    }
}

impl EngineOptions {
    /// Number of runtime worker threads these options ask for.
    pub fn worker_threads(&self) -> usize {
        if !self.multicore {
            return 1;
        }
        match self.num_event_loop {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }

    /// Read size actually used; a zero cap would stall every connection.
    pub(crate) fn read_chunk(&self) -> usize {
        self.read_buffer_cap.max(1)
    }
}
