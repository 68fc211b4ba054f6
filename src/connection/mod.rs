//! Connection Bookkeeping
//!
//! Per-connection framing state and the registry that owns it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                ConnectionRegistry                    │
//! │          RwLock<HashMap<ConnId, SharedState>>        │
//! │                                                      │
//! │   #1 ──> ConnState { pending: "*1\r\n$4\r\nPI",     │
//! │                      queue:   [PING] }               │
//! │   #2 ──> ConnState { pending: "", queue: [] }        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! An entry exists exactly while its connection is open: it is inserted by
//! the open event and removed by the close event, before the user's close
//! callback runs.

pub mod registry;
pub mod state;

pub use registry::{ConnectionRegistry, RegistryError, SharedState};
pub use state::ConnState;
