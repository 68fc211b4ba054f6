//! Connection Registry
//!
//! Maps each live [`ConnId`] to its [`ConnState`]. It is the only structure
//! shared between connections, so it carries the locking discipline:
//!
//! - `register` / `unregister` take the write lock
//! - `lookup` takes the read lock and hands back a clone of the entry's `Arc`
//!
//! Once resolved, a state is mutated through its own mutex without touching
//! the registry lock again. The engine never runs two events for the same
//! connection at once, so that mutex is uncontended; it only exists so the
//! state can outlive the read guard.

use crate::connection::state::ConnState;
use crate::engine::ConnId;
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A registered connection's state.
pub type SharedState = Arc<Mutex<ConnState>>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry: the connection was never opened or has been closed
    #[error("connection {0} not found")]
    NotFound(ConnId),

    /// An entry already exists for an identity being opened
    #[error("connection {0} already registered")]
    AlreadyRegistered(ConnId),
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    conns: RwLock<HashMap<ConnId, SharedState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh, empty state for `id`.
    ///
    /// An existing entry is left untouched and reported as an error.
    pub fn register(&self, id: ConnId) -> Result<(), RegistryError> {
        match self.conns.write().entry(id) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(ConnState::new())));
                Ok(())
            }
        }
    }

    pub fn lookup(&self, id: ConnId) -> Result<SharedState, RegistryError> {
        self.conns
            .read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Removes `id`, returning the state it held.
    pub fn unregister(&self, id: ConnId) -> Result<SharedState, RegistryError> {
        self.conns
            .write()
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.conns.read().contains_key(&id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.conns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_lookup_unregister() {
        let registry = ConnectionRegistry::new();
        let id = ConnId::new(1);

        assert_eq!(registry.lookup(id).unwrap_err(), RegistryError::NotFound(id));

        registry.register(id).unwrap();
        assert!(registry.contains(id));
        assert!(registry.lookup(id).unwrap().lock().is_idle());

        registry.unregister(id).unwrap();
        assert_eq!(registry.lookup(id).unwrap_err(), RegistryError::NotFound(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_register_keeps_existing_state() {
        let registry = ConnectionRegistry::new();
        let id = ConnId::new(9);
        registry.register(id).unwrap();
        registry
            .lookup(id)
            .unwrap()
            .lock()
            .ingest(b"*1\r\n$4\r\nPI")
            .unwrap();

        assert_eq!(
            registry.register(id),
            Err(RegistryError::AlreadyRegistered(id))
        );
        assert_eq!(registry.lookup(id).unwrap().lock().pending(), b"*1\r\n$4\r\nPI");
    }

    #[test]
    fn test_unregister_unknown() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            registry.unregister(ConnId::new(3)).unwrap_err(),
            RegistryError::NotFound(ConnId::new(3))
        );
    }

    #[test]
    fn test_concurrent_churn_keeps_entries_exclusive() {
        let registry = Arc::new(ConnectionRegistry::new());

        thread::scope(|scope| {
            for t in 0..8u64 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..200u64 {
                        let id = ConnId::new(t * 1_000 + i);
                        registry.register(id).unwrap();
                        assert!(registry.lookup(id).is_ok());
                        registry.unregister(id).unwrap();
                        assert!(registry.lookup(id).is_err());
                    }
                });
            }
        });

        assert!(registry.is_empty());
    }
}
