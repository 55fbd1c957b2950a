//! Resolution of host server handles to state bundles.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::info;

use crate::data::ServerData;

/// Opaque identifier the host uses for one running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerHandle(pub u64);

impl fmt::Display for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server#{}", self.0)
    }
}

/// Maps a server handle to its state bundle.
///
/// `None` means the server has no claims state (not started, shutting down,
/// or claims never loaded). Every protection entry point allows in that case.
pub trait SessionGateway: Send + Sync {
    fn resolve_state(&self, handle: ServerHandle) -> Option<Arc<ServerData>>;
}

/// In-process gateway backed by a handle table.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<ServerHandle, Arc<ServerData>>>,
}

impl ServerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `data` to `handle`, returning whatever was attached before.
    pub fn register(&self, handle: ServerHandle, data: Arc<ServerData>) -> Option<Arc<ServerData>> {
        info!(%handle, "claims state attached");
        self.servers.write().insert(handle, data)
    }

    pub fn unregister(&self, handle: ServerHandle) -> Option<Arc<ServerData>> {
        let removed = self.servers.write().remove(&handle);
        if removed.is_some() {
            info!(%handle, "claims state detached");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionGateway for ServerRegistry {
    fn resolve_state(&self, handle: ServerHandle) -> Option<Arc<ServerData>> {
        self.servers.read().get(&handle).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_register_resolve_unregister() {
        let registry = ServerRegistry::new();
        let handle = ServerHandle(7);
        assert!(registry.resolve_state(handle).is_none());

        let data = Arc::new(ServerData::new(ServerConfig::default()));
        assert!(registry.register(handle, Arc::clone(&data)).is_none());

        let resolved = registry.resolve_state(handle).unwrap();
        assert!(Arc::ptr_eq(&resolved, &data));
        assert!(registry.resolve_state(ServerHandle(8)).is_none());

        assert!(registry.unregister(handle).is_some());
        assert!(registry.is_empty());
    }
}
