//! Registry of active tunnels.
//!
//! The registry is the single source of truth for "is this tunnel running".
//! All operations go through one mutex over the whole map, so no caller can
//! observe a partially registered entry, and a Stop always sees the effect of
//! a Start that happened before it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::debug;

use crate::platform::{TunnelEngine, VirtualInterface};
use crate::tunnel::types::TunnelId;

/// A fully started tunnel: both handles present, exclusively owned by the
/// registry until unregistered. Stop is the only path that closes them.
pub struct ActiveTunnel {
    /// Identity the tunnel was registered under
    pub id: TunnelId,

    /// Engine handle
    pub engine: Box<dyn TunnelEngine>,

    /// Virtual interface handle
    pub interface: Box<dyn VirtualInterface>,
}

impl fmt::Debug for ActiveTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTunnel")
            .field("id", &self.id)
            .field("interface", &self.interface.name())
            .finish()
    }
}

/// Concurrency-safe map from tunnel identity to its live resources.
#[derive(Default)]
pub struct TunnelRegistry {
    tunnels: Mutex<HashMap<TunnelId, ActiveTunnel>>,
}

impl TunnelRegistry {
    pub fn new() -> Self {
        TunnelRegistry::default()
    }

    /// Register a started tunnel.
    ///
    /// On collision the entry is handed back untouched so the losing caller
    /// can close its handles -- the registry never takes ownership of
    /// resources it will not track.
    pub fn register(&self, entry: ActiveTunnel) -> Result<(), ActiveTunnel> {
        let mut tunnels = self.tunnels.lock().unwrap();
        match tunnels.entry(entry.id.clone()) {
            Entry::Occupied(_) => Err(entry),
            Entry::Vacant(slot) => {
                debug!(tunnel_id = %slot.key(), "registered active tunnel");
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Remove and return the entry for an identity. Absence is not an error:
    /// double-stop and stop-after-crash are expected callers.
    pub fn unregister(&self, id: &TunnelId) -> Option<ActiveTunnel> {
        let removed = self.tunnels.lock().unwrap().remove(id);
        if removed.is_some() {
            debug!(tunnel_id = %id, "unregistered tunnel");
        }
        removed
    }

    /// Presence check without transferring ownership.
    pub fn contains(&self, id: &TunnelId) -> bool {
        self.tunnels.lock().unwrap().contains_key(id)
    }

    /// Identities of all currently active tunnels.
    pub fn active_ids(&self) -> Vec<TunnelId> {
        self.tunnels.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tunnels.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunnels.lock().unwrap().is_empty()
    }
}
