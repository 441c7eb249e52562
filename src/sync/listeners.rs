//! Mint listener registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::events::MintEvent;
use crate::observability::metrics;

/// Callback invoked for every published mint.
pub type MintListener = Arc<dyn Fn(&MintEvent) + Send + Sync>;

/// Opaque subscription handle. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Handle → callback map. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<DashMap<ListenerHandle, MintListener>>,
    next_handle: Arc<AtomicU64>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; returns the handle to remove it with.
    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&MintEvent) + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners.insert(handle, Arc::new(callback));
        metrics::record_listener_count(self.listeners.len());
        tracing::debug!(handle = %handle, "Mint listener added");
        handle
    }

    /// Remove a listener. Unknown handles are ignored; returns whether one was removed.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let removed = self.listeners.remove(&handle).is_some();
        if removed {
            metrics::record_listener_count(self.listeners.len());
            tracing::debug!(handle = %handle, "Mint listener removed");
        }
        removed
    }

    /// Invoke every live listener with `event`. Returns how many were called.
    pub fn publish(&self, event: &MintEvent) -> usize {
        // Snapshot first so callbacks may (un)subscribe without deadlocking the map.
        let listeners: Vec<MintListener> = self.listeners.iter().map(|r| Arc::clone(r.value())).collect();
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
