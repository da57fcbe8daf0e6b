//! Synchronous per-plugin config watchers.
//!
//! Callbacks run in registration order on the thread that made the change.
//! Each call is wrapped in `catch_unwind`, so a panicking watcher is reported
//! and the remaining watchers still see the event.
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::event::error::EventSystemError;
use crate::event::types::ConfigChangeEvent;
use crate::utils::panic_message;

/// Callback invoked with every change to the watched plugin's config
pub type WatchCallback = Arc<dyn Fn(&ConfigChangeEvent) + Send + Sync>;

/// Identifier for a registered watcher
pub type WatcherId = u64;

#[derive(Default)]
pub struct WatcherRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, Vec<(WatcherId, WatchCallback)>>>,
}

impl fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("watcher_count", &self.watcher_count())
            .finish()
    }
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<(WatcherId, WatchCallback)>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a watcher for `plugin_id`
    pub fn subscribe(&self, plugin_id: &str, callback: WatchCallback) -> WatcherId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries()
            .entry(plugin_id.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// Remove a watcher. The plugin's entry is dropped once its list is empty.
    pub fn unsubscribe(&self, plugin_id: &str, watcher_id: WatcherId) -> bool {
        let mut entries = self.entries();
        let Some(list) = entries.get_mut(plugin_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != watcher_id);
        let removed = list.len() != before;
        if list.is_empty() {
            entries.remove(plugin_id);
        }
        removed
    }

    /// Deliver `event` to the plugin's watchers, returning one error per failed watcher
    pub fn notify(&self, event: &ConfigChangeEvent) -> Vec<EventSystemError> {
        // Snapshot so callbacks may (un)subscribe without deadlocking
        let watchers: Vec<(WatcherId, WatchCallback)> = match self.entries().get(&event.plugin_id) {
            Some(list) => list.clone(),
            None => return Vec::new(),
        };

        let mut failures = Vec::new();
        for (watcher_id, callback) in watchers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                let message = panic_message(payload);
                log::error!(
                    "Config watcher {} for '{}' panicked: {}",
                    watcher_id,
                    event.plugin_id,
                    message
                );
                failures.push(EventSystemError::WatcherFailed {
                    plugin_id: event.plugin_id.clone(),
                    watcher_id,
                    message,
                });
            }
        }
        failures
    }

    /// Total number of registered watchers across all plugins
    pub fn watcher_count(&self) -> usize {
        self.entries().values().map(Vec::len).sum()
    }

    pub fn has_entry(&self, plugin_id: &str) -> bool {
        self.entries().contains_key(plugin_id)
    }
}

/// Handle returned by [`ConfigManager::watch_config`](crate::storage::config::ConfigManager::watch_config).
///
/// Dropping it leaves the watcher registered; call [`WatchHandle::unsubscribe`].
#[derive(Debug, Clone)]
pub struct WatchHandle {
    plugin_id: String,
    watcher_id: WatcherId,
    registry: Weak<WatcherRegistry>,
}

impl WatchHandle {
    pub(crate) fn new(plugin_id: &str, watcher_id: WatcherId, registry: &Arc<WatcherRegistry>) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            watcher_id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> WatcherId {
        self.watcher_id
    }

    /// Remove the watcher; returns false if it was already removed
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.unsubscribe(&self.plugin_id, self.watcher_id))
    }
}
