use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::PluginSource;

/// Registry of plugin sources, plus the versions of installed plugins
/// that dependency checks resolve against.
#[derive(Default)]
pub struct PluginRegistry {
    /// Registered sources by plugin id
    sources: RwLock<HashMap<String, Arc<dyn PluginSource>>>,
    /// Installed plugin id -> installed version
    installed: RwLock<HashMap<String, String>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("sources", &self.ids())
            .field("installed", &self.installed_ids())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sources_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn PluginSource>>> {
        self.sources.read().unwrap_or_else(|p| p.into_inner())
    }

    fn sources_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<dyn PluginSource>>>, PluginSystemError> {
        self.sources
            .write()
            .map_err(|_| PluginSystemError::InternalError("plugin registry lock poisoned".into()))
    }

    fn installed_read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.installed.read().unwrap_or_else(|p| p.into_inner())
    }

    fn installed_write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.installed.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a source. Ids must be non-blank and unique.
    pub fn register(&self, source: Arc<dyn PluginSource>) -> Result<(), PluginSystemError> {
        let id = source.id().to_string();
        if id.trim().is_empty() {
            return Err(PluginSystemError::RegistrationError {
                plugin_id: id,
                message: "plugin id must not be empty".to_string(),
            });
        }

        let mut sources = self.sources_write()?;
        if sources.contains_key(&id) {
            return Err(PluginSystemError::RegistrationError {
                plugin_id: id,
                message: "plugin already registered".to_string(),
            });
        }
        sources.insert(id.clone(), source);
        log::debug!("Registered plugin source '{}'", id);
        Ok(())
    }

    /// Remove a source; returns whether it was registered
    pub fn unregister(&self, id: &str) -> Result<bool, PluginSystemError> {
        let removed = self.sources_write()?.remove(id).is_some();
        self.installed_write().remove(id);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn PluginSource>> {
        self.sources_read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources_read().contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources_read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sources_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources_read().is_empty()
    }

    pub fn mark_installed(&self, id: &str, version: &str) {
        self.installed_write().insert(id.to_string(), version.to_string());
    }

    pub fn mark_uninstalled(&self, id: &str) -> bool {
        self.installed_write().remove(id).is_some()
    }

    pub fn installed_version(&self, id: &str) -> Option<String> {
        self.installed_read().get(id).cloned()
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.installed_read().contains_key(id)
    }

    pub fn installed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.installed_read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
