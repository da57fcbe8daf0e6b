use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::now_millis;

/// Path recorded when a whole config instance is removed
pub const WILDCARD_PATH: &str = "*";

/// One change to a plugin's persisted config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    pub plugin_id: String,
    /// Top-level key that changed, or [`WILDCARD_PATH`] for a deletion
    pub path: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub actor: String,
}

impl ConfigChangeEvent {
    pub fn new(
        plugin_id: &str,
        path: &str,
        old_value: Option<Value>,
        new_value: Option<Value>,
        actor: &str,
    ) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            path: path.to_string(),
            old_value,
            new_value,
            timestamp: now_millis(),
            actor: actor.to_string(),
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.path == WILDCARD_PATH && self.new_value.is_none()
    }
}

/// Notable things that happen inside the runtime, published on the
/// [`EventHub`](crate::event::hub::EventHub)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    ModuleLoaded { plugin_id: String },
    ModuleLoadFailed { plugin_id: String, reason: String },
    PluginInstalled { plugin_id: String, version: String },
    PluginActivated { plugin_id: String },
    PluginUninstalled { plugin_id: String },
    InstanceCreated { plugin_id: String, container: String },
    InstanceDestroyed { plugin_id: String, container: String },
    CalculationFailed { plugin_id: String, container: String, message: String },
    BoundaryTripped { plugin_id: String, container: String },
}

impl RuntimeEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::ModuleLoaded { .. } => "module_loaded",
            RuntimeEvent::ModuleLoadFailed { .. } => "module_load_failed",
            RuntimeEvent::PluginInstalled { .. } => "plugin_installed",
            RuntimeEvent::PluginActivated { .. } => "plugin_activated",
            RuntimeEvent::PluginUninstalled { .. } => "plugin_uninstalled",
            RuntimeEvent::InstanceCreated { .. } => "instance_created",
            RuntimeEvent::InstanceDestroyed { .. } => "instance_destroyed",
            RuntimeEvent::CalculationFailed { .. } => "calculation_failed",
            RuntimeEvent::BoundaryTripped { .. } => "boundary_tripped",
        }
    }

    pub fn plugin_id(&self) -> &str {
        match self {
            RuntimeEvent::ModuleLoaded { plugin_id }
            | RuntimeEvent::ModuleLoadFailed { plugin_id, .. }
            | RuntimeEvent::PluginInstalled { plugin_id, .. }
            | RuntimeEvent::PluginActivated { plugin_id }
            | RuntimeEvent::PluginUninstalled { plugin_id }
            | RuntimeEvent::InstanceCreated { plugin_id, .. }
            | RuntimeEvent::InstanceDestroyed { plugin_id, .. }
            | RuntimeEvent::CalculationFailed { plugin_id, .. }
            | RuntimeEvent::BoundaryTripped { plugin_id, .. } => plugin_id,
        }
    }
}
