//! # Plugin Lifecycle
//!
//! One [`LifecycleController`] per plugin id drives the state machine
//!
//! ```text
//! Unregistered -> Installed -> Validated -> Active
//!                     \____________\___________\____> Uninstalled
//! ```
//!
//! `install` is all-or-nothing and fails loudly on a broken plugin;
//! `validate` and `check_compatibility` report through their return value.
//! Config updates are merged, checked against the plugin's settings schema
//! and only then handed to the [`ConfigManager`].
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::event::types::ConfigChangeEvent;
use crate::execution::options::ExecutionOptions;
use crate::execution::pipeline::ExecutionPipeline;
use crate::kernel::constants::{API_VERSION, DEFAULT_LOCALE, GENERIC_TEMPLATE_ID};
use crate::kernel::error::Result;
use crate::plugin_system::bundle::ModuleBundle;
use crate::plugin_system::compatibility::{self, CompatibilityIssue, CompatibilityReport, IssueCategory};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::registry::PluginRegistry;
use crate::storage::config::{ConfigManager, ConfigTemplate, ConfigUpdate, Environment, PluginConfigInstance};
use crate::storage::error::StorageSystemError;
use crate::storage::schema;

/// Tolerance when comparing a numeric smoke test result to its expected value
const SMOKE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    Installed,
    Validated,
    Active,
    Uninstalled,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unregistered => "Unregistered",
            LifecycleState::Installed => "Installed",
            LifecycleState::Validated => "Validated",
            LifecycleState::Active => "Active",
            LifecycleState::Uninstalled => "Uninstalled",
        };
        write!(f, "{}", name)
    }
}

fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => (e - a).abs() <= SMOKE_TOLERANCE,
        _ => expected == actual,
    }
}

pub struct LifecycleController {
    plugin_id: String,
    state: LifecycleState,
    bundle: Option<Arc<ModuleBundle>>,
    config: Arc<ConfigManager>,
    pipeline: ExecutionPipeline,
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("plugin_id", &self.plugin_id)
            .field("state", &self.state)
            .field("bundle", &self.bundle.is_some())
            .finish()
    }
}

impl LifecycleController {
    pub fn new(plugin_id: &str, config: Arc<ConfigManager>, execution: ExecutionOptions) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            state: LifecycleState::Unregistered,
            bundle: None,
            config,
            pipeline: ExecutionPipeline::new(execution),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn bundle(&self) -> Option<&Arc<ModuleBundle>> {
        self.bundle.as_ref()
    }

    fn transition(&mut self, to: LifecycleState) {
        log::debug!("'{}': {} -> {}", self.plugin_id, self.state, to);
        self.state = to;
    }

    fn invalid_transition(&self, to: LifecycleState) -> PluginSystemError {
        PluginSystemError::InvalidTransition {
            plugin_id: self.plugin_id.clone(),
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    /// Run the fixed-input smoke computation; `Err` carries the reason
    async fn smoke_test(&self, bundle: &ModuleBundle) -> std::result::Result<(), String> {
        let inputs = bundle.config.smoke_inputs();
        let outcome = self
            .pipeline
            .run(bundle.id(), bundle.scoring.as_ref(), &inputs)
            .await
            .map_err(|e| format!("smoke test failed: {}", e.diagnostic()))?;

        let expected = bundle.config.smoke_test.as_ref().and_then(|t| t.expected.as_ref());
        match expected {
            Some(expected) if !values_match(expected, &outcome.result.value) => Err(format!(
                "smoke test expected {} but computed {}",
                expected, outcome.result.value
            )),
            _ => Ok(()),
        }
    }

    /// Static checks shared by install and validate
    fn structural_problems(&self, bundle: &ModuleBundle, check_required_inputs: bool) -> Vec<String> {
        let mut problems = Vec::new();
        let manifest = bundle.manifest();
        if manifest.id != self.plugin_id {
            problems.push(format!("bundle declares id '{}'", manifest.id));
        }
        let missing = manifest.missing_fields();
        if !missing.is_empty() {
            problems.push(format!("manifest is incomplete: missing {}", missing.join(", ")));
        }
        if bundle.config.layout.field_count() == 0 {
            problems.push("no field descriptors declared".to_string());
        }
        let duplicates = bundle.config.layout.duplicate_field_ids();
        if !duplicates.is_empty() {
            problems.push(format!("duplicate field ids: {}", duplicates.join(", ")));
        }
        if check_required_inputs {
            let undeclared = bundle.config.undeclared_required_inputs();
            if !undeclared.is_empty() {
                problems.push(format!("required inputs without a field: {}", undeclared.join(", ")));
            }
        }
        problems
    }

    /// Install `bundle`. Any failed check aborts with a lifecycle error and
    /// leaves the controller in its previous state.
    pub async fn install(&mut self, bundle: Arc<ModuleBundle>) -> std::result::Result<(), PluginSystemError> {
        if !matches!(self.state, LifecycleState::Unregistered | LifecycleState::Uninstalled) {
            return Err(self.invalid_transition(LifecycleState::Installed));
        }

        let problems = self.structural_problems(&bundle, false);
        if !problems.is_empty() {
            log::error!("Install of '{}' rejected: {}", self.plugin_id, problems.join("; "));
            return Err(PluginSystemError::lifecycle(&self.plugin_id, "install", problems.join("; ")));
        }
        if let Err(reason) = self.smoke_test(&bundle).await {
            log::error!("Install of '{}' rejected: {}", self.plugin_id, reason);
            return Err(PluginSystemError::lifecycle(&self.plugin_id, "install", reason));
        }

        log::info!("Installed '{}' v{}", self.plugin_id, bundle.manifest().version);
        self.bundle = Some(bundle);
        self.transition(LifecycleState::Installed);
        Ok(())
    }

    /// Re-check the installed bundle. A passing check moves `Installed` to
    /// `Validated`; a failing one demotes `Validated` or `Active` back to
    /// `Installed`, so no new instances are created until it passes again.
    pub async fn validate(&mut self) -> bool {
        let Some(bundle) = self.bundle.clone() else {
            log::warn!("Cannot validate '{}': not installed", self.plugin_id);
            return false;
        };
        if matches!(self.state, LifecycleState::Unregistered | LifecycleState::Uninstalled) {
            return false;
        }

        let mut problems = self.structural_problems(&bundle, true);
        if let Err(reason) = self.smoke_test(&bundle).await {
            problems.push(reason);
        }

        if problems.is_empty() {
            if self.state == LifecycleState::Installed {
                self.transition(LifecycleState::Validated);
            }
            true
        } else {
            log::warn!("Validation of '{}' failed: {}", self.plugin_id, problems.join("; "));
            if matches!(self.state, LifecycleState::Validated | LifecycleState::Active) {
                self.transition(LifecycleState::Installed);
            }
            false
        }
    }

    /// `Validated` -> `Active`. Activating an active plugin is a no-op.
    pub fn activate(&mut self) -> std::result::Result<(), PluginSystemError> {
        match self.state {
            LifecycleState::Active => Ok(()),
            LifecycleState::Validated => {
                self.transition(LifecycleState::Active);
                log::info!("Activated '{}'", self.plugin_id);
                Ok(())
            }
            _ => Err(self.invalid_transition(LifecycleState::Active)),
        }
    }

    pub fn check_compatibility(&self, registry: &PluginRegistry) -> CompatibilityReport {
        match &self.bundle {
            Some(bundle) => compatibility::check_compatibility(bundle, registry, API_VERSION),
            None => {
                let mut report = CompatibilityReport::new(&self.plugin_id);
                report.issues.push(CompatibilityIssue::error(
                    IssueCategory::Configuration,
                    "Plugin is not installed",
                    "Install the plugin before checking compatibility",
                ));
                report
            }
        }
    }

    /// Release the bundle. Returns false when already uninstalled.
    pub fn uninstall(&mut self) -> bool {
        if self.state == LifecycleState::Uninstalled {
            return false;
        }
        self.bundle = None;
        self.transition(LifecycleState::Uninstalled);
        log::info!("Uninstalled '{}'", self.plugin_id);
        true
    }

    /// Template the plugin's config is created from: its own settings
    /// schema when it declares one, otherwise the generic template
    pub fn config_template(&self) -> Option<ConfigTemplate> {
        let bundle = self.bundle.as_ref()?;
        let settings_schema = bundle.config.settings_schema.as_ref()?;
        let mut defaults = settings_schema.defaults();
        for (key, value) in &bundle.config.default_settings {
            defaults.insert(key.clone(), value.clone());
        }
        let name = bundle.manifest().name.resolve(DEFAULT_LOCALE).to_string();
        Some(
            ConfigTemplate::new(&self.plugin_id, &format!("{} settings", name), settings_schema.clone())
                .with_defaults(defaults),
        )
    }

    /// Create the plugin's config if it has none yet
    pub fn ensure_config(&self, environment: Environment) -> Result<PluginConfigInstance> {
        let template_id = match self.config_template() {
            Some(template) => {
                let id = template.id.clone();
                if self.config.template(&id).is_none() {
                    self.config.register_template(template)?;
                }
                id
            }
            None => GENERIC_TEMPLATE_ID.to_string(),
        };
        Ok(self.config.ensure_config(&self.plugin_id, &template_id, environment)?)
    }

    /// Merge `update` into the stored config after checking the merged
    /// settings. A rejected update has no effect.
    pub async fn on_config_update(&mut self, update: ConfigUpdate, actor: &str) -> Result<Vec<ConfigChangeEvent>> {
        if self.state == LifecycleState::Uninstalled {
            return Err(self.invalid_transition(LifecycleState::Active).into());
        }
        let current = self
            .config
            .get_config(&self.plugin_id)
            .ok_or_else(|| StorageSystemError::ConfigNotFound(self.plugin_id.clone()))?;

        if let Some(settings) = &update.settings {
            let mut merged = current.settings.clone();
            for (key, value) in settings {
                merged.insert(key.clone(), value.clone());
            }
            let template = self
                .config
                .template(&current.template_id)
                .ok_or_else(|| StorageSystemError::TemplateNotFound(current.template_id.clone()))?;
            let report = schema::validate(&Value::Object(merged), &template.schema);
            if !report.valid {
                log::warn!("Config update for '{}' rejected", self.plugin_id);
                return Err(StorageSystemError::SchemaViolation {
                    plugin_id: self.plugin_id.clone(),
                    errors: report.error_messages(),
                }
                .into());
            }
        }

        let events = self.config.update_config(&self.plugin_id, update, actor)?;
        if !events.is_empty() && self.bundle.is_some() && !self.validate().await {
            log::warn!("'{}' no longer validates after a config update", self.plugin_id);
        }
        Ok(events)
    }
}
