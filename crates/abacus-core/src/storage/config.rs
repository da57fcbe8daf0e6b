//! # Plugin Configuration Manager
//!
//! Owns every [`PluginConfigInstance`]: one per installed plugin, created
//! from a [`ConfigTemplate`] and persisted through a [`StorageProvider`]
//! under `plugin-config:<plugin id>`.
//!
//! Updates are diffed per top-level key (`enabled`, `settings`,
//! `environment`, `secrets`); each changed key yields one
//! [`ConfigChangeEvent`]. A settings change is re-validated against the
//! template schema and the whole update is rejected if it fails. Accepted
//! changes are persisted, appended to a capped history, audited, delivered
//! to synchronous watchers in registration order and published on a
//! bounded broadcast channel.
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::event::types::{ConfigChangeEvent, WILDCARD_PATH};
use crate::event::watchers::{WatchHandle, WatcherRegistry};
use crate::kernel::component::KernelComponent;
use crate::kernel::constants::{
    config_key, CONFIG_KEY_PREFIX, DEFAULT_CHANGE_CHANNEL_CAPACITY, DEFAULT_HISTORY_CAP,
    GENERIC_TEMPLATE_ID, HISTORY_KEY, SYSTEM_ACTOR,
};
use crate::kernel::error::Result as KernelResult;
use crate::storage::audit::{AuditEntry, AuditSeverity, AuditSink};
use crate::storage::error::StorageSystemError;
use crate::storage::format::ConfigFormat;
use crate::storage::provider::StorageProvider;
use crate::storage::schema::{self, ConfigSchema, ObjectSchema, PropertySchema};
use crate::utils::now_millis;

type Result<T> = std::result::Result<T, StorageSystemError>;

/// Deployment environment a config is tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn all() -> Vec<Environment> {
        vec![
            Environment::Development,
            Environment::Test,
            Environment::Staging,
            Environment::Production,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Schema, defaults and supported environments a config is created from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: ConfigSchema,
    #[serde(default)]
    pub defaults: Map<String, Value>,
    pub environments: Vec<Environment>,
}

impl ConfigTemplate {
    /// A template whose defaults are the schema's declared defaults,
    /// supporting every environment
    pub fn new(id: &str, name: &str, schema: ConfigSchema) -> Self {
        let defaults = schema.defaults();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            schema,
            defaults,
            environments: Environment::all(),
        }
    }

    /// Merge extra defaults over the schema defaults
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        for (key, value) in defaults {
            self.defaults.insert(key, value);
        }
        self
    }

    pub fn with_environments(mut self, environments: Vec<Environment>) -> Self {
        self.environments = environments;
        self
    }

    pub fn supports(&self, environment: Environment) -> bool {
        self.environments.contains(&environment)
    }

    /// The built-in template every plugin can fall back to
    pub fn generic() -> Self {
        let schema = ObjectSchema::new()
            .property(
                "debug",
                PropertySchema::boolean()
                    .with_default(json!(false))
                    .describe("Log plugin internals"),
            )
            .property(
                "timeout",
                PropertySchema::integer()
                    .bounds(Some(0.0), None)
                    .with_default(json!(30000))
                    .describe("Operation timeout in milliseconds"),
            )
            .property(
                "retries",
                PropertySchema::integer()
                    .bounds(Some(0.0), Some(10.0))
                    .with_default(json!(3))
                    .describe("Retry attempts"),
            );
        let mut template = ConfigTemplate::new(GENERIC_TEMPLATE_ID, "Generic plugin settings", schema);
        template.description = Some("Default settings for plugins without their own template".into());
        template
    }
}

/// The persisted configuration of one plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfigInstance {
    pub plugin_id: String,
    pub template_id: String,
    pub enabled: bool,
    #[serde(default)]
    pub settings: Map<String, Value>,
    pub environment: Environment,
    #[serde(default)]
    pub secrets: Map<String, Value>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl PluginConfigInstance {
    /// Values of the keys that participate in change diffing
    fn tracked_values(&self) -> [(&'static str, Value); 4] {
        [
            ("enabled", Value::Bool(self.enabled)),
            ("settings", Value::Object(self.settings.clone())),
            ("environment", Value::String(self.environment.as_str().to_string())),
            ("secrets", Value::Object(self.secrets.clone())),
        ]
    }
}

/// A partial change to a [`PluginConfigInstance`].
///
/// `settings` is merged key by key into the current settings; the other
/// fields replace their current value. Also the document shape accepted by
/// [`ConfigManager::import_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Map<String, Value>>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set a single settings key
    pub fn setting(mut self, key: &str, value: Value) -> Self {
        self.settings
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn secrets(mut self, secrets: Map<String, Value>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.settings.is_none()
            && self.environment.is_none()
            && self.secrets.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigManagerOptions {
    /// Maximum number of change events kept; the oldest are evicted first
    pub history_cap: usize,
    pub change_channel_capacity: usize,
}

impl Default for ConfigManagerOptions {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            change_channel_capacity: DEFAULT_CHANGE_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigStats {
    pub total_configs: usize,
    pub enabled_configs: usize,
    pub by_environment: BTreeMap<String, usize>,
    pub template_count: usize,
    pub history_len: usize,
    pub watcher_count: usize,
}

pub struct ConfigManager {
    provider: Arc<dyn StorageProvider>,
    audit: Arc<dyn AuditSink>,
    options: ConfigManagerOptions,
    templates: RwLock<HashMap<String, ConfigTemplate>>,
    configs: RwLock<HashMap<String, PluginConfigInstance>>,
    history: Mutex<VecDeque<ConfigChangeEvent>>,
    watchers: Arc<WatcherRegistry>,
    changes: broadcast::Sender<ConfigChangeEvent>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .field("watchers", &self.watchers)
            .finish()
    }
}

fn poisoned(what: &str) -> StorageSystemError {
    StorageSystemError::InternalError(format!("{} lock poisoned", what))
}

impl ConfigManager {
    /// Create a manager with default options and the `generic` template registered
    pub fn new(provider: Arc<dyn StorageProvider>, audit: Arc<dyn AuditSink>) -> Self {
        Self::with_options(provider, audit, ConfigManagerOptions::default())
    }

    pub fn with_options(
        provider: Arc<dyn StorageProvider>,
        audit: Arc<dyn AuditSink>,
        options: ConfigManagerOptions,
    ) -> Self {
        let (changes, _rx) = broadcast::channel(options.change_channel_capacity.max(1));
        let generic = ConfigTemplate::generic();
        let mut templates = HashMap::new();
        templates.insert(generic.id.clone(), generic);
        Self {
            provider,
            audit,
            options,
            templates: RwLock::new(templates),
            configs: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            watchers: Arc::new(WatcherRegistry::new()),
            changes,
        }
    }

    pub fn options(&self) -> ConfigManagerOptions {
        self.options
    }

    fn templates_read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, ConfigTemplate>>> {
        self.templates.read().map_err(|_| poisoned("template"))
    }

    fn configs_read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, PluginConfigInstance>>> {
        self.configs.read().map_err(|_| poisoned("config"))
    }

    fn configs_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, PluginConfigInstance>>> {
        self.configs.write().map_err(|_| poisoned("config"))
    }

    fn history_lock(&self) -> MutexGuard<'_, VecDeque<ConfigChangeEvent>> {
        self.history.lock().unwrap_or_else(|p| p.into_inner())
    }

    // --- Templates ---

    /// Register (or replace) a template.
    ///
    /// The id and name must be non-blank and at least one environment must
    /// be supported.
    pub fn register_template(&self, template: ConfigTemplate) -> Result<()> {
        let invalid = |message: &str| StorageSystemError::InvalidTemplate {
            template_id: template.id.clone(),
            message: message.to_string(),
        };
        if template.id.trim().is_empty() {
            return Err(invalid("template id is required"));
        }
        if template.name.trim().is_empty() {
            return Err(invalid("template name is required"));
        }
        if template.environments.is_empty() {
            return Err(invalid("at least one supported environment is required"));
        }

        let mut templates = self.templates.write().map_err(|_| poisoned("template"))?;
        if templates.insert(template.id.clone(), template.clone()).is_some() {
            log::info!("Replaced config template '{}'", template.id);
        } else {
            log::debug!("Registered config template '{}'", template.id);
        }
        Ok(())
    }

    pub fn template(&self, template_id: &str) -> Option<ConfigTemplate> {
        self.templates_read().ok()?.get(template_id).cloned()
    }

    pub fn template_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .templates_read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn require_template(&self, template_id: &str) -> Result<ConfigTemplate> {
        self.template(template_id)
            .ok_or_else(|| StorageSystemError::TemplateNotFound(template_id.to_string()))
    }

    fn validate_settings(
        &self,
        plugin_id: &str,
        settings: &Map<String, Value>,
        schema: &ConfigSchema,
    ) -> Result<()> {
        let report = schema::validate(&Value::Object(settings.clone()), schema);
        for warning in &report.warnings {
            log::debug!("Config warning for '{}': {}", plugin_id, warning);
        }
        if report.valid {
            Ok(())
        } else {
            Err(StorageSystemError::SchemaViolation {
                plugin_id: plugin_id.to_string(),
                errors: report.error_messages(),
            })
        }
    }

    // --- Instances ---

    /// Create the config for `plugin_id` from a template.
    ///
    /// Template defaults are merged with `overrides` and the result must
    /// validate against the template schema.
    pub fn create_config(
        &self,
        plugin_id: &str,
        template_id: &str,
        environment: Environment,
        overrides: Map<String, Value>,
    ) -> Result<PluginConfigInstance> {
        let template = self.require_template(template_id)?;
        if !template.supports(environment) {
            return Err(StorageSystemError::UnsupportedEnvironment {
                template_id: template_id.to_string(),
                environment: environment.to_string(),
            });
        }
        if self.configs_read()?.contains_key(plugin_id) {
            return Err(StorageSystemError::ConfigExists(plugin_id.to_string()));
        }

        let mut settings = template.defaults.clone();
        for (key, value) in overrides {
            settings.insert(key, value);
        }
        self.validate_settings(plugin_id, &settings, &template.schema)?;

        let now = now_millis();
        let instance = PluginConfigInstance {
            plugin_id: plugin_id.to_string(),
            template_id: template_id.to_string(),
            enabled: true,
            settings,
            environment,
            secrets: Map::new(),
            created_at: now,
            updated_at: now,
        };
        self.persist(&instance)?;
        self.configs_write()?.insert(plugin_id.to_string(), instance.clone());
        self.audit.record(AuditEntry::new(
            "config.create",
            plugin_id,
            SYSTEM_ACTOR,
            AuditSeverity::Info,
        ));
        log::info!(
            "Created config for '{}' from template '{}' ({})",
            plugin_id,
            template_id,
            environment
        );
        Ok(instance)
    }

    /// Return the existing config, or create one from `template_id` with no overrides
    pub fn ensure_config(
        &self,
        plugin_id: &str,
        template_id: &str,
        environment: Environment,
    ) -> Result<PluginConfigInstance> {
        match self.get_config(plugin_id) {
            Some(existing) => Ok(existing),
            None => self.create_config(plugin_id, template_id, environment, Map::new()),
        }
    }

    pub fn get_config(&self, plugin_id: &str) -> Option<PluginConfigInstance> {
        self.configs_read().ok()?.get(plugin_id).cloned()
    }

    pub fn config_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .configs_read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Apply a partial update.
    ///
    /// Returns the emitted events, one per changed top-level key. An update
    /// that changes nothing emits nothing and is not persisted.
    pub fn update_config(
        &self,
        plugin_id: &str,
        update: ConfigUpdate,
        actor: &str,
    ) -> Result<Vec<ConfigChangeEvent>> {
        let current = self
            .get_config(plugin_id)
            .ok_or_else(|| StorageSystemError::ConfigNotFound(plugin_id.to_string()))?;

        let mut next = current.clone();
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(settings) = update.settings {
            for (key, value) in settings {
                next.settings.insert(key, value);
            }
        }
        if let Some(environment) = update.environment {
            next.environment = environment;
        }
        if let Some(secrets) = update.secrets {
            next.secrets = secrets;
        }

        let events: Vec<ConfigChangeEvent> = current
            .tracked_values()
            .into_iter()
            .zip(next.tracked_values())
            .filter(|((_, old), (_, new))| old != new)
            .map(|((path, old), (_, new))| {
                ConfigChangeEvent::new(plugin_id, path, Some(old), Some(new), actor)
            })
            .collect();
        if events.is_empty() {
            log::debug!("Update for '{}' changed nothing", plugin_id);
            return Ok(events);
        }

        let template = self.require_template(&next.template_id)?;
        if next.environment != current.environment && !template.supports(next.environment) {
            return Err(StorageSystemError::UnsupportedEnvironment {
                template_id: template.id,
                environment: next.environment.to_string(),
            });
        }
        if next.settings != current.settings {
            self.validate_settings(plugin_id, &next.settings, &template.schema)?;
        }

        next.updated_at = now_millis();
        self.persist(&next)?;
        self.configs_write()?.insert(plugin_id.to_string(), next);
        self.audit.record(AuditEntry::new(
            "config.update",
            plugin_id,
            actor,
            AuditSeverity::Info,
        ));
        log::info!(
            "Updated config for '{}' ({} change(s)) by {}",
            plugin_id,
            events.len(),
            actor
        );
        self.publish(&events);
        Ok(events)
    }

    /// Delete a plugin's config. Absent configs are a no-op returning `false`.
    pub fn delete_config(&self, plugin_id: &str, actor: &str) -> Result<bool> {
        let previous = {
            let mut configs = self.configs_write()?;
            if !configs.contains_key(plugin_id) {
                return Ok(false);
            }
            // Storage before memory, as in create and update
            self.provider.delete(&config_key(plugin_id))?;
            match configs.remove(plugin_id) {
                Some(previous) => previous,
                None => return Ok(false),
            }
        };

        let snapshot = serde_json::to_value(&previous).map_err(|e| StorageSystemError::SerializationError {
            format: "json".to_string(),
            source: Box::new(e),
        })?;
        let event = ConfigChangeEvent::new(plugin_id, WILDCARD_PATH, Some(snapshot), None, actor);
        self.audit.record(AuditEntry::new(
            "config.delete",
            plugin_id,
            actor,
            AuditSeverity::Warning,
        ));
        log::info!("Deleted config for '{}' by {}", plugin_id, actor);
        self.publish(std::slice::from_ref(&event));
        Ok(true)
    }

    fn publish(&self, events: &[ConfigChangeEvent]) {
        self.append_history(events);
        for event in events {
            // Failures are logged by the registry; delivery continues
            let _ = self.watchers.notify(event);
            let _ = self.changes.send(event.clone());
        }
    }

    fn append_history(&self, events: &[ConfigChangeEvent]) {
        let snapshot: Vec<ConfigChangeEvent> = {
            let mut history = self.history_lock();
            for event in events {
                history.push_back(event.clone());
            }
            while history.len() > self.options.history_cap {
                history.pop_front();
            }
            history.iter().cloned().collect()
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(e) = self.provider.set(HISTORY_KEY, &json) {
                    log::warn!("Failed to persist config history: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize config history: {}", e),
        }
    }

    fn persist(&self, instance: &PluginConfigInstance) -> Result<()> {
        let json = ConfigFormat::Json.encode(instance)?;
        self.provider.set(&config_key(&instance.plugin_id), &json)
    }

    /// Load every persisted config and the change history from the provider.
    ///
    /// Returns the number of configs loaded. Entries that fail to parse are
    /// skipped with a warning.
    pub fn load_persisted(&self) -> Result<usize> {
        let mut loaded = 0;
        for key in self.provider.keys(CONFIG_KEY_PREFIX)? {
            let Some(raw) = self.provider.get(&key)? else {
                continue;
            };
            match ConfigFormat::Json.decode::<PluginConfigInstance>(&raw) {
                Ok(instance) => {
                    self.configs_write()?.insert(instance.plugin_id.clone(), instance);
                    loaded += 1;
                }
                Err(e) => log::warn!("Skipping unreadable config '{}': {}", key, e),
            }
        }

        if let Some(raw) = self.provider.get(HISTORY_KEY)? {
            match ConfigFormat::Json.decode::<Vec<ConfigChangeEvent>>(&raw) {
                Ok(events) => {
                    let mut history = self.history_lock();
                    history.clear();
                    let skip = events.len().saturating_sub(self.options.history_cap);
                    history.extend(events.into_iter().skip(skip));
                }
                Err(e) => log::warn!("Skipping unreadable config history: {}", e),
            }
        }
        Ok(loaded)
    }

    // --- Observation ---

    /// Register a synchronous watcher for changes to `plugin_id`'s config
    pub fn watch_config<F>(&self, plugin_id: &str, callback: F) -> WatchHandle
    where
        F: Fn(&ConfigChangeEvent) + Send + Sync + 'static,
    {
        let id = self.watchers.subscribe(plugin_id, Arc::new(callback));
        WatchHandle::new(plugin_id, id, &self.watchers)
    }

    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    /// Receive every change event on the bounded broadcast channel
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.changes.subscribe()
    }

    pub fn change_stream(&self) -> BroadcastStream<ConfigChangeEvent> {
        BroadcastStream::new(self.changes.subscribe())
    }

    /// Change history, oldest first, optionally filtered to one plugin
    pub fn history(&self, plugin_id: Option<&str>) -> Vec<ConfigChangeEvent> {
        self.history_lock()
            .iter()
            .filter(|e| plugin_id.is_none_or(|id| e.plugin_id == id))
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history_lock().len()
    }

    // --- Import / export ---

    /// Copy of the config safe to hand out.
    ///
    /// Without `include_secrets` the secret map is cleared and every
    /// settings property flagged `sensitive` is removed, at any depth.
    pub fn export_config(&self, plugin_id: &str, include_secrets: bool) -> Result<PluginConfigInstance> {
        let mut instance = self
            .get_config(plugin_id)
            .ok_or_else(|| StorageSystemError::ConfigNotFound(plugin_id.to_string()))?;
        if !include_secrets {
            instance.secrets.clear();
            if let Some(template) = self.template(&instance.template_id) {
                instance.settings = schema::strip_map(&instance.settings, &template.schema);
            }
        }
        Ok(instance)
    }

    /// [`export_config`](Self::export_config) serialized in `format`
    pub fn export_config_as(
        &self,
        plugin_id: &str,
        include_secrets: bool,
        format: ConfigFormat,
    ) -> Result<String> {
        format.encode(&self.export_config(plugin_id, include_secrets)?)
    }

    /// Parse a config document, validate it and apply it through
    /// [`update_config`](Self::update_config).
    ///
    /// An empty `secrets` map in the document (as produced by a sanitized
    /// export) leaves the stored secrets untouched.
    pub fn import_config(
        &self,
        plugin_id: &str,
        data: &str,
        format: ConfigFormat,
        actor: &str,
    ) -> Result<Vec<ConfigChangeEvent>> {
        let mut update: ConfigUpdate = format.decode(data)?;
        if update.secrets.as_ref().is_some_and(Map::is_empty) {
            update.secrets = None;
        }

        let current = self
            .get_config(plugin_id)
            .ok_or_else(|| StorageSystemError::ConfigNotFound(plugin_id.to_string()))?;
        if let Some(settings) = &update.settings {
            let template = self.require_template(&current.template_id)?;
            let mut merged = current.settings.clone();
            for (key, value) in settings {
                merged.insert(key.clone(), value.clone());
            }
            self.validate_settings(plugin_id, &merged, &template.schema)?;
        }
        self.update_config(plugin_id, update, actor)
    }

    pub fn get_stats(&self) -> ConfigStats {
        let mut stats = ConfigStats {
            template_count: self.templates_read().map(|t| t.len()).unwrap_or(0),
            history_len: self.history_len(),
            watcher_count: self.watchers.watcher_count(),
            ..ConfigStats::default()
        };
        if let Ok(configs) = self.configs_read() {
            stats.total_configs = configs.len();
            for instance in configs.values() {
                if instance.enabled {
                    stats.enabled_configs += 1;
                }
                *stats
                    .by_environment
                    .entry(instance.environment.to_string())
                    .or_insert(0) += 1;
            }
        }
        stats
    }
}

#[async_trait]
impl KernelComponent for ConfigManager {
    fn name(&self) -> &'static str {
        "ConfigManager"
    }

    async fn initialize(&self) -> KernelResult<()> {
        let loaded = self.load_persisted()?;
        log::info!("Loaded {} persisted plugin config(s) from '{}'", loaded, self.provider.name());
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        log::debug!("ConfigManager stopping with {} history event(s)", self.history_len());
        Ok(())
    }
}
