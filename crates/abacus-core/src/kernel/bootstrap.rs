use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::event::hub::EventHub;
use crate::event::types::{ConfigChangeEvent, RuntimeEvent};
use crate::execution::options::ExecutionOptions;
use crate::kernel::component::KernelComponent;
use crate::kernel::constants::{self, SYSTEM_ACTOR};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::compatibility::{self, CompatibilityReport};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::instance::{InstanceHandle, InstanceOptions};
use crate::plugin_system::lifecycle::{LifecycleController, LifecycleState};
use crate::plugin_system::loader::ModuleLoader;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::PluginSource;
use crate::storage::audit::{AuditSink, LogAuditSink};
use crate::storage::config::{ConfigManager, ConfigManagerOptions, ConfigUpdate, Environment};
use crate::storage::provider::{MemoryStorageProvider, StorageProvider};
use crate::ui_bridge::root::ContainerId;

#[derive(Debug, Clone, Copy)]
pub struct ApplicationOptions {
    /// Environment new plugin configs are created in
    pub environment: Environment,
    /// Timeouts for install and validate smoke tests
    pub execution: ExecutionOptions,
    pub config: ConfigManagerOptions,
    pub event_capacity: usize,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            execution: ExecutionOptions::default(),
            config: ConfigManagerOptions::default(),
            event_capacity: constants::DEFAULT_EVENT_HUB_CAPACITY,
        }
    }
}

/// Wires the registry, module loader, config manager and one lifecycle
/// controller per plugin together.
pub struct Application {
    initialized: bool,
    options: ApplicationOptions,
    registry: Arc<PluginRegistry>,
    loader: Arc<ModuleLoader>,
    config: Arc<ConfigManager>,
    hub: EventHub,
    controllers: Mutex<HashMap<String, LifecycleController>>,
    // Initialization order; shutdown runs in reverse
    components: Vec<Arc<dyn KernelComponent>>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("initialized", &self.initialized)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish()
    }
}

impl Application {
    pub fn new(provider: Arc<dyn StorageProvider>, audit: Arc<dyn AuditSink>) -> Self {
        Self::with_options(provider, audit, ApplicationOptions::default())
    }

    /// Application backed by in-memory storage, auditing to the log
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorageProvider::new()), Arc::new(LogAuditSink))
    }

    pub fn with_options(
        provider: Arc<dyn StorageProvider>,
        audit: Arc<dyn AuditSink>,
        options: ApplicationOptions,
    ) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        let hub = EventHub::new(options.event_capacity);
        let registry = Arc::new(PluginRegistry::new());
        let config = Arc::new(ConfigManager::with_options(provider, audit, options.config));
        let loader = Arc::new(ModuleLoader::new(Arc::clone(&registry), hub.clone()));

        let components: Vec<Arc<dyn KernelComponent>> = vec![
            Arc::clone(&config) as Arc<dyn KernelComponent>,
            Arc::clone(&loader) as Arc<dyn KernelComponent>,
        ];

        Application {
            initialized: false,
            options,
            registry,
            loader,
            config,
            hub,
            controllers: Mutex::new(HashMap::new()),
            components,
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn events(&self) -> &EventHub {
        &self.hub
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // --- Component lifecycle ---

    /// Initialize and start every component. Persisted configs are loaded here.
    pub async fn run(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Bootstrap,
                component_name: None,
                message: "Application already initialized".to_string(),
                source: None,
            });
        }
        self.initialize().await?;
        self.start().await?;
        self.initialized = true;
        log::info!("Application initialized and started successfully.");
        Ok(())
    }

    async fn initialize(&self) -> Result<()> {
        for component in &self.components {
            log::debug!("Initializing component: {}", component.name());
            component
                .initialize()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Initialize, component.name(), e))?;
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        for component in &self.components {
            log::debug!("Starting component: {}", component.name());
            component
                .start()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Start, component.name(), e))?;
        }
        Ok(())
    }

    /// Stop components in reverse order. Every component is stopped even if
    /// an earlier one fails; the first failure is returned.
    pub async fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;
        for component in self.components.iter().rev() {
            log::debug!("Stopping component: {}", component.name());
            if let Err(e) = component.stop().await {
                log::error!("Error stopping component {}: {}", component.name(), e);
                if first_error.is_none() {
                    first_error = Some(Error::lifecycle(KernelLifecyclePhase::Shutdown, component.name(), e));
                }
            }
        }
        self.initialized = false;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // --- Plugins ---

    pub fn register_plugin(&self, source: Arc<dyn PluginSource>) -> Result<()> {
        self.registry.register(source)?;
        Ok(())
    }

    pub async fn plugin_state(&self, plugin_id: &str) -> LifecycleState {
        self.controllers
            .lock()
            .await
            .get(plugin_id)
            .map(LifecycleController::state)
            .unwrap_or(LifecycleState::Unregistered)
    }

    /// Load, install, validate, configure and activate a plugin.
    ///
    /// Installing an already active plugin is a no-op.
    pub async fn install_plugin(&self, plugin_id: &str) -> Result<LifecycleState> {
        let bundle = self.loader.load_module(plugin_id).await?;
        let mut controllers = self.controllers.lock().await;
        let controller = controllers
            .entry(plugin_id.to_string())
            .or_insert_with(|| LifecycleController::new(plugin_id, Arc::clone(&self.config), self.options.execution));
        if controller.state() == LifecycleState::Active {
            return Ok(LifecycleState::Active);
        }

        let version = bundle.manifest().version.clone();
        if matches!(controller.state(), LifecycleState::Unregistered | LifecycleState::Uninstalled) {
            controller.install(Arc::clone(&bundle)).await?;
            self.hub.emit(RuntimeEvent::PluginInstalled {
                plugin_id: plugin_id.to_string(),
                version: version.clone(),
            });
        }

        if !controller.validate().await {
            return Err(PluginSystemError::lifecycle(plugin_id, "validate", "plugin failed validation").into());
        }

        let report = controller.check_compatibility(&self.registry);
        for warning in report.warnings() {
            log::warn!("'{}': {}", plugin_id, warning);
        }
        if !report.is_compatible() {
            let errors: Vec<String> = report.errors().map(|i| i.message.clone()).collect();
            return Err(PluginSystemError::lifecycle(plugin_id, "compatibility", errors.join("; ")).into());
        }

        controller.ensure_config(self.options.environment)?;
        controller.activate()?;
        self.registry.mark_installed(plugin_id, &version);
        self.hub.emit(RuntimeEvent::PluginActivated {
            plugin_id: plugin_id.to_string(),
        });
        Ok(controller.state())
    }

    /// Destroy the plugin's instances, evict its module and delete its config.
    /// Returns false when the plugin was not installed.
    pub async fn uninstall_plugin(&self, plugin_id: &str) -> Result<bool> {
        let mut controllers = self.controllers.lock().await;
        let Some(controller) = controllers.get_mut(plugin_id) else {
            return Ok(false);
        };
        if controller.state() == LifecycleState::Uninstalled {
            return Ok(false);
        }

        let destroyed = self.loader.destroy_instances_of(plugin_id).await;
        self.loader.evict_module(plugin_id);
        self.config.delete_config(plugin_id, SYSTEM_ACTOR)?;
        self.registry.mark_uninstalled(plugin_id);
        controller.uninstall();
        log::info!("Uninstalled '{}' ({} instance(s) destroyed)", plugin_id, destroyed);
        self.hub.emit(RuntimeEvent::PluginUninstalled {
            plugin_id: plugin_id.to_string(),
        });
        Ok(true)
    }

    /// Re-run the plugin's validation checks; false when not installed
    pub async fn validate_plugin(&self, plugin_id: &str) -> bool {
        match self.controllers.lock().await.get_mut(plugin_id) {
            Some(controller) => controller.validate().await,
            None => false,
        }
    }

    /// Compatibility report for a plugin, loading it if it is not installed
    pub async fn check_compatibility(&self, plugin_id: &str) -> Result<CompatibilityReport> {
        if let Some(controller) = self.controllers.lock().await.get(plugin_id) {
            if controller.bundle().is_some() {
                return Ok(controller.check_compatibility(&self.registry));
            }
        }
        let bundle = self.loader.load_module(plugin_id).await?;
        Ok(compatibility::check_compatibility(&bundle, &self.registry, constants::API_VERSION))
    }

    pub async fn update_plugin_config(
        &self,
        plugin_id: &str,
        update: ConfigUpdate,
        actor: &str,
    ) -> Result<Vec<ConfigChangeEvent>> {
        let mut controllers = self.controllers.lock().await;
        let controller = controllers
            .get_mut(plugin_id)
            .ok_or_else(|| PluginSystemError::lifecycle(plugin_id, "config-update", "plugin is not installed"))?;
        controller.on_config_update(update, actor).await
    }

    /// Mount an active plugin into `container`
    pub async fn create_instance(
        &self,
        plugin_id: &str,
        container: ContainerId,
        options: InstanceOptions,
    ) -> Result<InstanceHandle> {
        let state = self.plugin_state(plugin_id).await;
        if state != LifecycleState::Active {
            return Err(PluginSystemError::lifecycle(
                plugin_id,
                "instance",
                format!("plugin is {}, not Active", state),
            )
            .into());
        }
        Ok(self.loader.create_instance(plugin_id, container, options).await?)
    }
}
