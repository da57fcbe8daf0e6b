//! # Module Loader
//!
//! Resolves a plugin id to a cached [`ModuleBundle`] and binds bundles to
//! containers as [`RuntimeInstance`]s.
//!
//! Loading fetches the config descriptor, scoring implementation and
//! optional visualization concurrently. A missing config or scoring
//! artifact is a `ModuleUnavailable` failure that leaves the cache
//! untouched. Instance creation is single-flight per container: a request
//! for a container that already has a creation in progress returns `Busy`
//! immediately instead of queuing.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::event::hub::EventHub;
use crate::event::types::RuntimeEvent;
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result as KernelResult;
use crate::plugin_system::bundle::ModuleBundle;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::instance::{InstanceHandle, InstanceOptions, InstanceTable, RuntimeInstance};
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::PluginSource;
use crate::ui_bridge::presentation::{GenericPresentation, Presentation};
use crate::ui_bridge::root::ContainerId;

/// Marks a container as under construction until dropped
struct CreationGuard<'a> {
    pending: &'a StdMutex<HashSet<ContainerId>>,
    container: ContainerId,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.remove(&self.container);
    }
}

pub struct ModuleLoader {
    registry: Arc<PluginRegistry>,
    modules: RwLock<HashMap<String, Arc<ModuleBundle>>>,
    instances: Arc<InstanceTable>,
    pending: StdMutex<HashSet<ContainerId>>,
    hub: EventHub,
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("cached_modules", &self.cached_ids())
            .field("instances", &self.instances.len())
            .finish()
    }
}

impl ModuleLoader {
    pub fn new(registry: Arc<PluginRegistry>, hub: EventHub) -> Self {
        Self {
            registry,
            modules: RwLock::new(HashMap::new()),
            instances: Arc::new(InstanceTable::default()),
            pending: StdMutex::new(HashSet::new()),
            hub,
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    // --- Module cache ---

    pub fn cached_module(&self, id: &str) -> Option<Arc<ModuleBundle>> {
        self.modules
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cached_module(id).is_some()
    }

    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .modules
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Drop a module from the cache; live instances keep their bundle
    pub fn evict_module(&self, id: &str) -> bool {
        self.modules
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id)
            .is_some()
    }

    /// Resolve `id` to its bundle, fetching and caching it on first use
    pub async fn load_module(&self, id: &str) -> Result<Arc<ModuleBundle>, PluginSystemError> {
        if let Some(cached) = self.cached_module(id) {
            log::debug!("Module cache hit for '{}'", id);
            return Ok(cached);
        }

        let outcome = match self.registry.get(id) {
            Some(source) => Self::fetch_bundle(id, source.as_ref()).await,
            None => Err(PluginSystemError::unavailable(id, "no plugin is registered under this id")),
        };

        match outcome {
            Ok(bundle) => {
                let bundle = {
                    let mut modules = self.modules.write().unwrap_or_else(|p| p.into_inner());
                    // A concurrent load may have won the race; keep its bundle
                    Arc::clone(modules.entry(id.to_string()).or_insert_with(|| Arc::new(bundle)))
                };
                log::info!("Loaded module '{}' v{}", id, bundle.manifest().version);
                self.hub.emit(RuntimeEvent::ModuleLoaded { plugin_id: id.to_string() });
                Ok(bundle)
            }
            Err(e) => {
                log::warn!("Failed to load module '{}': {}", id, e);
                self.hub.emit(RuntimeEvent::ModuleLoadFailed {
                    plugin_id: id.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch_bundle(id: &str, source: &dyn PluginSource) -> Result<ModuleBundle, PluginSystemError> {
        let (config, scoring, visualization) =
            tokio::join!(source.config_descriptor(), source.scoring(), source.visualization());

        let config = match config {
            Ok(Some(config)) => config,
            Ok(None) => return Err(PluginSystemError::unavailable(id, "config descriptor is missing")),
            Err(e) => return Err(PluginSystemError::unavailable(id, format!("config descriptor: {}", e))),
        };
        let scoring = match scoring {
            Ok(Some(scoring)) => scoring,
            Ok(None) => return Err(PluginSystemError::unavailable(id, "scoring implementation is missing")),
            Err(e) => {
                return Err(PluginSystemError::unavailable(id, format!("scoring implementation: {}", e)));
            }
        };
        let visualization = visualization.unwrap_or_else(|e| {
            log::warn!("Ignoring visualization for '{}': {}", id, e);
            None
        });

        if config.manifest.id != id {
            return Err(PluginSystemError::unavailable(
                id,
                format!("config descriptor declares id '{}'", config.manifest.id),
            ));
        }

        Ok(ModuleBundle {
            config,
            scoring,
            visualization,
            presentation: source.presentation(),
        })
    }

    // --- Instances ---

    fn begin_creation(&self, container: &ContainerId) -> Result<CreationGuard<'_>, PluginSystemError> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if !pending.insert(container.clone()) {
            return Err(PluginSystemError::Busy {
                container: container.to_string(),
            });
        }
        Ok(CreationGuard {
            pending: &self.pending,
            container: container.clone(),
        })
    }

    /// Load `id` and mount a new instance into `container`.
    ///
    /// An instance already living in the container is destroyed first.
    pub async fn create_instance(
        &self,
        id: &str,
        container: ContainerId,
        options: InstanceOptions,
    ) -> Result<InstanceHandle, PluginSystemError> {
        let _guard = self.begin_creation(&container)?;
        let bundle = self.load_module(id).await?;

        let presentation: Arc<dyn Presentation> = match &bundle.presentation {
            Some(presentation) => Arc::clone(presentation),
            None => {
                log::debug!("'{}' has no presentation; using the generic one", id);
                Arc::new(GenericPresentation)
            }
        };

        if let Some(previous) = self.instances.remove(&container) {
            let mut previous = previous.lock().await;
            let previous_id = previous.plugin_id().to_string();
            previous.unmount();
            self.hub.emit(RuntimeEvent::InstanceDestroyed {
                plugin_id: previous_id,
                container: container.to_string(),
            });
        }

        let mut instance = RuntimeInstance::new(bundle, presentation, container.clone(), options, self.hub.clone());
        instance.render();
        let instance = Arc::new(Mutex::new(instance));
        self.instances.insert(container.clone(), Arc::clone(&instance));

        log::info!("Created '{}' instance in '{}'", id, container);
        self.hub.emit(RuntimeEvent::InstanceCreated {
            plugin_id: id.to_string(),
            container: container.to_string(),
        });
        Ok(InstanceHandle::new(id, container, instance, &self.instances, self.hub.clone()))
    }

    /// Handle to the instance mounted in `container`
    pub async fn instance(&self, container: &ContainerId) -> Option<InstanceHandle> {
        let instance = self.instances.get(container)?;
        let plugin_id = instance.lock().await.plugin_id().to_string();
        Some(InstanceHandle::new(
            &plugin_id,
            container.clone(),
            instance,
            &self.instances,
            self.hub.clone(),
        ))
    }

    pub async fn destroy_instance(&self, container: &ContainerId) -> bool {
        match self.instance(container).await {
            Some(handle) => handle.destroy().await,
            None => false,
        }
    }

    /// Destroy every instance of `plugin_id`; returns how many were destroyed
    pub async fn destroy_instances_of(&self, plugin_id: &str) -> usize {
        let mut destroyed = 0;
        for container in self.instances.containers() {
            if let Some(handle) = self.instance(&container).await {
                if handle.plugin_id() == plugin_id && handle.destroy().await {
                    destroyed += 1;
                }
            }
        }
        destroyed
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn containers(&self) -> Vec<ContainerId> {
        self.instances.containers()
    }
}

#[async_trait]
impl KernelComponent for ModuleLoader {
    fn name(&self) -> &'static str {
        "ModuleLoader"
    }

    async fn initialize(&self) -> KernelResult<()> {
        log::info!("ModuleLoader ready with {} registered plugin(s)", self.registry.len());
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        let instances = self.instances.drain();
        let count = instances.len();
        for instance in instances {
            instance.lock().await.unmount();
        }
        log::info!("ModuleLoader stopped; unmounted {} instance(s)", count);
        Ok(())
    }
}
