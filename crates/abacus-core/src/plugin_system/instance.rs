//! Runtime instances: one loaded module bound to one mounted container.
//!
//! A [`RuntimeInstance`] owns the form state, the last result and error,
//! the UI root and the error boundary. Hosts hold an [`InstanceHandle`];
//! `calculate` takes the instance lock for the whole validate -> compute
//! cycle, so at most one cycle per instance is ever in flight.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, Weak};

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::event::hub::EventHub;
use crate::event::types::RuntimeEvent;
use crate::execution::error::ExecutionError;
use crate::execution::options::ExecutionOptions;
use crate::execution::pipeline::ExecutionPipeline;
use crate::form::engine::FormEngine;
use crate::kernel::constants::DEFAULT_LOCALE;
use crate::kernel::error::Error;
use crate::plugin_system::bundle::ModuleBundle;
use crate::plugin_system::traits::{FieldErrors, FormattedResult, Inputs, ScoreResult};
use crate::ui_bridge::boundary::ErrorBoundary;
use crate::ui_bridge::error::RenderError;
use crate::ui_bridge::presentation::{Presentation, RenderContext, RenderedOutput};
use crate::ui_bridge::root::{ContainerId, UiRoot};

pub type CalculateCallback = Arc<dyn Fn(&ScoreResult) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Callbacks the host registers on an instance
#[derive(Clone, Default)]
pub struct HostCallbacks {
    pub on_calculate: Option<CalculateCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl HostCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_calculate<F: Fn(&ScoreResult) + Send + Sync + 'static>(mut self, callback: F) -> Self {
        self.on_calculate = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F: Fn(&Error) + Send + Sync + 'static>(mut self, callback: F) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCallbacks")
            .field("on_calculate", &self.on_calculate.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub locale: String,
    pub show_errors_immediately: bool,
    pub execution: ExecutionOptions,
    pub callbacks: HostCallbacks,
    pub initial_inputs: Inputs,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            show_errors_immediately: false,
            execution: ExecutionOptions::default(),
            callbacks: HostCallbacks::default(),
            initial_inputs: Inputs::new(),
        }
    }
}

impl InstanceOptions {
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_callbacks(mut self, callbacks: HostCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_input(mut self, field: &str, value: Value) -> Self {
        self.initial_inputs.insert(field.to_string(), value);
        self
    }

    pub fn show_errors_immediately(mut self) -> Self {
        self.show_errors_immediately = true;
        self
    }
}

pub struct RuntimeInstance {
    container: ContainerId,
    bundle: Arc<ModuleBundle>,
    presentation: Arc<dyn Presentation>,
    form: FormEngine,
    pipeline: ExecutionPipeline,
    last_result: Option<ScoreResult>,
    last_formatted: Option<FormattedResult>,
    last_error: Option<ExecutionError>,
    boundary: ErrorBoundary,
    root: UiRoot,
    callbacks: HostCallbacks,
    locale: String,
    hub: EventHub,
}

impl fmt::Debug for RuntimeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeInstance")
            .field("plugin_id", &self.bundle.id())
            .field("container", &self.container)
            .field("presentation", &self.presentation.name())
            .field("has_result", &self.last_result.is_some())
            .field("boundary", &self.boundary)
            .finish()
    }
}

impl RuntimeInstance {
    pub(crate) fn new(
        bundle: Arc<ModuleBundle>,
        presentation: Arc<dyn Presentation>,
        container: ContainerId,
        options: InstanceOptions,
        hub: EventHub,
    ) -> Self {
        let mut form = FormEngine::new(&bundle.config.layout)
            .with_locale(&options.locale)
            .show_errors_immediately(options.show_errors_immediately);
        for (field, value) in options.initial_inputs {
            form.set_value(&field, value);
        }

        let reporter = {
            let on_error = options.callbacks.on_error.clone();
            let hub = hub.clone();
            let plugin_id = bundle.id().to_string();
            let container = container.to_string();
            Arc::new(move |error: &RenderError| {
                if let Some(on_error) = &on_error {
                    on_error(&Error::Render(error.clone()));
                }
                hub.emit(RuntimeEvent::BoundaryTripped {
                    plugin_id: plugin_id.clone(),
                    container: container.clone(),
                });
            })
        };

        Self {
            boundary: ErrorBoundary::new(bundle.id()).with_reporter(reporter),
            root: UiRoot::mount(container.clone()),
            container,
            presentation,
            form,
            pipeline: ExecutionPipeline::new(options.execution),
            last_result: None,
            last_formatted: None,
            last_error: None,
            callbacks: options.callbacks,
            locale: options.locale,
            hub,
            bundle,
        }
    }

    pub fn plugin_id(&self) -> &str {
        self.bundle.id()
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn bundle(&self) -> &Arc<ModuleBundle> {
        &self.bundle
    }

    pub fn form(&self) -> &FormEngine {
        &self.form
    }

    /// All current values, including those of hidden fields
    pub fn inputs(&self) -> &Inputs {
        self.form.values()
    }

    pub fn errors(&self) -> &FieldErrors {
        self.form.errors()
    }

    pub fn last_result(&self) -> Option<&ScoreResult> {
        self.last_result.as_ref()
    }

    pub fn formatted_result(&self) -> Option<&FormattedResult> {
        self.last_formatted.as_ref()
    }

    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.last_error.as_ref()
    }

    pub fn is_boundary_tripped(&self) -> bool {
        self.boundary.is_tripped()
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_mounted()
    }

    /// What the UI root currently shows
    pub fn output(&self) -> Option<&RenderedOutput> {
        self.root.content()
    }

    /// Set a field value and re-render. Returns false for unknown fields.
    pub fn set_input(&mut self, field: &str, value: Value) -> bool {
        let known = self.form.set_value(field, value);
        if known {
            self.render();
        }
        known
    }

    pub fn touch(&mut self, field: &str) {
        self.form.touch(field);
        self.render();
    }

    pub fn toggle_section(&mut self, section: &str) -> Option<bool> {
        let state = self.form.toggle_section(section);
        if state.is_some() {
            self.render();
        }
        state
    }

    /// Run one validate -> compute -> format cycle on the visible inputs.
    ///
    /// Success replaces the last result and calls `on_calculate`. Any
    /// failure leaves the previous result in place and calls `on_error`.
    pub async fn calculate(&mut self) -> Result<ScoreResult, ExecutionError> {
        self.form.touch_all_visible();
        let form_errors = self.form.validate();

        let bundle = Arc::clone(&self.bundle);
        let outcome = if form_errors.is_empty() {
            let inputs = self.form.visible_inputs();
            self.pipeline
                .run(bundle.id(), bundle.scoring.as_ref(), &inputs)
                .await
        } else {
            Err(ExecutionError::Validation(form_errors))
        };

        let result = match outcome {
            Ok(outcome) => {
                self.last_result = Some(outcome.result.clone());
                self.last_formatted = Some(outcome.formatted);
                self.last_error = None;
                if let Some(on_calculate) = &self.callbacks.on_calculate {
                    on_calculate(&outcome.result);
                }
                Ok(outcome.result)
            }
            Err(error) => {
                if let ExecutionError::Validation(errors) = &error {
                    self.form.set_errors(errors.clone());
                } else {
                    log::warn!("Calculation failed for '{}': {}", bundle.id(), error.diagnostic());
                    self.hub.emit(RuntimeEvent::CalculationFailed {
                        plugin_id: bundle.id().to_string(),
                        container: self.container.to_string(),
                        message: error.diagnostic(),
                    });
                }
                self.last_error = Some(error.clone());
                if let Some(on_error) = &self.callbacks.on_error {
                    on_error(&Error::Execution(error.clone()));
                }
                Err(error)
            }
        };
        self.render();
        result
    }

    /// Render through the error boundary and commit to the UI root
    pub fn render(&mut self) -> Option<&RenderedOutput> {
        if !self.root.is_mounted() {
            return None;
        }
        let form = self.form.render();
        let error_message = self
            .last_error
            .as_ref()
            .filter(|e| e.field_errors().is_none())
            .map(ExecutionError::user_message);
        let ctx = RenderContext {
            plugin_id: self.bundle.id(),
            manifest: self.bundle.manifest(),
            locale: &self.locale,
            form: &form,
            score: self.last_result.as_ref(),
            result: self.last_formatted.as_ref(),
            error_message,
            visualization: self.bundle.visualization.as_ref(),
        };
        let output = self.boundary.render(self.presentation.as_ref(), &ctx);
        if let Err(e) = self.root.commit(output) {
            log::warn!("Dropped render for '{}': {}", self.bundle.id(), e);
        }
        self.root.content()
    }

    pub(crate) fn unmount(&mut self) {
        self.root.unmount();
    }
}

/// Live instances by container
#[derive(Default)]
pub(crate) struct InstanceTable {
    entries: StdMutex<HashMap<ContainerId, Arc<Mutex<RuntimeInstance>>>>,
}

impl InstanceTable {
    fn entries(&self) -> StdMutexGuard<'_, HashMap<ContainerId, Arc<Mutex<RuntimeInstance>>>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn insert(&self, container: ContainerId, instance: Arc<Mutex<RuntimeInstance>>) {
        self.entries().insert(container, instance);
    }

    pub(crate) fn get(&self, container: &ContainerId) -> Option<Arc<Mutex<RuntimeInstance>>> {
        self.entries().get(container).cloned()
    }

    pub(crate) fn remove(&self, container: &ContainerId) -> Option<Arc<Mutex<RuntimeInstance>>> {
        self.entries().remove(container)
    }

    /// Remove the entry only if it still holds `instance`
    fn remove_if_same(&self, container: &ContainerId, instance: &Arc<Mutex<RuntimeInstance>>) -> bool {
        let mut entries = self.entries();
        match entries.get(container) {
            Some(current) if Arc::ptr_eq(current, instance) => {
                entries.remove(container);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn drain(&self) -> Vec<Arc<Mutex<RuntimeInstance>>> {
        self.entries().drain().map(|(_, instance)| instance).collect()
    }

    pub(crate) fn containers(&self) -> Vec<ContainerId> {
        let mut containers: Vec<ContainerId> = self.entries().keys().cloned().collect();
        containers.sort();
        containers
    }

    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Shared handle to a live [`RuntimeInstance`]
#[derive(Clone)]
pub struct InstanceHandle {
    plugin_id: String,
    container: ContainerId,
    instance: Arc<Mutex<RuntimeInstance>>,
    table: Weak<InstanceTable>,
    hub: EventHub,
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("plugin_id", &self.plugin_id)
            .field("container", &self.container)
            .finish()
    }
}

impl InstanceHandle {
    pub(crate) fn new(
        plugin_id: &str,
        container: ContainerId,
        instance: Arc<Mutex<RuntimeInstance>>,
        table: &Arc<InstanceTable>,
        hub: EventHub,
    ) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            container,
            instance,
            table: Arc::downgrade(table),
            hub,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    /// Exclusive access to the instance
    pub async fn lock(&self) -> MutexGuard<'_, RuntimeInstance> {
        self.instance.lock().await
    }

    pub async fn set_input(&self, field: &str, value: Value) -> bool {
        self.instance.lock().await.set_input(field, value)
    }

    pub async fn calculate(&self) -> Result<ScoreResult, ExecutionError> {
        self.instance.lock().await.calculate().await
    }

    /// Plain-text rendering of the current UI root
    pub async fn output_text(&self) -> Option<String> {
        self.instance.lock().await.output().map(RenderedOutput::to_text)
    }

    /// True while the instance is still registered in its container
    pub fn is_live(&self) -> bool {
        self.table
            .upgrade()
            .and_then(|table| table.get(&self.container))
            .is_some_and(|current| Arc::ptr_eq(&current, &self.instance))
    }

    /// Unmount the UI root and evict the instance. The module stays cached.
    ///
    /// Returns false if the instance was already destroyed or replaced.
    pub async fn destroy(&self) -> bool {
        let removed = self
            .table
            .upgrade()
            .is_some_and(|table| table.remove_if_same(&self.container, &self.instance));
        let mut instance = self.instance.lock().await;
        if !instance.is_mounted() {
            return false;
        }
        instance.unmount();
        self.hub.emit(RuntimeEvent::InstanceDestroyed {
            plugin_id: self.plugin_id.clone(),
            container: self.container.to_string(),
        });
        log::info!("Destroyed '{}' instance in '{}'", self.plugin_id, self.container);
        removed
    }
}
