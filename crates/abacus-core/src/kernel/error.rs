//! # Abacus Kernel Errors
//!
//! Defines the top-level [`Error`] type for the runtime.
//!
//! Every subsystem owns a typed error enum ([`PluginSystemError`],
//! [`StorageSystemError`], [`ExecutionError`], [`RenderError`],
//! [`EventSystemError`]); the kernel error wraps them so that
//! [`Application`](crate::kernel::Application) methods and component
//! lifecycle hooks can share one `Result` alias.
use std::result::Result as StdResult;

use crate::event::error::EventSystemError;
use crate::execution::error::ExecutionError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;
use crate::ui_bridge::error::RenderError;
use thiserror::Error as ThisError;

/// Custom error type for the Abacus runtime
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Specific, typed storage and config error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Failure inside the validate -> compute -> format pipeline
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Presentation failure that escaped to the kernel (never from a boundary)
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Event system error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase:?}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Wrap a component failure with the lifecycle phase it happened in
    pub fn lifecycle(phase: KernelLifecyclePhase, component_name: &str, source: Error) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: Some(component_name.to_string()),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}
