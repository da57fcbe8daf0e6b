pub mod event;
pub mod execution;
pub mod form;
pub mod kernel;
pub mod plugin_system;
pub mod storage;
pub mod ui_bridge;
pub mod utils;

// Re-export key public types for the binary and plugin crates
pub use kernel::error::Error as KernelError;
pub use kernel::Application;
pub use plugin_system::{
    CalculatorConfig, InstanceHandle, InstanceOptions, ModuleBundle, PluginManifest, PluginSource,
    ScoreResult, ScoringImpl, StaticPluginSource,
};
pub use storage::{ConfigManager, StorageProvider};
pub use ui_bridge::{ContainerId, Presentation};
