//! # Abacus Plugin System
//!
//! Everything between a plugin id and a running calculator.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`manifest`]**, **[`version`]**, **[`dependency`]**: plugin identity,
//!   semver ranges and dependency resolution.
//! - **[`traits`]**: the statically typed [`ScoringImpl`] contract and the
//!   [`PluginSource`] artifacts are fetched from.
//! - **[`source`]**: in-process ([`StaticPluginSource`]) and file-backed
//!   ([`FilePluginSource`]) sources.
//! - **[`registry`]**: registered sources and installed versions.
//! - **[`loader`]**: the module cache and single-flight instance creation.
//! - **[`instance`]**: [`RuntimeInstance`] and the host-facing [`InstanceHandle`].
//! - **[`lifecycle`]**: install, validate, activate, uninstall and config updates.
//! - **[`compatibility`]**: dependency, API and configuration checks.
//! - **[`error`]**: [`PluginSystemError`].
pub mod bundle;
pub mod compatibility;
pub mod dependency;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod source;
pub mod traits;
pub mod version;

pub use bundle::{
    CalculatorConfig, ChartKind, ModuleBundle, ScoreBand, SmokeTest, VisualizationDescriptor,
};
pub use compatibility::{
    check_compatibility, CompatibilityIssue, CompatibilityReport, IssueCategory, IssueSeverity,
};
pub use dependency::{DependencyError, PluginDependency};
pub use error::PluginSystemError;
pub use instance::{HostCallbacks, InstanceHandle, InstanceOptions, RuntimeInstance};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use loader::ModuleLoader;
pub use manifest::{LocalizedText, ManifestBuilder, PluginManifest};
pub use registry::PluginRegistry;
pub use source::{parse_config_descriptor, FilePluginSource, StaticPluginSource};
pub use traits::{
    FieldErrors, FormattedResult, Inputs, PluginSource, ScoreResult, ScoringError, ScoringImpl,
};
pub use version::{VersionError, VersionRange};

#[cfg(test)]
pub(crate) mod tests;
