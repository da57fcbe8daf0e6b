//! # Abacus Kernel
//!
//! Bootstrapping and shared plumbing for the runtime.
//!
//! - **[`bootstrap`]**: the [`Application`] that wires the registry, module
//!   loader, config manager and lifecycle controllers together.
//! - **[`component`]**: the [`KernelComponent`] lifecycle hooks.
//! - **[`constants`]**: runtime-wide defaults.
//! - **[`error`]**: the kernel [`Error`] and its `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::{Application, ApplicationOptions};
pub use component::KernelComponent;
pub use error::{Error, Result};
