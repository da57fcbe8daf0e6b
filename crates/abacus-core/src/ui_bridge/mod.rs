//! # Abacus UI Bridge
//!
//! The contract between runtime instances and whatever draws them.
//! A [`Presentation`] turns an instance's state into a [`RenderedOutput`]
//! that is committed to the instance's [`UiRoot`]. Every render goes through
//! the instance's [`ErrorBoundary`], which contains presentation failures.
pub mod boundary;
pub mod error;
pub mod presentation;
pub mod root;

pub use boundary::{BoundaryReporter, ErrorBoundary};
pub use error::RenderError;
pub use presentation::{
    Block, GenericPresentation, MessageSeverity, Presentation, RenderContext, RenderedOutput,
};
pub use root::{ContainerId, UiRoot};

#[cfg(test)]
mod tests;
