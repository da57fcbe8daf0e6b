//! # Abacus UI Bridge Errors
//!
//! [`RenderError`] is raised by a presentation while rendering one runtime
//! instance. It is caught by that instance's
//! [`ErrorBoundary`](crate::ui_bridge::boundary::ErrorBoundary) and never
//! reaches sibling instances or the host.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Presentation '{presentation}' failed: {message}")]
    Failed { presentation: String, message: String },

    #[error("Presentation '{presentation}' panicked: {message}")]
    Panicked { presentation: String, message: String },

    #[error("Container '{0}' is not mounted")]
    NotMounted(String),
}

impl RenderError {
    pub fn failed(presentation: &str, message: impl Into<String>) -> Self {
        RenderError::Failed {
            presentation: presentation.to_string(),
            message: message.into(),
        }
    }
}
