//! # Abacus Execution Errors
//!
//! [`ExecutionError`] covers everything that can stop a validate -> compute
//! -> format run. Hosts show [`ExecutionError::user_message`]; the full
//! [`ExecutionError::diagnostic`] text is for logs.
use std::fmt;

use thiserror::Error;

use crate::plugin_system::traits::FieldErrors;

/// How a computation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationFailure {
    Timeout,
    Failed,
    Panicked,
}

impl fmt::Display for ComputationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationFailure::Timeout => write!(f, "timeout"),
            ComputationFailure::Failed => write!(f, "failed"),
            ComputationFailure::Panicked => write!(f, "panicked"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Validation failed for field(s): {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("Validation did not finish within {timeout_ms} ms")]
    ValidationTimeout { timeout_ms: u64 },

    /// The validator itself broke, as opposed to rejecting a field
    #[error("Validation aborted: {message}")]
    ValidationAborted { message: String },

    #[error("Computation {kind}: {message}")]
    Computation {
        kind: ComputationFailure,
        message: String,
    },

    #[error("Scoring implementation of '{plugin_id}' is misconfigured: {message}")]
    Configuration { plugin_id: String, message: String },
}

impl ExecutionError {
    pub fn computation(kind: ComputationFailure, message: impl Into<String>) -> Self {
        ExecutionError::Computation {
            kind,
            message: message.into(),
        }
    }

    /// Generic, retry-able message safe to show to end users
    pub fn user_message(&self) -> &'static str {
        match self {
            ExecutionError::Validation(_) => "Please correct the highlighted fields.",
            ExecutionError::ValidationTimeout { .. } => "Checking your inputs took too long. Please try again.",
            ExecutionError::ValidationAborted { .. } => "Your inputs could not be checked.",
            ExecutionError::Computation { .. } => "The calculation could not be completed. Please try again.",
            ExecutionError::Configuration { .. } => "This calculator is not available right now.",
        }
    }

    /// Full text including the underlying message
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecutionError::ValidationTimeout { .. }
                | ExecutionError::Computation {
                    kind: ComputationFailure::Timeout,
                    ..
                }
        )
    }

    /// Per-field errors of a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ExecutionError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
