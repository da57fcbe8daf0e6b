//! Per-instance render failure isolation.
//!
//! An [`ErrorBoundary`] wraps exactly one instance's presentation. The first
//! render that returns an error or panics trips it: the failure is reported
//! once, and from then on every render yields the fallback panel without
//! calling the presentation again. Only recreating the instance resets it.
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::ui_bridge::error::RenderError;
use crate::ui_bridge::presentation::{Block, MessageSeverity, Presentation, RenderContext, RenderedOutput};
use crate::utils::panic_message;

/// Receives the error that tripped a boundary
pub type BoundaryReporter = Arc<dyn Fn(&RenderError) + Send + Sync>;

const FALLBACK_TEXT: &str = "This calculator cannot be displayed right now.";

pub struct ErrorBoundary {
    plugin_id: String,
    tripped: Option<RenderError>,
    reporter: Option<BoundaryReporter>,
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("plugin_id", &self.plugin_id)
            .field("tripped", &self.tripped)
            .finish()
    }
}

impl ErrorBoundary {
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            tripped: None,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: BoundaryReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.is_some()
    }

    /// The error that tripped the boundary
    pub fn trip_error(&self) -> Option<&RenderError> {
        self.tripped.as_ref()
    }

    /// The panel shown in place of a failed presentation. Carries no error detail.
    pub fn fallback_panel() -> RenderedOutput {
        RenderedOutput {
            blocks: vec![Block::Notice {
                severity: MessageSeverity::Error,
                text: FALLBACK_TEXT.to_string(),
            }],
            is_fallback: true,
        }
    }

    /// Render through the boundary; never fails and never panics
    pub fn render(&mut self, presentation: &dyn Presentation, ctx: &RenderContext<'_>) -> RenderedOutput {
        if self.tripped.is_some() {
            return Self::fallback_panel();
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| presentation.render(ctx)));
        let error = match outcome {
            Ok(Ok(output)) => return output,
            Ok(Err(error)) => error,
            Err(payload) => RenderError::Panicked {
                presentation: presentation.name().to_string(),
                message: panic_message(payload),
            },
        };

        log::error!("Error boundary tripped for '{}': {}", self.plugin_id, error);
        if let Some(reporter) = &self.reporter {
            if panic::catch_unwind(AssertUnwindSafe(|| reporter(&error))).is_err() {
                log::error!("Error reporter for '{}' panicked", self.plugin_id);
            }
        }
        self.tripped = Some(error);
        Self::fallback_panel()
    }
}
