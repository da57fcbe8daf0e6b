//! The validate -> compute -> format pipeline.
//!
//! Each async step races a timer with `tokio::time::timeout`. The loser is
//! dropped, so a timed-out scoring future is cancelled at its next
//! suspension point and its outcome never reaches the instance. Panics in
//! any step are caught and classified instead of unwinding into the host.
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::time::timeout;

use crate::execution::error::{ComputationFailure, ExecutionError};
use crate::execution::options::ExecutionOptions;
use crate::plugin_system::traits::{FormattedResult, Inputs, ScoreResult, ScoringImpl};
use crate::utils::panic_message;

/// Successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub result: ScoreResult,
    pub formatted: FormattedResult,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPipeline {
    options: ExecutionOptions,
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl ExecutionPipeline {
    pub fn new(options: ExecutionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExecutionOptions {
        self.options
    }

    /// Run the plugin's `validate` under the validate timeout
    pub async fn validate(&self, scoring: &dyn ScoringImpl, inputs: &Inputs) -> Result<(), ExecutionError> {
        let limit = self.options.validate_timeout;
        let errors = match timeout(limit, AssertUnwindSafe(scoring.validate(inputs)).catch_unwind()).await {
            Err(_) => {
                log::warn!("validate exceeded {} ms", millis(limit));
                return Err(ExecutionError::ValidationTimeout { timeout_ms: millis(limit) });
            }
            Ok(Err(payload)) => {
                let message = format!("validate panicked: {}", panic_message(payload));
                log::error!("{}", message);
                return Err(ExecutionError::ValidationAborted { message });
            }
            Ok(Ok(errors)) => errors,
        };

        if errors.is_empty() {
            Ok(())
        } else {
            log::debug!("validate rejected {} field(s)", errors.len());
            Err(ExecutionError::Validation(errors))
        }
    }

    /// Run the plugin's `compute` under the compute timeout
    pub async fn compute(&self, scoring: &dyn ScoringImpl, inputs: &Inputs) -> Result<ScoreResult, ExecutionError> {
        let limit = self.options.compute_timeout;
        match timeout(limit, AssertUnwindSafe(scoring.compute(inputs)).catch_unwind()).await {
            Err(_) => {
                log::warn!("compute exceeded {} ms", millis(limit));
                Err(ExecutionError::computation(
                    ComputationFailure::Timeout,
                    format!("compute did not finish within {} ms", millis(limit)),
                ))
            }
            Ok(Err(payload)) => Err(ExecutionError::computation(
                ComputationFailure::Panicked,
                panic_message(payload),
            )),
            Ok(Ok(Err(e))) => Err(ExecutionError::computation(ComputationFailure::Failed, e.message)),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }

    /// Run the plugin's synchronous `format`
    pub fn format(
        &self,
        plugin_id: &str,
        scoring: &dyn ScoringImpl,
        result: &ScoreResult,
    ) -> Result<FormattedResult, ExecutionError> {
        panic::catch_unwind(AssertUnwindSafe(|| scoring.format(result))).map_err(|payload| {
            ExecutionError::Configuration {
                plugin_id: plugin_id.to_string(),
                message: format!("format panicked: {}", panic_message(payload)),
            }
        })
    }

    /// validate, then compute, then format. Field errors stop the run before compute.
    pub async fn run(
        &self,
        plugin_id: &str,
        scoring: &dyn ScoringImpl,
        inputs: &Inputs,
    ) -> Result<PipelineOutcome, ExecutionError> {
        let started = Instant::now();
        self.validate(scoring, inputs).await?;
        let result = self.compute(scoring, inputs).await?;
        let formatted = self.format(plugin_id, scoring, &result)?;
        let elapsed = started.elapsed();
        log::debug!("'{}' computed in {} ms", plugin_id, millis(elapsed));
        Ok(PipelineOutcome {
            result,
            formatted,
            elapsed,
        })
    }
}
