//! # Execution Pipeline
//!
//! Runs a calculator's fixed contract (`validate`, `compute`, `format`)
//! under bounded timeouts. Inputs are passed through untouched; type
//! checking belongs to the scoring implementation.
pub mod error;
pub mod options;
pub mod pipeline;

pub use error::{ComputationFailure, ExecutionError};
pub use options::ExecutionOptions;
pub use pipeline::{ExecutionPipeline, PipelineOutcome};
