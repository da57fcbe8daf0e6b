use std::time::Duration;

use crate::kernel::constants::{DEFAULT_COMPUTE_TIMEOUT_MS, DEFAULT_VALIDATE_TIMEOUT_MS};

/// Time limits for one validate -> compute run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub validate_timeout: Duration,
    pub compute_timeout: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            validate_timeout: Duration::from_millis(DEFAULT_VALIDATE_TIMEOUT_MS),
            compute_timeout: Duration::from_millis(DEFAULT_COMPUTE_TIMEOUT_MS),
        }
    }
}

impl ExecutionOptions {
    pub fn with_validate_timeout(mut self, timeout: Duration) -> Self {
        self.validate_timeout = timeout;
        self
    }

    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = timeout;
        self
    }
}
