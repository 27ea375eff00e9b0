//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Default number of timed iterations per variant.
pub const DEFAULT_ITERATIONS: usize = 30;

/// Default number of discarded warm-up iterations per variant.
pub const DEFAULT_WARMUP: usize = 3;

/// Parameters of a single benchmark run, passed explicitly to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Timed iterations per variant. Must be at least 1.
    pub iterations: usize,

    /// Warm-up iterations per variant. Results are discarded.
    pub warmup: usize,
}

impl RunConfig {
    /// Create a configuration with the given iteration and warm-up counts.
    pub fn new(iterations: usize, warmup: usize) -> Self {
        Self { iterations, warmup }
    }

    /// Set the number of timed iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the number of warm-up iterations.
    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Reject configurations that cannot produce a measurement.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.iterations == 0 {
            return Err(BenchError::config("iterations must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS, DEFAULT_WARMUP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.warmup, DEFAULT_WARMUP);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = RunConfig::default().with_iterations(0);
        assert!(matches!(
            config.validate(),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_warmup_allowed() {
        let config = RunConfig::new(1, 0);
        assert!(config.validate().is_ok());
    }
}
