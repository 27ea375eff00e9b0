//! Sequential execution of scenarios.
//!
//! Variants and iterations run one at a time on the calling thread. Each timed
//! iteration covers the full query call: resource acquisition, execution,
//! materialization and resource release.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::alloc::AllocationSnapshot;
use crate::config::RunConfig;
use crate::error::BenchError;
use crate::scenario::{ResultRows, Scenario};

/// Outcome of one timed iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MeasurementStatus {
    Ok,
    Failed(String),
}

/// A single timed iteration of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    scenario: String,
    variant: String,
    iteration: usize,
    elapsed: Duration,
    allocated_bytes: u64,
    allocations: u64,
    rows: usize,
    status: MeasurementStatus,
}

impl Measurement {
    /// A successful iteration.
    pub fn success(
        scenario: impl Into<String>,
        variant: impl Into<String>,
        iteration: usize,
        elapsed: Duration,
        allocated_bytes: u64,
        allocations: u64,
        rows: usize,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            variant: variant.into(),
            iteration,
            elapsed,
            allocated_bytes,
            allocations,
            rows,
            status: MeasurementStatus::Ok,
        }
    }

    /// A failed iteration. Carries no timing or allocation data.
    pub fn failure(
        scenario: impl Into<String>,
        variant: impl Into<String>,
        iteration: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            variant: variant.into(),
            iteration,
            elapsed: Duration::ZERO,
            allocated_bytes: 0,
            allocations: 0,
            rows: 0,
            status: MeasurementStatus::Failed(error.into()),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn status(&self) -> &MeasurementStatus {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == MeasurementStatus::Ok
    }
}

/// Result of executing one variant once for result-set comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantCheck {
    pub variant: String,
    pub rows: Option<usize>,
    pub digest: Option<u64>,
    /// Whether rows and digest match the scenario's reference variant.
    pub consistent: bool,
    pub error: Option<String>,
}

/// Executes scenarios with a fixed [`RunConfig`].
#[derive(Debug, Clone)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    /// Create a runner. Fails with a configuration error for invalid configs.
    pub fn new(config: RunConfig) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every variant of the scenario: warm-up first, then timed iterations.
    ///
    /// Query failures become failed measurements; the remaining iterations and
    /// variants still run.
    pub fn run(&self, scenario: &mut Scenario) -> Vec<Measurement> {
        let name = scenario.name().to_string();
        let mut measurements =
            Vec::with_capacity(scenario.len() * self.config.iterations);

        tracing::info!(
            scenario = %name,
            variants = scenario.len(),
            iterations = self.config.iterations,
            warmup = self.config.warmup,
            "running scenario"
        );

        for variant in scenario.variants_mut() {
            let label = variant.label();

            for i in 0..self.config.warmup {
                if let Err(e) = variant.execute() {
                    tracing::warn!(
                        scenario = %name,
                        variant = %label,
                        iteration = i,
                        error = %e,
                        "warm-up iteration failed"
                    );
                }
            }

            let mut failures = 0usize;
            for iteration in 0..self.config.iterations {
                let allocations = AllocationSnapshot::take();
                let start = Instant::now();
                let outcome = variant.execute();
                let elapsed = start.elapsed();
                let delta = allocations.delta();

                let measurement = match outcome {
                    Ok(rows) => Measurement::success(
                        name.as_str(),
                        label.as_str(),
                        iteration,
                        elapsed,
                        delta.bytes,
                        delta.count,
                        rows.row_count(),
                    ),
                    Err(e) => {
                        failures += 1;
                        tracing::debug!(
                            scenario = %name,
                            variant = %label,
                            iteration,
                            error = %e,
                            "iteration failed"
                        );
                        Measurement::failure(name.as_str(), label.as_str(), iteration, e.failure_message())
                    }
                };
                measurements.push(measurement);
            }

            if failures > 0 {
                tracing::warn!(
                    scenario = %name,
                    variant = %label,
                    failures,
                    iterations = self.config.iterations,
                    "variant had failed iterations"
                );
            } else {
                tracing::debug!(scenario = %name, variant = %label, "variant complete");
            }
        }

        measurements
    }

    /// Execute every variant once, untimed, and compare each result set with
    /// the first variant that succeeded.
    pub fn verify(&self, scenario: &mut Scenario) -> Vec<VariantCheck> {
        verify(scenario)
    }
}

/// Run a scenario with the given configuration.
pub fn run(scenario: &mut Scenario, config: &RunConfig) -> Result<Vec<Measurement>, BenchError> {
    Ok(Runner::new(*config)?.run(scenario))
}

/// Execute every variant once and check row count and digest agree.
pub fn verify(scenario: &mut Scenario) -> Vec<VariantCheck> {
    let name = scenario.name().to_string();
    let mut reference: Option<(usize, u64)> = None;
    let mut checks = Vec::with_capacity(scenario.len());

    for variant in scenario.variants_mut() {
        let label = variant.label();
        let check = match variant.execute() {
            Ok(rows) => {
                let observed = (rows.row_count(), rows.digest());
                let expected = *reference.get_or_insert(observed);
                let consistent = observed == expected;
                if !consistent {
                    tracing::warn!(
                        scenario = %name,
                        variant = %label,
                        rows = observed.0,
                        expected_rows = expected.0,
                        "result set differs from reference variant"
                    );
                }
                VariantCheck {
                    variant: label,
                    rows: Some(observed.0),
                    digest: Some(observed.1),
                    consistent,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(scenario = %name, variant = %label, error = %e, "verification query failed");
                VariantCheck {
                    variant: label,
                    rows: None,
                    digest: None,
                    consistent: false,
                    error: Some(e.failure_message()),
                }
            }
        };
        checks.push(check);
    }

    checks
}
