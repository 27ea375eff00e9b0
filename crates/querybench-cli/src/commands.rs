//! Subcommand implementations.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use querybench_core::{aggregate, render, BenchError, Runner, Summary};
use querybench_sales::{parse_database_url, seed as seed_database, SalesWorkload};

use crate::config::{RunArgs, SeedArgs};
use crate::error::Error;

/// Verify, measure and report every selected scenario.
pub fn run(args: RunArgs) -> Result<(), Error> {
    let config = args.into_config()?;
    let runner = Runner::new(config.run)?;

    tracing::info!(
        database_url = %config.database_url,
        iterations = config.run.iterations,
        warmup = config.run.warmup,
        scenarios = config.scenarios.len(),
        format = %config.format,
        "configuration loaded"
    );

    let workload = SalesWorkload::connect(&config.database_url, config.pool_size)?;
    let mut scenarios = workload.scenarios(&config.scenarios);

    let mut measurements = Vec::new();
    for scenario in &mut scenarios {
        if config.verify {
            let checks = runner.verify(scenario);
            let mismatched: Vec<_> = checks
                .iter()
                .filter(|c| !c.consistent)
                .map(|c| c.variant.as_str())
                .collect();
            if mismatched.is_empty() {
                tracing::info!(scenario = %scenario.name(), "variants return equivalent results");
            } else {
                tracing::warn!(
                    scenario = %scenario.name(),
                    variants = ?mismatched,
                    "variants disagree with the reference result"
                );
            }
        }
        measurements.extend(runner.run(scenario));
    }

    let summaries = aggregate(&measurements);
    write_report(&render(&summaries, config.format)?, config.output.as_deref())?;

    let dead = scenarios_without_success(&summaries);
    if dead.is_empty() {
        Ok(())
    } else {
        Err(Error::NoSuccessfulVariant(dead))
    }
}

/// Create and populate the sales database.
pub fn seed(args: SeedArgs) -> Result<(), Error> {
    let path = parse_database_url(&args.database_url()?)?;
    let summary = seed_database(&path, args.row_count())?;
    println!(
        "seeded {} rows ({} orders) into {}",
        summary.rows,
        summary.orders,
        path.display()
    );
    Ok(())
}

fn write_report(report: &str, output: Option<&Path>) -> Result<(), Error> {
    match output {
        Some(path) => {
            std::fs::write(path, report).map_err(BenchError::from)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", report).map_err(BenchError::from)?;
        }
    }
    Ok(())
}

/// Scenarios in which every variant failed, in report order.
fn scenarios_without_success(summaries: &[Summary]) -> Vec<String> {
    let succeeded: HashSet<&str> = summaries
        .iter()
        .filter(|s| !s.failed)
        .map(|s| s.scenario.as_str())
        .collect();

    let mut dead: Vec<String> = Vec::new();
    for summary in summaries {
        if !succeeded.contains(summary.scenario.as_str()) && !dead.contains(&summary.scenario) {
            dead.push(summary.scenario.clone());
        }
    }
    dead
}
