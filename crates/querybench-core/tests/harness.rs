//! End-to-end tests of the harness with allocation tracking enabled.

use querybench_core::{
    aggregate, render, run, BenchError, QueryError, ReportFormat, RunConfig, Scenario,
    TrackingAllocator, Variant,
};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn fixed_rows() -> Result<Vec<String>, QueryError> {
    Ok((0..5).map(|i| format!("row-{}", i)).collect())
}

fn two_variant_scenario() -> Scenario {
    Scenario::new("fixed")
        .with_variant(Variant::new("first", fixed_rows))
        .with_variant(Variant::new("second", fixed_rows).with_flag("no_tracking"))
}

#[test]
fn test_ten_iterations_two_variants() {
    let mut scenario = two_variant_scenario();
    let measurements = run(&mut scenario, &RunConfig::new(10, 0)).unwrap();

    assert_eq!(measurements.iter().filter(|m| m.variant() == "first").count(), 10);
    assert_eq!(
        measurements
            .iter()
            .filter(|m| m.variant() == "second:no_tracking")
            .count(),
        10
    );

    let summaries = aggregate(&measurements);
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert!(!summary.failed);
        assert_eq!(summary.successes, 10);
        assert!(summary.mean_ns >= 0.0);
        assert!(summary.std_dev_ns >= 0.0);
        assert!(summary.allocated_bytes_per_op > 0.0);
        assert!(summary.allocations_per_op >= 6.0);
        assert_eq!(summary.rows_per_op, 5.0);
    }
}

#[test]
fn test_single_iteration_has_zero_std_dev() {
    let mut scenario = two_variant_scenario();
    let summaries = aggregate(&run(&mut scenario, &RunConfig::new(1, 0)).unwrap());
    assert!(summaries.iter().all(|s| s.std_dev_ns == 0.0));
}

#[test]
fn test_zero_iterations_is_configuration_error() {
    let mut scenario = two_variant_scenario();
    let result = run(&mut scenario, &RunConfig::new(0, 5));
    assert!(matches!(result, Err(BenchError::Configuration(_))));
}

#[test]
fn test_failing_variant_reported_alongside_siblings() {
    let mut scenario = two_variant_scenario().with_variant(Variant::new(
        "broken",
        || -> Result<Vec<String>, QueryError> { Err(QueryError::new("no such table: orders")) },
    ));

    let summaries = aggregate(&run(&mut scenario, &RunConfig::new(5, 1)).unwrap());
    assert_eq!(summaries.len(), 3);

    let broken = summaries.iter().find(|s| s.variant == "broken").unwrap();
    assert!(broken.failed);
    assert!(broken.mean_ns.is_nan());
    assert_eq!(broken.failures, 5);

    let siblings: Vec<_> = summaries.iter().filter(|s| s.variant != "broken").collect();
    assert!(siblings.iter().all(|s| !s.failed && s.successes == 5));

    let report = render(&summaries, ReportFormat::Json).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&report).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    // Failed variants sort after every variant with a mean.
    assert_eq!(rows[2]["variant"], "broken");
    assert!(rows[0]["mean_ns"].as_f64().unwrap() <= rows[1]["mean_ns"].as_f64().unwrap());
}
