//! Per-variant summary statistics.

use std::collections::HashMap;

use serde::Serialize;

use crate::runner::{Measurement, MeasurementStatus};

/// Summary statistics of one variant.
///
/// Durations are in nanoseconds. When no iteration succeeded every statistic
/// is NaN and `failed` is set.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub variant: String,
    pub mean_ns: f64,
    pub std_dev_ns: f64,
    pub median_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub allocated_bytes_per_op: f64,
    pub allocations_per_op: f64,
    pub rows_per_op: f64,
    pub successes: usize,
    pub failures: usize,
    pub failed: bool,
    pub last_error: Option<String>,
}

impl Summary {
    /// Summarize measurements that all belong to one variant.
    fn from_measurements(scenario: &str, variant: &str, measurements: &[&Measurement]) -> Self {
        let ok: Vec<&Measurement> = measurements.iter().copied().filter(|m| m.is_success()).collect();
        let failures = measurements.len() - ok.len();
        let last_error = measurements.iter().rev().find_map(|m| match m.status() {
            MeasurementStatus::Failed(msg) => Some(msg.clone()),
            MeasurementStatus::Ok => None,
        });

        if ok.is_empty() {
            return Self {
                scenario: scenario.to_string(),
                variant: variant.to_string(),
                mean_ns: f64::NAN,
                std_dev_ns: f64::NAN,
                median_ns: f64::NAN,
                min_ns: f64::NAN,
                max_ns: f64::NAN,
                allocated_bytes_per_op: f64::NAN,
                allocations_per_op: f64::NAN,
                rows_per_op: f64::NAN,
                successes: 0,
                failures,
                failed: true,
                last_error,
            };
        }

        let mut durations: Vec<f64> = ok.iter().map(|m| m.elapsed().as_nanos() as f64).collect();
        let mean_ns = mean(&durations);
        let std_dev_ns = sample_std_dev(&durations, mean_ns);

        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_ns = median_of_sorted(&durations);
        let min_ns = durations[0];
        let max_ns = durations[durations.len() - 1];

        let n = ok.len() as f64;
        let allocated_bytes_per_op = ok.iter().map(|m| m.allocated_bytes() as f64).sum::<f64>() / n;
        let allocations_per_op = ok.iter().map(|m| m.allocations() as f64).sum::<f64>() / n;
        let rows_per_op = ok.iter().map(|m| m.rows() as f64).sum::<f64>() / n;

        Self {
            scenario: scenario.to_string(),
            variant: variant.to_string(),
            mean_ns,
            std_dev_ns,
            median_ns,
            min_ns,
            max_ns,
            allocated_bytes_per_op,
            allocations_per_op,
            rows_per_op,
            successes: ok.len(),
            failures,
            failed: false,
            last_error,
        }
    }
}

/// Group measurements by scenario and variant, in first-seen order, and
/// summarize each group.
pub fn aggregate(measurements: &[Measurement]) -> Vec<Summary> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<((&str, &str), Vec<&Measurement>)> = Vec::new();

    for m in measurements {
        let key = (m.scenario(), m.variant());
        match index.get(&key) {
            Some(&i) => groups[i].1.push(m),
            None => {
                index.insert(key, groups.len());
                groups.push((key, vec![m]));
            }
        }
    }

    groups
        .iter()
        .map(|((scenario, variant), group)| Summary::from_measurements(scenario, variant, group))
        .collect()
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Sample standard deviation (n - 1 denominator); zero for a single sample.
fn sample_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    variance.sqrt()
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ok(variant: &str, iteration: usize, micros: u64, bytes: u64) -> Measurement {
        Measurement::success("scan", variant, iteration, Duration::from_micros(micros), bytes, 2, 5)
    }

    #[test]
    fn test_mean_and_std_dev() {
        let measurements = vec![
            ok("a", 0, 2, 100),
            ok("a", 1, 4, 200),
            ok("a", 2, 4, 300),
            ok("a", 3, 4, 400),
            ok("a", 4, 5, 500),
            ok("a", 5, 5, 600),
            ok("a", 6, 7, 700),
            ok("a", 7, 9, 800),
        ];
        let summaries = aggregate(&measurements);
        assert_eq!(summaries.len(), 1);

        let s = &summaries[0];
        assert!((s.mean_ns - 5_000.0).abs() < 1e-6);
        // Sample variance of [2,4,4,4,5,5,7,9] is 32/7.
        let expected = (32.0f64 / 7.0).sqrt() * 1_000.0;
        assert!((s.std_dev_ns - expected).abs() < 1e-6);
        assert!((s.median_ns - 4_500.0).abs() < 1e-6);
        assert_eq!(s.min_ns, 2_000.0);
        assert_eq!(s.max_ns, 9_000.0);
        assert_eq!(s.allocated_bytes_per_op, 450.0);
        assert_eq!(s.allocations_per_op, 2.0);
        assert_eq!(s.rows_per_op, 5.0);
        assert!(!s.failed);
    }

    #[test]
    fn test_single_sample_has_zero_std_dev() {
        let summaries = aggregate(&[ok("a", 0, 10, 64)]);
        assert_eq!(summaries[0].std_dev_ns, 0.0);
        assert_eq!(summaries[0].mean_ns, 10_000.0);
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let measurements = vec![ok("b", 0, 1, 1), ok("a", 0, 1, 1), ok("b", 1, 3, 1)];
        let summaries = aggregate(&measurements);
        let labels: Vec<&str> = summaries.iter().map(|s| s.variant.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert_eq!(summaries[0].successes, 2);
    }

    #[test]
    fn test_same_variant_label_in_different_scenarios() {
        let measurements = vec![
            Measurement::success("scan", "rusqlite", 0, Duration::from_micros(1), 0, 0, 1),
            Measurement::success("group", "rusqlite", 0, Duration::from_micros(1), 0, 0, 1),
        ];
        assert_eq!(aggregate(&measurements).len(), 2);
    }

    #[test]
    fn test_all_failed_variant_is_kept() {
        let measurements = vec![
            Measurement::failure("scan", "broken", 0, "no such table"),
            Measurement::failure("scan", "broken", 1, "no such table"),
            ok("fine", 0, 3, 10),
        ];
        let summaries = aggregate(&measurements);
        assert_eq!(summaries.len(), 2);

        let broken = &summaries[0];
        assert!(broken.failed);
        assert!(broken.mean_ns.is_nan());
        assert!(broken.std_dev_ns.is_nan());
        assert!(broken.allocated_bytes_per_op.is_nan());
        assert_eq!(broken.failures, 2);
        assert_eq!(broken.successes, 0);
        assert_eq!(broken.last_error.as_deref(), Some("no such table"));

        assert!(!summaries[1].failed);
    }

    #[test]
    fn test_partial_failures_use_successful_samples() {
        let measurements = vec![
            ok("a", 0, 4, 10),
            Measurement::failure("scan", "a", 1, "timeout"),
            ok("a", 2, 6, 30),
        ];
        let s = &aggregate(&measurements)[0];
        assert!(!s.failed);
        assert_eq!(s.successes, 2);
        assert_eq!(s.failures, 1);
        assert_eq!(s.mean_ns, 5_000.0);
        assert_eq!(s.allocated_bytes_per_op, 20.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
