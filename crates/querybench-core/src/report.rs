//! Report rendering.
//!
//! Rows are grouped by scenario (first-seen order) and sorted by mean duration
//! ascending inside each scenario. Failed variants have no mean and sort last.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use comfy_table::{presets, Cell, CellAlignment, Table};
use serde::Serialize;

use crate::aggregate::Summary;
use crate::error::BenchError;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Terminal table.
    #[default]
    Table,
    /// JSON array of rows.
    Json,
    /// CSV with a header line.
    Csv,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Table => write!(f, "table"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

/// One rendered report row.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow<'a> {
    pub scenario: &'a str,
    pub variant: &'a str,
    pub mean_ns: Option<f64>,
    pub std_dev_ns: Option<f64>,
    pub median_ns: Option<f64>,
    pub min_ns: Option<f64>,
    pub max_ns: Option<f64>,
    /// Mean relative to the fastest successful variant of the scenario.
    pub ratio: Option<f64>,
    pub allocated_bytes_per_op: Option<f64>,
    pub allocations_per_op: Option<f64>,
    pub rows_per_op: Option<f64>,
    pub successes: usize,
    pub failures: usize,
    pub failed: bool,
    pub error: Option<&'a str>,
}

/// Order summaries for reporting: scenarios in first-seen order, variants by
/// ascending mean, failed variants last.
pub fn sorted_rows(summaries: &[Summary]) -> Vec<ReportRow<'_>> {
    let mut scenarios: Vec<&str> = Vec::new();
    for s in summaries {
        if !scenarios.contains(&s.scenario.as_str()) {
            scenarios.push(&s.scenario);
        }
    }

    let mut rows = Vec::with_capacity(summaries.len());
    for scenario in scenarios {
        let mut group: Vec<&Summary> = summaries.iter().filter(|s| s.scenario == scenario).collect();
        group.sort_by(|a, b| compare_mean(a, b));

        let fastest = group
            .iter()
            .find(|s| !s.failed)
            .map(|s| s.mean_ns)
            .filter(|mean| *mean > 0.0);

        for s in group {
            rows.push(ReportRow {
                scenario: &s.scenario,
                variant: &s.variant,
                mean_ns: finite(s.mean_ns),
                std_dev_ns: finite(s.std_dev_ns),
                median_ns: finite(s.median_ns),
                min_ns: finite(s.min_ns),
                max_ns: finite(s.max_ns),
                ratio: fastest.and_then(|base| finite(s.mean_ns / base)),
                allocated_bytes_per_op: finite(s.allocated_bytes_per_op),
                allocations_per_op: finite(s.allocations_per_op),
                rows_per_op: finite(s.rows_per_op),
                successes: s.successes,
                failures: s.failures,
                failed: s.failed,
                error: s.last_error.as_deref(),
            });
        }
    }
    rows
}

fn compare_mean(a: &Summary, b: &Summary) -> Ordering {
    match (a.mean_ns.is_nan(), b.mean_ns.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.mean_ns.partial_cmp(&b.mean_ns).unwrap_or(Ordering::Equal),
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Trait for report formatters.
pub trait Formatter {
    /// Render summaries as a complete report.
    fn format_summaries(&self, summaries: &[Summary]) -> Result<String, BenchError>;
}

/// Create a formatter for the given format.
pub fn create_formatter(format: ReportFormat) -> Box<dyn Formatter> {
    match format {
        ReportFormat::Table => Box::new(TableFormatter),
        ReportFormat::Json => Box::new(JsonFormatter),
        ReportFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Render summaries in the given format.
pub fn render(summaries: &[Summary], format: ReportFormat) -> Result<String, BenchError> {
    create_formatter(format).format_summaries(summaries)
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_summaries(&self, summaries: &[Summary]) -> Result<String, BenchError> {
        if summaries.is_empty() {
            return Ok("No results".to_string());
        }

        let mut table = Table::new();
        table.load_preset(presets::ASCII_MARKDOWN);
        table.set_header(vec![
            "Scenario",
            "Variant",
            "Mean",
            "StdDev",
            "Median",
            "Ratio",
            "Allocated",
            "Allocs/op",
            "Rows",
            "Failures",
        ]);

        for row in sorted_rows(summaries) {
            let numeric = |text: String| Cell::new(text).set_alignment(CellAlignment::Right);
            table.add_row(vec![
                Cell::new(row.scenario),
                Cell::new(row.variant),
                numeric(opt(row.mean_ns, format_duration)),
                numeric(opt(row.std_dev_ns, format_duration)),
                numeric(opt(row.median_ns, format_duration)),
                numeric(opt(row.ratio, |r| format!("{:.2}", r))),
                numeric(opt(row.allocated_bytes_per_op, format_bytes)),
                numeric(opt(row.allocations_per_op, |a| format!("{:.0}", a))),
                numeric(opt(row.rows_per_op, |r| format!("{:.0}", r))),
                numeric(format!("{}/{}", row.failures, row.failures + row.successes)),
            ]);
        }

        let mut output = table.to_string();
        for row in sorted_rows(summaries).iter().filter(|r| r.failed) {
            output.push_str(&format!(
                "\n{} / {} failed: {}",
                row.scenario,
                row.variant,
                row.error.unwrap_or("unknown error")
            ));
        }
        Ok(output)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_summaries(&self, summaries: &[Summary]) -> Result<String, BenchError> {
        Ok(serde_json::to_string_pretty(&sorted_rows(summaries))?)
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_summaries(&self, summaries: &[Summary]) -> Result<String, BenchError> {
        let mut output = String::from(
            "scenario,variant,mean_ns,std_dev_ns,median_ns,min_ns,max_ns,ratio,allocated_bytes_per_op,allocations_per_op,rows_per_op,successes,failures,failed,error\n",
        );
        for row in sorted_rows(summaries) {
            let cells = [
                escape_csv(row.scenario),
                escape_csv(row.variant),
                opt_csv(row.mean_ns),
                opt_csv(row.std_dev_ns),
                opt_csv(row.median_ns),
                opt_csv(row.min_ns),
                opt_csv(row.max_ns),
                opt_csv(row.ratio),
                opt_csv(row.allocated_bytes_per_op),
                opt_csv(row.allocations_per_op),
                opt_csv(row.rows_per_op),
                row.successes.to_string(),
                row.failures.to_string(),
                row.failed.to_string(),
                row.error.map(escape_csv).unwrap_or_default(),
            ];
            output.push_str(&cells.join(","));
            output.push('\n');
        }
        Ok(output)
    }
}

fn opt(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "NA".to_string())
}

fn opt_csv(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_default()
}

fn escape_csv(s: &str) -> String {
    if s.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Format a duration given in nanoseconds with an appropriate unit.
pub fn format_duration(nanos: f64) -> String {
    const UNITS: &[(&str, f64)] = &[("s", 1e9), ("ms", 1e6), ("us", 1e3)];

    for &(unit, scale) in UNITS {
        if nanos >= scale {
            return format!("{:.2} {}", nanos / scale, unit);
        }
    }
    format!("{:.2} ns", nanos)
}

/// Format a byte count with binary units.
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    const THRESHOLD: f64 = 1024.0;

    let mut size = bytes;
    let mut unit_index = 0;
    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(scenario: &str, variant: &str, mean_ns: f64) -> Summary {
        Summary {
            scenario: scenario.to_string(),
            variant: variant.to_string(),
            mean_ns,
            std_dev_ns: 1.0,
            median_ns: mean_ns,
            min_ns: mean_ns,
            max_ns: mean_ns,
            allocated_bytes_per_op: 2048.0,
            allocations_per_op: 12.0,
            rows_per_op: 5.0,
            successes: 10,
            failures: 0,
            failed: false,
            last_error: None,
        }
    }

    fn failed(scenario: &str, variant: &str) -> Summary {
        Summary {
            mean_ns: f64::NAN,
            std_dev_ns: f64::NAN,
            median_ns: f64::NAN,
            min_ns: f64::NAN,
            max_ns: f64::NAN,
            allocated_bytes_per_op: f64::NAN,
            allocations_per_op: f64::NAN,
            rows_per_op: f64::NAN,
            successes: 0,
            failures: 10,
            failed: true,
            last_error: Some("no such table".to_string()),
            ..summary(scenario, variant, 0.0)
        }
    }

    #[test]
    fn test_rows_sorted_by_mean_within_scenario() {
        let summaries = vec![
            summary("get_all", "sqlx:tracking", 3_000.0),
            failed("get_all", "broken"),
            summary("get_all", "rusqlite", 1_000.0),
            summary("order_prices", "rusqlite", 9_000.0),
            summary("get_all", "sqlx:no_tracking", 2_000.0),
        ];

        let rows = sorted_rows(&summaries);
        let labels: Vec<(&str, &str)> = rows.iter().map(|r| (r.scenario, r.variant)).collect();
        assert_eq!(
            labels,
            vec![
                ("get_all", "rusqlite"),
                ("get_all", "sqlx:no_tracking"),
                ("get_all", "sqlx:tracking"),
                ("get_all", "broken"),
                ("order_prices", "rusqlite"),
            ]
        );
        assert_eq!(rows[0].ratio, Some(1.0));
        assert_eq!(rows[2].ratio, Some(3.0));
        assert_eq!(rows[3].ratio, None);
        assert_eq!(rows[3].mean_ns, None);
    }

    #[test]
    fn test_table_has_one_row_per_variant() {
        let summaries = vec![
            summary("get_all", "b", 2_000.0),
            summary("get_all", "a", 1_000.0),
        ];
        let output = render(&summaries, ReportFormat::Table).unwrap();
        let pos_a = output.find("| a ").unwrap();
        let pos_b = output.find("| b ").unwrap();
        assert!(pos_a < pos_b);
        assert_eq!(output.matches("get_all").count(), 2);
        assert!(output.contains("1.00 us"));
        assert!(output.contains("2.00 KiB"));
    }

    #[test]
    fn test_table_lists_failures() {
        let summaries = vec![summary("s", "ok", 10.0), failed("s", "broken")];
        let output = render(&summaries, ReportFormat::Table).unwrap();
        assert!(output.contains("NA"));
        assert!(output.contains("s / broken failed: no such table"));
    }

    #[test]
    fn test_json_output() {
        let summaries = vec![summary("s", "slow", 20.0), summary("s", "fast", 10.0), failed("s", "x")];
        let output = render(&summaries, ReportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["variant"], "fast");
        assert_eq!(rows[1]["ratio"], 2.0);
        assert!(rows[2]["mean_ns"].is_null());
        assert_eq!(rows[2]["failed"], true);
    }

    #[test]
    fn test_csv_output() {
        let summaries = vec![summary("s", "a,b", 1_500.0)];
        let output = render(&summaries, ReportFormat::Csv).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("scenario,variant,mean_ns"));
        assert!(lines[1].starts_with("s,\"a,b\",1500.000,"));
        assert!(lines[1].ends_with(",10,0,false,"));
    }

    #[test]
    fn test_csv_marks_failed_variants() {
        let summaries = vec![summary("s", "ok", 10.0), failed("s", "broken")];
        let output = render(&summaries, ReportFormat::Csv).unwrap();
        let header: Vec<&str> = output.lines().next().unwrap().split(',').collect();
        let failed_col = header.iter().position(|h| *h == "failed").unwrap();
        assert_eq!(header[failed_col - 1], "failures");

        let broken: Vec<&str> = output.lines().nth(2).unwrap().split(',').collect();
        assert_eq!(broken[1], "broken");
        assert_eq!(broken[failed_col], "true");
        assert_eq!(broken[failed_col + 1], "no such table");
    }

    #[test]
    fn test_serialization_failure_is_an_error() {
        let err: BenchError = serde_json::from_str::<Vec<f64>>("[").unwrap_err().into();
        assert!(matches!(err, BenchError::Serialization(_)));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render(&[], ReportFormat::Table).unwrap(), "No results");
        assert_eq!(render(&[], ReportFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(512.0), "512.00 ns");
        assert_eq!(format_duration(1_500.0), "1.50 us");
        assert_eq!(format_duration(2_250_000.0), "2.25 ms");
        assert_eq!(format_duration(3e9), "3.00 s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0 B");
        assert_eq!(format_bytes(1023.0), "1023 B");
        assert_eq!(format_bytes(1536.0), "1.50 KiB");
        assert_eq!(format_bytes(3.0 * 1024.0 * 1024.0), "3.00 MiB");
    }

    #[test]
    fn test_report_format_parse() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Csv.to_string(), "csv");
    }
}
