//! Command-line arguments and run configuration.
//!
//! Values are resolved in order: flags, environment, `--config` file, defaults.
//! clap covers flags and the `QUERYBENCH_*` variables; `DATABASE_URL` and the
//! file are consulted only for values still unset.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use querybench_core::{BenchError, ReportFormat, RunConfig};
use querybench_sales::{SalesScenario, Scale, DEFAULT_POOL_SIZE};
use serde::Deserialize;

/// Fallback environment variable for the database URL.
pub const FALLBACK_URL_ENV: &str = "DATABASE_URL";

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => ReportFormat::Table,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Csv => ReportFormat::Csv,
        }
    }
}

/// querybench: data-access overhead benchmarks
#[derive(Parser, Debug)]
#[command(name = "querybench")]
#[command(version, about = "Compare sqlx and rusqlite query overhead", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the benchmark scenarios and print a report.
    Run(RunArgs),
    /// Create and populate a sales database.
    Seed(SeedArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Database URL (sqlite://path or a file path).
    #[arg(short, long, env = "QUERYBENCH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Timed iterations per variant.
    #[arg(short = 'n', long, env = "QUERYBENCH_ITERATIONS")]
    pub iterations: Option<usize>,

    /// Discarded warm-up iterations per variant.
    #[arg(short, long, env = "QUERYBENCH_WARMUP")]
    pub warmup: Option<usize>,

    /// Scenarios to run (default: all).
    #[arg(short, long = "scenario", value_delimiter = ',')]
    pub scenarios: Vec<String>,

    /// Report format.
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum connections in the sqlx pool.
    #[arg(long)]
    pub pool_size: Option<u32>,

    /// Skip the result-equivalence check before measuring.
    #[arg(long)]
    pub skip_verify: bool,

    /// JSON configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SeedArgs {
    /// Database URL (sqlite://path or a file path). Created if missing.
    #[arg(short, long, env = "QUERYBENCH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Data scale: tiny, small, medium or full.
    #[arg(long, default_value = "small")]
    pub scale: Scale,

    /// Exact row count, overriding --scale.
    #[arg(long)]
    pub rows: Option<usize>,
}

impl SeedArgs {
    /// Database URL, falling back to `DATABASE_URL`.
    pub fn database_url(&self) -> Result<String, BenchError> {
        self.database_url
            .clone()
            .or_else(|| std::env::var(FALLBACK_URL_ENV).ok())
            .ok_or_else(|| BenchError::config("no database url given"))
    }

    pub fn row_count(&self) -> usize {
        self.rows.unwrap_or_else(|| self.scale.rows())
    }
}

/// Contents of a `--config` file. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub iterations: Option<usize>,
    pub warmup: Option<usize>,
    pub scenarios: Option<Vec<String>>,
    pub format: Option<String>,
    pub pool_size: Option<u32>,
    pub skip_verify: Option<bool>,
}

impl FileConfig {
    /// Load a config file. Unreadable or malformed files are configuration errors.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            BenchError::config(format!("invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Resolved configuration of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub database_url: String,
    pub run: RunConfig,
    pub scenarios: Vec<SalesScenario>,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub pool_size: u32,
    pub verify: bool,
}

impl BenchConfig {
    /// Defaults for everything but the database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            run: RunConfig::default(),
            scenarios: SalesScenario::ALL.to_vec(),
            format: ReportFormat::default(),
            output: None,
            pool_size: DEFAULT_POOL_SIZE,
            verify: true,
        }
    }

    pub fn with_run_config(mut self, run: RunConfig) -> Self {
        self.run = run;
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<SalesScenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Skip result verification.
    pub fn without_verify(mut self) -> Self {
        self.verify = false;
        self
    }

    /// Check the configuration before anything connects.
    pub fn validate(&self) -> Result<(), BenchError> {
        self.run.validate()?;
        if self.scenarios.is_empty() {
            return Err(BenchError::config("no scenarios selected"));
        }
        Ok(())
    }
}

impl RunArgs {
    /// Resolve against the process environment and the `--config` file.
    pub fn into_config(self) -> Result<BenchConfig, BenchError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let fallback_url = std::env::var(FALLBACK_URL_ENV).ok();
        self.resolve(file, fallback_url)
    }

    /// Merge flags (already merged with `QUERYBENCH_*` by clap), the fallback
    /// URL variable, the file and defaults.
    pub fn resolve(
        self,
        file: FileConfig,
        fallback_url: Option<String>,
    ) -> Result<BenchConfig, BenchError> {
        let database_url = self
            .database_url
            .or(fallback_url)
            .or(file.database_url)
            .ok_or_else(|| {
                BenchError::config(
                    "no database url: pass --database-url or set QUERYBENCH_DATABASE_URL",
                )
            })?;

        let defaults = RunConfig::default();
        let run = RunConfig::new(
            self.iterations.or(file.iterations).unwrap_or(defaults.iterations),
            self.warmup.or(file.warmup).unwrap_or(defaults.warmup),
        );

        let names = if self.scenarios.is_empty() {
            file.scenarios.unwrap_or_default()
        } else {
            self.scenarios
        };
        let scenarios = if names.is_empty() {
            SalesScenario::ALL.to_vec()
        } else {
            names
                .iter()
                .map(|name| name.trim().parse())
                .collect::<Result<Vec<SalesScenario>, _>>()?
        };

        let format = match (self.format, file.format) {
            (Some(format), _) => format.into(),
            (None, Some(name)) => name.parse().map_err(BenchError::Configuration)?,
            (None, None) => ReportFormat::default(),
        };

        let mut config = BenchConfig::new(database_url)
            .with_run_config(run)
            .with_scenarios(scenarios)
            .with_format(format)
            .with_pool_size(self.pool_size.or(file.pool_size).unwrap_or(DEFAULT_POOL_SIZE));
        if let Some(output) = self.output {
            config = config.with_output(output);
        }
        if self.skip_verify || file.skip_verify.unwrap_or(false) {
            config = config.without_verify();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(url: Option<&str>) -> RunArgs {
        RunArgs {
            database_url: url.map(String::from),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = args(Some("sales.db"))
            .resolve(FileConfig::default(), None)
            .unwrap();
        assert_eq!(config, BenchConfig::new("sales.db"));
        assert_eq!(config.scenarios.len(), 3);
        assert!(config.verify);
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = args(None).resolve(FileConfig::default(), None).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_precedence() {
        let file = FileConfig {
            database_url: Some("file.db".into()),
            iterations: Some(7),
            warmup: Some(2),
            format: Some("csv".into()),
            ..FileConfig::default()
        };

        // Fallback env beats the file.
        let config = args(None)
            .resolve(file.clone(), Some("env.db".into()))
            .unwrap();
        assert_eq!(config.database_url, "env.db");
        assert_eq!(config.run, RunConfig::new(7, 2));
        assert_eq!(config.format, ReportFormat::Csv);

        // Flags beat both.
        let flags = RunArgs {
            database_url: Some("flag.db".into()),
            iterations: Some(1),
            format: Some(OutputFormat::Json),
            ..RunArgs::default()
        };
        let config = flags.resolve(file, Some("env.db".into())).unwrap();
        assert_eq!(config.database_url, "flag.db");
        assert_eq!(config.run, RunConfig::new(1, 2));
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let flags = RunArgs {
            iterations: Some(0),
            ..args(Some("sales.db"))
        };
        assert!(matches!(
            flags.resolve(FileConfig::default(), None),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_scenario_selection() {
        let flags = RunArgs {
            scenarios: vec!["order_prices".into(), "get_all".into()],
            ..args(Some("sales.db"))
        };
        let config = flags.resolve(FileConfig::default(), None).unwrap();
        assert_eq!(
            config.scenarios,
            vec![SalesScenario::OrderPrices, SalesScenario::GetAll]
        );

        let flags = RunArgs {
            scenarios: vec!["everything".into()],
            ..args(Some("sales.db"))
        };
        assert!(flags.resolve(FileConfig::default(), None).is_err());
    }

    #[test]
    fn test_load_file_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"database_url": "sqlite://sales.db", "iterations": 5, "scenarios": ["get_all"], "skip_verify": true}}"#
        )
        .unwrap();

        let loaded = FileConfig::load(file.path()).unwrap();
        assert_eq!(loaded.iterations, Some(5));

        let config = args(None).resolve(loaded, None).unwrap();
        assert_eq!(config.scenarios, vec![SalesScenario::GetAll]);
        assert!(!config.verify);
    }

    #[test]
    fn test_unknown_file_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"iteration": 5}}"#).unwrap();
        assert!(matches!(
            FileConfig::load(file.path()),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_run_command() {
        let parsed = Args::try_parse_from([
            "querybench",
            "run",
            "--database-url",
            "sales.db",
            "-n",
            "5",
            "--scenario",
            "get_all,filter_and_sort",
            "--format",
            "json",
            "--skip-verify",
        ])
        .unwrap();

        match parsed.command {
            Command::Run(run) => {
                assert_eq!(run.iterations, Some(5));
                assert_eq!(run.scenarios.len(), 2);
                assert_eq!(run.format, Some(OutputFormat::Json));
                assert!(run.skip_verify);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_seed_command() {
        let parsed =
            Args::try_parse_from(["querybench", "seed", "-d", "sales.db", "--scale", "tiny"])
                .unwrap();
        match parsed.command {
            Command::Seed(seed) => {
                assert_eq!(seed.scale, Scale::Tiny);
                assert_eq!(seed.row_count(), 1_000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
