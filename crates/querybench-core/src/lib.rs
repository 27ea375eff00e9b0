//! Comparative query-benchmark harness.
//!
//! Scenarios group semantically equivalent queries written against different
//! data-access strategies. The [`Runner`] executes every variant sequentially
//! (warm-up, then timed iterations), [`aggregate`] turns the raw measurements
//! into per-variant summaries, and [`render`] emits a comparison report sorted
//! by mean duration.
//!
//! # Quick Start
//!
//! ```ignore
//! use querybench_core::{aggregate, render, ReportFormat, RunConfig, Runner, Scenario, Variant};
//!
//! let mut scenario = Scenario::new("get_all")
//!     .with_variant(Variant::new("rusqlite", || backend.get_all()))
//!     .with_variant(Variant::new("sqlx", || orm.get_all()).with_flag("no_tracking"));
//!
//! let runner = Runner::new(RunConfig::new(30, 3))?;
//! let summaries = aggregate(&runner.run(&mut scenario));
//! println!("{}", render(&summaries, ReportFormat::Table)?);
//! ```
//!
//! Allocation figures require [`TrackingAllocator`] to be installed as the
//! global allocator of the final binary.

pub mod aggregate;
pub mod alloc;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;

pub use aggregate::{aggregate, Summary};
pub use alloc::{AllocationSnapshot, TrackingAllocator};
pub use config::RunConfig;
pub use error::{BenchError, QueryError};
pub use report::{render, ReportFormat};
pub use runner::{run, verify, Measurement, MeasurementStatus, Runner, VariantCheck};
pub use scenario::{ResultRows, RowDigest, Scenario, Variant};
