//! querybench command-line runner.
//!
//! Installs the counting allocator, so every measurement in this process
//! reports allocations.

mod commands;
mod config;
mod error;

use clap::Parser;
use querybench_core::TrackingAllocator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Command};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn main() {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querybench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Run(run) => commands::run(run),
        Command::Seed(seed) => commands::seed(seed),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
