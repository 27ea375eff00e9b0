//! CLI error types and exit codes.

use querybench_core::BenchError;
use querybench_sales::BackendError;
use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG: i32 = 1;

/// Exit code when the database cannot be reached.
pub const EXIT_UNREACHABLE: i32 = 2;

/// Exit code when a scenario has no successful variant.
pub const EXIT_NO_SUCCESS: i32 = 3;

/// Exit code when the report cannot be rendered or written.
pub const EXIT_OUTPUT: i32 = 4;

/// CLI errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Harness error.
    #[error(transparent)]
    Bench(#[from] BenchError),

    /// Seeding the database failed.
    #[error("seed failed: {0}")]
    Seed(#[from] BackendError),

    /// Every variant of the named scenarios failed.
    #[error("no successful variant in scenario(s): {}", .0.join(", "))]
    NoSuccessfulVariant(Vec<String>),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Bench(BenchError::Connection(_)) => EXIT_UNREACHABLE,
            Error::Bench(BenchError::Io(_) | BenchError::Serialization(_)) => EXIT_OUTPUT,
            Error::Bench(_) => EXIT_CONFIG,
            Error::Seed(_) => EXIT_UNREACHABLE,
            Error::NoSuccessfulVariant(_) => EXIT_NO_SUCCESS,
        }
    }
}
