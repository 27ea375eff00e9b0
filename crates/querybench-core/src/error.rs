//! Harness error types.

use thiserror::Error;

/// Harness errors.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The target database could not be reached. Fatal, raised before any measurement.
    #[error("connection error: {0}")]
    Connection(String),

    /// A variant's query failed.
    #[error("query failed in {variant}: {source}")]
    Query {
        variant: String,
        #[source]
        source: QueryError,
    },

    /// Invalid run configuration. Fatal, raised before any execution.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Report or config (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BenchError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Configuration(message.into())
    }

    /// Message to record for a failed iteration: the driver's message for
    /// query failures, the full error otherwise.
    pub fn failure_message(&self) -> String {
        match self {
            BenchError::Query { source, .. } => source.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Error returned by a single execution of a variant's query.
///
/// Backends wrap their driver errors in this type; the runner records it as a
/// failed measurement and moves on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl QueryError {
    /// Create an error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying driver error.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_query_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such table");
        let err = QueryError::from_source(io);
        assert_eq!(err.message(), "no such table");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_query_error_names_variant() {
        let query = BenchError::Query {
            variant: "rusqlite".into(),
            source: QueryError::new("boom"),
        };
        assert_eq!(query.to_string(), "query failed in rusqlite: boom");
        assert_eq!(query.failure_message(), "boom");
        assert!(query.source().is_some());

        let config = BenchError::config("no scenarios selected");
        assert_eq!(config.failure_message(), "configuration error: no scenarios selected");
    }
}
