//! Error types for the comparison engine.
//!
//! The taxonomy is deliberately small: connection acquisition failures,
//! malformed comparison requests, and structurally incomparable datasets.
//! Value-level anomalies (unparseable numerics, oversized strings) are
//! never errors -- they degrade into recorded deltas or logged truncations,
//! because the purpose of the engine is to report discrepancies, not to
//! enforce data quality.

use thiserror::Error;

/// Main error type for dbparity operations.
///
/// # Security
/// Error messages never include credentials. Connection failures carry the
/// pool fingerprint's display form, which excludes passwords by
/// construction.
#[derive(Debug, Error)]
pub enum ParityError {
    /// Connection factory failed to produce a usable handle.
    ///
    /// Fatal to that `acquire` call; the fingerprint is not cached and no
    /// retry is performed at this layer.
    #[error("connection factory failed for {fingerprint}")]
    Connection {
        /// Display form of the fingerprint that was being connected.
        fingerprint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed comparison request (empty dataset, missing primary-key
    /// column, mis-shaped row). Surfaced before any partial work.
    #[error("invalid comparison request: {message}")]
    Validation {
        /// What was wrong with the request.
        message: String,
    },

    /// The two datasets share no columns; there is nothing comparable.
    ///
    /// Both full column sets are carried for diagnosis.
    #[error(
        "datasets share no columns (source: [{}], target: [{}])",
        source_columns.join(", "),
        target_columns.join(", ")
    )]
    NoCommonColumns {
        /// Canonical column names of the source dataset.
        source_columns: Vec<String>,
        /// Canonical column names of the target dataset.
        target_columns: Vec<String>,
    },

    /// Invalid configuration value (zero chunk size, zero handle cap, ...).
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// Query execution failed inside a caller-supplied executor.
    #[error("query execution failed: {context}")]
    QueryExecution {
        /// Short description of the failing query context.
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with `ParityError`.
pub type Result<T> = std::result::Result<T, ParityError>;

impl ParityError {
    /// Creates a connection error for the given fingerprint display form.
    pub fn connection_failed<E>(fingerprint: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            fingerprint: fingerprint.into(),
            source: Box::new(error),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a query execution error with context.
    pub fn query_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::QueryExecution {
            context: context.into(),
            source: Box::new(error),
        }
    }
}
