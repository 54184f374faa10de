//! Error types for factor operations.

use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while computing or persisting factors.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Invalid construction or call arguments, detected before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fatal misconfiguration (unsupported store family, missing store,
    /// unsupported date representation).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Factor computation failed.
    #[error("Computation error: {0}")]
    Computation(String),

    /// Backing store error.
    #[error("Store error: {0}")]
    Store(String),

    /// Data feed error.
    #[error("Data feed error: {0}")]
    Feed(String),

    /// Missing data for a symbol or date.
    #[error("Missing data for {symbol}: {reason}")]
    MissingData {
        /// Symbol that was queried
        symbol: String,
        /// Reason for missing data
        reason: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
