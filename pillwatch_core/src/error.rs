//! Error types for the pillwatch_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pillwatch_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user input; the targeted record is unchanged
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation against a missing record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record store backend outage; safe to retry
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Alert delivery failure; retried naturally on the next sweep
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
