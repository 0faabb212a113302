//! Error types for stackplot

use thiserror::Error;

/// stackplot error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bin layout inconsistency among combined inputs
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// No process contributions supplied
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Malformed systematic descriptor (negative fraction, wrong length, unknown process)
    #[error("Invalid systematic: {0}")]
    InvalidSystematic(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
