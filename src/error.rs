//! # Error Types
//!
//! Custom error types for Prop Link using `thiserror`.
//!
//! The packet pump itself never fails: capacity or data shortages and
//! malformed frames resolve to no-ops. These errors cover startup and I/O.

use thiserror::Error;

/// Main error type for Prop Link
#[derive(Debug, Error)]
pub enum PropLinkError {
    /// Capsule framing errors
    #[error("Capsule framing error: {0}")]
    Capsule(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Prop Link
pub type Result<T> = std::result::Result<T, PropLinkError>;
