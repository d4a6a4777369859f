//! Error types for the summary service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, SummaryError>;

#[derive(Error, Debug)]
pub enum SummaryError {

    // =============================
    // Service Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini response did not contain text output.")]
    EmptyResponse,

    #[error("Upstream error: {0}")]
    Upstream(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
