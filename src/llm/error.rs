//! Error types for the LLM module

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;
