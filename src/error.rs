//! Error types for docforge operations.
//!
//! Defines error types for the major subsystems:
//! - Catalog loading (projects and templates)
//! - LLM API interactions
//! - Record and progress persistence

use thiserror::Error;

/// Errors that can occur while loading project or template catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog file '{0}' contains no entries")]
    Empty(String),

    #[error("Duplicate catalog id '{0}'")]
    DuplicateId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENROUTER_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("LLM response contained no content")]
    EmptyResponse,
}

/// Errors that can occur in the record and progress stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
