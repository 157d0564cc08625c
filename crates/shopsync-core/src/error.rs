//! Error types for shopsync-core

use thiserror::Error;

/// Result type alias using shopsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shopsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote API error
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image/object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Credential encryption/decryption error
    #[error("Credential error: {0}")]
    Credential(String),
}
