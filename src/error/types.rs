//! Error types
//!
//! Defines the storage error taxonomy and the startup error that wraps it.

use std::io;

use thiserror::Error;

/// Failures returned by the storage manager.
///
/// Every variant is recoverable at the request boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File too large (max {limit} bytes)")]
    PayloadTooLarge { limit: u64 },

    #[error("Invalid file type: {0}")]
    UnsupportedType(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::PayloadTooLarge { .. } => 413,
            StorageError::UnsupportedType(_) => 415,
            StorageError::InvalidName(_) => 400,
            StorageError::NotFound(_) => 404,
            StorageError::Io(_) => 500,
        }
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
