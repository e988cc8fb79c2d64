//! Error types for the HiL sequencer
//!
//! A failed test is data, not an error: only configuration, catalog,
//! profile and I/O problems surface here.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the HiL sequencer
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid run parameter '{field}': {reason}")]
    InvalidRunConfig { field: String, reason: String },

    // === Catalog Errors ===
    #[error("Invalid test catalog: {0}")]
    CatalogInvalid(String),

    // === Profile Errors ===
    #[error("Configuration profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid configuration profile format in '{path}': {reason}")]
    ProfileFormat { path: String, reason: String },

    // === Sequencer Errors ===
    #[error("Sequencer is no longer running")]
    SequencerStopped,

    // === File Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid run parameter error
    pub fn invalid_run_config(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRunConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a file read error from a path and the underlying cause
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a file write error from a path and the underlying cause
    pub fn file_write(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a profile format error
    pub fn profile_format(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::ProfileFormat {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
