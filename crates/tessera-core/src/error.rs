//! Error types for the Tessera scanning pipeline.
//!
//! Only [`PipelineError::RootInaccessible`] aborts a scan. Every other
//! pipeline variant is a per-task soft failure: the task is dropped, the
//! failure is logged, and the scan carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background pipeline task panicked or was cancelled
    #[error("Scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, fatal and per-task.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The scan root cannot be opened as a directory
    #[error("Cannot read root directory {path}: {source}")]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be opened or read
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry is not a regular file, e.g. a FIFO or device node
    #[error("Not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// No registered codec recognised the bytes
    #[error("Not a decodable image: {0}")]
    UnsupportedFormat(PathBuf),

    /// A codec recognised the bytes but decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The decoded image has zero-area bounds
    #[error("Empty image: {0}")]
    EmptyImage(PathBuf),

    /// The task exceeded its deadline
    #[error("Timeout processing {path} after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },
}

impl PipelineError {
    /// Whether this error aborts the whole scan rather than a single task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RootInaccessible { .. })
    }
}

/// Failure to average a pixel grid.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageError {
    /// The grid bounds enclose no pixels
    #[error("image has zero-area bounds")]
    EmptyImage,
}

/// Convenience type alias for Tessera results.
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
