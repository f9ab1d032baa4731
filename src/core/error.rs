//! Error types for chksum
//!
//! This module defines the error types used throughout the library. Per-file
//! hashing failures are not errors at this level: they are collected as
//! [`HashFailure`](crate::core::events::HashFailure) values and reported
//! alongside the scan results.

use crate::core::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chksum
#[derive(Error, Debug)]
pub enum ChksumError {
    /// The requested hash algorithm is not supported
    #[error("Unknown hash algorithm '{0}'. Supported: sha256, xxh32, xxh64")]
    UnknownAlgorithm(String),

    /// The streaming buffer size is not a positive integer
    #[error("Invalid buffer size '{0}': expected a positive integer")]
    InvalidBufferSize(String),

    /// The worker thread count could not be parsed
    #[error("Invalid thread count '{0}': expected a non-negative integer")]
    InvalidThreadCount(String),

    /// The index root does not exist or is not a directory
    #[error("Index root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// No usable index exists at the given location
    #[error("No index could be found at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// The index was built with a different algorithm than the one requested
    #[error("Index was built with '{index}' but '{requested}' was requested")]
    AlgorithmMismatch { index: String, requested: String },

    /// A chunk-folded index was built with a different buffer size
    #[error(
        "Index was built with {algorithm} over {index}-byte chunks but {requested}-byte chunks \
         were requested; {algorithm} digests depend on the chunk size"
    )]
    BufferSizeMismatch {
        algorithm: String,
        index: usize,
        requested: usize,
    },

    /// Insert of a hash that is already indexed
    #[error("Hash {0} is already present in the index")]
    DuplicateKey(String),

    /// Update of a hash that is not indexed
    #[error("Hash {0} is not present in the index")]
    MissingRecord(String),

    /// A scanned path does not live under the index root
    #[error("'{}' is outside of the index root", .0.display())]
    OutsideRoot(PathBuf),

    /// A path that cannot be stored without loss
    #[error("'{}' is not valid UTF-8 and cannot be indexed", .0.display())]
    NonUtf8Path(PathBuf),

    /// The hashing worker pool could not be created
    #[error("Failed to start hashing workers: {0}")]
    ThreadPool(String),

    /// Configuration file problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage engine error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

impl ChksumError {
    /// Whether this error is a configuration problem detected before any work
    /// was done
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChksumError::UnknownAlgorithm(_)
                | ChksumError::InvalidBufferSize(_)
                | ChksumError::InvalidThreadCount(_)
                | ChksumError::RootNotFound(_)
                | ChksumError::IndexNotFound(_)
                | ChksumError::AlgorithmMismatch { .. }
                | ChksumError::BufferSizeMismatch { .. }
                | ChksumError::Config(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ChksumError>;

impl From<std::io::Error> for ChksumError {
    fn from(err: std::io::Error) -> Self {
        ChksumError::IoError(err.to_string())
    }
}
