//! Error types for the access layer

use thiserror::Error;

/// Main error type for the access layer
#[derive(Error, Debug)]
pub enum Error {
    /// Mapping document error
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Storage adapter error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while loading, storing or validating a mapping document
#[derive(Error, Debug)]
pub enum MappingError {
    /// The document is not a valid mapping
    #[error("Malformed mapping document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Reading or writing the document failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The object store holding mapping documents failed
    #[error("Object store error for {path}: {message}")]
    ObjectStore {
        /// Object path that was accessed
        path: String,
        /// Description of the failure
        message: String,
    },

    /// No document exists at the requested path
    #[error("Mapping not found: {0}")]
    NotFound(String),

    /// The object path is not acceptable
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// The operation did not finish in time
    #[error("Mapping operation on {path} timed out after {seconds}s")]
    Timeout {
        /// Object path that was accessed
        path: String,
        /// Timeout that elapsed
        seconds: u64,
    },
}

/// Storage adapter errors
///
/// The repository propagates these unchanged; retry policy belongs to the adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested row does not exist
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Row set cannot be evaluated (e.g. inverted range)
    #[error("Invalid row set: {0}")]
    InvalidRowSet(String),

    /// Filter cannot be evaluated (e.g. bad regex)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Number of row keys and mutations differ in a bulk apply
    #[error("Bulk size mismatch: {keys} row keys, {mutations} mutations")]
    BulkSizeMismatch {
        /// Number of row keys
        keys: usize,
        /// Number of mutations
        mutations: usize,
    },

    /// Backend specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Configuration(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
