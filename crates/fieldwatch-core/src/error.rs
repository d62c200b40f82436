//! Error types for fieldwatch-core

use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias using fieldwatch-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldwatch-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The local store could not be opened or migrated
    #[error("Schema upgrade failed: {0}")]
    SchemaUpgrade(String),

    /// Local storage rejected a pending write
    #[error("Failed to save {kind} offline: {reason}")]
    Enqueue {
        /// Collection the write was destined for
        kind: EntityKind,
        /// Underlying storage failure
        reason: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
