use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldwatch_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Offline storage is unavailable: {0}")]
    OfflineUnavailable(String),
    #[error("Pending write ID cannot be empty")]
    EmptyPendingId,
    #[error("Unrecognized pending write ID: {0}")]
    UnknownIdKind(String),
    #[error("No pending write with id {0} (it may already be synced)")]
    PendingNotFound(String),
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    #[error("Cannot attach {path}: {reason}")]
    InvalidMedia { path: String, reason: String },
    #[error("Retention is not configured. Pass --days or set retention_days in the config file.")]
    RetentionNotConfigured,
    #[error(
        "Remote sync is not configured. Run `fieldwatch config init --api-base-url <URL>` or set FIELDWATCH_API_URL."
    )]
    SyncNotConfigured,
}
