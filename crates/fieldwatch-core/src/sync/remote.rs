//! Contract with the remote service that accepts queued writes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PendingWrite;

/// Why a single delivery attempt did not succeed.
///
/// Never fatal: the write stays pending and is retried on the next pass.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),
    #[error("delivery timed out")]
    Timeout,
    #[error("remote rejected write: {message} ({status})")]
    Rejected { status: u16, message: String },
    #[error("could not build request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Receives pending writes, one call per write.
///
/// Delivery is at-least-once: a write whose acceptance was not recorded locally
/// is sent again on a later pass with the same id. Implementations must
/// deduplicate by [`PendingWrite::id`] or tolerate duplicates.
#[async_trait]
pub trait RemoteCollaborator: Send + Sync {
    async fn deliver(&self, write: &PendingWrite) -> Result<(), DeliveryError>;
}
