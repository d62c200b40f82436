//! Pending write model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{EntityKind, Payload};

/// Locally generated identifier for a pending write.
///
/// Rendered as `<kind-prefix>-<uuid v7>`; v7 carries a millisecond timestamp
/// followed by random bits, so ids are unique on the device without any
/// server coordination. The id doubles as the delivery idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PendingId(String);

impl PendingId {
    /// Generate a fresh id for the given kind
    #[must_use]
    pub fn generate(kind: EntityKind) -> Self {
        Self(format!("{}-{}", kind.id_prefix(), Uuid::now_v7()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind encoded in the id prefix, if recognizable
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_id(&self.0)
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PendingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for PendingId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.is_empty() {
            return Err("pending write id cannot be empty".to_string());
        }
        Ok(Self(id.to_string()))
    }
}

/// A locally queued write awaiting delivery
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    /// Unique identifier and idempotency key
    pub id: PendingId,
    /// Kind-specific content
    pub payload: Payload,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Set once the remote has accepted this write
    pub synced: bool,
    /// When the synced flag was flipped (Unix ms)
    pub synced_at: Option<i64>,
    /// Failed delivery attempts so far
    pub attempts: u32,
    /// Most recent delivery failure
    pub last_error: Option<String>,
}

impl PendingWrite {
    /// Create a new, unsynced write stamped with the current time
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            id: PendingId::generate(payload.kind()),
            payload,
            created_at: crate::util::unix_millis_now(),
            synced: false,
            synced_at: None,
            attempts: 0,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}
