//! Shared presentation state types.

/// Sync status published by the driver for status surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No pass has run yet
    Idle,
    Offline,
    Syncing,
    /// Last pass delivered everything it attempted
    Synced,
    /// Last pass left at least one write pending
    Error,
}
