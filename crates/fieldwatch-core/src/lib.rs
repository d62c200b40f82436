//! fieldwatch-core - Core library for Fieldwatch
//!
//! Offline-first write path for field incident reporting: a durable local
//! queue of pending writes, a connectivity observer, and a sync driver that
//! delivers queued writes once the remote service is reachable.

pub mod capability;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod indicator;
pub mod models;
pub mod queue;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use capability::OfflineCapability;
pub use config::ClientConfig;
pub use connectivity::{Connectivity, ConnectivityEvent, ConnectivityObserver};
pub use error::{Error, Result};
pub use indicator::{Banner, Indicator};
pub use models::{EntityKind, Payload, PendingId, PendingWrite};
pub use queue::WriteQueue;
pub use services::LocalStore;
pub use state::SyncState;
pub use sync::{HttpRemote, RemoteCollaborator, SyncDriver, SyncOutcome, SyncReport};
