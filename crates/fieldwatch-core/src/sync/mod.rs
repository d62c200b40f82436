//! Delivery of queued writes to the remote service.

mod driver;
mod http;
mod remote;

pub use driver::{KindReport, PassState, SyncDriver, SyncOutcome, SyncReport};
pub use http::{endpoint_path, HttpRemote, IDEMPOTENCY_HEADER};
pub use remote::{DeliveryError, RemoteCollaborator};
