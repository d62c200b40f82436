//! Sync driver.
//!
//! Drains every collection's unsynced writes to the remote in creation order.
//! At most one pass runs at a time; a trigger that arrives mid-pass is dropped
//! because the running pass, or the next trigger, covers its records.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};

use super::remote::{DeliveryError, RemoteCollaborator};
use crate::connectivity::{Connectivity, ConnectivityEvent};
use crate::models::{EntityKind, PendingWrite};
use crate::services::LocalStore;
use crate::state::SyncState;

/// Whether a sync pass is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Running,
}

/// Per-kind counters for one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KindReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Remote rejected or could not be reached; retried next pass
    pub failed: usize,
    /// Remote accepted but the local flag could not be flipped; redelivered next pass
    pub flag_update_failed: usize,
    /// The collection could not be read this pass
    pub read_failed: bool,
}

impl KindReport {
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.flag_update_failed == 0 && !self.read_failed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub kinds: BTreeMap<EntityKind, KindReport>,
}

impl SyncReport {
    pub fn kind(&self, kind: EntityKind) -> KindReport {
        self.kinds.get(&kind).cloned().unwrap_or_default()
    }

    pub fn attempted(&self) -> usize {
        self.kinds.values().map(|report| report.attempted).sum()
    }

    pub fn delivered(&self) -> usize {
        self.kinds.values().map(|report| report.delivered).sum()
    }

    /// Writes that remain unsynced after this pass.
    pub fn left_pending(&self) -> usize {
        self.kinds
            .values()
            .map(|report| report.failed + report.flag_update_failed)
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.kinds.values().all(KindReport::is_clean)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was already running; nothing was submitted
    AlreadyRunning,
}

/// Resets the pass token when the pass ends, including by panic.
struct PassGuard<'a> {
    pass: &'a Mutex<PassState>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        *lock(self.pass) = PassState::Idle;
    }
}

fn lock(pass: &Mutex<PassState>) -> MutexGuard<'_, PassState> {
    pass.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SyncDriver {
    store: LocalStore,
    remote: Arc<dyn RemoteCollaborator>,
    delivery_timeout: Duration,
    pass: Mutex<PassState>,
    state: watch::Sender<SyncState>,
    connectivity: Option<watch::Receiver<Connectivity>>,
}

impl SyncDriver {
    /// `delivery_timeout` bounds each remote call; a call that overruns counts
    /// as a failed delivery.
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteCollaborator>,
        delivery_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            store,
            remote,
            delivery_timeout,
            pass: Mutex::new(PassState::Idle),
            state,
            connectivity: None,
        }
    }

    /// A pass that ends while `connectivity` reads offline publishes
    /// [`SyncState::Offline`] instead of its own result.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: watch::Receiver<Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    fn is_offline(&self) -> bool {
        self.connectivity
            .as_ref()
            .is_some_and(|connectivity| !connectivity.borrow().is_online())
    }

    pub fn pass_state(&self) -> PassState {
        *lock(&self.pass)
    }

    pub fn sync_state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Receiver that always holds the latest [`SyncState`].
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        let mut pass = lock(&self.pass);
        if *pass == PassState::Running {
            return None;
        }
        *pass = PassState::Running;
        drop(pass);
        Some(PassGuard { pass: &self.pass })
    }

    /// Run one sync pass over every collection.
    ///
    /// Failures are isolated per record and per collection; nothing here is
    /// fatal to the caller. Records left unsynced are picked up next pass.
    pub async fn sync_all(&self) -> SyncOutcome {
        let Some(_guard) = self.try_begin_pass() else {
            tracing::debug!("Sync pass already running; trigger dropped");
            return SyncOutcome::AlreadyRunning;
        };

        self.state.send_replace(SyncState::Syncing);
        let mut report = SyncReport::default();
        for kind in EntityKind::ALL {
            let kind_report = self.sync_kind(kind).await;
            report.kinds.insert(kind, kind_report);
        }

        if report.attempted() > 0 || !report.is_clean() {
            tracing::info!(
                "Sync pass finished: {} delivered, {} left pending",
                report.delivered(),
                report.left_pending()
            );
        }
        self.state.send_replace(if self.is_offline() {
            SyncState::Offline
        } else if report.is_clean() {
            SyncState::Synced
        } else {
            SyncState::Error
        });
        SyncOutcome::Completed(report)
    }

    async fn sync_kind(&self, kind: EntityKind) -> KindReport {
        let mut report = KindReport::default();
        let writes = match self.store.get_all_unsynced(kind).await {
            Ok(writes) => writes,
            Err(error) => {
                tracing::error!("Failed to read unsynced {kind}: {error}");
                report.read_failed = true;
                return report;
            }
        };

        for write in writes {
            report.attempted += 1;
            if let Err(error) = self.deliver(&write).await {
                report.failed += 1;
                tracing::warn!("Failed to sync {kind} {}: {error}", write.id);
                if let Err(error) = self
                    .store
                    .record_delivery_failure(kind, &write.id, &error.to_string())
                    .await
                {
                    tracing::warn!("Failed to record delivery failure for {}: {error}", write.id);
                }
                continue;
            }

            match self.store.mark_synced(kind, &write.id).await {
                Ok(_) => {
                    report.delivered += 1;
                    tracing::debug!("Synced {kind} {}", write.id);
                }
                Err(error) => {
                    report.flag_update_failed += 1;
                    tracing::warn!(
                        "Remote accepted {kind} {} but marking it synced failed; it will be resent: {error}",
                        write.id
                    );
                }
            }
        }
        report
    }

    async fn deliver(&self, write: &PendingWrite) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.delivery_timeout, self.remote.deliver(write))
            .await
            .unwrap_or(Err(DeliveryError::Timeout))
    }

    fn spawn_pass(self: &Arc<Self>, trigger: &'static str) {
        let driver = Arc::clone(self);
        tokio::spawn(async move {
            tracing::debug!("Sync triggered by {trigger}");
            driver.sync_all().await;
        });
    }

    /// Start a pass on every transition to online and every `interval` while
    /// online. Returns once the connectivity observer is dropped.
    pub async fn run_triggers(
        self: Arc<Self>,
        mut events: broadcast::Receiver<ConnectivityEvent>,
        connectivity: watch::Receiver<Connectivity>,
        interval: Duration,
    ) {
        if !connectivity.borrow().is_online() {
            self.state.send_replace(SyncState::Offline);
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ConnectivityEvent::BecameOnline) => self.spawn_pass("reconnect"),
                    Ok(ConnectivityEvent::BecameOffline) => {
                        self.state.send_replace(SyncState::Offline);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {skipped} connectivity event(s)");
                        let online = connectivity.borrow().is_online();
                        if online {
                            self.spawn_pass("reconnect");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = ticker.tick() => {
                    let online = connectivity.borrow().is_online();
                    if online {
                        self.spawn_pass("timer");
                    } else {
                        tracing::debug!("Skipping scheduled sync while offline");
                    }
                }
            }
        }
    }
}
