//! Connectivity observer.
//!
//! Tracks whether the remote service is reachable and broadcasts one event per
//! transition. Readings come from a [`ConnectivityProbe`], the platform's
//! online/offline signal.

mod probe;

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

pub use probe::{ConnectivityProbe, TcpProbe};

const EVENT_CAPACITY: usize = 16;

/// Current reachability of the remote service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Offline,
    Online,
}

impl Connectivity {
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Emitted exactly once per state change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

pub struct ConnectivityObserver {
    state: watch::Sender<Connectivity>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityObserver {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { state, events }
    }

    /// Start from the probe's current reading.
    pub async fn from_probe(probe: &dyn ConnectivityProbe) -> Self {
        let initial = probe.check().await;
        tracing::info!("Initial connectivity: {initial:?}");
        Self::new(initial)
    }

    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Receiver for transition events. Only events sent after subscribing are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Feed a reading from the platform signal.
    ///
    /// Returns the transition event if the state changed. Repeated readings of
    /// the same state are absorbed.
    pub fn update(&self, reading: Connectivity) -> Option<ConnectivityEvent> {
        let mut emitted = None;
        self.state.send_if_modified(|current| {
            if *current == reading {
                return false;
            }
            *current = reading;
            let event = match reading {
                Connectivity::Online => ConnectivityEvent::BecameOnline,
                Connectivity::Offline => ConnectivityEvent::BecameOffline,
            };
            // Sent while the state lock is held so events keep transition order.
            // No subscribers is not an error.
            let _ = self.events.send(event);
            emitted = Some(event);
            true
        });

        if let Some(event) = emitted {
            tracing::info!("Connectivity changed: {event:?}");
        }
        emitted
    }

    /// Sample the probe every `interval`, feeding each reading into the
    /// observer. Runs until the surrounding task is dropped.
    pub async fn poll(&self, probe: &dyn ConnectivityProbe, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reading = probe.check().await;
            self.update(reading);
        }
    }
}
