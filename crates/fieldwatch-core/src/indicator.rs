//! Connectivity banner shown to the user.
//!
//! Pure presentation over connectivity events. Never reads the store and does
//! not wait for sync progress before dismissing.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use crate::connectivity::{Connectivity, ConnectivityEvent};

pub const OFFLINE_MESSAGE: &str =
    "You are offline. Reports will be saved locally and synced when online.";
pub const BACK_ONLINE_MESSAGE: &str = "Back online. Syncing data...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Banner {
    Hidden,
    Offline,
    BackOnline,
}

impl Banner {
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Hidden => None,
            Self::Offline => Some(OFFLINE_MESSAGE),
            Self::BackOnline => Some(BACK_ONLINE_MESSAGE),
        }
    }
}

pub struct Indicator {
    banner: watch::Sender<Banner>,
    dismiss_after: Duration,
}

impl Indicator {
    /// `dismiss_after` is how long the back-online banner stays up.
    pub fn new(initial: Connectivity, dismiss_after: Duration) -> Self {
        let initial = if initial.is_online() {
            Banner::Hidden
        } else {
            Banner::Offline
        };
        let (banner, _) = watch::channel(initial);
        Self {
            banner,
            dismiss_after,
        }
    }

    pub fn banner(&self) -> Banner {
        *self.banner.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<Banner> {
        self.banner.subscribe()
    }

    fn show(&self, banner: Banner) {
        self.banner.send_if_modified(|current| {
            let changed = *current != banner;
            *current = banner;
            changed
        });
    }

    /// Bring the banner in line with `current` after missed events.
    /// Returns the dismissal deadline to keep.
    fn resync(&self, current: Connectivity, dismiss_at: Option<Instant>) -> Option<Instant> {
        match (current, self.banner()) {
            (Connectivity::Offline, _) => {
                self.show(Banner::Offline);
                None
            }
            (Connectivity::Online, Banner::Offline) => {
                self.show(Banner::BackOnline);
                Some(Instant::now() + self.dismiss_after)
            }
            (Connectivity::Online, _) => dismiss_at,
        }
    }

    /// Follow connectivity events until the observer goes away.
    ///
    /// `connectivity` is read only when events were missed.
    pub async fn run(
        &self,
        mut events: broadcast::Receiver<ConnectivityEvent>,
        connectivity: watch::Receiver<Connectivity>,
    ) {
        let mut dismiss_at: Option<Instant> = None;
        loop {
            let deadline = dismiss_at;
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ConnectivityEvent::BecameOffline) => {
                        dismiss_at = None;
                        self.show(Banner::Offline);
                    }
                    Ok(ConnectivityEvent::BecameOnline) => {
                        dismiss_at = Some(Instant::now() + self.dismiss_after);
                        self.show(Banner::BackOnline);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Indicator skipped {skipped} connectivity event(s)");
                        let current = *connectivity.borrow();
                        dismiss_at = self.resync(current, dismiss_at);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    dismiss_at = None;
                    self.show(Banner::Hidden);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityObserver;
    use std::sync::Arc;

    fn spawn_indicator(observer: &ConnectivityObserver) -> Arc<Indicator> {
        let indicator = Arc::new(Indicator::new(observer.current(), Duration::from_secs(3)));
        let events = observer.subscribe();
        let connectivity = observer.watch();
        let runner = Arc::clone(&indicator);
        tokio::spawn(async move { runner.run(events, connectivity).await });
        indicator
    }

    #[test]
    fn banner_messages() {
        assert_eq!(Banner::Hidden.message(), None);
        assert_eq!(
            Banner::Offline.message(),
            Some("You are offline. Reports will be saved locally and synced when online.")
        );
        assert_eq!(
            Banner::BackOnline.message(),
            Some("Back online. Syncing data...")
        );
    }

    #[test]
    fn initial_banner_follows_connectivity() {
        let offline = Indicator::new(Connectivity::Offline, Duration::from_secs(3));
        assert_eq!(offline.banner(), Banner::Offline);
        let online = Indicator::new(Connectivity::Online, Duration::from_secs(3));
        assert_eq!(online.banner(), Banner::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn back_online_banner_dismisses_after_delay() {
        let observer = ConnectivityObserver::new(Connectivity::Offline);
        let indicator = spawn_indicator(&observer);
        let mut banner = indicator.watch();

        observer.update(Connectivity::Online);
        banner.changed().await.unwrap();
        assert_eq!(*banner.borrow_and_update(), Banner::BackOnline);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(indicator.banner(), Banner::BackOnline);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(indicator.banner(), Banner::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn going_offline_cancels_dismissal() {
        let observer = ConnectivityObserver::new(Connectivity::Offline);
        let indicator = spawn_indicator(&observer);
        let mut banner = indicator.watch();

        observer.update(Connectivity::Online);
        banner.changed().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        observer.update(Connectivity::Offline);
        banner.changed().await.unwrap();
        assert_eq!(*banner.borrow_and_update(), Banner::Offline);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(indicator.banner(), Banner::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_restarts_dismissal_window() {
        let observer = ConnectivityObserver::new(Connectivity::Online);
        let indicator = spawn_indicator(&observer);
        let mut banner = indicator.watch();
        assert_eq!(indicator.banner(), Banner::Hidden);

        observer.update(Connectivity::Offline);
        banner.changed().await.unwrap();
        observer.update(Connectivity::Online);
        banner.changed().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        observer.update(Connectivity::Offline);
        observer.update(Connectivity::Online);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(indicator.banner(), Banner::BackOnline);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(indicator.banner(), Banner::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn resync_follows_current_connectivity() {
        let indicator = Indicator::new(Connectivity::Online, Duration::from_secs(3));

        assert_eq!(indicator.resync(Connectivity::Online, None), None);
        assert_eq!(indicator.banner(), Banner::Hidden);

        assert_eq!(indicator.resync(Connectivity::Offline, None), None);
        assert_eq!(indicator.banner(), Banner::Offline);

        let deadline = indicator.resync(Connectivity::Online, None);
        assert_eq!(indicator.banner(), Banner::BackOnline);
        assert_eq!(deadline, Some(Instant::now() + Duration::from_secs(3)));

        let kept = Instant::now() + Duration::from_secs(1);
        assert_eq!(indicator.resync(Connectivity::Online, Some(kept)), Some(kept));
        assert_eq!(indicator.banner(), Banner::BackOnline);
    }

    #[tokio::test(start_paused = true)]
    async fn lagged_indicator_does_not_stick_on_offline() {
        let indicator = Arc::new(Indicator::new(Connectivity::Offline, Duration::from_secs(3)));
        let (events, receiver) = broadcast::channel(1);
        let (_connectivity, connectivity_rx) = watch::channel(Connectivity::Online);
        events.send(ConnectivityEvent::BecameOnline).unwrap();
        events.send(ConnectivityEvent::BecameOffline).unwrap();
        events.send(ConnectivityEvent::BecameOnline).unwrap();

        let runner = Arc::clone(&indicator);
        let task = tokio::spawn(async move { runner.run(receiver, connectivity_rx).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(indicator.banner(), Banner::BackOnline);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(indicator.banner(), Banner::Hidden);

        drop(events);
        task.await.unwrap();
    }
}
