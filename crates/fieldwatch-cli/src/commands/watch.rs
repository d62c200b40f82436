use std::path::Path;
use std::sync::Arc;

use fieldwatch_core::connectivity::TcpProbe;
use fieldwatch_core::{Banner, ConnectivityObserver, Indicator, SyncState};
use tokio::task::JoinSet;

use crate::commands::common::{build_driver, load_config, open_store};
use crate::error::CliError;

pub const fn sync_state_message(state: SyncState) -> Option<&'static str> {
    match state {
        SyncState::Idle | SyncState::Offline => None,
        SyncState::Syncing => Some("Syncing pending writes..."),
        SyncState::Synced => Some("All pending writes synced"),
        SyncState::Error => Some("Some writes could not be synced; they will be retried"),
    }
}

fn render_banner(banner: Banner) {
    if let Some(message) = banner.message() {
        eprintln!("[{message}]");
    }
}

pub async fn run_watch(db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let store = open_store(db_path).await?;
    let driver = build_driver(&config, store)?;
    let probe_address = config
        .probe_target()
        .ok_or(CliError::SyncNotConfigured)?;
    tracing::debug!("Probing reachability of {probe_address}");

    let probe = Arc::new(TcpProbe::new(probe_address, config.probe_timeout()));
    let observer = Arc::new(ConnectivityObserver::from_probe(probe.as_ref()).await);
    let driver = Arc::new(driver.with_connectivity(observer.watch()));
    let indicator = Arc::new(Indicator::new(
        observer.current(),
        config.banner_dismiss_after(),
    ));

    let trigger_events = observer.subscribe();
    let indicator_events = observer.subscribe();
    let mut banner = indicator.watch();
    let mut sync_state = driver.watch_state();
    let mut tasks = JoinSet::new();

    {
        let driver = Arc::clone(&driver);
        let connectivity = observer.watch();
        let interval = config.sync_interval();
        tasks.spawn(async move {
            driver
                .run_triggers(trigger_events, connectivity, interval)
                .await;
        });
    }
    {
        let indicator = Arc::clone(&indicator);
        let connectivity = observer.watch();
        tasks.spawn(async move { indicator.run(indicator_events, connectivity).await });
    }
    tasks.spawn(async move {
        render_banner(*banner.borrow_and_update());
        while banner.changed().await.is_ok() {
            render_banner(*banner.borrow_and_update());
        }
    });
    tasks.spawn(async move {
        while sync_state.changed().await.is_ok() {
            let state = *sync_state.borrow_and_update();
            if let Some(message) = sync_state_message(state) {
                eprintln!("{message}");
            }
        }
    });
    if observer.current().is_online() {
        let driver = Arc::clone(&driver);
        tasks.spawn(async move {
            driver.sync_all().await;
        });
    }
    {
        let observer = Arc::clone(&observer);
        let interval = config.probe_interval();
        tasks.spawn(async move { observer.poll(probe.as_ref(), interval).await });
    }

    println!(
        "Watching {} (sync every {}s). Press Ctrl-C to stop.",
        config.api_base_url.as_deref().unwrap_or_default(),
        config.sync_interval_secs
    );
    tokio::signal::ctrl_c().await?;
    tasks.shutdown().await;
    println!("Stopped");
    Ok(())
}
