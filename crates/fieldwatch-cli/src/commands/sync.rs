use std::path::Path;

use fieldwatch_core::SyncOutcome;

use crate::commands::common::{
    build_driver, format_sync_report, kind_summary, load_config, open_store, KindSummary,
};
use crate::error::CliError;

pub async fn run_sync(as_json: bool, db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let store = open_store(db_path).await?;
    let driver = build_driver(&config, store)?;

    let SyncOutcome::Completed(report) = driver.sync_all().await else {
        println!("A sync pass is already running");
        return Ok(());
    };

    if as_json {
        let kinds = report
            .kinds
            .iter()
            .map(|(kind, kind_report)| kind_summary(*kind, kind_report))
            .collect::<Vec<KindSummary>>();
        println!("{}", serde_json::to_string_pretty(&kinds)?);
        return Ok(());
    }

    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}
