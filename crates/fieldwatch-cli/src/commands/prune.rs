use std::path::Path;

use chrono::Utc;
use fieldwatch_core::config::retention_cutoff;

use crate::commands::common::{load_config, open_store};
use crate::error::CliError;

pub async fn run_prune(
    days: Option<u32>,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let now_ms = Utc::now().timestamp_millis();
    let cutoff = match days {
        Some(0) => {
            return Err(CliError::Core(fieldwatch_core::Error::InvalidInput(
                "--days must be greater than zero".to_string(),
            )))
        }
        Some(days) => retention_cutoff(days, now_ms),
        None => load_config(config_path)?
            .retention_cutoff(now_ms)
            .ok_or(CliError::RetentionNotConfigured)?,
    };

    let store = open_store(db_path).await?;
    let removed = store.prune_synced(cutoff).await?;
    println!("Pruned {removed} synced record(s)");
    Ok(())
}
