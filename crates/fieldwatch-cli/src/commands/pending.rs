use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use fieldwatch_core::{EntityKind, PendingId};

use crate::commands::common::{
    format_pending_lines, open_queue, open_store, pending_to_item, PendingItem,
};
use crate::error::CliError;

pub async fn run_pending(
    kind: Option<EntityKind>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let kinds = kind.map_or_else(|| EntityKind::ALL.to_vec(), |kind| vec![kind]);

    let mut writes = Vec::new();
    for kind in kinds {
        writes.extend(store.get_all_unsynced(kind).await?);
    }

    let now_ms = Utc::now().timestamp_millis();
    if as_json {
        let items = writes
            .iter()
            .map(|write| pending_to_item(write, now_ms))
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if writes.is_empty() {
        println!("No pending writes.");
        return Ok(());
    }
    for line in format_pending_lines(&writes, now_ms) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let counts = store.pending_counts().await?;

    if as_json {
        let by_collection = counts
            .iter()
            .map(|(kind, count)| (kind.to_string(), *count))
            .collect::<BTreeMap<String, u64>>();
        println!("{}", serde_json::to_string_pretty(&by_collection)?);
        return Ok(());
    }

    for (kind, count) in &counts {
        println!("{kind:<12}  {count}");
    }
    println!("{:<12}  {}", "total", counts.values().sum::<u64>());
    Ok(())
}

pub fn parse_pending_id(raw: &str) -> Result<(EntityKind, PendingId), CliError> {
    let id = raw
        .parse::<PendingId>()
        .map_err(|_| CliError::EmptyPendingId)?;
    let kind = id
        .kind()
        .ok_or_else(|| CliError::UnknownIdKind(id.to_string()))?;
    Ok((kind, id))
}

pub async fn run_cancel(raw_id: &str, db_path: &Path) -> Result<(), CliError> {
    let (kind, id) = parse_pending_id(raw_id)?;
    let queue = open_queue(db_path).await?;

    if queue.cancel(kind, &id).await? {
        println!("Cancelled {id}");
        Ok(())
    } else {
        Err(CliError::PendingNotFound(id.to_string()))
    }
}
