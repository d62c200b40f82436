use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fieldwatch_core::models::{Location, MediaBlob};
use fieldwatch_core::sync::KindReport;
use fieldwatch_core::{
    ClientConfig, EntityKind, HttpRemote, LocalStore, OfflineCapability, PendingWrite,
    SyncDriver, SyncReport, WriteQueue,
};
use serde::Serialize;

use crate::error::CliError;

pub const DB_PATH_ENV: &str = "FIELDWATCH_DB_PATH";
pub const CONFIG_PATH_ENV: &str = "FIELDWATCH_CONFIG";

const SUMMARY_CHARS: usize = 60;

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub kind: String,
    pub summary: String,
    pub created_at: i64,
    pub relative_time: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub flag_update_failed: usize,
    pub read_failed: bool,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldwatch")
        .join("fieldwatch.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldwatch")
        .join("config.json")
}

/// Config file overlaid with `FIELDWATCH_*` environment variables.
pub fn load_config(config_path: &Path) -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::load(config_path)?.with_env_overrides()?)
}

pub async fn open_queue(db_path: &Path) -> Result<WriteQueue, CliError> {
    match OfflineCapability::open(db_path).await {
        OfflineCapability::Available { queue, .. } => Ok(queue),
        OfflineCapability::Degraded { reason } => {
            tracing::warn!("Offline queue at {} is unavailable", db_path.display());
            Err(CliError::OfflineUnavailable(reason))
        }
    }
}

pub async fn open_store(db_path: &Path) -> Result<LocalStore, CliError> {
    Ok(open_queue(db_path).await?.store().clone())
}

pub fn build_driver(config: &ClientConfig, store: LocalStore) -> Result<SyncDriver, CliError> {
    let base_url = config
        .api_base_url
        .clone()
        .ok_or(CliError::SyncNotConfigured)?;
    let remote = HttpRemote::new(
        base_url,
        config.auth_token.clone(),
        config.delivery_timeout(),
    )?;
    Ok(SyncDriver::new(
        store,
        Arc::new(remote),
        config.delivery_timeout(),
    ))
}

pub fn parse_location(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Location>, CliError> {
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(CliError::InvalidLocation(format!(
                    "latitude {lat} is outside -90..90"
                )));
            }
            if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
                return Err(CliError::InvalidLocation(format!(
                    "longitude {lng} is outside -180..180"
                )));
            }
            Ok(Some(Location::new(lat, lng)))
        }
        _ => Err(CliError::InvalidLocation(
            "--lat and --lng must be given together".to_string(),
        )),
    }
}

pub fn read_media(path: &Path) -> Result<MediaBlob, CliError> {
    let invalid = |reason: String| CliError::InvalidMedia {
        path: path.display().to_string(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|error| invalid(error.to_string()))?;
    if bytes.is_empty() {
        return Err(invalid("file is empty".to_string()));
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| invalid("path has no file name".to_string()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(MediaBlob::new(file_name, mime_type, bytes))
}

pub fn pending_to_item(write: &PendingWrite, now_ms: i64) -> PendingItem {
    PendingItem {
        id: write.id.to_string(),
        kind: write.kind().to_string(),
        summary: write.payload.summary(SUMMARY_CHARS),
        created_at: write.created_at,
        relative_time: format_relative_time(write.created_at, now_ms),
        attempts: write.attempts,
        last_error: write.last_error.clone(),
    }
}

pub fn format_pending_lines(writes: &[PendingWrite], now_ms: i64) -> Vec<String> {
    writes
        .iter()
        .map(|write| {
            let relative_time = format_relative_time(write.created_at, now_ms);
            let summary = write.payload.summary(SUMMARY_CHARS);
            let line = format!("{}  {relative_time:<10}  {summary}", write.id);
            match (&write.last_error, write.attempts) {
                (Some(error), attempts) if attempts > 0 => {
                    format!("{line}  [{attempts} failed: {error}]")
                }
                _ => line,
            }
        })
        .collect()
}

pub fn kind_summary(kind: EntityKind, report: &KindReport) -> KindSummary {
    KindSummary {
        kind: kind.to_string(),
        attempted: report.attempted,
        delivered: report.delivered,
        failed: report.failed,
        flag_update_failed: report.flag_update_failed,
        read_failed: report.read_failed,
    }
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = report
        .kinds
        .iter()
        .filter(|(_, kind_report)| kind_report.attempted > 0 || !kind_report.is_clean())
        .map(|(kind, kind_report)| {
            if kind_report.read_failed {
                return format!("{kind:<12}  could not be read");
            }
            let still_pending = if kind_report.flag_update_failed > 0 {
                format!(
                    ", {} accepted but still pending",
                    kind_report.flag_update_failed
                )
            } else {
                String::new()
            };
            format!(
                "{kind:<12}  {} delivered, {} failed{still_pending}",
                kind_report.delivered, kind_report.failed
            )
        })
        .collect::<Vec<_>>();

    if report.attempted() == 0 && report.is_clean() {
        lines.push("Nothing to sync".to_string());
    } else {
        lines.push(format!(
            "Sync finished: {} delivered, {} left pending",
            report.delivered(),
            report.left_pending()
        ));
    }
    lines
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
