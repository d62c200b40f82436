//! Client configuration.
//!
//! A `ClientConfig` is read from a JSON file and then overlaid with
//! environment variables. Everything except the API base URL has a default,
//! so an empty file is a valid offline-only configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const API_URL_ENV: &str = "FIELDWATCH_API_URL";
pub const AUTH_TOKEN_ENV: &str = "FIELDWATCH_AUTH_TOKEN";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BANNER_DISMISS_SECS: u64 = 3;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;
const PROBE_TIMEOUT_SECS: u64 = 3;
const DAY_MILLIS: i64 = 86_400_000;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token sent with every delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_banner_dismiss_secs")]
    pub banner_dismiss_secs: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Synced records older than this are pruned by `prune`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
    /// `host:port` checked for connectivity; derived from the API URL if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_address: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("delivery_timeout_secs", &self.delivery_timeout_secs)
            .field("banner_dismiss_secs", &self.banner_dismiss_secs)
            .field("probe_interval_secs", &self.probe_interval_secs)
            .field("retention_days", &self.retention_days)
            .field("probe_address", &self.probe_address)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            auth_token: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            delivery_timeout_secs: DEFAULT_DELIVERY_TIMEOUT_SECS,
            banner_dismiss_secs: DEFAULT_BANNER_DISMISS_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            retention_days: None,
            probe_address: None,
        }
    }
}

const fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

const fn default_delivery_timeout_secs() -> u64 {
    DEFAULT_DELIVERY_TIMEOUT_SECS
}

const fn default_banner_dismiss_secs() -> u64 {
    DEFAULT_BANNER_DISMISS_SECS
}

const fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

impl ClientConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.validate()
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = self.clone().validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut raw = serde_json::to_string_pretty(&config)?;
        raw.push('\n');
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Overlay `FIELDWATCH_API_URL` and `FIELDWATCH_AUTH_TOKEN` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(API_URL_ENV)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(AUTH_TOKEN_ENV)) {
            self.auth_token = Some(token);
        }
        self.validate()
    }

    /// Normalize string fields and reject values the client cannot run with.
    pub fn validate(mut self) -> Result<Self> {
        self.api_base_url = match normalize_text_option(self.api_base_url.take()) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(Error::Config(
                    "api_base_url must include http:// or https://".to_string(),
                ))
            }
            None => None,
        };
        self.auth_token = normalize_text_option(self.auth_token.take());
        self.probe_address = normalize_text_option(self.probe_address.take());

        for (field, value) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("delivery_timeout_secs", self.delivery_timeout_secs),
            ("banner_dismiss_secs", self.banner_dismiss_secs),
            ("probe_interval_secs", self.probe_interval_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{field} must be greater than zero")));
            }
        }
        if self.retention_days == Some(0) {
            return Err(Error::Config(
                "retention_days must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub const fn banner_dismiss_after(&self) -> Duration {
        Duration::from_secs(self.banner_dismiss_secs)
    }

    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    /// Address the connectivity probe dials.
    ///
    /// Uses `probe_address` when set, otherwise the API URL's host and port.
    pub fn probe_target(&self) -> Option<String> {
        if let Some(address) = &self.probe_address {
            return Some(address.clone());
        }

        let url = Url::parse(self.api_base_url.as_deref()?).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(format!("{host}:{port}"))
    }

    /// Cutoff (Unix ms) before which synced records may be pruned.
    pub fn retention_cutoff(&self, now_millis: i64) -> Option<i64> {
        self.retention_days.map(|days| retention_cutoff(days, now_millis))
    }
}

/// Unix ms timestamp `days` before `now_millis`.
pub fn retention_cutoff(days: u32, now_millis: i64) -> i64 {
    now_millis.saturating_sub(i64::from(days).saturating_mul(DAY_MILLIS))
}
