use std::path::Path;

use fieldwatch_core::util::normalize_text_option;
use fieldwatch_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

/// Flags accepted by `config init`; unset flags keep the current value.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub api_base_url: Option<String>,
    pub auth_token: Option<String>,
    pub sync_interval_secs: Option<u64>,
    pub delivery_timeout_secs: Option<u64>,
    pub retention_days: Option<u32>,
    pub probe_address: Option<String>,
}

impl ConfigUpdate {
    pub fn apply(self, mut config: ClientConfig) -> Result<ClientConfig, CliError> {
        if let Some(url) = normalize_text_option(self.api_base_url) {
            config.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(self.auth_token) {
            config.auth_token = Some(token);
        }
        if let Some(secs) = self.sync_interval_secs {
            config.sync_interval_secs = secs;
        }
        if let Some(secs) = self.delivery_timeout_secs {
            config.delivery_timeout_secs = secs;
        }
        if let Some(days) = self.retention_days {
            config.retention_days = Some(days);
        }
        if let Some(address) = normalize_text_option(self.probe_address) {
            config.probe_address = Some(address);
        }
        Ok(config.validate()?)
    }
}

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            auth_token,
            sync_interval_secs,
            delivery_timeout_secs,
            retention_days,
            probe_address,
        } => run_config_init(
            ConfigUpdate {
                api_base_url,
                auth_token,
                sync_interval_secs,
                delivery_timeout_secs,
                retention_days,
                probe_address,
            },
            config_path,
        ),
        ConfigCommands::Show => run_config_show(config_path),
    }
}

pub fn run_config_init(update: ConfigUpdate, config_path: &Path) -> Result<(), CliError> {
    // Start from the file alone so environment overrides are not persisted.
    let existing = ClientConfig::load(config_path)?;
    let config = update.apply(existing)?;
    config.save(config_path)?;

    println!("Saved config to {}", config_path.display());
    match config.api_base_url.as_deref() {
        Some(url) => println!("Remote API: {url}"),
        None => println!("Remote API not set; writes will stay queued locally"),
    }
    Ok(())
}

pub fn run_config_show(config_path: &Path) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if config.auth_token.is_some() {
        config.auth_token = Some("[REDACTED]".to_string());
    }

    println!("# {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
