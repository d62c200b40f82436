use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldwatch_core::EntityKind;

#[derive(Parser)]
#[command(name = "fieldwatch")]
#[command(about = "Capture incident reports offline and sync them when the network returns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the client config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue an incident report
    Report {
        /// What happened
        #[arg(long)]
        description: String,
        /// Latitude of the incident
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of the incident
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Photo or video to attach
        #[arg(long, value_name = "PATH")]
        media: Option<PathBuf>,
    },
    /// Queue a panic alert
    Panic {
        /// Current latitude
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Current longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Queue an evidence upload
    Evidence {
        /// File to upload
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// Case the evidence belongs to
        #[arg(long)]
        case_id: Option<String>,
        /// Short description of the evidence
        #[arg(long)]
        description: Option<String>,
    },
    /// Queue a new case
    Case {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "open")]
        status: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Responder the case is assigned to
        #[arg(long)]
        assigned_to: Option<String>,
    },
    /// Queue a note
    Note {
        #[arg(long)]
        content: String,
        /// Report the note is attached to
        #[arg(long)]
        report_id: Option<String>,
        /// Case the note is attached to
        #[arg(long)]
        case_id: Option<String>,
    },
    /// List writes waiting to be synced
    Pending {
        /// Only show one kind (reports, panic, evidence, cases, notes)
        #[arg(long)]
        kind: Option<EntityKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending counts per kind
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop a write that has not been synced yet
    Cancel {
        /// Pending write ID
        id: String,
    },
    /// Run one sync pass now
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Watch connectivity and sync automatically until interrupted
    Watch,
    /// Delete synced records older than the retention window
    Prune {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the config file
    Init {
        /// Remote API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Bearer token for the remote API
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Seconds between scheduled sync passes
        #[arg(long, value_name = "SECS")]
        sync_interval_secs: Option<u64>,
        /// Seconds before a delivery attempt is abandoned
        #[arg(long, value_name = "SECS")]
        delivery_timeout_secs: Option<u64>,
        /// Days to keep synced records
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<u32>,
        /// host:port checked for connectivity
        #[arg(long, value_name = "ADDR")]
        probe_address: Option<String>,
    },
    /// Print the effective configuration
    Show,
}
