//! Fieldwatch CLI - capture incident reports from the command line
//!
//! Writes are always saved locally first and delivered when the remote API is
//! reachable.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::capture::{run_case, run_evidence, run_note, run_panic, run_report};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::pending::{run_cancel, run_pending, run_status};
use crate::commands::prune::run_prune;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "fieldwatch=info".parse::<tracing_subscriber::filter::Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config_path = resolve_config_path(cli.config);
    tracing::debug!(
        "Using store {} and config {}",
        db_path.display(),
        config_path.display()
    );

    match cli.command {
        Commands::Report {
            description,
            lat,
            lng,
            media,
        } => run_report(description, lat, lng, media.as_deref(), &db_path).await?,
        Commands::Panic { lat, lng } => run_panic(lat, lng, &db_path).await?,
        Commands::Evidence {
            file,
            case_id,
            description,
        } => run_evidence(&file, case_id, description, &db_path).await?,
        Commands::Case {
            title,
            description,
            status,
            priority,
            assigned_to,
        } => run_case(title, description, status, priority, assigned_to, &db_path).await?,
        Commands::Note {
            content,
            report_id,
            case_id,
        } => run_note(content, report_id, case_id, &db_path).await?,
        Commands::Pending { kind, json } => run_pending(kind, json, &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
        Commands::Cancel { id } => run_cancel(&id, &db_path).await?,
        Commands::Sync { json } => run_sync(json, &db_path, &config_path).await?,
        Commands::Watch => run_watch(&db_path, &config_path).await?,
        Commands::Prune { days } => run_prune(days, &db_path, &config_path).await?,
        Commands::Config { command } => run_config(command, &config_path)?,
    }

    Ok(())
}
