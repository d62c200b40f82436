use std::path::Path;

use fieldwatch_core::models::{
    CasePayload, EvidencePayload, NotePayload, PanicAlertPayload, Payload, ReportPayload,
};
use fieldwatch_core::util::normalize_text_option;
use fieldwatch_core::OfflineCapability;

use crate::commands::common::{parse_location, read_media};
use crate::error::CliError;

async fn enqueue(payload: impl Into<Payload>, db_path: &Path) -> Result<(), CliError> {
    let capability = OfflineCapability::open(db_path).await;
    let id = capability.enqueue(payload).await?;
    tracing::debug!("Queued {id} in {}", db_path.display());
    println!("{id}");
    Ok(())
}

fn require_text(value: String, field: &str) -> Result<String, CliError> {
    normalize_text_option(Some(value)).ok_or_else(|| {
        CliError::Core(fieldwatch_core::Error::InvalidInput(format!(
            "{field} cannot be empty"
        )))
    })
}

pub async fn run_report(
    description: String,
    lat: Option<f64>,
    lng: Option<f64>,
    media: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload = ReportPayload {
        description: require_text(description, "description")?,
        location: parse_location(lat, lng)?,
        media: media.map(read_media).transpose()?,
    };
    enqueue(payload, db_path).await
}

pub async fn run_panic(lat: Option<f64>, lng: Option<f64>, db_path: &Path) -> Result<(), CliError> {
    let payload = PanicAlertPayload {
        location: parse_location(lat, lng)?,
    };
    enqueue(payload, db_path).await
}

pub async fn run_evidence(
    file: &Path,
    case_id: Option<String>,
    description: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload = EvidencePayload {
        case_id: normalize_text_option(case_id),
        file: read_media(file)?,
        description: normalize_text_option(description),
    };
    enqueue(payload, db_path).await
}

pub async fn run_case(
    title: String,
    description: String,
    status: String,
    priority: String,
    assigned_to: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload = CasePayload {
        title: require_text(title, "title")?,
        description: require_text(description, "description")?,
        status: require_text(status, "status")?,
        priority: require_text(priority, "priority")?,
        assigned_to: normalize_text_option(assigned_to),
    };
    enqueue(payload, db_path).await
}

pub async fn run_note(
    content: String,
    report_id: Option<String>,
    case_id: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload = NotePayload {
        content: require_text(content, "content")?,
        report_id: normalize_text_option(report_id),
        case_id: normalize_text_option(case_id),
    };
    enqueue(payload, db_path).await
}
