//! HTTP remote that posts each write kind to its API endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::remote::{DeliveryError, RemoteCollaborator};
use crate::error::{Error, Result};
use crate::models::{EntityKind, MediaBlob, Payload, PendingWrite};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Header carrying the pending write id so the server can drop redeliveries.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Path of the endpoint that accepts writes of `kind`.
pub const fn endpoint_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Report => "/reports",
        EntityKind::PanicAlert => "/panic",
        EntityKind::Evidence => "/upload",
        EntityKind::Case => "/cases",
        EntityKind::Note => "/notes",
    }
}

#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| Error::Config(format!("Failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            auth_token: normalize_text_option(auth_token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, kind: EntityKind) -> String {
        format!("{}{}", self.base_url, endpoint_path(kind))
    }

    fn build_request(&self, write: &PendingWrite) -> std::result::Result<RequestBuilder, DeliveryError> {
        let mut request = self
            .client
            .post(self.endpoint(write.kind()))
            .header(IDEMPOTENCY_HEADER, write.id.as_str())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let request = match &write.payload {
            Payload::Report(report) => {
                let location = serde_json::to_string(&report.location)
                    .map_err(|error| DeliveryError::InvalidRequest(error.to_string()))?;
                let mut form = Form::new()
                    .text("description", report.description.clone())
                    .text("location", location);
                if let Some(media) = &report.media {
                    form = form.part("media", media_part(media)?);
                }
                request.multipart(form)
            }
            Payload::PanicAlert(alert) => request.json(&json!({
                "location": alert.location,
                "timestamp": rfc3339_millis(write.created_at),
            })),
            Payload::Evidence(evidence) => {
                let mut form = Form::new().part("file", media_part(&evidence.file)?);
                if let Some(case_id) = &evidence.case_id {
                    form = form.text("caseId", case_id.clone());
                }
                if let Some(description) = &evidence.description {
                    form = form.text("description", description.clone());
                }
                request.multipart(form)
            }
            Payload::Case(case) => request.json(&json!({
                "title": case.title,
                "description": case.description,
                "status": case.status,
                "priority": case.priority,
                "assignedTo": case.assigned_to,
            })),
            Payload::Note(note) => request.json(&json!({
                "content": note.content,
                "reportId": note.report_id,
                "caseId": note.case_id,
            })),
        };
        Ok(request)
    }
}

#[async_trait]
impl RemoteCollaborator for HttpRemote {
    async fn deliver(&self, write: &PendingWrite) -> std::result::Result<(), DeliveryError> {
        let response = self.build_request(write)?.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }
}

fn media_part(media: &MediaBlob) -> std::result::Result<Part, DeliveryError> {
    Part::bytes(media.bytes.clone())
        .file_name(media.file_name.clone())
        .mime_str(&media.mime_type)
        .map_err(|error| DeliveryError::InvalidRequest(format!("{}: {error}", media.mime_type)))
}

fn rfc3339_millis(unix_millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(unix_millis)
        .map(|timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
