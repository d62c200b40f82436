//! Kind-specific payloads carried by pending writes

use serde::{Deserialize, Serialize};

use super::EntityKind;

/// Geographic position captured with a report or alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Binary attachment (photo, audio, document) kept inline with the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlob {
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub description: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub media: Option<MediaBlob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanicAlertPayload {
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePayload {
    #[serde(default)]
    pub case_id: Option<String>,
    pub file: MediaBlob,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePayload {
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    pub content: String,
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub case_id: Option<String>,
}

/// A payload for exactly one entity kind.
///
/// The variant decides which collection the write lands in and which remote
/// endpoint receives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Report(ReportPayload),
    PanicAlert(PanicAlertPayload),
    Evidence(EvidencePayload),
    Case(CasePayload),
    Note(NotePayload),
}

impl Payload {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Report(_) => EntityKind::Report,
            Self::PanicAlert(_) => EntityKind::PanicAlert,
            Self::Evidence(_) => EntityKind::Evidence,
            Self::Case(_) => EntityKind::Case,
            Self::Note(_) => EntityKind::Note,
        }
    }

    /// Serialize the inner payload for the kind's `payload` column
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Report(payload) => serde_json::to_string(payload),
            Self::PanicAlert(payload) => serde_json::to_string(payload),
            Self::Evidence(payload) => serde_json::to_string(payload),
            Self::Case(payload) => serde_json::to_string(payload),
            Self::Note(payload) => serde_json::to_string(payload),
        }
    }

    /// Decode a stored payload column for the given kind
    pub fn from_json(kind: EntityKind, raw: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Report => Self::Report(serde_json::from_str(raw)?),
            EntityKind::PanicAlert => Self::PanicAlert(serde_json::from_str(raw)?),
            EntityKind::Evidence => Self::Evidence(serde_json::from_str(raw)?),
            EntityKind::Case => Self::Case(serde_json::from_str(raw)?),
            EntityKind::Note => Self::Note(serde_json::from_str(raw)?),
        })
    }

    /// Short human-readable summary for listings
    #[must_use]
    pub fn summary(&self, max_len: usize) -> String {
        let text = match self {
            Self::Report(report) => report.description.clone(),
            Self::PanicAlert(alert) => alert.location.map_or_else(
                || "panic alert (no location)".to_string(),
                |location| format!("panic alert at {:.5}, {:.5}", location.lat, location.lng),
            ),
            Self::Evidence(evidence) => evidence
                .description
                .clone()
                .unwrap_or_else(|| evidence.file.file_name.clone()),
            Self::Case(case) => format!("[{}/{}] {}", case.status, case.priority, case.title),
            Self::Note(note) => note.content.clone(),
        };
        text.lines().next().unwrap_or("").chars().take(max_len).collect()
    }
}

impl From<ReportPayload> for Payload {
    fn from(value: ReportPayload) -> Self {
        Self::Report(value)
    }
}

impl From<PanicAlertPayload> for Payload {
    fn from(value: PanicAlertPayload) -> Self {
        Self::PanicAlert(value)
    }
}

impl From<EvidencePayload> for Payload {
    fn from(value: EvidencePayload) -> Self {
        Self::Evidence(value)
    }
}

impl From<CasePayload> for Payload {
    fn from(value: CasePayload) -> Self {
        Self::Case(value)
    }
}

impl From<NotePayload> for Payload {
    fn from(value: NotePayload) -> Self {
        Self::Note(value)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_column_decodes_under_its_own_kind() {
        let payload = Payload::Evidence(EvidencePayload {
            case_id: Some("case-1".to_string()),
            file: MediaBlob::new("scene.jpg", "image/jpeg", vec![0xff, 0xd8, 0x00, 0x01]),
            description: None,
        });

        let raw = payload.to_json().unwrap();
        assert!(raw.contains("\"bytes\":\"/9gAAQ==\""));
        assert_eq!(Payload::from_json(EntityKind::Evidence, &raw).unwrap(), payload);
    }

    #[test]
    fn payload_column_rejects_mismatched_kind() {
        let raw = Payload::PanicAlert(PanicAlertPayload { location: None })
            .to_json()
            .unwrap();
        assert!(Payload::from_json(EntityKind::Case, &raw).is_err());
    }

    #[test]
    fn summary_uses_first_line_and_truncates() {
        let payload = Payload::Note(NotePayload {
            content: "Suspect left on foot\nheading north".to_string(),
            report_id: None,
            case_id: None,
        });
        assert_eq!(payload.summary(7), "Suspect");
        assert_eq!(payload.summary(80), "Suspect left on foot");
    }

    #[test]
    fn panic_summary_renders_location() {
        let payload = Payload::PanicAlert(PanicAlertPayload {
            location: Some(Location::new(9.08, 8.67)),
        });
        assert_eq!(payload.summary(80), "panic alert at 9.08000, 8.67000");
    }
}
