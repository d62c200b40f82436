//! Data models for Fieldwatch

mod kind;
mod payload;
mod pending;

pub use kind::EntityKind;
pub use payload::{
    CasePayload, EvidencePayload, Location, MediaBlob, NotePayload, PanicAlertPayload, Payload,
    ReportPayload,
};
pub use pending::{PendingId, PendingWrite};
