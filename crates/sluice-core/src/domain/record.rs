//! Outcome record: the audit row written for every processing attempt.

use serde::{Deserialize, Serialize};

use super::header::MessageHeader;
use super::ids::RecordId;

/// Logical name of the record store target.
pub const EVENTS_TABLE: &str = "events";

/// Result of one processing attempt as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Processed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Processed => "processed",
            RecordStatus::Failed => "failed",
        }
    }
}

/// Durable audit row.
///
/// Records are append-only: redelivered messages produce a new record with a
/// new `id`, even when `event_id` repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub event_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub schema_version: String,
    pub occurred_at: String,
    pub status: RecordStatus,
    pub body: String,
}

impl OutcomeRecord {
    /// Skeleton built from a decoded header; status starts as `Processed`.
    pub fn from_header(id: RecordId, header: &MessageHeader) -> Self {
        Self {
            id: id.to_string(),
            event_id: header.event_id.clone(),
            tenant_id: header.tenant_id.clone(),
            client_id: header.client_id.clone(),
            schema_version: header.schema_version.clone(),
            occurred_at: header.occurred_at.clone(),
            status: RecordStatus::Processed,
            body: header.body_text().to_string(),
        }
    }

    pub fn mark_failed(&mut self) {
        self.status = RecordStatus::Failed;
    }
}
