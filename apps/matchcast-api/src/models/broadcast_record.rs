use chrono::{DateTime, Utc};
use matchcast_common::id::{prefix, prefixed_ulid};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a persisted broadcast. `Sent` is written as soon as the job
/// is queued; the others once delivery has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Sent,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BroadcastRecord {
    pub id: String,
    pub event_id: u64,
    pub content_hash: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BroadcastRecord {
    pub fn new(event_id: u64, content_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: prefixed_ulid(prefix::BROADCAST),
            event_id,
            content_hash,
            status: RecordStatus::Sent,
            created_at: now,
            updated_at: now,
        }
    }
}
