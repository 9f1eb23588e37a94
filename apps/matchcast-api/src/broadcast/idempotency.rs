//! Duplicate-broadcast guard keyed by event ID.
//!
//! The check and the record write are separate steps, so two broadcasts for
//! the same event racing each other can both pass the check. The record
//! store's uniqueness on event ID is the only backstop.

use std::sync::Arc;

use chrono::Utc;

use super::error::BroadcastError;
use super::types::Message;
use crate::db::{BroadcastRepository, RepositoryError};
use crate::models::broadcast_record::{BroadcastRecord, RecordStatus};

#[derive(Debug)]
pub enum GuardDecision {
    /// A broadcast was already recorded for this event.
    AlreadySent(BroadcastRecord),
    MayProceed,
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    records: Arc<dyn BroadcastRepository>,
}

impl IdempotencyGuard {
    pub fn new(records: Arc<dyn BroadcastRepository>) -> Self {
        Self { records }
    }

    /// Stable content fingerprint for a message.
    pub fn fingerprint(message: &Message) -> String {
        message.fingerprint()
    }

    pub async fn check(&self, event_id: u64) -> Result<GuardDecision, BroadcastError> {
        match self.records.get_by_event_id(event_id).await {
            Ok(Some(record)) => Ok(GuardDecision::AlreadySent(record)),
            Ok(None) | Err(RepositoryError::NotFound(_)) => Ok(GuardDecision::MayProceed),
            Err(err) => {
                tracing::error!(event_id, %err, "broadcast record lookup failed");
                Err(err.into())
            }
        }
    }

    /// Persist a `sent` record for an accepted broadcast.
    pub async fn record(
        &self,
        event_id: u64,
        fingerprint: String,
    ) -> Result<BroadcastRecord, BroadcastError> {
        let record = BroadcastRecord::new(event_id, fingerprint);
        self.records.create(&record).await?;
        Ok(record)
    }

    /// Move an existing record to its final status.
    pub async fn mark(&self, event_id: u64, status: RecordStatus) -> Result<(), BroadcastError> {
        let mut record = self
            .records
            .get_by_event_id(event_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("broadcast for event {event_id}")))?;
        record.status = status;
        record.updated_at = Utc::now();
        self.records.update(&record).await?;
        Ok(())
    }
}
