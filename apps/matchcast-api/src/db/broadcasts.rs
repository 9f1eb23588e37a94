use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::RepositoryError;
use crate::models::broadcast_record::BroadcastRecord;

/// Storage for broadcast records, keyed by match/event ID.
#[async_trait]
pub trait BroadcastRepository: Send + Sync {
    /// `Ok(None)` means no broadcast was recorded for the event.
    async fn get_by_event_id(&self, event_id: u64) -> Result<Option<BroadcastRecord>, RepositoryError>;
    async fn create(&self, record: &BroadcastRecord) -> Result<(), RepositoryError>;
    async fn update(&self, record: &BroadcastRecord) -> Result<(), RepositoryError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBroadcastRepository {
    records: Mutex<HashMap<u64, BroadcastRecord>>,
}

impl MemoryBroadcastRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl BroadcastRepository for MemoryBroadcastRepository {
    async fn get_by_event_id(&self, event_id: u64) -> Result<Option<BroadcastRecord>, RepositoryError> {
        Ok(self.records.lock().get(&event_id).cloned())
    }

    async fn create(&self, record: &BroadcastRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock();
        if records.contains_key(&record.event_id) {
            return Err(RepositoryError::Conflict(format!(
                "broadcast for event {}",
                record.event_id
            )));
        }
        records.insert(record.event_id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &BroadcastRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock();
        match records.get_mut(&record.event_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "broadcast for event {}",
                record.event_id
            ))),
        }
    }
}
