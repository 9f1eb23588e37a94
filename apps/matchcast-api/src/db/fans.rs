use async_trait::async_trait;
use parking_lot::Mutex;

use super::RepositoryError;
use crate::models::fan::Fan;

/// Source of fan subscriptions, queried per channel (team).
#[async_trait]
pub trait FanRepository: Send + Sync {
    async fn create(&self, fan: &Fan) -> Result<(), RepositoryError>;
    async fn get_by_channel(&self, channel_id: &str) -> Result<Vec<Fan>, RepositoryError>;
    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Fan>, RepositoryError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Keeps insertion order so resolved targets come back in subscription order.
#[derive(Default)]
pub struct MemoryFanRepository {
    fans: Mutex<Vec<Fan>>,
}

impl MemoryFanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fans(fans: impl IntoIterator<Item = Fan>) -> Self {
        Self {
            fans: Mutex::new(fans.into_iter().collect()),
        }
    }
}

#[async_trait]
impl FanRepository for MemoryFanRepository {
    async fn create(&self, fan: &Fan) -> Result<(), RepositoryError> {
        self.fans.lock().push(fan.clone());
        Ok(())
    }

    async fn get_by_channel(&self, channel_id: &str) -> Result<Vec<Fan>, RepositoryError> {
        Ok(self
            .fans
            .lock()
            .iter()
            .filter(|f| f.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Fan>, RepositoryError> {
        Ok(self
            .fans
            .lock()
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }
}
