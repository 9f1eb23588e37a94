use async_trait::async_trait;

use super::{DeliveryError, DeliveryExecutor, SimulatedProvider};
use crate::broadcast::types::{Message, NotificationTarget};

/// In-app socket delivery to a connected user.
pub struct SocketExecutor {
    provider: SimulatedProvider,
}

impl SocketExecutor {
    pub fn new(provider: SimulatedProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl DeliveryExecutor for SocketExecutor {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        tracing::debug!(
            target_id = %target.id,
            user = %target.address,
            title = %message.title,
            "sending socket message"
        );
        self.provider.attempt().await
    }
}
