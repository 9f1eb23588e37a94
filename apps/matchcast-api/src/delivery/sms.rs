use async_trait::async_trait;

use super::{DeliveryError, DeliveryExecutor, SimulatedProvider};
use crate::broadcast::types::{DeliveryType, Message, NotificationTarget};

/// Longest SMS body sent in a single segment.
const SMS_MAX_LEN: usize = 160;

pub struct SmsExecutor {
    provider: SimulatedProvider,
}

impl SmsExecutor {
    pub fn new(provider: SimulatedProvider) -> Self {
        Self { provider }
    }
}

/// E.164-ish: optional leading `+`, then 8 to 15 digits.
fn is_phone_number(address: &str) -> bool {
    let digits = address.strip_prefix('+').unwrap_or(address);
    (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `title: content`, truncated on a char boundary to one segment.
pub fn sms_body(message: &Message) -> String {
    let body = if message.title.is_empty() {
        message.content.clone()
    } else {
        format!("{}: {}", message.title, message.content)
    };
    body.chars().take(SMS_MAX_LEN).collect()
}

#[async_trait]
impl DeliveryExecutor for SmsExecutor {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        if !is_phone_number(&target.address) {
            return Err(DeliveryError::InvalidAddress {
                kind: DeliveryType::Sms,
                address: target.address.clone(),
            });
        }
        let body = sms_body(message);
        tracing::debug!(target_id = %target.id, to = %target.address, len = body.len(), "sending SMS");
        self.provider.attempt().await
    }
}
