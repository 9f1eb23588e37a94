use async_trait::async_trait;

use super::{DeliveryError, DeliveryExecutor, SimulatedProvider};
use crate::broadcast::types::{DeliveryType, Message, NotificationTarget};

const DEFAULT_SUBJECT: &str = "Notification from Football";
const DEFAULT_TAG: &str = "football-api";

/// Provider-specific fields taken from a target's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOptions {
    pub subject: String,
    pub tag: String,
    pub track_clicks: bool,
    pub track_opens: bool,
    pub match_id: Option<String>,
    pub team: Option<String>,
}

impl EmailOptions {
    pub fn from_target(target: &NotificationTarget, message: &Message) -> Self {
        let subject = target
            .meta("subject")
            .map(str::to_string)
            .or_else(|| (!message.title.is_empty()).then(|| message.title.clone()))
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        Self {
            subject,
            tag: target.meta("tag").unwrap_or(DEFAULT_TAG).to_string(),
            track_clicks: target.meta("track_clicks") == Some("true"),
            track_opens: target.meta("track_opens") == Some("true"),
            match_id: target.meta("match_id").map(str::to_string),
            team: target.meta("team").map(str::to_string),
        }
    }
}

pub struct EmailExecutor {
    provider: SimulatedProvider,
}

impl EmailExecutor {
    pub fn new(provider: SimulatedProvider) -> Self {
        Self { provider }
    }
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[async_trait]
impl DeliveryExecutor for EmailExecutor {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        if !looks_like_email(&target.address) {
            return Err(DeliveryError::InvalidAddress {
                kind: DeliveryType::Email,
                address: target.address.clone(),
            });
        }

        let options = EmailOptions::from_target(target, message);
        tracing::debug!(
            target_id = %target.id,
            to = %target.address,
            subject = %options.subject,
            tag = %options.tag,
            track_clicks = options.track_clicks,
            track_opens = options.track_opens,
            match_id = options.match_id.as_deref(),
            team = options.team.as_deref(),
            "sending email"
        );
        self.provider.attempt().await
    }
}
