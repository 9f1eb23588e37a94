//! Value types shared by the registry, dispatcher, executors and publisher.

use std::collections::HashMap;
use std::fmt;

use matchcast_common::content_fingerprint;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a single target is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Push,
    Socket,
    Email,
    Sms,
    Webhook,
    /// An app user: push first, in-app socket as fallback.
    User,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Push => "push",
            DeliveryType::Socket => "socket",
            DeliveryType::Email => "email",
            DeliveryType::Sms => "sms",
            DeliveryType::Webhook => "webhook",
            DeliveryType::User => "user",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recipient/address pair for a single delivery type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub id: String,
    pub delivery_type: DeliveryType,
    pub address: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl NotificationTarget {
    pub fn new(id: impl Into<String>, delivery_type: DeliveryType, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delivery_type,
            address: address.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// A subscriber registered on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// ID of the stored subscription this entry came from.
    pub id: String,
    pub subscriber_id: String,
    pub channel_id: String,
    pub notification_type: DeliveryType,
    pub address: String,
}

impl Subscription {
    /// Builds the delivery target for this subscription. The channel is
    /// carried as `team` metadata for providers that tag by team.
    pub fn to_target(&self) -> NotificationTarget {
        NotificationTarget::new(
            self.subscriber_id.clone(),
            self.notification_type,
            self.address.clone(),
        )
        .with_metadata("team", self.channel_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub title: String,
    pub content: String,
}

impl Message {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn fingerprint(&self) -> String {
        content_fingerprint(&self.title, &self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Result of delivering to a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub target_id: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            status: DeliveryStatus::Sent,
            error: None,
        }
    }

    pub fn failed(target_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

/// Aggregate of every outcome of one job. Only built once all targets have
/// reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub outcomes: Vec<DeliveryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| !o.is_sent()).count();
        let error = (failed > 0).then(|| format!("notification completed with {failed} errors"));
        Self {
            success: failed == 0,
            outcomes,
            error,
        }
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_sent()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.sent_count()
    }
}

/// Live progress of one broadcast, pushed to observers on every change.
///
/// `sent_count + failed_count` never exceeds `total` and the snapshot is
/// frozen once `is_completed` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastStatus {
    pub event_id: u64,
    pub job_id: String,
    pub channel_ids: Vec<String>,
    #[serde(rename = "total_sent")]
    total: usize,
    sent_count: usize,
    failed_count: usize,
    is_completed: bool,
    error_details: Vec<String>,
}

impl BroadcastStatus {
    pub fn new(event_id: u64, job_id: impl Into<String>, channel_ids: Vec<String>, total: usize) -> Self {
        Self {
            event_id,
            job_id: job_id.into(),
            channel_ids,
            total,
            sent_count: 0,
            failed_count: 0,
            is_completed: false,
            error_details: Vec::new(),
        }
    }

    /// Counts one outcome. Returns `false` (and changes nothing) once the
    /// status is completed or every target has already been counted.
    pub fn record(&mut self, outcome: &DeliveryOutcome) -> bool {
        if self.is_completed || self.processed() >= self.total {
            return false;
        }
        match outcome.status {
            DeliveryStatus::Sent => self.sent_count += 1,
            DeliveryStatus::Failed => {
                self.failed_count += 1;
                if let Some(err) = &outcome.error {
                    self.error_details.push(format!("{}: {err}", outcome.target_id));
                }
            }
        }
        true
    }

    pub fn complete(&mut self) {
        self.is_completed = true;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn processed(&self) -> usize {
        self.sent_count + self.failed_count
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn error_details(&self) -> &[String] {
        &self.error_details
    }
}
