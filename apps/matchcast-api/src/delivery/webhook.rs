use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;

use super::{DeliveryError, DeliveryExecutor};
use crate::broadcast::types::{Message, NotificationTarget};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Metadata key that overrides the configured signing secret for a target.
pub const SECRET_METADATA_KEY: &str = "signature_secret";

/// POSTs a JSON payload to the target URL. Any non-2xx status or transport
/// error is a failed delivery; there is no retry.
pub struct WebhookExecutor {
    http_client: Client,
    secret: Option<String>,
    timeout: Duration,
}

impl WebhookExecutor {
    pub fn new(secret: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::new(),
            secret,
            timeout,
        }
    }
}

/// Hex HMAC-SHA256 of the payload.
pub fn sign_payload(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// The request body sent to webhook targets. The signing secret never
/// leaves the process.
pub fn build_payload(target: &NotificationTarget, message: &Message) -> serde_json::Value {
    let metadata: serde_json::Map<String, serde_json::Value> = target
        .metadata
        .iter()
        .filter(|(k, _)| k.as_str() != SECRET_METADATA_KEY)
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();

    json!({
        "target_id": target.id,
        "title": message.title,
        "message": message.content,
        "metadata": metadata,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

#[async_trait]
impl DeliveryExecutor for WebhookExecutor {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        let payload = build_payload(target, message);
        let body =
            serde_json::to_string(&payload).map_err(|e| DeliveryError::Encode(e.to_string()))?;

        let mut request = self
            .http_client
            .post(&target.address)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");

        let secret = target.meta(SECRET_METADATA_KEY).or(self.secret.as_deref());
        if let Some(secret) = secret {
            let signature = sign_payload(&body, secret);
            request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
        }

        tracing::debug!(target_id = %target.id, url = %target.address, "sending webhook");

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
