//! Per-target delivery executors.
//!
//! Every [`DeliveryType`] maps to exactly one executor through
//! [`Executors`]. Executors keep no mutable state between calls and are
//! invoked concurrently by the dispatcher workers.

pub mod email;
pub mod push;
pub mod simulated;
pub mod sms;
pub mod socket;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::broadcast::types::{DeliveryType, Message, NotificationTarget};

pub use email::EmailExecutor;
pub use push::PushExecutor;
pub use simulated::SimulatedProvider;
pub use sms::SmsExecutor;
pub use socket::SocketExecutor;
pub use webhook::WebhookExecutor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("{provider} service unavailable")]
    Unavailable { provider: &'static str },

    #[error("invalid {kind} address {address:?}")]
    InvalidAddress { kind: DeliveryType, address: String },

    #[error("webhook responded with status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("payload encoding failed: {0}")]
    Encode(String),

    #[error("push failed ({push}); socket fallback failed ({fallback})")]
    FallbackExhausted {
        push: Box<DeliveryError>,
        fallback: Box<DeliveryError>,
    },
}

/// A single best-effort send to one target.
#[async_trait]
pub trait DeliveryExecutor: Send + Sync {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError>;
}

/// Tunables for the delivery executors, derived from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub push_fault_rate: f64,
    pub socket_fault_rate: f64,
    pub sms_fault_rate: f64,
    pub email_fault_rate: f64,
    /// Base latency of the simulated providers. Zero disables the sleep.
    pub simulated_latency: Duration,
    pub webhook_secret: Option<String>,
    pub webhook_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            push_fault_rate: 0.10,
            socket_fault_rate: 0.05,
            sms_fault_rate: 0.08,
            email_fault_rate: 0.0,
            simulated_latency: Duration::from_millis(50),
            webhook_secret: None,
            webhook_timeout: Duration::from_secs(5),
        }
    }
}

impl DeliveryConfig {
    /// No injected faults and no simulated latency.
    pub fn reliable() -> Self {
        Self {
            push_fault_rate: 0.0,
            socket_fault_rate: 0.0,
            sms_fault_rate: 0.0,
            email_fault_rate: 0.0,
            simulated_latency: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Routes each target to the executor for its delivery type.
pub struct Executors {
    push: PushExecutor,
    socket: Arc<SocketExecutor>,
    email: EmailExecutor,
    sms: SmsExecutor,
    webhook: WebhookExecutor,
}

impl Executors {
    pub fn new(config: &DeliveryConfig) -> Self {
        // Latencies follow the relative speeds of the real providers.
        let base = config.simulated_latency;
        let socket = Arc::new(SocketExecutor::new(SimulatedProvider::new(
            "websocket",
            config.socket_fault_rate,
            base,
        )));
        Self {
            push: PushExecutor::new(
                SimulatedProvider::new("push notification", config.push_fault_rate, base.saturating_mul(2)),
                socket.clone(),
            ),
            socket,
            email: EmailExecutor::new(SimulatedProvider::new(
                "email",
                config.email_fault_rate,
                base.saturating_mul(4),
            )),
            sms: SmsExecutor::new(SimulatedProvider::new("SMS", config.sms_fault_rate, base.saturating_mul(3))),
            webhook: WebhookExecutor::new(config.webhook_secret.clone(), config.webhook_timeout),
        }
    }

    pub fn for_type(&self, delivery_type: DeliveryType) -> &dyn DeliveryExecutor {
        match delivery_type {
            DeliveryType::Push | DeliveryType::User => &self.push,
            DeliveryType::Socket => self.socket.as_ref(),
            DeliveryType::Email => &self.email,
            DeliveryType::Sms => &self.sms,
            DeliveryType::Webhook => &self.webhook,
        }
    }
}

#[async_trait]
impl DeliveryExecutor for Executors {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        self.for_type(target.delivery_type).send(target, message).await
    }
}
