use std::sync::Arc;

use async_trait::async_trait;

use super::{DeliveryError, DeliveryExecutor, SimulatedProvider};
use crate::broadcast::types::{DeliveryType, Message, NotificationTarget};

/// Push notification with a single fallback hop to socket delivery.
pub struct PushExecutor {
    provider: SimulatedProvider,
    fallback: Arc<dyn DeliveryExecutor>,
}

impl PushExecutor {
    pub fn new(provider: SimulatedProvider, fallback: Arc<dyn DeliveryExecutor>) -> Self {
        Self { provider, fallback }
    }
}

#[async_trait]
impl DeliveryExecutor for PushExecutor {
    async fn send(&self, target: &NotificationTarget, message: &Message) -> Result<(), DeliveryError> {
        tracing::debug!(target_id = %target.id, device = %target.address, "sending push notification");

        let push_err = match self.provider.attempt().await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        tracing::info!(
            target_id = %target.id,
            error = %push_err,
            "push failed, falling back to socket"
        );

        // Same target and address, delivered as a socket message.
        let fallback_target = NotificationTarget {
            delivery_type: DeliveryType::Socket,
            ..target.clone()
        };
        self.fallback
            .send(&fallback_target, message)
            .await
            .map_err(|fallback_err| DeliveryError::FallbackExhausted {
                push: Box::new(push_err),
                fallback: Box::new(fallback_err),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// Records what it was asked to deliver.
    struct RecordingFallback {
        calls: AtomicUsize,
        seen: Mutex<Vec<NotificationTarget>>,
        fail: bool,
    }

    impl RecordingFallback {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl DeliveryExecutor for RecordingFallback {
        async fn send(&self, target: &NotificationTarget, _message: &Message) -> Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(target.clone());
            if self.fail {
                Err(DeliveryError::Unavailable { provider: "websocket" })
            } else {
                Ok(())
            }
        }
    }

    fn target() -> NotificationTarget {
        NotificationTarget::new("fan1", DeliveryType::Push, "device-1")
    }

    fn message() -> Message {
        Message::new("t", "c")
    }

    #[tokio::test]
    async fn successful_push_skips_fallback() {
        let fallback = RecordingFallback::new(false);
        let push = PushExecutor::new(SimulatedProvider::new("push", 0.0, Duration::ZERO), fallback.clone());
        push.send(&target(), &message()).await.unwrap();
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_push_uses_socket_with_same_address() {
        let fallback = RecordingFallback::new(false);
        let push = PushExecutor::new(SimulatedProvider::new("push", 1.0, Duration::ZERO), fallback.clone());
        push.send(&target(), &message()).await.unwrap();

        let seen = fallback.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, "fan1");
        assert_eq!(seen[0].address, "device-1");
        assert_eq!(seen[0].delivery_type, DeliveryType::Socket);
    }

    #[tokio::test]
    async fn both_failing_surfaces_fallback_exhausted() {
        let fallback = RecordingFallback::new(true);
        let push = PushExecutor::new(SimulatedProvider::new("push", 1.0, Duration::ZERO), fallback.clone());
        let err = push.send(&target(), &message()).await.unwrap_err();
        match err {
            DeliveryError::FallbackExhausted { push, fallback } => {
                assert_eq!(*push, DeliveryError::Unavailable { provider: "push" });
                assert_eq!(*fallback, DeliveryError::Unavailable { provider: "websocket" });
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }
}
