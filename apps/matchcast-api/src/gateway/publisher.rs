//! Live broadcast status fan-out to connected observers.
//!
//! Registration and removal take the write side of the observer lock;
//! publishing holds the read side while it writes to every observer in
//! parallel. New registrations therefore queue behind an in-flight publish,
//! and one slow observer delays the end of a publish by at most
//! `write_timeout`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use matchcast_common::id::{prefix, prefixed_ulid};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use super::events::AdminMessage;
use crate::broadcast::types::BroadcastStatus;

/// Upper bound on a single observer write.
pub const OBSERVER_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("observer connection closed")]
    Closed,

    #[error("observer write failed: {0}")]
    Transport(String),
}

/// The transport side of an observer connection.
#[async_trait]
pub trait ObserverSink: Send + Sync {
    async fn write_json(&self, payload: &Value) -> Result<(), ObserverError>;
    async fn close(&self);
}

pub struct StatusPublisher {
    observers: RwLock<HashMap<String, Arc<dyn ObserverSink>>>,
    write_timeout: Duration,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new(OBSERVER_WRITE_TIMEOUT)
    }
}

impl StatusPublisher {
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            write_timeout,
        }
    }

    /// Returns the ID used to unregister the observer later.
    pub async fn register_observer(&self, sink: Arc<dyn ObserverSink>) -> String {
        self.register_observer_with_id(prefixed_ulid(prefix::OBSERVER), sink)
            .await
    }

    /// Register under an ID the caller already handed to the peer.
    pub async fn register_observer_with_id(&self, id: String, sink: Arc<dyn ObserverSink>) -> String {
        self.observers.write().await.insert(id.clone(), sink);
        tracing::debug!(observer_id = %id, "observer registered");
        id
    }

    /// Returns `false` if the observer was already gone.
    pub async fn unregister_observer(&self, observer_id: &str) -> bool {
        let removed = self.observers.write().await.remove(observer_id).is_some();
        if removed {
            tracing::debug!(observer_id, "observer unregistered");
        }
        removed
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Write a status snapshot to every observer. Observers whose write
    /// fails or times out are unregistered and closed. Returns how many
    /// observers received the snapshot.
    pub async fn publish(&self, status: &BroadcastStatus) -> usize {
        let message = match AdminMessage::status(status).and_then(|m| serde_json::to_value(&m)) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(%err, job_id = %status.job_id, "failed to encode broadcast status");
                return 0;
            }
        };

        let (delivered, failed) = {
            let observers = self.observers.read().await;
            let writes = observers.iter().map(|(id, sink)| {
                let message = &message;
                async move {
                    match tokio::time::timeout(self.write_timeout, sink.write_json(message)).await {
                        Ok(Ok(())) => None,
                        Ok(Err(err)) => {
                            tracing::warn!(observer_id = %id, %err, "failed to send broadcast status to observer");
                            Some(id.clone())
                        }
                        Err(_) => {
                            tracing::warn!(observer_id = %id, "observer write timed out");
                            Some(id.clone())
                        }
                    }
                }
            });
            let failed: Vec<String> = join_all(writes).await.into_iter().flatten().collect();
            (observers.len() - failed.len(), failed)
        };

        if !failed.is_empty() {
            let removed: Vec<Arc<dyn ObserverSink>> = {
                let mut observers = self.observers.write().await;
                failed.iter().filter_map(|id| observers.remove(id)).collect()
            };
            for sink in removed {
                sink.close().await;
            }
        }

        delivered
    }
}
