//! Channel → subscriber registry.
//!
//! Duplicate subscriptions are kept: a fan registered twice on a channel
//! is delivered to twice. Only the same stored subscription seen twice (once
//! from the fan source, once from intake during a load) is collapsed.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::types::{NotificationTarget, Subscription};
use crate::db::{FanRepository, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoadState {
    #[default]
    Unloaded,
    /// A fetch from the fan source is in flight.
    Loading,
    Loaded,
}

#[derive(Debug, Default)]
struct Channel {
    subs: Vec<Subscription>,
    state: LoadState,
}

/// Shared registry of channel subscriptions.
///
/// Each channel entry holds its subscriptions and load state under the same
/// `DashMap` shard lock, so intake and the end of a load never interleave.
/// Readers get owned snapshots; later registrations never leak into an
/// already-resolved target list.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: DashMap<String, Channel>,
    /// Single-flight fetch per channel.
    load_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscription to its channel unconditionally.
    pub fn add_subscription(&self, sub: Subscription) {
        self.channels
            .entry(sub.channel_id.clone())
            .or_default()
            .subs
            .push(sub);
    }

    /// Add a subscription that has just been written to the fan source.
    ///
    /// Appended when the channel is loaded or being loaded; skipped while it
    /// is unloaded, since the first load reads it from the source. Returns
    /// whether it was appended.
    pub fn track_subscription(&self, sub: Subscription) -> bool {
        let Some(mut channel) = self.channels.get_mut(&sub.channel_id) else {
            return false;
        };
        if channel.state == LoadState::Unloaded {
            return false;
        }
        channel.subs.push(sub);
        true
    }

    /// Snapshot of the delivery targets currently registered on a channel.
    pub fn resolve(&self, channel_id: &str) -> Vec<NotificationTarget> {
        self.channels
            .get(channel_id)
            .map(|c| c.subs.iter().map(Subscription::to_target).collect())
            .unwrap_or_default()
    }

    /// Populate a channel from the fan source the first time it is needed.
    ///
    /// Subsequent calls are no-ops; returns the number of subscriptions the
    /// channel holds afterwards. Loads of different channels run
    /// independently.
    pub async fn load_channel(
        &self,
        source: &dyn FanRepository,
        channel_id: &str,
    ) -> Result<usize, RepositoryError> {
        if self.is_loaded(channel_id) {
            return Ok(self.subscription_count(channel_id));
        }

        let lock = self
            .load_locks
            .entry(channel_id.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().await;
        if self.is_loaded(channel_id) {
            return Ok(self.subscription_count(channel_id));
        }

        self.channels.entry(channel_id.to_string()).or_default().state = LoadState::Loading;

        let fans = match source.get_by_channel(channel_id).await {
            Ok(fans) => fans,
            Err(err) => {
                // Intake during the failed attempt stays; the next load
                // collapses it against the refetch.
                if let Some(mut channel) = self.channels.get_mut(channel_id) {
                    channel.state = LoadState::Unloaded;
                }
                return Err(err);
            }
        };
        let fetched = fans.len();

        let count = {
            let mut channel = self.channels.entry(channel_id.to_string()).or_default();
            let added_early = std::mem::take(&mut channel.subs);
            let mut subs: Vec<Subscription> = fans.into_iter().map(Subscription::from).collect();
            let known: HashSet<String> = subs.iter().map(|s| s.id.clone()).collect();
            subs.extend(added_early.into_iter().filter(|s| !known.contains(&s.id)));
            channel.subs = subs;
            channel.state = LoadState::Loaded;
            channel.subs.len()
        };

        tracing::debug!(channel_id, fetched, subscriptions = count, "subscription channel loaded");
        Ok(count)
    }

    pub fn is_loaded(&self, channel_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|c| c.state == LoadState::Loaded)
    }

    pub fn subscription_count(&self, channel_id: &str) -> usize {
        self.channels.get(channel_id).map(|c| c.subs.len()).unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total subscriptions across all channels.
    pub fn len(&self) -> usize {
        self.channels.iter().map(|e| e.value().subs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use matchcast_common::id::{prefix, prefixed_ulid};

    use super::*;
    use crate::broadcast::types::DeliveryType;
    use crate::db::MemoryFanRepository;
    use crate::models::fan::Fan;

    fn sub(subscriber: &str, channel: &str, kind: DeliveryType) -> Subscription {
        Subscription {
            id: prefixed_ulid(prefix::SUBSCRIPTION),
            subscriber_id: subscriber.to_string(),
            channel_id: channel.to_string(),
            notification_type: kind,
            address: format!("{subscriber}-addr"),
        }
    }

    #[test]
    fn resolve_unknown_channel_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.resolve("nobody").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn add_and_resolve_in_order() {
        let registry = SubscriptionRegistry::new();
        registry.add_subscription(sub("f1", "TeamA", DeliveryType::Push));
        registry.add_subscription(sub("f2", "TeamA", DeliveryType::Email));
        registry.add_subscription(sub("f3", "TeamB", DeliveryType::Sms));

        let targets = registry.resolve("TeamA");
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, "f1");
        assert_eq!(targets[1].delivery_type, DeliveryType::Email);
        assert_eq!(registry.channel_count(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_subscriptions_are_kept() {
        let registry = SubscriptionRegistry::new();
        registry.add_subscription(sub("f1", "TeamA", DeliveryType::Push));
        registry.add_subscription(sub("f1", "TeamA", DeliveryType::Push));
        assert_eq!(registry.resolve("TeamA").len(), 2);
    }

    #[test]
    fn resolved_list_is_a_snapshot() {
        let registry = SubscriptionRegistry::new();
        registry.add_subscription(sub("f1", "TeamA", DeliveryType::Push));
        let before = registry.resolve("TeamA");
        registry.add_subscription(sub("f2", "TeamA", DeliveryType::Push));
        assert_eq!(before.len(), 1);
        assert_eq!(registry.resolve("TeamA").len(), 2);
    }

    #[tokio::test]
    async fn load_channel_fetches_once_and_keeps_early_adds() {
        let repo = MemoryFanRepository::with_fans([
            Fan::new("f1", "TeamA", DeliveryType::Push, "d1"),
            Fan::new("f2", "TeamA", DeliveryType::Email, "f2@example.com"),
        ]);
        let registry = SubscriptionRegistry::new();
        registry.add_subscription(sub("early", "TeamA", DeliveryType::Sms));

        assert_eq!(registry.load_channel(&repo, "TeamA").await.unwrap(), 3);
        assert!(registry.is_loaded("TeamA"));

        let targets = registry.resolve("TeamA");
        assert_eq!(targets[0].id, "f1");
        assert_eq!(targets[2].id, "early");

        // A second load does not refetch (and so does not duplicate).
        assert_eq!(registry.load_channel(&repo, "TeamA").await.unwrap(), 3);
    }

    #[test]
    fn concurrent_adds_are_all_recorded() {
        let registry = std::sync::Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        registry.add_subscription(sub(&format!("f{i}-{j}"), "TeamA", DeliveryType::Push));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.resolve("TeamA").len(), 400);
    }

    /// Reads its snapshot from the inner store, then stalls before
    /// returning it. Channels listed in `hang` never return.
    struct SlowFans {
        inner: MemoryFanRepository,
        delay: Duration,
        hang: Vec<&'static str>,
    }

    #[async_trait]
    impl FanRepository for SlowFans {
        async fn create(&self, fan: &Fan) -> Result<(), RepositoryError> {
            self.inner.create(fan).await
        }

        async fn get_by_channel(&self, channel_id: &str) -> Result<Vec<Fan>, RepositoryError> {
            if self.hang.iter().any(|h| *h == channel_id) {
                std::future::pending::<()>().await;
            }
            let snapshot = self.inner.get_by_channel(channel_id).await?;
            tokio::time::sleep(self.delay).await;
            Ok(snapshot)
        }

        async fn get_by_user(&self, user_id: &str) -> Result<Vec<Fan>, RepositoryError> {
            self.inner.get_by_user(user_id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_stored_during_load_is_not_lost() {
        let fans = Arc::new(SlowFans {
            inner: MemoryFanRepository::with_fans([Fan::new("f1", "TeamB", DeliveryType::Sms, "+5511999990000")]),
            delay: Duration::from_millis(300),
            hang: vec![],
        });
        let registry = Arc::new(SubscriptionRegistry::new());

        let load = {
            let (registry, fans) = (registry.clone(), fans.clone());
            tokio::spawn(async move { registry.load_channel(fans.as_ref(), "TeamB").await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!registry.is_loaded("TeamB"));

        // Same order as subscription intake: store first, then registry.
        let late = Fan::new("f2", "TeamB", DeliveryType::Socket, "f2");
        fans.create(&late).await.unwrap();
        assert!(registry.track_subscription(Subscription::from(late)));

        assert_eq!(load.await.unwrap().unwrap(), 2);
        let ids: Vec<String> = registry.resolve("TeamB").into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["f1", "f2"]);
    }

    #[tokio::test]
    async fn subscription_seen_by_fetch_and_intake_is_kept_once() {
        let fan = Fan::new("f1", "TeamA", DeliveryType::Push, "d1");
        let repo = MemoryFanRepository::with_fans([fan.clone()]);
        let registry = SubscriptionRegistry::new();

        // Loading state without a fetch yet: intake is appended.
        registry.channels.entry("TeamA".to_string()).or_default().state = LoadState::Loading;
        assert!(registry.track_subscription(Subscription::from(fan)));

        registry.channels.get_mut("TeamA").unwrap().state = LoadState::Unloaded;
        assert_eq!(registry.load_channel(&repo, "TeamA").await.unwrap(), 1);
    }

    #[test]
    fn intake_on_unloaded_channel_is_left_to_the_load() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.track_subscription(sub("f1", "TeamA", DeliveryType::Push)));
        assert!(registry.resolve("TeamA").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_load_does_not_block_other_channels() {
        let fans = Arc::new(SlowFans {
            inner: MemoryFanRepository::with_fans([Fan::new("f1", "TeamB", DeliveryType::Sms, "+5511999990000")]),
            delay: Duration::ZERO,
            hang: vec!["TeamA"],
        });
        let registry = Arc::new(SubscriptionRegistry::new());

        let stalled = {
            let (registry, fans) = (registry.clone(), fans.clone());
            tokio::spawn(async move { registry.load_channel(fans.as_ref(), "TeamA").await })
        };
        tokio::task::yield_now().await;

        let loaded = tokio::time::timeout(
            Duration::from_secs(1),
            registry.load_channel(fans.as_ref(), "TeamB"),
        )
        .await
        .expect("TeamB load waited on TeamA");
        assert_eq!(loaded.unwrap(), 1);
        assert!(!registry.is_loaded("TeamA"));
        stalled.abort();
    }

    #[tokio::test]
    async fn failed_load_can_be_retried() {
        struct Down;

        #[async_trait]
        impl FanRepository for Down {
            async fn create(&self, _fan: &Fan) -> Result<(), RepositoryError> {
                Ok(())
            }
            async fn get_by_channel(&self, _channel_id: &str) -> Result<Vec<Fan>, RepositoryError> {
                Err(RepositoryError::Unavailable("down".into()))
            }
            async fn get_by_user(&self, _user_id: &str) -> Result<Vec<Fan>, RepositoryError> {
                Ok(vec![])
            }
        }

        let registry = SubscriptionRegistry::new();
        assert!(registry.load_channel(&Down, "TeamA").await.is_err());
        assert!(!registry.is_loaded("TeamA"));

        let repo = MemoryFanRepository::with_fans([Fan::new("f1", "TeamA", DeliveryType::Push, "d1")]);
        assert_eq!(registry.load_channel(&repo, "TeamA").await.unwrap(), 1);
        assert!(registry.is_loaded("TeamA"));
    }
}
