//! Broadcast entry point: dedup, resolve, enqueue, record.
//!
//! The request path returns as soon as the job is accepted into the
//! dispatcher. Delivery progress is only observable through the status
//! publisher.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use utoipa::ToSchema;

use super::dispatcher::{BroadcastJob, Dispatcher, PendingJob};
use super::error::BroadcastError;
use super::idempotency::{GuardDecision, IdempotencyGuard};
use super::registry::SubscriptionRegistry;
use super::types::{BroadcastStatus, DeliveryOutcome, Message};
use crate::db::FanRepository;
use crate::gateway::StatusPublisher;
use crate::models::broadcast_record::RecordStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BroadcastOutcome {
    /// A broadcast was already recorded for this event; nothing was sent.
    AlreadySent {
        event_id: u64,
        content_hash: String,
        status: RecordStatus,
    },
    /// None of the channels has subscribers.
    NoTargets { event_id: u64 },
    /// The job is queued; delivery continues in the background.
    Dispatched {
        event_id: u64,
        job_id: String,
        target_count: usize,
        content_hash: String,
    },
}

pub struct BroadcastOrchestrator {
    guard: IdempotencyGuard,
    registry: Arc<SubscriptionRegistry>,
    fans: Arc<dyn FanRepository>,
    dispatcher: Arc<Dispatcher>,
    publisher: Arc<StatusPublisher>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

/// Event IDs are positive match IDs from the sports-data feed, either bare
/// (`42`) or prefixed (`match_42`).
pub fn parse_event_id(raw: &str) -> Result<u64, BroadcastError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("match_").unwrap_or(trimmed);
    match digits.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(BroadcastError::InvalidInput(format!("invalid event ID: {raw:?}"))),
    }
}

impl BroadcastOrchestrator {
    pub fn new(
        guard: IdempotencyGuard,
        registry: Arc<SubscriptionRegistry>,
        fans: Arc<dyn FanRepository>,
        dispatcher: Arc<Dispatcher>,
        publisher: Arc<StatusPublisher>,
    ) -> Self {
        Self {
            guard,
            registry,
            fans,
            dispatcher,
            publisher,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn broadcast(
        &self,
        event_id: &str,
        message: Message,
        channel_ids: &[String],
    ) -> Result<BroadcastOutcome, BroadcastError> {
        let cancel = self.shutdown.child_token();
        self.broadcast_with_cancel(event_id, message, channel_ids, &cancel)
            .await
    }

    /// `cancel` only bounds the wait for a queue slot.
    pub async fn broadcast_with_cancel(
        &self,
        event_id: &str,
        message: Message,
        channel_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        let event_id = parse_event_id(event_id)?;
        if message.content.trim().is_empty() {
            return Err(BroadcastError::InvalidInput("message content is required".to_string()));
        }

        let fingerprint = IdempotencyGuard::fingerprint(&message);
        if let GuardDecision::AlreadySent(record) = self.guard.check(event_id).await? {
            tracing::info!(event_id, "broadcast already sent for this event");
            return Ok(BroadcastOutcome::AlreadySent {
                event_id,
                content_hash: record.content_hash,
                status: record.status,
            });
        }

        let mut channels: Vec<String> = Vec::with_capacity(channel_ids.len());
        for channel in channel_ids {
            if !channels.contains(channel) {
                channels.push(channel.clone());
            }
        }

        let mut targets = Vec::new();
        for channel in &channels {
            self.registry.load_channel(self.fans.as_ref(), channel).await?;
            targets.extend(
                self.registry
                    .resolve(channel)
                    .into_iter()
                    .map(|t| t.with_metadata("match_id", event_id.to_string())),
            );
        }

        if targets.is_empty() {
            tracing::info!(event_id, channels = ?channels, "no subscribers for broadcast");
            return Ok(BroadcastOutcome::NoTargets { event_id });
        }

        let target_count = targets.len();
        let mut job = BroadcastJob::new(event_id, message, targets);
        let job_id = job.id.clone();
        let progress = job.stream_progress();

        let pending = self.dispatcher.enqueue(job, cancel).await?;

        // Queued counts as sent for dedup purposes. The record must exist
        // before the tracker can mark it.
        let recorded = self.guard.record(event_id, fingerprint.clone()).await;

        let status = BroadcastStatus::new(event_id, job_id.clone(), channels, target_count);
        self.tracker.spawn(track_job(
            self.publisher.clone(),
            self.guard.clone(),
            status,
            progress,
            pending,
            self.shutdown.child_token(),
        ));

        if let Err(err) = recorded {
            tracing::error!(event_id, job_id = %job_id, %err, "broadcast queued but not recorded");
            return Err(err);
        }

        tracing::info!(event_id, job_id = %job_id, targets = target_count, "broadcast dispatched");
        Ok(BroadcastOutcome::Dispatched {
            event_id,
            job_id,
            target_count,
            content_hash: fingerprint,
        })
    }

    /// Drain the dispatcher, then wait for every status tracker to publish
    /// its final snapshot.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.shutdown.cancel();
    }
}

/// Publishes a snapshot per outcome, then the completed snapshot, then
/// moves the record to its final status.
async fn track_job(
    publisher: Arc<StatusPublisher>,
    guard: IdempotencyGuard,
    mut status: BroadcastStatus,
    mut progress: mpsc::UnboundedReceiver<DeliveryOutcome>,
    pending: PendingJob,
    cancel: CancellationToken,
) {
    let event_id = status.event_id;
    let job_id = pending.job_id.clone();

    let stream = async {
        while let Some(outcome) = progress.recv().await {
            if status.record(&outcome) {
                publisher.publish(&status).await;
            }
        }
    };
    let ((), result) = tokio::join!(stream, pending.wait(&cancel));

    status.complete();
    publisher.publish(&status).await;

    if let Err(err) = &result {
        tracing::warn!(event_id, job_id = %job_id, %err, "broadcast did not report a result in time");
    }

    // The progress stream has ended, so every outcome the job produced is
    // counted. Per-target failures still count as a completed broadcast.
    let final_status = if status.processed() == status.total() {
        RecordStatus::Completed
    } else {
        tracing::warn!(
            event_id,
            job_id = %job_id,
            missing = status.total() - status.processed(),
            "broadcast ended with unreported targets"
        );
        RecordStatus::Failed
    };

    tracing::info!(
        event_id,
        job_id = %job_id,
        sent = status.sent_count(),
        failed = status.failed_count(),
        "broadcast completed"
    );

    if let Err(err) = guard.mark(event_id, final_status).await {
        tracing::warn!(event_id, %err, "failed to update broadcast record");
    }
}
