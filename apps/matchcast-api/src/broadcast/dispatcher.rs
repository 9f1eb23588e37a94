//! Bounded job queue drained by a fixed pool of workers.
//!
//! Workers pull whole jobs. For each job every target gets its own task, and
//! the [`JobResult`] is only built once all of them have reported. A job
//! moves through `Queued → Dispatched → Aggregating → Completed`; callers
//! see the first state through [`Dispatcher::enqueue`] and the last through
//! [`PendingJob::wait`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use matchcast_common::id::{prefix, prefixed_ulid};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::error::DispatchError;
use super::types::{DeliveryOutcome, JobResult, Message, NotificationTarget};
use crate::delivery::DeliveryExecutor;

/// How long `enqueue` waits for a free queue slot.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `wait` waits for a queued job's result.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub submit_timeout: Duration,
    pub completion_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
            submit_timeout: SUBMIT_TIMEOUT,
            completion_timeout: COMPLETION_TIMEOUT,
        }
    }
}

/// One broadcast request's unit of work. The target list is fixed at
/// creation; workers only read it.
#[derive(Debug)]
pub struct BroadcastJob {
    pub id: String,
    pub event_id: u64,
    message: Arc<Message>,
    targets: Arc<[NotificationTarget]>,
    progress: Option<mpsc::UnboundedSender<DeliveryOutcome>>,
}

impl BroadcastJob {
    pub fn new(event_id: u64, message: Message, targets: Vec<NotificationTarget>) -> Self {
        Self {
            id: prefixed_ulid(prefix::JOB),
            event_id,
            message: Arc::new(message),
            targets: targets.into(),
            progress: None,
        }
    }

    /// Receive every outcome as soon as it is produced, before the job's
    /// aggregate result.
    pub fn stream_progress(&mut self) -> mpsc::UnboundedReceiver<DeliveryOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress = Some(tx);
        rx
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn targets(&self) -> &[NotificationTarget] {
        &self.targets
    }
}

/// A job sitting in the queue together with its completion handle.
struct QueuedJob {
    job: BroadcastJob,
    done: oneshot::Sender<JobResult>,
}

/// Handle to a job that has been accepted into the queue.
#[derive(Debug)]
pub struct PendingJob {
    pub job_id: String,
    result: oneshot::Receiver<JobResult>,
    timeout: Duration,
}

impl PendingJob {
    /// Wait for the job's result. Cancelling or timing out abandons the
    /// wait only; the deliveries keep running.
    pub async fn wait(self, cancel: &CancellationToken) -> Result<JobResult, DispatchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.result) => match res {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(_)) => Err(DispatchError::Abandoned),
                Err(_) => {
                    tracing::warn!(job_id = %self.job_id, "timed out waiting for broadcast job");
                    Err(DispatchError::CompletionTimeout)
                }
            }
        }
    }
}

pub struct Dispatcher {
    intake: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Start the worker pool. Must be called inside a tokio runtime.
    pub fn new(config: DispatcherConfig, executor: Arc<dyn DeliveryExecutor>) -> Self {
        let worker_count = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(worker_loop(id, queue.clone(), executor.clone())))
            .collect();

        tracing::info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity.max(1),
            "broadcast dispatcher started"
        );

        Self {
            intake: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
            config,
        }
    }

    /// Put a job on the queue, waiting at most the submission timeout for a
    /// free slot.
    pub async fn enqueue(
        &self,
        job: BroadcastJob,
        cancel: &CancellationToken,
    ) -> Result<PendingJob, DispatchError> {
        let sender = self.intake.read().clone().ok_or(DispatchError::Closed)?;
        let job_id = job.id.clone();
        let (done, result) = oneshot::channel();
        let queued = QueuedJob { job, done };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            res = tokio::time::timeout(self.config.submit_timeout, sender.send(queued)) => match res {
                Ok(Ok(())) => {
                    tracing::debug!(job_id = %job_id, "broadcast job queued");
                    Ok(PendingJob {
                        job_id,
                        result,
                        timeout: self.config.completion_timeout,
                    })
                }
                Ok(Err(_)) => Err(DispatchError::Closed),
                Err(_) => {
                    tracing::warn!(job_id = %job_id, "broadcast queue full, submission timed out");
                    Err(DispatchError::QueueTimeout)
                }
            }
        }
    }

    /// Enqueue and wait for the result.
    pub async fn submit(
        &self,
        job: BroadcastJob,
        cancel: &CancellationToken,
    ) -> Result<JobResult, DispatchError> {
        self.enqueue(job, cancel).await?.wait(cancel).await
    }

    /// Approximate number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.intake
            .read()
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.intake.read().is_some()
    }

    /// Stop accepting jobs, let the workers drain the queue and wait for
    /// every one of them to exit.
    pub async fn shutdown(&self) {
        drop(self.intake.write().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(err) = handle.await {
                tracing::error!(%err, "broadcast worker panicked");
            }
        }
        tracing::info!("broadcast dispatcher stopped");
    }
}

async fn worker_loop(
    id: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    executor: Arc<dyn DeliveryExecutor>,
) {
    tracing::debug!(worker = id, "broadcast worker started");

    loop {
        let next = queue.lock().await.recv().await;
        let Some(QueuedJob { job, done }) = next else {
            break;
        };

        let job_id = job.id.clone();
        let result = process_job(id, job, executor.clone()).await;

        // The waiter may have timed out or been cancelled; the work is done
        // either way.
        if done.send(result).is_err() {
            tracing::warn!(worker = id, job_id = %job_id, "no caller waiting for job result, dropping it");
        }
    }

    tracing::debug!(worker = id, "broadcast worker stopped");
}

async fn process_job(worker: usize, job: BroadcastJob, executor: Arc<dyn DeliveryExecutor>) -> JobResult {
    tracing::info!(
        worker,
        job_id = %job.id,
        event_id = job.event_id,
        targets = job.targets.len(),
        "processing broadcast job"
    );

    let mut tasks = JoinSet::new();
    let mut task_targets = HashMap::with_capacity(job.targets.len());

    for index in 0..job.targets.len() {
        let targets = job.targets.clone();
        let message = job.message.clone();
        let executor = executor.clone();
        let handle = tasks.spawn(async move {
            let target = &targets[index];
            match executor.send(target, &message).await {
                Ok(()) => DeliveryOutcome::sent(&target.id),
                Err(err) => {
                    tracing::warn!(
                        target_id = %target.id,
                        kind = %target.delivery_type,
                        error = %err,
                        "delivery failed"
                    );
                    DeliveryOutcome::failed(&target.id, err.to_string())
                }
            }
        });
        task_targets.insert(handle.id(), job.targets[index].id.clone());
    }

    let mut outcomes = Vec::with_capacity(job.targets.len());
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                let target_id = task_targets.get(&err.id()).cloned().unwrap_or_default();
                tracing::error!(target_id = %target_id, %err, "delivery task aborted");
                DeliveryOutcome::failed(target_id, format!("delivery task aborted: {err}"))
            }
        };
        if let Some(progress) = &job.progress {
            // A gone listener must not stop the job.
            let _ = progress.send(outcome.clone());
        }
        outcomes.push(outcome);
    }

    let result = JobResult::from_outcomes(outcomes);
    tracing::info!(
        worker,
        job_id = %job.id,
        sent = result.sent_count(),
        failed = result.failed_count(),
        "broadcast job completed"
    );
    result
}
