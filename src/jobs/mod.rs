//! Background jobs
//!
//! An in-process, at-least-once job queue. Handlers enqueue work after a
//! mutation commits; a small pool of worker tasks drains a bounded channel
//! and retries failures with a linear backoff. Job bodies must tolerate
//! running more than once for the same input.
//!
//! # Usage
//!
//! ```rust,ignore
//! let (queue, workers) = JobQueue::start(handler, &config.jobs);
//! queue.enqueue(Job::BustUserCache { user_id: 7 }).await?;
//! drop(queue);
//! workers.join().await;
//! ```

pub mod cache_bust;

pub use cache_bust::CacheBustHandler;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::JobsConfig;

/// Upper bound on a single retry delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A unit of background work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    BustCommentCache { comment_id: i64 },
    BustUserCache { user_id: i64 },
    BustArticleCache { article_id: i64 },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::BustCommentCache { .. } => "bust_comment_cache",
            Job::BustUserCache { .. } => "bust_user_cache",
            Job::BustArticleCache { .. } => "bust_article_cache",
        }
    }
}

/// Error types for job execution and scheduling
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Job failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// Executes jobs
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn perform(&self, job: &Job) -> Result<(), JobError>;
}

/// Attempt limit and backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &JobsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Delay after the `attempt`-th failure
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt).min(MAX_BACKOFF)
    }
}

/// Producer side of the queue; cheap to clone
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    handler: Arc<dyn JobHandler>,
    policy: RetryPolicy,
}

/// Worker tasks draining a [`JobQueue`]
pub struct JobWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl JobWorkers {
    /// Wait for every worker to finish. Workers stop once all queue
    /// handles are dropped and the channel is drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Job worker panicked: {}", e);
            }
        }
    }
}

impl JobQueue {
    /// Spawn `config.workers` workers and return the producer handle
    pub fn start(handler: Arc<dyn JobHandler>, config: &JobsConfig) -> (Self, JobWorkers) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let policy = RetryPolicy::from_config(config);

        let queue = Self {
            sender,
            handler,
            policy,
        };

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let queue = queue.worker_view();
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };
                        if let Err(e) = queue.perform_with_retry(&job).await {
                            tracing::error!(
                                worker,
                                job = job.name(),
                                ?job,
                                "Job dropped after {} attempts: {}",
                                queue.policy.max_attempts,
                                e
                            );
                        }
                    }
                    tracing::debug!(worker, "Job worker stopped");
                })
            })
            .collect();

        tracing::info!(workers = config.workers.max(1), "Job workers started");
        (queue, JobWorkers { handles })
    }

    /// Workers must not hold a sender, or the channel would never close
    fn worker_view(&self) -> Worker {
        Worker {
            handler: Arc::clone(&self.handler),
            policy: self.policy,
        }
    }

    /// Queue a job; waits while the queue is full
    pub async fn enqueue(&self, job: Job) -> Result<(), JobError> {
        tracing::debug!(job = job.name(), ?job, "Enqueued job");
        self.sender.send(job).await.map_err(|_| JobError::QueueClosed)
    }

    /// Run a job inline, once, bypassing the queue
    pub async fn run_now(&self, job: Job) -> Result<(), JobError> {
        self.handler.perform(&job).await
    }

    /// Run a job inline with the queue's retry policy
    pub async fn perform_with_retry(&self, job: &Job) -> Result<(), JobError> {
        self.worker_view().perform_with_retry(job).await
    }
}

struct Worker {
    handler: Arc<dyn JobHandler>,
    policy: RetryPolicy,
}

impl Worker {
    async fn perform_with_retry(&self, job: &Job) -> Result<(), JobError> {
        let mut attempt = 1;
        loop {
            tracing::debug!(job = job.name(), attempt, "Running job");
            match self.handler.perform(job).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.policy.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        job = job.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Job failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
