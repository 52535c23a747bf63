pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use std::pin::Pin;

use crate::{
    QueueResult, JobId, NotificationJob, NotificationRequest, QueueEvent, QueueStats,
};

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Storage primitives for the notification queue.
///
/// Mark operations are the only status mutators and each is atomic with
/// respect to the others.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a pending job with `retry_count = 0`
    async fn enqueue(&self, request: NotificationRequest) -> QueueResult<JobId>;

    /// Snapshot of pending, not in-flight jobs whose retry time has passed,
    /// in enqueue order
    async fn select_eligible(&self, now: DateTime<Utc>) -> QueueResult<Vec<NotificationJob>>;

    /// Claim a pending job for dispatch (check-and-set on the in-flight set)
    async fn mark_processing(&self, job_id: &JobId) -> QueueResult<NotificationJob>;

    /// Delivered: `processing -> completed`, job removed
    async fn mark_done(&self, job_id: &JobId) -> QueueResult<()>;

    /// Failed with attempts left: `processing -> pending`, `retry_count += 1`
    async fn mark_failed_retry(
        &self,
        job_id: &JobId,
        next_retry_at: DateTime<Utc>,
        error: String,
    ) -> QueueResult<NotificationJob>;

    /// Failed with no attempts left: `processing -> failed`, `retry_count += 1`
    async fn mark_failed_terminal(&self, job_id: &JobId, error: String) -> QueueResult<NotificationJob>;

    /// Point-in-time aggregate counts
    async fn stats(&self) -> QueueResult<QueueStats>;

    /// Current record of a job still held by the store
    async fn get(&self, job_id: &JobId) -> QueueResult<NotificationJob>;

    /// Terminally failed jobs, in enqueue order
    async fn failed_jobs(&self) -> QueueResult<Vec<NotificationJob>>;

    /// Event stream for observability (boxed for stable Rust)
    fn event_stream(&self) -> BoxStream<QueueEvent>;
}
