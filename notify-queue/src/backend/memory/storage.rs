use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::debug;

use crate::{
    QueueResult, QueueError, JobId, JobStatus, NotificationJob, NotificationRequest,
    QueueEvent, QueueStats, backend::{QueueStore, BoxStream},
};

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Jobs, their enqueue order and the in-flight set live under one lock
#[derive(Debug, Default)]
struct StoreState {
    jobs: HashMap<JobId, NotificationJob>,
    order: VecDeque<JobId>,
    in_flight: HashSet<JobId>,
}

impl StoreState {
    /// Fetch a job that must currently be processing
    fn processing_mut(&mut self, job_id: &JobId, to: &'static str) -> QueueResult<&mut NotificationJob> {
        let record = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))?;

        if record.status != JobStatus::Processing {
            return Err(QueueError::InvalidTransition {
                job_id: job_id.clone(),
                from: record.status.name(),
                to,
            });
        }

        Ok(record)
    }
}

/// In-memory queue store. Jobs do not survive a restart.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,

    /// Event broadcaster for observability
    event_broadcaster: broadcast::Sender<QueueEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a store whose event channel buffers `capacity` events per subscriber
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (event_broadcaster, _) = broadcast::channel(capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            event_broadcaster,
        }
    }

    /// IDs currently held by a dispatch
    pub fn in_flight(&self) -> Vec<JobId> {
        self.state.read().in_flight.iter().cloned().collect()
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is not an error
        let _ = self.event_broadcaster.send(event);
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn enqueue(&self, request: NotificationRequest) -> QueueResult<JobId> {
        let job_id = JobId::new();
        let record = NotificationJob::new(job_id.clone(), request);
        let channel = record.channel;
        let at = record.created_at;

        {
            let mut state = self.state.write();
            state.jobs.insert(job_id.clone(), record);
            state.order.push_back(job_id.clone());
        }

        self.emit(QueueEvent::Enqueued {
            job_id: job_id.clone(),
            channel,
            at,
        });

        Ok(job_id)
    }

    async fn select_eligible(&self, now: DateTime<Utc>) -> QueueResult<Vec<NotificationJob>> {
        let state = self.state.read();

        let eligible = state
            .order
            .iter()
            .filter(|job_id| !state.in_flight.contains(*job_id))
            .filter_map(|job_id| state.jobs.get(job_id))
            .filter(|record| record.is_eligible(now))
            .cloned()
            .collect();

        Ok(eligible)
    }

    async fn mark_processing(&self, job_id: &JobId) -> QueueResult<NotificationJob> {
        let claimed = {
            let mut state = self.state.write();

            if state.in_flight.contains(job_id) {
                return Err(QueueError::AlreadyInFlight(job_id.clone()));
            }

            let record = state
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))?;

            if record.status != JobStatus::Pending {
                return Err(QueueError::InvalidTransition {
                    job_id: job_id.clone(),
                    from: record.status.name(),
                    to: JobStatus::Processing.name(),
                });
            }

            record.status = JobStatus::Processing;
            record.touch();
            let claimed = record.clone();
            state.in_flight.insert(job_id.clone());
            claimed
        };

        self.emit(QueueEvent::Dispatched {
            job_id: job_id.clone(),
            attempt: claimed.retry_count + 1,
            at: claimed.updated_at,
        });

        Ok(claimed)
    }

    async fn mark_done(&self, job_id: &JobId) -> QueueResult<()> {
        {
            let mut state = self.state.write();
            let record = state.processing_mut(job_id, JobStatus::Completed.name())?;
            record.status = JobStatus::Completed;

            state.in_flight.remove(job_id);
            state.jobs.remove(job_id);
            state.order.retain(|id| id != job_id);
        }

        debug!("Removed completed job {}", job_id);
        self.emit(QueueEvent::Completed {
            job_id: job_id.clone(),
            at: Utc::now(),
        });

        Ok(())
    }

    async fn mark_failed_retry(
        &self,
        job_id: &JobId,
        next_retry_at: DateTime<Utc>,
        error: String,
    ) -> QueueResult<NotificationJob> {
        let now = Utc::now();

        let updated = {
            let mut state = self.state.write();
            let record = state.processing_mut(job_id, JobStatus::Pending.name())?;

            let next = record.retry_count + 1;
            if next >= record.max_retries {
                return Err(QueueError::RetriesExhausted {
                    job_id: job_id.clone(),
                    retry_count: record.retry_count,
                    max_retries: record.max_retries,
                });
            }
            if next_retry_at <= now {
                return Err(QueueError::RetryNotInFuture(job_id.clone()));
            }

            record.retry_count = next;
            record.next_retry_at = Some(next_retry_at);
            record.status = JobStatus::Pending;
            record.last_error = Some(error.clone());
            record.touch();
            let updated = record.clone();

            state.in_flight.remove(job_id);
            updated
        };

        self.emit(QueueEvent::Retrying {
            job_id: job_id.clone(),
            retry_count: updated.retry_count,
            retry_at: next_retry_at,
            error,
            at: now,
        });

        Ok(updated)
    }

    async fn mark_failed_terminal(&self, job_id: &JobId, error: String) -> QueueResult<NotificationJob> {
        let updated = {
            let mut state = self.state.write();
            let record = state.processing_mut(job_id, JobStatus::Failed.name())?;

            let next = record.retry_count + 1;
            if next < record.max_retries {
                return Err(QueueError::RetriesRemaining {
                    job_id: job_id.clone(),
                    retry_count: record.retry_count,
                    max_retries: record.max_retries,
                });
            }

            record.retry_count = next.min(record.max_retries);
            record.next_retry_at = None;
            record.status = JobStatus::Failed;
            record.last_error = Some(error.clone());
            record.touch();
            let updated = record.clone();

            state.in_flight.remove(job_id);
            updated
        };

        self.emit(QueueEvent::Failed {
            job_id: job_id.clone(),
            retry_count: updated.retry_count,
            error,
            at: updated.updated_at,
        });

        Ok(updated)
    }

    async fn stats(&self) -> QueueResult<QueueStats> {
        let state = self.state.read();
        Ok(QueueStats::from_jobs(state.jobs.values()))
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<NotificationJob> {
        self.state
            .read()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))
    }

    async fn failed_jobs(&self) -> QueueResult<Vec<NotificationJob>> {
        let state = self.state.read();

        Ok(state
            .order
            .iter()
            .filter_map(|job_id| state.jobs.get(job_id))
            .filter(|record| record.status == JobStatus::Failed)
            .cloned()
            .collect())
    }

    fn event_stream(&self) -> BoxStream<QueueEvent> {
        let receiver = self.event_broadcaster.subscribe();
        let stream = BroadcastStream::new(receiver)
            .filter_map(|result| result.ok());

        Box::pin(stream)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
