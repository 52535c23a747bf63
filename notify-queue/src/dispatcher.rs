use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    backend::{memory::MemoryStore, BoxStream, QueueStore},
    escalation::{EscalationSink, TerminalFailure, TracingSink},
    observability::LiveMetrics,
    retry::RetryPolicy,
    sender::ChannelSender,
    Channel, EscalationError, JobId, NotificationJob, NotificationRequest, QueueConfig,
    QueueError, QueueEvent, QueueResult, QueueStats, SendError, Variables,
};

/// Minimum delays (ms) tried in turn when rescheduling a failed job
const RESCHEDULE_FLOORS_MS: [i64; 3] = [1, 1_000, 60_000];

/// Handle for managing the dispatcher loop
pub struct DispatcherHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<QueueResult<()>>,
}

impl DispatcherHandle {
    /// Stop ticking. Sends already in flight run to completion on their own.
    pub async fn shutdown(self) -> QueueResult<()> {
        let _ = self.shutdown_tx.send(());
        self.join_handle
            .await
            .map_err(|e| QueueError::Internal(format!("Dispatcher join error: {}", e)))?
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

/// Notification delivery queue: store, scheduler and dispatcher in one handle
pub struct NotificationQueue<S: QueueStore + ?Sized = MemoryStore> {
    store: Arc<S>,
    sender: Arc<dyn ChannelSender>,
    sink: Arc<dyn EscalationSink>,
    metrics: Arc<LiveMetrics>,
    permits: Arc<Semaphore>,
    config: QueueConfig,
}

impl NotificationQueue<MemoryStore> {
    /// In-memory queue sized from `config`
    pub fn in_memory(sender: impl ChannelSender + 'static, config: QueueConfig) -> QueueResult<Self> {
        let store = MemoryStore::with_event_capacity(config.event_capacity);
        Self::new(store, sender).with_config(config)
    }
}

impl<S: QueueStore + 'static> NotificationQueue<S> {
    /// Create a queue with default configuration and a logging escalation sink
    pub fn new(store: S, sender: impl ChannelSender + 'static) -> Self {
        let config = QueueConfig::default();
        Self {
            store: Arc::new(store),
            sender: Arc::new(sender),
            sink: Arc::new(TracingSink),
            metrics: Arc::new(LiveMetrics::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_sends)),
            config,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        self.permits = Arc::new(Semaphore::new(config.max_concurrent_sends));
        self.config = config;
        Ok(self)
    }

    pub fn with_sender(mut self, sender: impl ChannelSender + 'static) -> Self {
        self.sender = Arc::new(sender);
        self
    }

    /// Replace the escalation sink
    pub fn with_sink(mut self, sink: impl EscalationSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Enqueue a notification. Never rejects on content or queue size.
    #[instrument(skip_all, fields(channel = %request.channel))]
    pub async fn enqueue(&self, request: NotificationRequest) -> QueueResult<JobId> {
        let channel = request.channel;
        let recipient = request.recipient.clone();

        let job_id = self.store.enqueue(request).await?;
        self.metrics.increment_jobs_enqueued(channel);

        // Fire and forget: a slow or failing sink must not hold up the caller
        let queue = self.clone();
        let escalated_id = job_id.clone();
        tokio::spawn(async move {
            queue
                .escalate("enqueued", queue.sink.notify_enqueued(&escalated_id, channel, &recipient))
                .await;
        });

        info!("Enqueued notification {}", job_id);
        Ok(job_id)
    }

    /// Enqueue with the configured default attempt ceiling
    pub async fn notify(
        &self,
        channel: Channel,
        recipient: impl Into<String>,
        template: impl Into<String>,
        variables: Variables,
    ) -> QueueResult<JobId> {
        let request = NotificationRequest::new(channel, recipient, template)
            .with_variables(variables)
            .with_max_retries(self.config.default_max_retries);
        self.enqueue(request).await
    }

    /// Run one scheduler pass at the current time
    pub async fn tick(&self) -> QueueResult<usize> {
        self.tick_at(Utc::now()).await
    }

    /// Run one scheduler pass as of `now`; returns the number of jobs dispatched.
    ///
    /// Never waits on a send. When the send pool is full the remaining
    /// eligible jobs are left for a later tick.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> QueueResult<usize> {
        let eligible = self.store.select_eligible(now).await?;
        if eligible.is_empty() {
            return Ok(0);
        }

        let total = eligible.len();
        let mut dispatched = 0;

        for (index, job) in eligible.into_iter().enumerate() {
            let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                debug!(deferred = total - index, "Send pool saturated, deferring to next tick");
                break;
            };

            let claimed = match self.store.mark_processing(&job.id).await {
                Ok(claimed) => claimed,
                Err(
                    e @ (QueueError::AlreadyInFlight(_)
                    | QueueError::InvalidTransition { .. }
                    | QueueError::JobNotFound(_)),
                ) => {
                    debug!("Skipping job {}: {}", job.id, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.metrics.increment_jobs_dispatched(claimed.channel);
            dispatched += 1;

            let queue = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                queue.deliver(claimed).await;
            });
        }

        if dispatched > 0 {
            debug!("Dispatched {} of {} eligible jobs", dispatched, total);
        }
        Ok(dispatched)
    }

    /// Start the recurring scheduler on the current tokio runtime
    pub fn start(&self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let queue = self.clone();

        let join_handle = tokio::spawn(async move { queue.run(shutdown_rx).await });

        info!("Started notification dispatcher, tick every {:?}", self.config.tick_interval);
        DispatcherHandle {
            shutdown_tx,
            join_handle,
        }
    }

    /// Wait until no send is in flight, or `timeout` elapses
    pub async fn wait_idle(&self, timeout: Duration) -> QueueResult<()> {
        let all = u32::try_from(self.config.max_concurrent_sends).unwrap_or(u32::MAX);

        let permits = tokio::time::timeout(timeout, self.permits.acquire_many(all))
            .await
            .map_err(|_| QueueError::Internal(format!("Sends still in flight after {:?}", timeout)))?
            .map_err(|_| QueueError::DispatcherShutdown)?;
        drop(permits);
        Ok(())
    }

    /// Point-in-time aggregate counts
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        self.store.stats().await
    }

    /// Current record of a job; completed jobs are gone and report `JobNotFound`
    pub async fn job(&self, job_id: &JobId) -> QueueResult<NotificationJob> {
        self.store.get(job_id).await
    }

    /// Terminally failed jobs
    pub async fn failed_jobs(&self) -> QueueResult<Vec<NotificationJob>> {
        self.store.failed_jobs().await
    }

    /// Stream of store transitions
    pub fn events(&self) -> BoxStream<QueueEvent> {
        self.store.event_stream()
    }

    pub fn metrics(&self) -> &LiveMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) -> QueueResult<()> {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Dispatcher shutdown requested");
                    break;
                }

                _ = ticker.tick() => {
                    // A failed tick is logged and the loop keeps going
                    if let Err(e) = self.tick().await {
                        error!("Scheduler tick failed: {}", e);
                    }
                }
            }
        }

        info!("Dispatcher stopped");
        Ok(())
    }

    /// Send one claimed job and apply the outcome
    #[instrument(skip_all, fields(job_id = %job.id, channel = %job.channel, attempt = job.retry_count + 1))]
    async fn deliver(&self, job: NotificationJob) {
        match self.send(&job).await {
            Ok(()) => match self.store.mark_done(&job.id).await {
                Ok(()) => {
                    self.metrics.increment_jobs_completed(job.channel);
                    info!("Notification {} delivered", job.id);
                }
                Err(e) => error!("Failed to complete job {}: {}", job.id, e),
            },
            Err(send_error) => self.fail(job, send_error).await,
        }
    }

    /// Channel send bounded by the timeout; panics count as failures
    async fn send(&self, job: &NotificationJob) -> Result<(), SendError> {
        let send = AssertUnwindSafe(self.sender.send(
            job.channel,
            &job.recipient,
            &job.template,
            &job.variables,
        ))
        .catch_unwind();

        match tokio::time::timeout(self.config.send_timeout, send).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => Err(SendError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(SendError::Timeout(self.config.send_timeout)),
        }
    }

    async fn fail(&self, job: NotificationJob, send_error: SendError) {
        if send_error.is_timeout() {
            self.metrics.increment_send_timeouts();
        }

        let decision = RetryPolicy::decide(job.retry_count, job.max_retries);
        let error = send_error.to_string();

        if decision.is_terminal() {
            match self.store.mark_failed_terminal(&job.id, error).await {
                Ok(failed) => {
                    self.metrics.increment_jobs_failed(failed.channel);
                    warn!(
                        "Notification {} failed permanently after {}/{} attempts: {}",
                        failed.id, failed.retry_count, failed.max_retries, send_error
                    );
                    let failure = TerminalFailure::from(&failed);
                    self.escalate("terminal failure", self.sink.notify_terminal_failure(&failure))
                        .await;
                }
                Err(e) => error!("Failed to mark job {} as failed: {}", job.id, e),
            }
            return;
        }

        let unit = self.config.backoff_unit;
        let cap = self.config.max_retry_backoff;

        // The store only accepts a retry strictly in the future; each pass
        // re-reads the clock and raises the floor
        for floor_ms in RESCHEDULE_FLOORS_MS {
            let failed_at = Utc::now();
            let floor = failed_at + chrono::Duration::milliseconds(floor_ms);
            let at = decision
                .retry_at(failed_at, unit, cap)
                .map_or(floor, |at| at.max(floor));

            match self.store.mark_failed_retry(&job.id, at, error.clone()).await {
                Ok(updated) => {
                    self.metrics.increment_jobs_retried(updated.channel);
                    warn!(
                        remaining = updated.remaining_attempts(),
                        "Notification {} failed (attempt {}/{}), retrying at {}: {}",
                        updated.id, updated.retry_count, updated.max_retries, at, send_error
                    );
                    return;
                }
                Err(QueueError::RetryNotInFuture(_)) => continue,
                Err(e) => {
                    error!("Failed to reschedule job {}: {}", job.id, e);
                    return;
                }
            }
        }

        error!("Could not schedule a future retry for job {}", job.id);
    }

    /// Best-effort sink call: bounded, panic-safe, errors only logged
    async fn escalate<F>(&self, kind: &'static str, call: F)
    where
        F: Future<Output = Result<(), EscalationError>>,
    {
        let call = AssertUnwindSafe(call).catch_unwind();

        let failure = match tokio::time::timeout(self.config.send_timeout, call).await {
            Ok(Ok(Ok(()))) => return,
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(panic)) => format!("sink panicked: {}", panic_message(panic.as_ref())),
            Err(_) => format!("sink timed out after {:?}", self.config.send_timeout),
        };

        self.metrics.increment_escalation_errors();
        warn!("Escalation ({}) failed: {}", kind, failure);
    }
}

impl<S: QueueStore + ?Sized> Clone for NotificationQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sender: self.sender.clone(),
            sink: self.sink.clone(),
            metrics: self.metrics.clone(),
            permits: self.permits.clone(),
            config: self.config.clone(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
