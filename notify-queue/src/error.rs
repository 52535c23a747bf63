use thiserror::Error;

use crate::types::JobId;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {0} is already being dispatched")]
    AlreadyInFlight(JobId),

    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Retry for job {0} must be scheduled in the future")]
    RetryNotInFuture(JobId),

    #[error("Retry budget exhausted for job {job_id}: {retry_count}/{max_retries}")]
    RetriesExhausted {
        job_id: JobId,
        retry_count: u32,
        max_retries: u32,
    },

    #[error("Job {job_id} still has attempts left: {retry_count}/{max_retries}")]
    RetriesRemaining {
        job_id: JobId,
        retry_count: u32,
        max_retries: u32,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Dispatcher shutdown")]
    DispatcherShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outcome of a failed channel send.
///
/// The dispatcher never branches on the variant; every error is a
/// failed attempt that feeds the retry policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Transport rejected or could not deliver the message
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// No sender is registered for the channel
    #[error("No sender registered for channel: {0}")]
    NoRoute(String),

    /// The send did not finish within the configured timeout
    #[error("Send timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The sender panicked
    #[error("Sender panicked: {0}")]
    Panicked(String),
}

impl SendError {
    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Failure reported by an escalation sink. Logged, never propagated into job state.
#[derive(Error, Debug, Clone)]
#[error("Escalation failed: {0}")]
pub struct EscalationError(pub String);

impl EscalationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

