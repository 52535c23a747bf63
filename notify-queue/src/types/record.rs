use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, JobId, NotificationRequest, Variables};

/// Job status lifecycle: `pending -> processing -> {completed | pending | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for dispatch (first attempt or retry)
    Pending,

    /// Held by exactly one dispatch
    Processing,

    /// Delivered; the job leaves the store with this transition
    Completed,

    /// Retry budget exhausted; retained for status queries only
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Notification job - mutable runtime state owned by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: JobId,
    pub channel: Channel,
    pub recipient: String,
    pub template: String,
    pub variables: Variables,

    /// Attempts already made (starts at 0, never above `max_retries`)
    pub retry_count: u32,

    /// Attempt ceiling, fixed at enqueue time (at least 1)
    pub max_retries: u32,

    /// Not eligible for dispatch before this instant
    pub next_retry_at: Option<DateTime<Utc>>,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Last send error (if any)
    pub last_error: Option<String>,
}

impl NotificationJob {
    /// Create a pending job from a request
    pub fn new(id: JobId, request: NotificationRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            channel: request.channel,
            recipient: request.recipient,
            template: request.template,
            variables: request.variables,
            retry_count: 0,
            max_retries: request.max_retries.max(1),
            next_retry_at: None,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Pending and past its retry time. The in-flight check lives in the store.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.next_retry_at.map_or(true, |at| at <= now)
    }

    /// Attempts left before the job fails terminally
    pub fn remaining_attempts(&self) -> u32 {
        self.max_retries.saturating_sub(self.retry_count)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job() -> NotificationJob {
        NotificationJob::new(
            JobId::new(),
            NotificationRequest::new(Channel::Sms, "+15550100", "otp"),
        )
    }

    #[test]
    fn new_job_is_pending_with_zero_retries() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.next_retry_at.is_none());
        assert!(job.is_eligible(Utc::now()));
    }

    #[test]
    fn zero_max_retries_is_raised_to_one() {
        let job = NotificationJob::new(
            JobId::new(),
            NotificationRequest::new(Channel::Email, "a@b.c", "x").with_max_retries(0),
        );
        assert_eq!(job.max_retries, 1);
        assert_eq!(job.remaining_attempts(), 1);
    }

    #[test]
    fn future_retry_time_gates_eligibility() {
        let now = Utc::now();
        let mut job = job();
        job.next_retry_at = Some(now + Duration::seconds(5));

        assert!(!job.is_eligible(now));
        assert!(job.is_eligible(now + Duration::seconds(5)));
        assert!(job.is_eligible(now + Duration::seconds(6)));
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
