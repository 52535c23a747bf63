//! Escalation sinks receive enqueue and terminal-failure events for
//! downstream persistence and alerting. Calls are best-effort: the
//! dispatcher logs a sink error and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{Channel, EscalationError, JobId, NotificationJob};

/// A job that exhausted its retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalFailure {
    pub job_id: JobId,
    pub channel: Channel,
    pub recipient: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub failed_at: DateTime<Utc>,
}

impl From<&NotificationJob> for TerminalFailure {
    fn from(job: &NotificationJob) -> Self {
        Self {
            job_id: job.id.clone(),
            channel: job.channel,
            recipient: job.recipient.clone(),
            retry_count: job.retry_count,
            max_retries: job.max_retries,
            last_error: job.last_error.clone(),
            failed_at: job.updated_at,
        }
    }
}

#[async_trait]
pub trait EscalationSink: Send + Sync {
    async fn notify_enqueued(
        &self,
        job_id: &JobId,
        channel: Channel,
        recipient: &str,
    ) -> Result<(), EscalationError>;

    async fn notify_terminal_failure(&self, failure: &TerminalFailure) -> Result<(), EscalationError>;
}

#[async_trait]
impl<T: EscalationSink + ?Sized> EscalationSink for Arc<T> {
    async fn notify_enqueued(
        &self,
        job_id: &JobId,
        channel: Channel,
        recipient: &str,
    ) -> Result<(), EscalationError> {
        (**self).notify_enqueued(job_id, channel, recipient).await
    }

    async fn notify_terminal_failure(&self, failure: &TerminalFailure) -> Result<(), EscalationError> {
        (**self).notify_terminal_failure(failure).await
    }
}

/// Writes escalations to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl EscalationSink for TracingSink {
    async fn notify_enqueued(
        &self,
        job_id: &JobId,
        channel: Channel,
        recipient: &str,
    ) -> Result<(), EscalationError> {
        info!(%job_id, %channel, recipient, "Notification queued");
        Ok(())
    }

    async fn notify_terminal_failure(&self, failure: &TerminalFailure) -> Result<(), EscalationError> {
        error!(
            job_id = %failure.job_id,
            channel = %failure.channel,
            recipient = %failure.recipient,
            retry_count = failure.retry_count,
            max_retries = failure.max_retries,
            last_error = ?failure.last_error,
            "Notification failed permanently"
        );
        Ok(())
    }
}

/// One stored escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationRecord {
    Enqueued {
        job_id: JobId,
        channel: Channel,
        recipient: String,
        at: DateTime<Utc>,
    },
    TerminalFailure(TerminalFailure),
}

/// Keeps escalations in memory as generic records
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<EscalationRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far
    pub fn records(&self) -> Vec<EscalationRecord> {
        self.records.lock().clone()
    }

    pub fn terminal_failures(&self) -> Vec<TerminalFailure> {
        self.records
            .lock()
            .iter()
            .filter_map(|record| match record {
                EscalationRecord::TerminalFailure(failure) => Some(failure.clone()),
                EscalationRecord::Enqueued { .. } => None,
            })
            .collect()
    }

    pub fn enqueued_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| matches!(record, EscalationRecord::Enqueued { .. }))
            .count()
    }
}

#[async_trait]
impl EscalationSink for RecordingSink {
    async fn notify_enqueued(
        &self,
        job_id: &JobId,
        channel: Channel,
        recipient: &str,
    ) -> Result<(), EscalationError> {
        self.records.lock().push(EscalationRecord::Enqueued {
            job_id: job_id.clone(),
            channel,
            recipient: recipient.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }

    async fn notify_terminal_failure(&self, failure: &TerminalFailure) -> Result<(), EscalationError> {
        self.records
            .lock()
            .push(EscalationRecord::TerminalFailure(failure.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotificationRequest;

    #[tokio::test]
    async fn test_recording_sink_keeps_both_kinds() {
        let sink = RecordingSink::new();
        let mut job = NotificationJob::new(
            JobId::new(),
            NotificationRequest::new(Channel::Sms, "+15550100", "otp").with_max_retries(2),
        );
        job.retry_count = 2;
        job.last_error = Some("carrier rejected".to_string());

        sink.notify_enqueued(&job.id, job.channel, &job.recipient).await.unwrap();
        sink.notify_terminal_failure(&TerminalFailure::from(&job)).await.unwrap();

        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.enqueued_count(), 1);

        let failures = sink.terminal_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].retry_count, 2);
        assert_eq!(failures[0].max_retries, 2);
        assert_eq!(failures[0].last_error.as_deref(), Some("carrier rejected"));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = EscalationRecord::Enqueued {
            job_id: JobId::from("job-1"),
            channel: Channel::Email,
            recipient: "a@b.c".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "enqueued");
        assert_eq!(json["channel"], "email");
    }
}
