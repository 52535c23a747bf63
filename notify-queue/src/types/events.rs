use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, JobId};

/// Event protocol for structured observability of the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
    /// Job was enqueued
    Enqueued {
        job_id: JobId,
        channel: Channel,
        at: DateTime<Utc>,
    },

    /// Job was claimed for dispatch
    Dispatched {
        job_id: JobId,
        attempt: u32,
        at: DateTime<Utc>,
    },

    /// Send failed, job rescheduled
    Retrying {
        job_id: JobId,
        retry_count: u32,
        retry_at: DateTime<Utc>,
        error: String,
        at: DateTime<Utc>,
    },

    /// Job delivered and removed
    Completed {
        job_id: JobId,
        at: DateTime<Utc>,
    },

    /// Job failed permanently
    Failed {
        job_id: JobId,
        retry_count: u32,
        error: String,
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Dispatched { .. } => "dispatched",
            Self::Retrying { .. } => "retrying",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Get the job ID from any event
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Enqueued { job_id, .. } => job_id,
            Self::Dispatched { job_id, .. } => job_id,
            Self::Retrying { job_id, .. } => job_id,
            Self::Completed { job_id, .. } => job_id,
            Self::Failed { job_id, .. } => job_id,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Enqueued { at, .. } => at,
            Self::Dispatched { at, .. } => at,
            Self::Retrying { at, .. } => at,
            Self::Completed { at, .. } => at,
            Self::Failed { at, .. } => at,
        }
    }
}
