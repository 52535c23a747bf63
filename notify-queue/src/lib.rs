//! # notify-queue: outbound notification delivery
//!
//! **At-least-once, retrying dispatcher for WhatsApp, email and SMS notifications**
//!
//! Jobs live in an in-process store. A recurring scheduler tick picks
//! every eligible job and hands it to a `ChannelSender`. Failed sends are
//! retried with exponential backoff (`2^n` seconds after the n-th
//! failure). A job that uses up its attempt budget is marked `failed`,
//! kept for status queries and reported to an `EscalationSink`.
//!
//! ## Guarantees
//!
//! - **No duplicate dispatch**: claiming a job is an atomic check-and-set
//!   on the store's in-flight set
//! - **Bounded retries**: `retry_count` only grows and never passes `max_retries`
//! - **Non-blocking scheduler**: each send runs in its own task, bounded by a
//!   timeout and a concurrency limit
//! - **Best-effort escalation**: sink failures are logged, never applied to job state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notify_queue::prelude::*;
//!
//! # async fn run() -> QueueResult<()> {
//! let queue = NotificationQueue::in_memory(
//!     ChannelRouter::new()
//!         .route(Channel::Email, LogSender)
//!         .fallback(SimulatedSender::new(0.9)),
//!     QueueConfig::from_env()?,
//! )?
//! .with_sink(RecordingSink::new());
//!
//! let dispatcher = queue.start();
//!
//! let request = NotificationRequest::new(Channel::WhatsApp, "+15550100", "appointment_reminder")
//!     .with_variable("patient", "Ada")
//!     .with_max_retries(5);
//! let job_id = queue.enqueue(request).await?;
//!
//! println!("queued {job_id}: {:?}", queue.stats().await?);
//! dispatcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod retry;
pub mod backend;
pub mod sender;
pub mod escalation;
pub mod dispatcher;
pub mod observability;

// Core API exports
pub use dispatcher::{NotificationQueue, DispatcherHandle};
pub use types::{
    JobId, Channel, NotificationRequest, Variables, NotificationJob, JobStatus,
    QueueEvent, QueueStats, DEFAULT_MAX_RETRIES,
};
pub use error::{QueueError, QueueResult, SendError, EscalationError};
pub use config::QueueConfig;
pub use retry::{RetryPolicy, RetryDecision};
pub use backend::{QueueStore, memory::MemoryStore};
pub use sender::{ChannelSender, ChannelRouter, LogSender, SimulatedSender};
pub use escalation::{EscalationSink, TerminalFailure, TracingSink, RecordingSink, EscalationRecord};

// Observability exports
pub use observability::{LiveMetrics, MetricsSnapshot};

/// Everything needed to enqueue and deliver notifications
pub mod prelude {
    pub use crate::{
        NotificationQueue, DispatcherHandle, QueueConfig, MemoryStore, QueueStore,
    };

    pub use crate::{
        JobId, Channel, NotificationRequest, Variables, JobStatus, QueueStats,
        QueueError, QueueResult, SendError,
    };

    pub use crate::{
        ChannelSender, ChannelRouter, LogSender, SimulatedSender,
        EscalationSink, TerminalFailure, TracingSink, RecordingSink,
    };

    // Essential traits
    pub use async_trait::async_trait;
}
