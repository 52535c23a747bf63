pub mod ids;
pub mod channel;
pub mod message;
pub mod record;
pub mod events;
pub mod stats;

pub use ids::JobId;
pub use channel::Channel;
pub use message::{NotificationRequest, Variables, DEFAULT_MAX_RETRIES};
pub use record::{JobStatus, NotificationJob};
pub use events::QueueEvent;
pub use stats::QueueStats;
