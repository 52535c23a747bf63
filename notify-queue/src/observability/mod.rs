pub mod metrics;
pub mod tracing;

pub use metrics::{LiveMetrics, ChannelMetrics, MetricsSnapshot};
pub use self::tracing::LogFormat;

#[cfg(feature = "tracing-basic")]
pub use self::tracing::init_tracing;
