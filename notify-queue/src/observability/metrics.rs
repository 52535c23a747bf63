use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::Channel;

/// Cumulative delivery counters for the lifetime of a queue
#[derive(Debug, Default)]
pub struct LiveMetrics {
    jobs_enqueued: AtomicU64,
    jobs_dispatched: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_retried: AtomicU64,
    jobs_failed: AtomicU64,
    send_timeouts: AtomicU64,
    escalation_errors: AtomicU64,

    // Per-channel metrics
    channel_metrics: RwLock<HashMap<Channel, ChannelMetrics>>,
}

impl LiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_jobs_enqueued(&self, channel: Channel) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
        self.channel_metrics.write().entry(channel).or_default().enqueued += 1;
    }

    pub fn increment_jobs_dispatched(&self, channel: Channel) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
        self.channel_metrics.write().entry(channel).or_default().dispatched += 1;
    }

    pub fn increment_jobs_completed(&self, channel: Channel) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.channel_metrics.write().entry(channel).or_default().completed += 1;
    }

    pub fn increment_jobs_retried(&self, channel: Channel) {
        self.jobs_retried.fetch_add(1, Ordering::Relaxed);
        self.channel_metrics.write().entry(channel).or_default().retried += 1;
    }

    pub fn increment_jobs_failed(&self, channel: Channel) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.channel_metrics.write().entry(channel).or_default().failed += 1;
    }

    pub fn increment_send_timeouts(&self) {
        self.send_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_escalation_errors(&self) {
        self.escalation_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Getters for global metrics
    pub fn jobs_enqueued(&self) -> u64 {
        self.jobs_enqueued.load(Ordering::Relaxed)
    }

    pub fn jobs_dispatched(&self) -> u64 {
        self.jobs_dispatched.load(Ordering::Relaxed)
    }

    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed.load(Ordering::Relaxed)
    }

    pub fn jobs_retried(&self) -> u64 {
        self.jobs_retried.load(Ordering::Relaxed)
    }

    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    pub fn send_timeouts(&self) -> u64 {
        self.send_timeouts.load(Ordering::Relaxed)
    }

    pub fn escalation_errors(&self) -> u64 {
        self.escalation_errors.load(Ordering::Relaxed)
    }

    /// Get metrics for a specific channel
    pub fn channel_metrics(&self, channel: Channel) -> Option<ChannelMetrics> {
        self.channel_metrics.read().get(&channel).cloned()
    }

    /// Collect current snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            jobs_enqueued: self.jobs_enqueued(),
            jobs_dispatched: self.jobs_dispatched(),
            jobs_completed: self.jobs_completed(),
            jobs_retried: self.jobs_retried(),
            jobs_failed: self.jobs_failed(),
            send_timeouts: self.send_timeouts(),
            escalation_errors: self.escalation_errors(),
            channels: self.channel_metrics.read().clone(),
        }
    }
}

/// Metrics for a specific channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub enqueued: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub retried: u64,
    pub failed: u64,
}

impl ChannelMetrics {
    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total_processed = self.completed + self.failed;
        if total_processed == 0 {
            100.0
        } else {
            (self.completed as f64 / total_processed as f64) * 100.0
        }
    }

    /// Calculate retry rate as percentage
    pub fn retry_rate(&self) -> f64 {
        if self.enqueued == 0 {
            0.0
        } else {
            (self.retried as f64 / self.enqueued as f64) * 100.0
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub jobs_enqueued: u64,
    pub jobs_dispatched: u64,
    pub jobs_completed: u64,
    pub jobs_retried: u64,
    pub jobs_failed: u64,
    pub send_timeouts: u64,
    pub escalation_errors: u64,
    pub channels: HashMap<Channel, ChannelMetrics>,
}

impl MetricsSnapshot {
    /// Jobs enqueued but neither delivered nor failed yet
    pub fn jobs_outstanding(&self) -> u64 {
        self.jobs_enqueued
            .saturating_sub(self.jobs_completed + self.jobs_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_metrics() {
        let metrics = LiveMetrics::new();

        metrics.increment_jobs_enqueued(Channel::Email);
        metrics.increment_jobs_enqueued(Channel::Email);
        metrics.increment_jobs_completed(Channel::Email);
        metrics.increment_jobs_retried(Channel::Email);

        assert_eq!(metrics.jobs_enqueued(), 2);
        assert_eq!(metrics.jobs_completed(), 1);

        let email = metrics.channel_metrics(Channel::Email).unwrap();
        assert_eq!(email.enqueued, 2);
        assert_eq!(email.success_rate(), 100.0);
        assert_eq!(email.retry_rate(), 50.0);
        assert!(metrics.channel_metrics(Channel::Sms).is_none());
    }

    #[test]
    fn test_snapshot_outstanding() {
        let metrics = LiveMetrics::new();
        for _ in 0..5 {
            metrics.increment_jobs_enqueued(Channel::Sms);
        }
        metrics.increment_jobs_completed(Channel::Sms);
        metrics.increment_jobs_failed(Channel::Sms);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_outstanding(), 3);
        assert_eq!(snapshot.channels[&Channel::Sms].failed, 1);
    }
}
