//! # Queue configuration
//!
//! `QueueConfig::default()` reproduces the reference behaviour: a one
//! second tick and `2^n` second backoff. Values can be overridden from
//! the environment with `PREFIX__KEY` variables:
//!
//! ```bash
//! export NOTIFY_QUEUE__TICK_INTERVAL_MS=250
//! export NOTIFY_QUEUE__SEND_TIMEOUT_MS=10000
//! export NOTIFY_QUEUE__MAX_CONCURRENT_SENDS=32
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::{QueueError, QueueResult, DEFAULT_MAX_RETRIES};

/// Environment prefix used by `QueueConfig::from_env`
pub const ENV_PREFIX: &str = "NOTIFY_QUEUE__";

/// Shortest backoff unit or cap accepted by `QueueConfig::validate`
pub const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(1);

/// Configuration for the notification queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Scheduler tick interval
    pub tick_interval: Duration,
    /// Upper bound on a single channel send; hitting it counts as a failure
    pub send_timeout: Duration,
    /// Maximum sends in flight at once
    pub max_concurrent_sends: usize,
    /// Length of one backoff step (`2^n` steps after the n-th failure)
    pub backoff_unit: Duration,
    /// Optional ceiling on a single backoff delay
    pub max_retry_backoff: Option<Duration>,
    /// Attempt ceiling applied by `NotificationQueue::notify`
    pub default_max_retries: u32,
    /// Buffered events per subscriber
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            send_timeout: Duration::from_secs(30),
            max_concurrent_sends: 64,
            backoff_unit: Duration::from_secs(1),
            max_retry_backoff: None,
            default_max_retries: DEFAULT_MAX_RETRIES,
            event_capacity: 1000,
        }
    }
}

impl QueueConfig {
    /// Load overrides from the process environment
    pub fn from_env() -> QueueResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load overrides from environment variables starting with `prefix`
    pub fn from_env_with_prefix(prefix: &str) -> QueueResult<Self> {
        let values: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_lowercase().replace("__", "."), value))
            })
            .collect();

        Self::from_values(&values)
    }

    /// Apply overrides from normalized keys (`tick_interval_ms`, ...)
    pub fn from_values(values: &HashMap<String, String>) -> QueueResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse::<u64>(values, "tick_interval_ms")? {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(values, "send_timeout_ms")? {
            config.send_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse::<usize>(values, "max_concurrent_sends")? {
            config.max_concurrent_sends = n;
        }
        if let Some(ms) = parse::<u64>(values, "backoff_unit_ms")? {
            config.backoff_unit = Duration::from_millis(ms);
        }
        if let Some(secs) = parse::<u64>(values, "max_retry_backoff_secs")? {
            config.max_retry_backoff = Some(Duration::from_secs(secs));
        }
        if let Some(n) = parse::<u32>(values, "default_max_retries")? {
            config.default_max_retries = n;
        }
        if let Some(n) = parse::<usize>(values, "event_capacity")? {
            config.event_capacity = n;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_max_concurrent_sends(mut self, max_concurrent_sends: usize) -> Self {
        self.max_concurrent_sends = max_concurrent_sends;
        self
    }

    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    pub fn with_max_retry_backoff(mut self, cap: Duration) -> Self {
        self.max_retry_backoff = Some(cap);
        self
    }

    /// Reject values the dispatcher cannot run with
    pub fn validate(&self) -> QueueResult<()> {
        if self.tick_interval.is_zero() {
            return Err(QueueError::Config("tick_interval must be positive".to_string()));
        }
        if self.send_timeout.is_zero() {
            return Err(QueueError::Config("send_timeout must be positive".to_string()));
        }
        if self.max_concurrent_sends == 0 {
            return Err(QueueError::Config("max_concurrent_sends must be at least 1".to_string()));
        }
        if self.max_concurrent_sends > u32::MAX as usize {
            return Err(QueueError::Config("max_concurrent_sends is too large".to_string()));
        }
        if self.backoff_unit < MIN_RETRY_BACKOFF {
            return Err(QueueError::Config(format!(
                "backoff_unit must be at least {:?}",
                MIN_RETRY_BACKOFF
            )));
        }
        if let Some(cap) = self.max_retry_backoff {
            if cap < MIN_RETRY_BACKOFF {
                return Err(QueueError::Config(format!(
                    "max_retry_backoff must be at least {:?}",
                    MIN_RETRY_BACKOFF
                )));
            }
        }
        if self.default_max_retries == 0 {
            return Err(QueueError::Config("default_max_retries must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(values: &HashMap<String, String>, key: &str) -> QueueResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    values
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| QueueError::Config(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_match_reference_behaviour() {
        let config = QueueConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.backoff_unit, Duration::from_secs(1));
        assert_eq!(config.max_retry_backoff, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_values() {
        let config = QueueConfig::from_values(&values(&[
            ("tick_interval_ms", "250"),
            ("send_timeout_ms", " 5000 "),
            ("max_concurrent_sends", "8"),
            ("max_retry_backoff_secs", "600"),
        ]))
        .unwrap();

        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_sends, 8);
        assert_eq!(config.max_retry_backoff, Some(Duration::from_secs(600)));
        assert_eq!(config.default_max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let result = QueueConfig::from_values(&values(&[("tick_interval_ms", "soon")]));
        assert!(matches!(result, Err(QueueError::Config(msg)) if msg.contains("tick_interval_ms")));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = QueueConfig::from_values(&values(&[("max_concurrent_sends", "0")]));
        assert!(matches!(result, Err(QueueError::Config(_))));
    }

    #[test]
    fn test_zero_backoff_cap_rejected() {
        let result = QueueConfig::from_values(&values(&[("max_retry_backoff_secs", "0")]));
        assert!(matches!(result, Err(QueueError::Config(msg)) if msg.contains("max_retry_backoff")));

        let config = QueueConfig::default().with_max_retry_backoff(Duration::from_micros(500));
        assert!(config.validate().is_err());
        let config = QueueConfig::default().with_max_retry_backoff(MIN_RETRY_BACKOFF);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sub_millisecond_backoff_unit_rejected() {
        let config = QueueConfig::default().with_backoff_unit(Duration::from_nanos(5));
        assert!(matches!(config.validate(), Err(QueueError::Config(msg)) if msg.contains("backoff_unit")));

        let result = QueueConfig::from_values(&values(&[("backoff_unit_ms", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_prefix_is_stripped() {
        std::env::set_var("NQ_TEST_CFG__TICK_INTERVAL_MS", "125");
        let config = QueueConfig::from_env_with_prefix("NQ_TEST_CFG__").unwrap();
        std::env::remove_var("NQ_TEST_CFG__TICK_INTERVAL_MS");

        assert_eq!(config.tick_interval, Duration::from_millis(125));
    }
}
