//! Retry policy: exponential backoff (base 2) with a fixed attempt ceiling.
//!
//! Pure functions only, no clock and no I/O.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// What to do with a job whose send just failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reschedule `after_secs` units from the failure
    Retry { retry_count: u32, after_secs: u64 },

    /// Budget exhausted, never dispatch again
    Terminal { retry_count: u32 },
}

impl RetryDecision {
    /// Retry count the job carries after this decision is applied
    pub fn retry_count(&self) -> u32 {
        match self {
            Self::Retry { retry_count, .. } | Self::Terminal { retry_count } => *retry_count,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Backoff delay, `after_secs * unit` capped at `cap`
    pub fn backoff(&self, unit: Duration, cap: Option<Duration>) -> Option<Duration> {
        let Self::Retry { after_secs, .. } = *self else {
            return None;
        };
        let factor = u32::try_from(after_secs).unwrap_or(u32::MAX);
        let delay = unit.checked_mul(factor).unwrap_or(Duration::MAX);
        Some(match cap {
            Some(cap) => delay.min(cap),
            None => delay,
        })
    }

    /// Instant at which a rescheduled job becomes eligible again
    pub fn retry_at(
        &self,
        failed_at: DateTime<Utc>,
        unit: Duration,
        cap: Option<Duration>,
    ) -> Option<DateTime<Utc>> {
        let delay = self.backoff(unit, cap)?;
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        Some(failed_at.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

/// Backoff policy applied after each failed send
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    /// Decide the outcome of a failed attempt.
    ///
    /// `retry_count` is the count before this failure is recorded. The
    /// failure makes it `retry_count + 1`; reaching `max_retries` is
    /// terminal, otherwise the job waits `2^(retry_count + 1)` units.
    pub fn decide(retry_count: u32, max_retries: u32) -> RetryDecision {
        let next = retry_count.saturating_add(1);
        if next >= max_retries {
            RetryDecision::Terminal {
                retry_count: next.min(max_retries.max(1)),
            }
        } else {
            RetryDecision::Retry {
                retry_count: next,
                after_secs: 2u64.saturating_pow(next),
            }
        }
    }
}
