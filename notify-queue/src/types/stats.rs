use serde::{Deserialize, Serialize};

use super::{JobStatus, NotificationJob};

/// Point-in-time aggregate counts over the jobs held by a store.
///
/// Completed jobs leave the store in the same step that completes them,
/// so `completed` is sampled after removal and normally reads 0. Use
/// `LiveMetrics` for cumulative delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStats {
    /// Aggregate a set of job records
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a NotificationJob>) -> Self {
        let mut stats = Self::default();
        for job in jobs {
            stats.total += 1;
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Jobs that may still be dispatched
    pub fn active(&self) -> usize {
        self.pending + self.processing
    }

    pub fn is_idle(&self) -> bool {
        self.active() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, JobId, NotificationRequest};

    fn job(status: JobStatus) -> NotificationJob {
        let mut job = NotificationJob::new(
            JobId::new(),
            NotificationRequest::new(Channel::Email, "a@b.c", "invoice_ready"),
        );
        job.status = status;
        job
    }

    #[test]
    fn failed_jobs_do_not_count_as_active() {
        let jobs = vec![job(JobStatus::Pending), job(JobStatus::Processing), job(JobStatus::Failed)];
        let stats = QueueStats::from_jobs(&jobs);

        assert_eq!((stats.total, stats.pending, stats.processing, stats.failed), (3, 1, 1, 1));
        assert_eq!(stats.active(), 2);
        assert!(!stats.is_idle());

        let only_failed = QueueStats::from_jobs(&jobs[2..]);
        assert_eq!(only_failed.total, 1);
        assert!(only_failed.is_idle());
        assert!(QueueStats::default().is_idle());
    }
}
