//! Registration job definition and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountId, JobId};

/// One unit of the registration action's input list (a course reference
/// number on the target site). Submitted in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap a raw item identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Job status.
///
/// Statuses form a strict progression: `Pending → Running → {Completed | Failed}`.
/// Terminal statuses are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Registered, waiting for its fire time.
    Pending,
    /// Attempts in progress.
    Running,
    /// An attempt succeeded.
    Completed,
    /// All attempts exhausted, or cancelled.
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

impl JobStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving to `next` respects the strict progression.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// A scheduled registration job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID.
    pub id: JobId,
    /// Owning account. Absent for anonymous one-shot jobs.
    pub account: Option<AccountId>,
    /// Item identifiers to submit, in submission order.
    pub items: Vec<ItemId>,
    /// The instant the job becomes eligible for its first attempt.
    pub fire_at: DateTime<Utc>,
    /// Current status. Mutated only by the retry driver.
    pub status: JobStatus,
    /// Error description, set when the job fails.
    pub error: Option<String>,
    /// Completion instant, set when the job completes.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(account: Option<AccountId>, items: Vec<ItemId>, fire_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account,
            items,
            fire_at,
            status: JobStatus::Pending,
            error: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the job's fire time has been reached.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.fire_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(None, vec![ItemId::from("10234")], Utc::now());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_status_progression() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));

        // No shortcut from pending to a terminal status.
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));

        // Terminal statuses are never left.
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let due = Job::new(None, vec![ItemId::from("1")], now - chrono::Duration::seconds(1));
        let not_due = Job::new(None, vec![ItemId::from("1")], now + chrono::Duration::hours(1));
        assert!(due.is_due(now));
        assert!(!not_due.is_due(now));
    }
}
