//! Job persistence store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::JobId;
use crate::error::StoreError;
use crate::job::{Job, JobStatus};

/// Job store trait.
///
/// The store enforces the strict status progression: an `update` that
/// would leave a terminal status, or skip `Running`, is rejected.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job.
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;

    /// Load a job by ID.
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Update a job in place, validating any status change.
    async fn update(&self, job: &Job) -> Result<(), StoreError>;
}

/// In-memory job store.
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&id).cloned())
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let existing = jobs
            .get(&job.id)
            .ok_or_else(|| StoreError::JobNotFound(job.id.to_string()))?;

        if existing.status != job.status && !existing.status.can_transition_to(job.status) {
            return Err(StoreError::InvalidTransition {
                from: existing.status,
                to: job.status,
            });
        }

        jobs.insert(job.id, job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ItemId;
    use chrono::Utc;

    fn pending_job() -> Job {
        Job::new(None, vec![ItemId::from("10234")], Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryJobStore::new();
        let job = pending_job();

        store.insert(&job).await.unwrap();
        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.items, job.items);
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let store = MemoryJobStore::new();
        let job = pending_job();
        let result = store.update(&job).await;
        assert!(matches!(result, Err(StoreError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_valid_progression_accepted() {
        let store = MemoryJobStore::new();
        let mut job = pending_job();
        store.insert(&job).await.unwrap();

        job.status = JobStatus::Running;
        store.update(&job).await.unwrap();

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        store.update(&job).await.unwrap();

        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_status_never_left() {
        let store = MemoryJobStore::new();
        let mut job = pending_job();
        store.insert(&job).await.unwrap();

        job.status = JobStatus::Running;
        store.update(&job).await.unwrap();
        job.status = JobStatus::Failed;
        store.update(&job).await.unwrap();

        job.status = JobStatus::Completed;
        let result = store.update(&job).await;
        assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_pending_cannot_skip_running() {
        let store = MemoryJobStore::new();
        let mut job = pending_job();
        store.insert(&job).await.unwrap();

        job.status = JobStatus::Completed;
        let result = store.update(&job).await;
        assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_same_status_update_allowed() {
        let store = MemoryJobStore::new();
        let mut job = pending_job();
        store.insert(&job).await.unwrap();

        job.error = Some("note".to_string());
        store.update(&job).await.unwrap();
        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.error.as_deref(), Some("note"));
    }
}
