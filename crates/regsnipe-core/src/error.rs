//! Store errors.

use thiserror::Error;

use crate::job::JobStatus;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Attempted status change violates the pending → running → terminal progression.
    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// Backend error.
    #[error("Store backend error: {0}")]
    Backend(String),
}
