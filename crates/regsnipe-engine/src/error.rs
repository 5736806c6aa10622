//! Engine errors.

use thiserror::Error;

use regsnipe_core::{JobId, StoreError};

use crate::config::ConfigError;

/// Engine error types.
///
/// Input errors are rejected synchronously at job creation and never
/// enter the scheduler. Failures inside an attempt are not errors at this
/// level; they are folded into the attempt outcome and retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Job submitted without item identifiers.
    #[error("Job requires at least one item identifier")]
    EmptyItems,

    /// Fire time could not be parsed.
    #[error("Invalid fire time: {0}")]
    InvalidFireTime(String),

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
