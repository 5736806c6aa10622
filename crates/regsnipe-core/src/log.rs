//! Append-only per-job log sink.
//!
//! The log sink is the primary observability surface for the external
//! collaborator: every scheduling, attempt, and automation step writes
//! one entry. Entries are immutable once appended.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::JobId;

/// Log entry severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Recoverable problem, attempt continues or will be retried.
    Warning,
    /// Attempt-fatal problem.
    Error,
}

/// One immutable log line belonging to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Owning job.
    pub job_id: JobId,
    /// Message text.
    pub message: String,
    /// Severity.
    pub level: LogLevel,
    /// Creation time.
    pub at: DateTime<Utc>,
}

impl LogEntry {
    /// Create an entry with the given severity.
    pub fn new(job_id: JobId, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            job_id,
            message: message.into(),
            level,
            at: Utc::now(),
        }
    }

    /// Create an info entry.
    pub fn info(job_id: JobId, message: impl Into<String>) -> Self {
        Self::new(job_id, LogLevel::Info, message)
    }

    /// Create a warning entry.
    pub fn warning(job_id: JobId, message: impl Into<String>) -> Self {
        Self::new(job_id, LogLevel::Warning, message)
    }

    /// Create an error entry.
    pub fn error(job_id: JobId, message: impl Into<String>) -> Self {
        Self::new(job_id, LogLevel::Error, message)
    }
}

/// Append-only log sink shared by all job workers.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one entry. Entries are never edited or removed.
    async fn append(&self, entry: LogEntry);

    /// All entries for a job, newest first.
    async fn entries_newest_first(&self, job_id: JobId) -> Vec<LogEntry>;
}

/// In-memory log sink.
pub struct MemoryLogSink {
    entries: RwLock<HashMap<JobId, Vec<LogEntry>>>,
}

impl MemoryLogSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, entry: LogEntry) {
        tracing::debug!(job_id = %entry.job_id, level = ?entry.level, "{}", entry.message);
        let mut entries = self.entries.write().await;
        entries.entry(entry.job_id).or_default().push(entry);
    }

    async fn entries_newest_first(&self, job_id: JobId) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        let mut result = entries.get(&job_id).cloned().unwrap_or_default();
        result.reverse();
        result
    }
}
