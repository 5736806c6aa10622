//! Retry driver: the per-job state machine.
//!
//! `run` is invoked exactly once per dispatched job. It moves the job to
//! `Running`, executes up to the configured number of attempts strictly
//! sequentially with a fixed cancellable delay in between, and performs
//! exactly one terminal transition. The driver itself never fails:
//! collaborator errors are logged and counted as attempt failures.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use regsnipe_core::{Job, JobId, JobStatus, JobStore, LogEntry, LogSink};

use crate::config::EngineConfig;
use crate::executor::AttemptExecutor;

/// Drives a job's attempts to a terminal status.
pub struct RetryDriver {
    config: Arc<EngineConfig>,
    jobs: Arc<dyn JobStore>,
    logs: Arc<dyn LogSink>,
    executor: AttemptExecutor,
}

impl RetryDriver {
    /// Create a driver.
    pub fn new(
        config: Arc<EngineConfig>,
        jobs: Arc<dyn JobStore>,
        logs: Arc<dyn LogSink>,
        executor: AttemptExecutor,
    ) -> Self {
        Self {
            config,
            jobs,
            logs,
            executor,
        }
    }

    /// Run a dispatched job to a terminal status.
    ///
    /// Cancellation is honored at safe points only: before an attempt and
    /// during the inter-attempt delay, never mid-automation-call.
    pub async fn run(&self, job_id: JobId, cancel: CancellationToken) {
        let mut job = match self.jobs.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(%job_id, "dispatched job missing from store");
                return;
            }
            Err(e) => {
                error!(%job_id, "could not load dispatched job: {}", e);
                return;
            }
        };

        // A job has exactly one active run; a re-dispatch is a no-op.
        if job.status != JobStatus::Pending {
            warn!(%job_id, status = ?job.status, "job already dispatched; skipping");
            return;
        }

        job.status = JobStatus::Running;
        if let Err(e) = self.jobs.update(&job).await {
            error!(%job_id, "could not mark job running: {}", e);
            return;
        }

        self.logs
            .append(LogEntry::info(
                job_id,
                format!("starting registration job for {} items", job.items.len()),
            ))
            .await;

        let max = self.config.max_attempts;
        for attempt in 1..=max {
            if cancel.is_cancelled() {
                self.finish_cancelled(&mut job).await;
                return;
            }

            self.logs
                .append(LogEntry::info(
                    job_id,
                    format!("registration attempt {}/{}", attempt, max),
                ))
                .await;

            let outcome = self.executor.attempt(&job).await;

            if outcome.success {
                job.status = JobStatus::Completed;
                job.completed_at = Some(Utc::now());
                job.error = None;
                self.store_update(&job).await;
                self.logs
                    .append(LogEntry::info(
                        job_id,
                        format!("registration succeeded on attempt {}", attempt),
                    ))
                    .await;
                return;
            }

            if attempt < max {
                self.logs
                    .append(LogEntry::warning(
                        job_id,
                        format!(
                            "attempt {} failed: {}; retrying in {}s",
                            attempt, outcome.detail, self.config.retry_delay_secs
                        ),
                    ))
                    .await;

                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.finish_cancelled(&mut job).await;
                        return;
                    }
                    _ = tokio::time::sleep(self.config.retry_delay()) => {}
                }
            } else {
                job.status = JobStatus::Failed;
                job.error = Some(format!(
                    "registration failed after {} attempts - registration may not be open yet",
                    max
                ));
                self.store_update(&job).await;
                self.logs
                    .append(LogEntry::error(
                        job_id,
                        format!(
                            "registration failed after {} attempts: {}",
                            max, outcome.detail
                        ),
                    ))
                    .await;
            }
        }
    }

    async fn finish_cancelled(&self, job: &mut Job) {
        job.status = JobStatus::Failed;
        job.error = Some("job cancelled".to_string());
        self.store_update(job).await;
        self.logs
            .append(LogEntry::warning(job.id, "job cancelled; stopping attempts"))
            .await;
    }

    async fn store_update(&self, job: &Job) {
        if let Err(e) = self.jobs.update(job).await {
            error!(job_id = %job.id, "could not persist job status: {}", e);
        }
    }
}
