//! One-shot job scheduler.
//!
//! Holds pending jobs keyed by an absolute fire instant and polls with a
//! bounded granularity. A job is handed to the retry driver at or after
//! its fire time, exactly once: dispatch removes it from the pending set,
//! so a job never re-fires. A fire time already in the past fires on the
//! next poll tick. Each dispatched job runs on its own task so one job's
//! delays never block another's dispatch or execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use regsnipe_core::{JobId, LogEntry, LogSink};

use crate::driver::RetryDriver;

/// Explicit, injectable scheduler instance with its own lifecycle.
pub struct Scheduler {
    poll_interval: std::time::Duration,
    driver: Arc<RetryDriver>,
    logs: Arc<dyn LogSink>,
    pending: Arc<RwLock<HashMap<JobId, DateTime<Utc>>>>,
    active: Arc<RwLock<HashMap<JobId, CancellationToken>>>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl Scheduler {
    /// Create a stopped scheduler.
    pub fn new(
        poll_interval: std::time::Duration,
        driver: Arc<RetryDriver>,
        logs: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            poll_interval,
            driver,
            logs,
            pending: Arc::new(RwLock::new(HashMap::new())),
            active: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Register a job to fire at an absolute instant.
    ///
    /// Idempotent per job ID: re-scheduling replaces the fire time instead
    /// of creating a duplicate trigger.
    pub async fn schedule(&self, job_id: JobId, fire_at: DateTime<Utc>) {
        let mut pending = self.pending.write().await;
        let replaced = pending.insert(job_id, fire_at).is_some();
        drop(pending);

        debug!(%job_id, %fire_at, replaced, "job scheduled");
        self.logs
            .append(LogEntry::info(
                job_id,
                format!("job scheduled for {}", fire_at.to_rfc3339()),
            ))
            .await;
    }

    /// Whether a job is still waiting for its fire time.
    pub async fn is_scheduled(&self, job_id: JobId) -> bool {
        self.pending.read().await.contains_key(&job_id)
    }

    /// Cancel a job before or during execution.
    ///
    /// Before dispatch the job is simply removed from the pending set.
    /// During execution the job's token is cancelled; the retry driver
    /// honors it at the next safe point. Returns false if the job is
    /// neither pending nor running.
    pub async fn cancel(&self, job_id: JobId) -> bool {
        if self.pending.write().await.remove(&job_id).is_some() {
            self.logs
                .append(LogEntry::warning(job_id, "job cancelled before dispatch"))
                .await;
            return true;
        }
        if let Some(token) = self.active.read().await.get(&job_id) {
            token.cancel();
            return true;
        }
        false
    }

    /// Start the background poll loop. A second call is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let poll_interval = self.poll_interval;
        let pending = self.pending.clone();
        let active = self.active.clone();
        let driver = self.driver.clone();
        let logs = self.logs.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            info!("scheduler started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }

                let now = Utc::now();
                let mut due = Vec::new();
                {
                    let mut pending = pending.write().await;
                    pending.retain(|job_id, fire_at| {
                        if *fire_at <= now {
                            due.push((*job_id, *fire_at));
                            false
                        } else {
                            true
                        }
                    });
                }

                for (job_id, fire_at) in due {
                    logs.append(LogEntry::info(
                        job_id,
                        format!("dispatching job scheduled for {}", fire_at.to_rfc3339()),
                    ))
                    .await;

                    let token = shutdown.child_token();
                    active.write().await.insert(job_id, token.clone());

                    let driver = driver.clone();
                    let active = active.clone();
                    tokio::spawn(async move {
                        driver.run(job_id, token).await;
                        active.write().await.remove(&job_id);
                    });
                }
            }
            info!("scheduler stopped");
        });
    }

    /// Stop the poll loop and cancel all in-flight jobs at their next
    /// safe point.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
