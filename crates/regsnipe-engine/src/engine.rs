//! Engine facade exposed to the web-facing collaborator.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use regsnipe_automation::SessionFactory;
use regsnipe_core::{
    AccountId, AccountStore, ItemId, Job, JobId, JobStatus, JobStore, LogEntry, LogSink,
    SessionCache,
};

use crate::config::EngineConfig;
use crate::driver::RetryDriver;
use crate::error::EngineError;
use crate::executor::AttemptExecutor;
use crate::scheduler::Scheduler;

/// Parse a fire time.
///
/// Accepts RFC 3339 (including a trailing `Z`); a bare
/// `YYYY-MM-DDTHH:MM:SS` is read as UTC.
pub fn parse_fire_time(value: &str) -> Result<DateTime<Utc>, EngineError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(EngineError::InvalidFireTime(value.to_string()))
}

/// Snapshot of a job's status and log, newest entries first.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Job ID.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Error description, if the job failed.
    pub error: Option<String>,
    /// Completion instant, if the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Log entries, newest first.
    pub entries: Vec<LogEntry>,
}

/// The job execution engine.
///
/// Wires the scheduler, retry driver, and attempt executor over injected
/// stores and an automation session factory.
pub struct Engine {
    jobs: Arc<dyn JobStore>,
    logs: Arc<dyn LogSink>,
    scheduler: Scheduler,
}

impl Engine {
    /// Create an engine. Validates the configuration.
    pub fn new(
        config: EngineConfig,
        accounts: Arc<dyn AccountStore>,
        jobs: Arc<dyn JobStore>,
        logs: Arc<dyn LogSink>,
        cache: Arc<dyn SessionCache>,
        sessions: Arc<dyn SessionFactory>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let config = Arc::new(config);

        let executor = AttemptExecutor::new(
            config.clone(),
            accounts,
            cache,
            logs.clone(),
            sessions,
        );
        let driver = Arc::new(RetryDriver::new(
            config.clone(),
            jobs.clone(),
            logs.clone(),
            executor,
        ));
        let scheduler = Scheduler::new(config.poll_interval(), driver, logs.clone());

        Ok(Self {
            jobs,
            logs,
            scheduler,
        })
    }

    /// Start the scheduler loop.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop the scheduler loop and cancel in-flight jobs at their next
    /// safe point.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Create and schedule a job from a textual fire time.
    ///
    /// Input errors (empty item list, unparseable fire time) are rejected
    /// here and never enter the scheduler.
    pub async fn create_job(
        &self,
        account: Option<AccountId>,
        items: Vec<ItemId>,
        fire_time: &str,
    ) -> Result<JobId, EngineError> {
        let fire_at = parse_fire_time(fire_time)?;
        self.create_job_at(account, items, fire_at).await
    }

    /// Create and schedule a job from a typed fire time.
    pub async fn create_job_at(
        &self,
        account: Option<AccountId>,
        items: Vec<ItemId>,
        fire_at: DateTime<Utc>,
    ) -> Result<JobId, EngineError> {
        if items.is_empty() {
            return Err(EngineError::EmptyItems);
        }

        let job = Job::new(account, items, fire_at);
        self.jobs.insert(&job).await?;
        self.scheduler.schedule(job.id, fire_at).await;
        Ok(job.id)
    }

    /// Status, error detail, and log entries (newest first) for a job.
    pub async fn job_status(&self, job_id: JobId) -> Result<JobReport, EngineError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(EngineError::JobNotFound(job_id))?;
        let entries = self.logs.entries_newest_first(job_id).await;
        Ok(JobReport {
            id: job.id,
            status: job.status,
            error: job.error,
            completed_at: job.completed_at,
            entries,
        })
    }

    /// Cancel a job before or during execution. Returns false if the job
    /// is neither pending nor running.
    pub async fn cancel_job(&self, job_id: JobId) -> Result<bool, EngineError> {
        Ok(self.scheduler.cancel(job_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use regsnipe_automation::fake::{Call, FakeFactory, FakeScript};
    use regsnipe_core::{
        Account, Credential, LogLevel, MemoryAccountStore, MemoryJobStore, MemoryLogSink,
        MemorySessionCache,
    };
    use std::time::Duration;

    struct Fixture {
        engine: Engine,
        factory: Arc<FakeFactory>,
        account: Account,
    }

    async fn fixture(script: FakeScript) -> Fixture {
        let factory = Arc::new(FakeFactory::new(script));
        let accounts = Arc::new(MemoryAccountStore::new());

        let account = Account::new("gwuser", Credential::new("secret"));
        accounts.insert(account.clone()).await;

        let engine = Engine::new(
            EngineConfig::default(),
            accounts,
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryLogSink::new()),
            Arc::new(MemorySessionCache::new()),
            factory.clone(),
        )
        .unwrap();

        Fixture {
            engine,
            factory,
            account,
        }
    }

    async fn wait_terminal(fx: &Fixture, job_id: JobId) -> JobReport {
        tokio::time::timeout(Duration::from_secs(3600), async {
            loop {
                let report = fx.engine.job_status(job_id).await.unwrap();
                if report.status.is_terminal() {
                    return report;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("job never reached a terminal status")
    }

    #[test]
    fn test_parse_fire_time() {
        assert!(parse_fire_time("2026-01-12T08:00:00Z").is_ok());
        assert!(parse_fire_time("2026-01-12T08:00:00+00:00").is_ok());
        assert!(parse_fire_time("2026-01-12T08:00:00").is_ok());
        assert!(matches!(
            parse_fire_time("next tuesday"),
            Err(EngineError::InvalidFireTime(_))
        ));
    }

    #[tokio::test]
    async fn test_create_job_rejects_empty_items() {
        let fx = fixture(FakeScript::default()).await;
        let result = fx
            .engine
            .create_job(Some(fx.account.id), Vec::new(), "2026-01-12T08:00:00Z")
            .await;
        assert!(matches!(result, Err(EngineError::EmptyItems)));
    }

    #[tokio::test]
    async fn test_create_job_rejects_bad_fire_time() {
        let fx = fixture(FakeScript::default()).await;
        let result = fx
            .engine
            .create_job(Some(fx.account.id), vec![ItemId::from("10234")], "whenever")
            .await;
        assert!(matches!(result, Err(EngineError::InvalidFireTime(_))));
    }

    #[tokio::test]
    async fn test_job_status_unknown_job() {
        let fx = fixture(FakeScript::default()).await;
        let result = fx.engine.job_status(JobId::new_v4()).await;
        assert!(matches!(result, Err(EngineError::JobNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_job_completes_within_one_attempt() {
        let fx = fixture(FakeScript::default()).await;
        let fire_at = Utc::now() + ChronoDuration::seconds(1);

        let job_id = fx
            .engine
            .create_job_at(
                Some(fx.account.id),
                vec![ItemId::from("10234"), ItemId::from("10235")],
                fire_at,
            )
            .await
            .unwrap();
        fx.engine.start();

        let report = wait_terminal(&fx, job_id).await;
        assert_eq!(report.status, JobStatus::Completed);
        assert!(report.completed_at.is_some());
        assert!(report.error.is_none());

        // Login, then both item fills in input order, then the add click.
        let session = &fx.factory.sessions()[0];
        assert!(session.performed_login());
        let fills = session.fill_values();
        assert_eq!(fills[2].1, "10234");
        assert_eq!(fills[3].1, "10235");
        assert!(session
            .calls()
            .contains(&Call::Click("id=add_crn_button".to_string())));

        let attempts = report
            .entries
            .iter()
            .filter(|e| e.message.starts_with("registration attempt"))
            .count();
        assert_eq!(attempts, 1);
        fx.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_job_exhausts_budget() {
        let fx = fixture(FakeScript::registration_rejected()).await;
        let job_id = fx
            .engine
            .create_job_at(Some(fx.account.id), vec![ItemId::from("10234")], Utc::now())
            .await
            .unwrap();
        fx.engine.start();

        let report = wait_terminal(&fx, job_id).await;
        assert_eq!(report.status, JobStatus::Failed);
        assert!(report.error.as_ref().unwrap().contains("failed after 5 attempts"));

        let attempts = report
            .entries
            .iter()
            .filter(|e| e.message.starts_with("registration attempt"))
            .count();
        assert_eq!(attempts, 5);
        fx.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_factor_on_first_login_still_retries() {
        let fx = fixture(FakeScript::default()).await;
        fx.factory.push_script(FakeScript::second_factor());

        let job_id = fx
            .engine
            .create_job_at(Some(fx.account.id), vec![ItemId::from("10234")], Utc::now())
            .await
            .unwrap();
        fx.engine.start();

        let report = wait_terminal(&fx, job_id).await;
        assert_eq!(report.status, JobStatus::Completed);
        assert!(report
            .entries
            .iter()
            .any(|e| e.level == LogLevel::Warning && e.message.contains("second-factor")));
        fx.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_job_fails_without_sessions() {
        let fx = fixture(FakeScript::default()).await;
        let job_id = fx
            .engine
            .create_job_at(None, vec![ItemId::from("10234")], Utc::now())
            .await
            .unwrap();
        fx.engine.start();

        let report = wait_terminal(&fx, job_id).await;
        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(fx.factory.opened(), 0);
        fx.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_running_job() {
        let fx = fixture(FakeScript::registration_rejected()).await;
        let job_id = fx
            .engine
            .create_job_at(Some(fx.account.id), vec![ItemId::from("10234")], Utc::now())
            .await
            .unwrap();
        fx.engine.start();

        // Let the first attempt fail, then cancel during the retry delay.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fx.engine.cancel_job(job_id).await.unwrap());

        let report = wait_terminal(&fx, job_id).await;
        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("job cancelled"));
        fx.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_entries_are_newest_first() {
        let fx = fixture(FakeScript::default()).await;
        let job_id = fx
            .engine
            .create_job_at(Some(fx.account.id), vec![ItemId::from("10234")], Utc::now())
            .await
            .unwrap();
        fx.engine.start();

        let report = wait_terminal(&fx, job_id).await;
        assert!(report.entries.first().unwrap().message.contains("succeeded"));
        assert!(report.entries.last().unwrap().message.contains("job scheduled"));
        fx.engine.stop();
    }
}
