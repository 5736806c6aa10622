//! Attempt executor: one complete registration attempt.
//!
//! An attempt obtains an authenticated automation session (reusing cached
//! cookies when they are still valid, otherwise driving a fresh login),
//! submits all item identifiers in input order, and classifies the outcome
//! from the resulting page text. Nothing escapes as an unhandled fault:
//! every failure is folded into the attempt's boolean/detail result, and
//! the automation session is closed on every exit path.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use regsnipe_automation::{AutomationError, AutomationSession, Locator, SessionFactory};
use regsnipe_core::{
    Account, AccountStore, ItemId, Job, JobId, LogEntry, LogSink, SessionArtifact, SessionCache,
};

use crate::config::EngineConfig;

/// Result of one attempt.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Human-readable detail, logged by the retry driver.
    pub detail: String,
}

impl AttemptOutcome {
    fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
        }
    }

    fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

/// Executes single registration attempts.
pub struct AttemptExecutor {
    config: Arc<EngineConfig>,
    accounts: Arc<dyn AccountStore>,
    cache: Arc<dyn SessionCache>,
    logs: Arc<dyn LogSink>,
    sessions: Arc<dyn SessionFactory>,
}

impl AttemptExecutor {
    /// Create an executor.
    pub fn new(
        config: Arc<EngineConfig>,
        accounts: Arc<dyn AccountStore>,
        cache: Arc<dyn SessionCache>,
        logs: Arc<dyn LogSink>,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            config,
            accounts,
            cache,
            logs,
            sessions,
        }
    }

    /// Perform one complete attempt for a job.
    pub async fn attempt(&self, job: &Job) -> AttemptOutcome {
        let Some(account_id) = job.account else {
            self.warning(job.id, "anonymous job has no stored credentials; cannot authenticate")
                .await;
            return AttemptOutcome::failure("no stored credentials for anonymous job");
        };

        let account = match self.accounts.get(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                self.error(job.id, format!("account {} not found", account_id)).await;
                return AttemptOutcome::failure("account not found");
            }
            Err(e) => {
                self.error(job.id, format!("account lookup failed: {}", e)).await;
                return AttemptOutcome::failure(format!("account lookup failed: {}", e));
            }
        };

        let session = match self.sessions.open().await {
            Ok(session) => session,
            Err(e) => {
                self.error(job.id, format!("automation session unavailable: {}", e))
                    .await;
                return AttemptOutcome::failure(format!("automation session unavailable: {}", e));
            }
        };

        let result = self.run_attempt(job, &account, session.as_ref()).await;

        // Scoped-resource guarantee: the session is released on every path.
        if let Err(e) = session.close().await {
            warn!(job_id = %job.id, "failed to close automation session: {}", e);
        }

        match result {
            Ok(detail) => AttemptOutcome::success(detail),
            Err(detail) => AttemptOutcome::failure(detail),
        }
    }

    async fn run_attempt(
        &self,
        job: &Job,
        account: &Account,
        session: &dyn AutomationSession,
    ) -> Result<String, String> {
        if !self.try_session_reuse(job, account, session).await {
            self.fresh_login(job, account, session).await?;
        }
        self.submit_items(job, session).await
    }

    /// Fast path: apply cached cookies if a valid artifact exists.
    ///
    /// Validity (`expires_at` strictly in the future) is re-checked on
    /// every attempt, never carried over from a previous one.
    async fn try_session_reuse(
        &self,
        job: &Job,
        account: &Account,
        session: &dyn AutomationSession,
    ) -> bool {
        let Some(artifact) = self.cache.get(account.id).await else {
            return false;
        };
        if !artifact.is_valid_at(Utc::now()) {
            debug!(job_id = %job.id, "cached session expired");
            return false;
        }

        self.info(job.id, "using saved session cookies for instant login").await;

        let loaded: Result<(), AutomationError> = async {
            session.navigate(&self.config.portal.login_url).await?;
            session.apply_cookies(&artifact.cookies).await
        }
        .await;

        match loaded {
            Ok(()) => true,
            Err(e) => {
                self.warning(
                    job.id,
                    format!("saved session rejected ({}); falling back to fresh login", e),
                )
                .await;
                false
            }
        }
    }

    /// Drive the portal login sequence and cache the captured cookies.
    async fn fresh_login(
        &self,
        job: &Job,
        account: &Account,
        session: &dyn AutomationSession,
    ) -> Result<(), String> {
        self.info(job.id, "performing fresh login").await;

        let portal = &self.config.portal;
        let creds = account.login_credentials();

        session
            .navigate(&portal.login_url)
            .await
            .map_err(|e| format!("login navigation failed: {}", e))?;

        let username = session
            .wait_for_element(&portal.username_field, self.config.element_timeout())
            .await
            .map_err(|e| format!("login form not available: {}", e))?;
        session
            .fill_field(&username, &creds.username)
            .await
            .map_err(|e| format!("could not enter username: {}", e))?;

        let password = session
            .find_element(&portal.password_field)
            .await
            .map_err(|e| format!("password field not found: {}", e))?;
        session
            .fill_field(&password, creds.credential.expose())
            .await
            .map_err(|e| format!("could not enter password: {}", e))?;

        let submit = session
            .find_element(&portal.submit_control)
            .await
            .map_err(|e| format!("login submit control not found: {}", e))?;
        session
            .click(&submit)
            .await
            .map_err(|e| format!("could not submit login form: {}", e))?;

        let url = session
            .current_url()
            .await
            .map_err(|e| format!("could not read post-login location: {}", e))?
            .to_lowercase();

        if portal.second_factor_markers.iter().any(|m| url.contains(m.as_str())) {
            self.warning(job.id, "second-factor challenge encountered during login").await;
            return Err("second-factor challenge encountered".to_string());
        }

        if !portal.login_success_markers.iter().any(|m| url.contains(m.as_str())) {
            return Err(format!("login did not reach an authenticated page (at {})", url));
        }

        let cookies = session
            .cookies()
            .await
            .map_err(|e| format!("could not capture session cookies: {}", e))?;
        let artifact = SessionArtifact::new(cookies, Utc::now() + self.config.session_ttl());
        self.cache.put(account.id, artifact).await;
        self.info(job.id, "login succeeded; session cookies saved for reuse").await;

        Ok(())
    }

    /// Fill all item slots in input order, click add, try to click register,
    /// and classify the outcome from the page text.
    async fn submit_items(&self, job: &Job, session: &dyn AutomationSession) -> Result<String, String> {
        let portal = &self.config.portal;

        session
            .navigate(&portal.registration_url)
            .await
            .map_err(|e| format!("could not open registration page: {}", e))?;
        self.info(job.id, "navigated to registration page").await;

        session
            .wait_for_element(&Locator::tag("body"), self.config.element_timeout())
            .await
            .map_err(|e| format!("registration page did not load: {}", e))?;

        let listed: Vec<&str> = job.items.iter().map(ItemId::as_str).collect();
        self.info(
            job.id,
            format!("submitting {} items: {}", job.items.len(), listed.join(", ")),
        )
        .await;

        for (index, item) in job.items.iter().enumerate() {
            if let Err(e) = self.fill_item_slot(job, session, item, index + 1).await {
                self.error(job.id, format!("could not enter item {}: {}", item, e)).await;
            }
        }

        let add = session
            .find_element(&portal.add_control)
            .await
            .map_err(|e| format!("add control not found: {}", e))?;
        session
            .click(&add)
            .await
            .map_err(|e| format!("could not click add control: {}", e))?;
        self.info(job.id, "clicked add control").await;

        // A missing register control is tolerated with a warning; some
        // portal variants submit directly from the add control.
        match session.find_element(&portal.register_control).await {
            Ok(register) => {
                session
                    .click(&register)
                    .await
                    .map_err(|e| format!("could not click register control: {}", e))?;
                self.info(job.id, "clicked register control").await;
            }
            Err(_) => match session.find_element(&portal.register_control_fallback).await {
                Ok(register) => {
                    session
                        .click(&register)
                        .await
                        .map_err(|e| format!("could not click register control: {}", e))?;
                    self.info(job.id, "clicked register control (fallback)").await;
                }
                Err(_) => {
                    self.warning(job.id, "no register control found; continuing").await;
                }
            },
        }

        let text = session
            .page_text()
            .await
            .map_err(|e| format!("could not read result page: {}", e))?;
        let lowered = text.to_lowercase();

        if portal.success_markers.iter().any(|m| lowered.contains(&m.to_lowercase())) {
            self.info(job.id, "registration appears successful").await;
            Ok("registration confirmed by page content".to_string())
        } else {
            let observed = truncate(&text, portal.detail_max_chars);
            self.warning(job.id, format!("registration not confirmed; page said: {}", observed))
                .await;
            Err(format!("registration not confirmed: {}", observed))
        }
    }

    /// Two-tier slot lookup: try the slot-specific input, then scan
    /// generically named inputs and fill the first unfilled one.
    async fn fill_item_slot(
        &self,
        job: &Job,
        session: &dyn AutomationSession,
        item: &ItemId,
        slot: usize,
    ) -> Result<(), AutomationError> {
        let portal = &self.config.portal;
        let specific = Locator::id(format!("{}{}", portal.item_slot_prefix, slot));

        match session.find_element(&specific).await {
            Ok(input) => {
                session.fill_field(&input, item.as_str()).await?;
                self.info(job.id, format!("entered item {} in slot {}", item, slot)).await;
                return Ok(());
            }
            Err(e) => {
                debug!(job_id = %job.id, slot, "slot locator missed ({}); scanning generic inputs", e);
            }
        }

        let inputs = session
            .find_elements(&Locator::css(portal.item_scan_selector.clone()))
            .await?;
        for input in &inputs {
            if session.field_value(input).await?.is_empty() {
                session.fill_field(input, item.as_str()).await?;
                self.info(job.id, format!("entered item {}", item)).await;
                return Ok(());
            }
        }

        Err(AutomationError::ElementNotFound(format!(
            "no free input slot for item {}",
            item
        )))
    }

    async fn info(&self, job_id: JobId, message: impl Into<String>) {
        self.logs.append(LogEntry::info(job_id, message)).await;
    }

    async fn warning(&self, job_id: JobId, message: impl Into<String>) {
        self.logs.append(LogEntry::warning(job_id, message)).await;
    }

    async fn error(&self, job_id: JobId, message: impl Into<String>) {
        self.logs.append(LogEntry::error(job_id, message)).await;
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
