//! Scripted fake automation session for tests.
//!
//! The fake models just enough of the target portal for the engine: a
//! login page whose submit click lands on a scripted URL, fillable fields
//! keyed by locator, and a scripted result page text. Every call is
//! recorded so tests can assert submission order and resource release.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regsnipe_core::CookieSet;

use crate::error::AutomationError;
use crate::locator::{ElementHandle, Locator};
use crate::session::{AutomationSession, SessionFactory};

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    WaitFor(String),
    Find(String),
    FindAll(String),
    Fill { target: String, value: String },
    FieldValue(String),
    Click(String),
    PageText,
    CurrentUrl,
    Cookies,
    ApplyCookies,
    Close,
}

/// Scripted behavior for one fake session.
#[derive(Debug, Clone)]
pub struct FakeScript {
    /// URL the session lands on after clicking the login submit control.
    pub post_login_url: String,
    /// Whether `apply_cookies` succeeds.
    pub apply_cookies_ok: bool,
    /// Text returned by `page_text`.
    pub result_page_text: String,
    /// Cookies returned by `cookies`.
    pub cookies: CookieSet,
    /// Locators (display form, e.g. `id=register_button`) that resolve to
    /// not-found / timeout.
    pub missing_elements: HashSet<String>,
    /// Number of generic input slots returned by a CSS scan.
    pub scan_slots: usize,
    /// Whether opening this session fails outright.
    pub fail_open: bool,
}

impl Default for FakeScript {
    fn default() -> Self {
        Self {
            post_login_url: "https://bssoweb.gwu.edu/landing".to_string(),
            apply_cookies_ok: true,
            result_page_text: "You have successfully registered".to_string(),
            cookies: CookieSet(vec![regsnipe_core::Cookie::new("JSESSIONID", "fake")]),
            missing_elements: HashSet::new(),
            scan_slots: 10,
            fail_open: false,
        }
    }
}

impl FakeScript {
    /// Script a login that lands on a second-factor page.
    pub fn second_factor() -> Self {
        Self {
            post_login_url: "https://auth.gwu.edu/2fa/duo".to_string(),
            ..Self::default()
        }
    }

    /// Script a result page with no success-indicating text.
    pub fn registration_rejected() -> Self {
        Self {
            result_page_text: "Unable to add course: closed section".to_string(),
            ..Self::default()
        }
    }

    /// Mark a locator (display form) as unresolvable.
    pub fn without_element(mut self, locator_display: impl Into<String>) -> Self {
        self.missing_elements.insert(locator_display.into());
        self
    }
}

#[derive(Default)]
struct FakeState {
    current_url: String,
    fills: HashMap<String, String>,
    calls: Vec<Call>,
    closed: bool,
}

/// A scripted automation session. Cloning shares the underlying state, so
/// a test can keep a handle while the engine drives the boxed copy.
#[derive(Clone)]
pub struct FakeSession {
    script: Arc<FakeScript>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    /// Create a session with the given script.
    pub fn new(script: FakeScript) -> Self {
        Self {
            script: Arc::new(script),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// All `fill_field` calls in order, as (target, value).
    pub fn fill_values(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fill { target, value } => Some((target, value)),
                _ => None,
            })
            .collect()
    }

    /// All navigated URLs, in order.
    pub fn navigated_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Whether the session was closed.
    pub fn was_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether a fresh login was driven (the username field was filled).
    pub fn performed_login(&self) -> bool {
        self.fill_values().iter().any(|(t, _)| t.contains("username"))
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn check_open(&self) -> Result<(), AutomationError> {
        if self.state.lock().closed {
            return Err(AutomationError::SessionClosed);
        }
        Ok(())
    }

    fn resolve(&self, locator: &Locator) -> Result<ElementHandle, AutomationError> {
        let display = locator.to_string();
        if self.script.missing_elements.contains(&display) {
            return Err(AutomationError::ElementNotFound(display));
        }
        Ok(ElementHandle::new(display))
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        self.check_open()?;
        self.record(Call::Navigate(url.to_string()));
        self.state.lock().current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<ElementHandle, AutomationError> {
        self.check_open()?;
        self.record(Call::WaitFor(locator.to_string()));
        let display = locator.to_string();
        if self.script.missing_elements.contains(&display) {
            return Err(AutomationError::Timeout(display));
        }
        Ok(ElementHandle::new(display))
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, AutomationError> {
        self.check_open()?;
        self.record(Call::Find(locator.to_string()));
        self.resolve(locator)
    }

    async fn find_elements(
        &self,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.check_open()?;
        self.record(Call::FindAll(locator.to_string()));
        if self.script.missing_elements.contains(&locator.to_string()) {
            return Ok(Vec::new());
        }
        Ok((1..=self.script.scan_slots)
            .map(|i| ElementHandle::new(format!("scan_input_{}", i)))
            .collect())
    }

    async fn fill_field(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), AutomationError> {
        self.check_open()?;
        self.record(Call::Fill {
            target: element.reference().to_string(),
            value: value.to_string(),
        });
        self.state
            .lock()
            .fills
            .insert(element.reference().to_string(), value.to_string());
        Ok(())
    }

    async fn field_value(&self, element: &ElementHandle) -> Result<String, AutomationError> {
        self.check_open()?;
        self.record(Call::FieldValue(element.reference().to_string()));
        Ok(self
            .state
            .lock()
            .fills
            .get(element.reference())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), AutomationError> {
        self.check_open()?;
        self.record(Call::Click(element.reference().to_string()));
        // Clicking the login submit lands on the scripted post-login URL.
        if element.reference().contains("submit") {
            self.state.lock().current_url = self.script.post_login_url.clone();
        }
        Ok(())
    }

    async fn page_text(&self) -> Result<String, AutomationError> {
        self.check_open()?;
        self.record(Call::PageText);
        Ok(self.script.result_page_text.clone())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        self.check_open()?;
        self.record(Call::CurrentUrl);
        Ok(self.state.lock().current_url.clone())
    }

    async fn cookies(&self) -> Result<CookieSet, AutomationError> {
        self.check_open()?;
        self.record(Call::Cookies);
        Ok(self.script.cookies.clone())
    }

    async fn apply_cookies(&self, _cookies: &CookieSet) -> Result<(), AutomationError> {
        self.check_open()?;
        self.record(Call::ApplyCookies);
        if !self.script.apply_cookies_ok {
            return Err(AutomationError::Cookie("saved cookies rejected".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), AutomationError> {
        self.record(Call::Close);
        self.state.lock().closed = true;
        Ok(())
    }
}

/// Factory handing out one scripted session per attempt.
///
/// Scripts pushed with [`push_script`](FakeFactory::push_script) are
/// consumed first (one per open), then the default script applies. Every
/// opened session stays reachable through [`sessions`](FakeFactory::sessions).
pub struct FakeFactory {
    default_script: FakeScript,
    queued: Mutex<VecDeque<FakeScript>>,
    sessions: Mutex<Vec<FakeSession>>,
}

impl FakeFactory {
    /// Create a factory with a default script for every attempt.
    pub fn new(default_script: FakeScript) -> Self {
        Self {
            default_script,
            queued: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Queue a script for the next opened session.
    pub fn push_script(&self, script: FakeScript) {
        self.queued.lock().push_back(script);
    }

    /// All sessions opened so far, in order.
    pub fn sessions(&self) -> Vec<FakeSession> {
        self.sessions.lock().clone()
    }

    /// Number of sessions opened so far.
    pub fn opened(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, AutomationError> {
        let script = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());
        if script.fail_open {
            return Err(AutomationError::SessionUnavailable(
                "scripted open failure".to_string(),
            ));
        }
        let session = FakeSession::new(script);
        self.sessions.lock().push(session.clone());
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let session = FakeSession::new(FakeScript::default());

        session.navigate("https://example.edu/").await.unwrap();
        let field = session.find_element(&Locator::name("username")).await.unwrap();
        session.fill_field(&field, "gwuser").await.unwrap();
        session.close().await.unwrap();

        let calls = session.calls();
        assert_eq!(calls[0], Call::Navigate("https://example.edu/".to_string()));
        assert_eq!(calls[1], Call::Find("name=username".to_string()));
        assert_eq!(
            calls[2],
            Call::Fill {
                target: "name=username".to_string(),
                value: "gwuser".to_string()
            }
        );
        assert_eq!(calls[3], Call::Close);
        assert!(session.was_closed());
    }

    #[tokio::test]
    async fn test_submit_click_lands_on_post_login_url() {
        let session = FakeSession::new(FakeScript::second_factor());
        session.navigate("https://portal.gwu.edu/").await.unwrap();
        let submit = session
            .find_element(&Locator::xpath("//input[@type='submit']"))
            .await
            .unwrap();
        session.click(&submit).await.unwrap();
        assert_eq!(
            session.current_url().await.unwrap(),
            "https://auth.gwu.edu/2fa/duo"
        );
    }

    #[tokio::test]
    async fn test_missing_element() {
        let script = FakeScript::default().without_element("id=register_button");
        let session = FakeSession::new(script);
        session.navigate("https://portal.gwu.edu/").await.unwrap();

        let result = session.find_element(&Locator::id("register_button")).await;
        assert!(matches!(result, Err(AutomationError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let session = FakeSession::new(FakeScript::default());
        session.close().await.unwrap();
        let result = session.navigate("https://example.edu/").await;
        assert!(matches!(result, Err(AutomationError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_factory_queues_scripts() {
        let factory = FakeFactory::new(FakeScript::default());
        factory.push_script(FakeScript::second_factor());

        factory.open().await.unwrap();
        factory.open().await.unwrap();

        let sessions = factory.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(
            sessions[0].script.post_login_url,
            "https://auth.gwu.edu/2fa/duo"
        );
        assert_eq!(
            sessions[1].script.post_login_url,
            "https://bssoweb.gwu.edu/landing"
        );
    }

    #[tokio::test]
    async fn test_factory_scripted_open_failure() {
        let factory = FakeFactory::new(FakeScript::default());
        factory.push_script(FakeScript {
            fail_open: true,
            ..FakeScript::default()
        });
        let result = factory.open().await;
        assert!(matches!(result, Err(AutomationError::SessionUnavailable(_))));
    }
}
