//! The automation session traits.

use std::time::Duration;

use async_trait::async_trait;
use regsnipe_core::CookieSet;

use crate::error::AutomationError;
use crate::locator::{ElementHandle, Locator};

/// One automation context (a browser page) driving the target site.
///
/// A session is exclusively owned by one attempt and must be released via
/// [`close`](AutomationSession::close) on every exit path.
#[async_trait]
pub trait AutomationSession: Send + Sync {
    /// Load a URL.
    async fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    /// Wait until an element is present, up to `timeout`.
    async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle, AutomationError>;

    /// Locate an element on the current page.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, AutomationError>;

    /// Locate all elements matching a locator on the current page.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, AutomationError>;

    /// Clear a field and type a value into it.
    async fn fill_field(&self, element: &ElementHandle, value: &str)
    -> Result<(), AutomationError>;

    /// Current value of a field.
    async fn field_value(&self, element: &ElementHandle) -> Result<String, AutomationError>;

    /// Click an element.
    async fn click(&self, element: &ElementHandle) -> Result<(), AutomationError>;

    /// Visible text of the current page.
    async fn page_text(&self) -> Result<String, AutomationError>;

    /// URL of the current page.
    async fn current_url(&self) -> Result<String, AutomationError>;

    /// All cookies of the current context.
    async fn cookies(&self) -> Result<CookieSet, AutomationError>;

    /// Apply a stored cookie set onto the current context.
    async fn apply_cookies(&self, cookies: &CookieSet) -> Result<(), AutomationError>;

    /// Release the context. Idempotent.
    async fn close(&self) -> Result<(), AutomationError>;
}

/// Opens a fresh automation session per attempt.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new session.
    async fn open(&self) -> Result<Box<dyn AutomationSession>, AutomationError>;
}
