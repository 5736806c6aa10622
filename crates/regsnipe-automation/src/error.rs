//! Automation errors.

use thiserror::Error;

/// Automation capability errors.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Could not open an automation context.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Element not found.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element wait timed out.
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    /// Interaction with an element failed.
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// Cookie capture or application failed.
    #[error("Cookie error: {0}")]
    Cookie(String),

    /// Session already closed.
    #[error("Session closed")]
    SessionClosed,
}
