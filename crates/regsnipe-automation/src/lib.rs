//! # Regsnipe Automation
//!
//! The automation capability boundary: the narrow interface the engine
//! drives to navigate the target site, fill fields, click controls, read
//! page text, and get/set session cookies.
//!
//! The engine only depends on the [`AutomationSession`] trait; a concrete
//! backend (WebDriver, CDP) lives outside this workspace. The [`fake`]
//! module ships a scripted, call-recording session for tests.

pub mod error;
pub mod fake;
pub mod locator;
pub mod session;

pub use error::AutomationError;
pub use locator::{ElementHandle, Locator};
pub use session::{AutomationSession, SessionFactory};
