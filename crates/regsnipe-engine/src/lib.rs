//! # Regsnipe Engine
//!
//! The job execution engine: fires registration jobs at their target
//! time, drives repeated attempts with a fixed retry budget, and decides
//! per attempt between cookie reuse and fresh authentication.
//!
//! ## Components
//!
//! - [`Scheduler`]: one-shot firing at an absolute instant, polled with
//!   bounded slack; each dispatched job runs on its own task
//! - [`RetryDriver`]: the `Pending → Running → {Completed | Failed}` state
//!   machine with a fixed inter-attempt delay
//! - [`AttemptExecutor`]: one complete attempt — session reuse or fresh
//!   login, ordered item submission, outcome classification
//! - [`Engine`]: the facade the web-facing collaborator calls
//!   (`create_job`, `job_status`, `cancel_job`)

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod executor;
pub mod scheduler;

pub use config::{ConfigError, EngineConfig, PortalConfig};
pub use driver::RetryDriver;
pub use engine::{Engine, JobReport, parse_fire_time};
pub use error::EngineError;
pub use executor::{AttemptExecutor, AttemptOutcome};
pub use scheduler::Scheduler;
