//! # Regsnipe Core
//!
//! Domain model and shared stores for the regsnipe registration engine.
//!
//! ## Features
//!
//! - Accounts and opaque target-site credentials
//! - Registration jobs with a strict status progression
//! - Append-only per-job log sink
//! - Session artifact cache (cookie reuse vs. fresh login)
//! - In-memory store implementations behind async traits

pub mod account;
pub mod error;
pub mod job;
pub mod log;
pub mod session;
pub mod store;

pub use account::{Account, AccountStore, Credential, LoginCredentials, MemoryAccountStore};
pub use error::StoreError;
pub use job::{ItemId, Job, JobStatus};
pub use log::{LogEntry, LogLevel, LogSink, MemoryLogSink};
pub use session::{Cookie, CookieSet, MemorySessionCache, SessionArtifact, SessionCache};
pub use store::{JobStore, MemoryJobStore};

/// Job identifier.
pub type JobId = uuid::Uuid;

/// Account identifier.
pub type AccountId = uuid::Uuid;
