//! Accounts and target-site credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::AccountId;
use crate::error::StoreError;

/// Opaque target-site credential.
///
/// The engine never interprets the value; it is only handed to the
/// automation capability during a fresh login. `Debug` output is redacted.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw value for the login sequence.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A registered user's target-site account.
///
/// Created at credential setup (outside the engine); read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Username on the target site.
    pub site_username: String,
    /// Credential on the target site.
    pub credential: Credential,
    /// Whether the account is enrolled in a second factor on the target site.
    pub second_factor_enrolled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account.
    pub fn new(site_username: impl Into<String>, credential: Credential) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_username: site_username.into(),
            credential,
            second_factor_enrolled: false,
            created_at: Utc::now(),
        }
    }

    /// Mark the account as second-factor enrolled.
    pub fn with_second_factor(mut self) -> Self {
        self.second_factor_enrolled = true;
        self
    }

    /// The exact fields the login sequence needs.
    pub fn login_credentials(&self) -> LoginCredentials {
        LoginCredentials {
            username: self.site_username.clone(),
            credential: self.credential.clone(),
        }
    }
}

/// The fields a fresh login needs, decoupled from the full [`Account`].
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    /// Username on the target site.
    pub username: String,
    /// Credential on the target site.
    pub credential: Credential,
}

/// Account lookup trait.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account by ID.
    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
}

/// In-memory account store.
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl MemoryAccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace an account.
    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account);
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }
}
