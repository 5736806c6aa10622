//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regsnipe_automation::Locator;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid value.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Engine policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum attempts per job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Scheduler poll granularity, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Lifetime of captured session cookies, in hours.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,

    /// Timeout for element waits, in seconds.
    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,

    /// Target portal layout.
    #[serde(default)]
    pub portal: PortalConfig,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_session_ttl() -> i64 {
    24
}

fn default_element_timeout() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            poll_interval_ms: default_poll_interval(),
            session_ttl_hours: default_session_ttl(),
            element_timeout_secs: default_element_timeout(),
            portal: PortalConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate policy values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session_ttl_hours < 1 {
            return Err(ConfigError::InvalidValue {
                field: "session_ttl_hours".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.portal.login_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "portal.login_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.portal.registration_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "portal.registration_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.portal.success_markers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "portal.success_markers".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Scheduler poll granularity.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Element wait timeout.
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    /// Session artifact lifetime.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

/// Layout of the target registration portal: URLs, locators, and the
/// page-text markers used to classify outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal entry URL, also used as the login page.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Registration form URL.
    #[serde(default = "default_registration_url")]
    pub registration_url: String,

    /// Username field locator.
    #[serde(default = "default_username_field")]
    pub username_field: Locator,

    /// Password field locator.
    #[serde(default = "default_password_field")]
    pub password_field: Locator,

    /// Login submit control locator.
    #[serde(default = "default_submit_control")]
    pub submit_control: Locator,

    /// Prefix for slot-specific item inputs; slot `n` is `{prefix}{n}`.
    #[serde(default = "default_item_slot_prefix")]
    pub item_slot_prefix: String,

    /// CSS selector for the generic item-input fallback scan.
    #[serde(default = "default_item_scan_selector")]
    pub item_scan_selector: String,

    /// Control that adds the entered items.
    #[serde(default = "default_add_control")]
    pub add_control: Locator,

    /// Control that submits the registration.
    #[serde(default = "default_register_control")]
    pub register_control: Locator,

    /// Fallback locator for the registration control.
    #[serde(default = "default_register_fallback")]
    pub register_control_fallback: Locator,

    /// URL substrings indicating an authenticated post-login page.
    #[serde(default = "default_login_success_markers")]
    pub login_success_markers: Vec<String>,

    /// URL substrings indicating a second-factor challenge.
    #[serde(default = "default_second_factor_markers")]
    pub second_factor_markers: Vec<String>,

    /// Page-text substrings indicating a successful registration.
    #[serde(default = "default_success_markers")]
    pub success_markers: Vec<String>,

    /// Maximum characters of page text carried in a failure detail.
    #[serde(default = "default_detail_max_chars")]
    pub detail_max_chars: usize,
}

fn default_login_url() -> String {
    "https://gweb-site.gwu.edu/".to_string()
}

fn default_registration_url() -> String {
    "https://bssoweb.gwu.edu:8002/StudentRegistrationSsb/ssb/registration/".to_string()
}

fn default_username_field() -> Locator {
    Locator::name("username")
}

fn default_password_field() -> Locator {
    Locator::name("password")
}

fn default_submit_control() -> Locator {
    Locator::xpath("//input[@type='submit']")
}

fn default_item_slot_prefix() -> String {
    "txt_crn".to_string()
}

fn default_item_scan_selector() -> String {
    "input[name*='crn'], input[id*='crn']".to_string()
}

fn default_add_control() -> Locator {
    Locator::id("add_crn_button")
}

fn default_register_control() -> Locator {
    Locator::id("register_button")
}

fn default_register_fallback() -> Locator {
    Locator::xpath("//input[@value='Register']")
}

fn default_login_success_markers() -> Vec<String> {
    vec!["bssoweb".to_string(), "gwu.edu".to_string()]
}

fn default_second_factor_markers() -> Vec<String> {
    vec!["2fa".to_string(), "duo".to_string()]
}

fn default_success_markers() -> Vec<String> {
    vec!["successfully".to_string(), "registered".to_string()]
}

fn default_detail_max_chars() -> usize {
    300
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            registration_url: default_registration_url(),
            username_field: default_username_field(),
            password_field: default_password_field(),
            submit_control: default_submit_control(),
            item_slot_prefix: default_item_slot_prefix(),
            item_scan_selector: default_item_scan_selector(),
            add_control: default_add_control(),
            register_control: default_register_control(),
            register_control_fallback: default_register_fallback(),
            login_success_markers: default_login_success_markers(),
            second_factor_markers: default_second_factor_markers(),
            success_markers: default_success_markers(),
            detail_max_chars: default_detail_max_chars(),
        }
    }
}
