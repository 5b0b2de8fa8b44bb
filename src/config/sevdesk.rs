//! sevDesk connection settings

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API token
pub const API_TOKEN_ENV: &str = "SEVDESK_API_TOKEN";

/// Configuration for the sevDesk API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SevdeskConfig {
    /// REST API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Web app URL, used to build links to invoices
    #[serde(default = "default_web_url")]
    pub web_url: String,

    /// API token
    pub api_token: Option<String>,

    /// Timeout in seconds for requests
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://my.sevdesk.de/api/v1".into()
}

fn default_web_url() -> String {
    "https://my.sevdesk.de".into()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    500
}

impl Default for SevdeskConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            web_url: default_web_url(),
            api_token: None,
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl SevdeskConfig {
    /// Link to an invoice in the sevDesk web app
    pub fn invoice_url(&self, invoice_id: &str) -> String {
        format!(
            "{}/fi/detail/type/RE/id/{}",
            self.web_url.trim_end_matches('/'),
            invoice_id
        )
    }

    /// Merge another config into this one (non-default values win)
    pub fn merge(&mut self, other: Self) {
        if other.base_url != default_base_url() {
            self.base_url = other.base_url;
        }
        if other.web_url != default_web_url() {
            self.web_url = other.web_url;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
        if other.timeout != default_timeout() {
            self.timeout = other.timeout;
        }
        if other.max_retries != default_max_retries() {
            self.max_retries = other.max_retries;
        }
        if other.retry_delay_ms != default_retry_delay() {
            self.retry_delay_ms = other.retry_delay_ms;
        }
    }
}
