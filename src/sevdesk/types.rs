//! Core types and traits for the sevDesk API

use crate::config::SevdeskConfig;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Order (offer) status codes
pub const ORDER_STATUS_DRAFT: u16 = 100;
pub const ORDER_STATUS_OPEN: u16 = 200;
pub const ORDER_STATUS_REJECTED: u16 = 300;
pub const ORDER_STATUS_ACCEPTED: u16 = 500;

/// Invoice status codes
pub const INVOICE_STATUS_DRAFT: u16 = 100;
pub const INVOICE_STATUS_OPEN: u16 = 200;
pub const INVOICE_STATUS_PAID: [u16; 2] = [400, 1000];

pub fn order_is_accepted(code: u16) -> bool {
    code == ORDER_STATUS_ACCEPTED
}

pub fn invoice_is_paid(code: u16) -> bool {
    INVOICE_STATUS_PAID.contains(&code)
}

/// Readable name of an order status code, for logs
pub fn describe_order_status(code: u16) -> &'static str {
    match code {
        ORDER_STATUS_DRAFT => "draft",
        ORDER_STATUS_OPEN => "open",
        ORDER_STATUS_REJECTED => "rejected",
        ORDER_STATUS_ACCEPTED => "accepted",
        _ => "other",
    }
}

/// Readable name of an invoice status code, for logs
pub fn describe_invoice_status(code: u16) -> &'static str {
    match code {
        INVOICE_STATUS_DRAFT => "draft",
        INVOICE_STATUS_OPEN => "open",
        c if invoice_is_paid(c) => "paid",
        _ => "other",
    }
}

/// Errors returned by sevDesk requests
#[derive(Debug, Clone, Error)]
pub enum SevdeskError {
    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by sevDesk
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// API token missing or rejected
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The referenced object does not exist
    #[error("{object} {id} not found")]
    NotFound { object: &'static str, id: String },

    /// Network error or server-side failure
    #[error("network error: {message}")]
    Network { message: String },

    /// Unexpected response body
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Invalid client configuration or rejected request
    #[error("invalid request: {message}")]
    Config { message: String },
}

impl SevdeskError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SevdeskError::Timeout { .. }
                | SevdeskError::RateLimit { .. }
                | SevdeskError::Network { .. }
        )
    }

    /// Server-suggested delay for rate limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SevdeskError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// The sevDesk operations the workflow depends on
#[async_trait]
pub trait SevdeskApi: Send + Sync {
    /// Current status code of an order (offer)
    async fn fetch_order_status(&self, order_id: &str) -> Result<u16, SevdeskError>;

    /// Current status code of an invoice
    async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<u16, SevdeskError>;

    /// Set the status code of an order
    async fn set_order_status(&self, order_id: &str, status: u16) -> Result<(), SevdeskError>;
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries
    pub max_retries: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SevdeskConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_delay_ms),
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // up to 25% on top
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert!(order_is_accepted(500));
        assert!(!order_is_accepted(ORDER_STATUS_OPEN));
        assert!(!order_is_accepted(ORDER_STATUS_REJECTED));

        assert!(invoice_is_paid(400));
        assert!(invoice_is_paid(1000));
        assert!(!invoice_is_paid(INVOICE_STATUS_OPEN));
        assert!(!invoice_is_paid(INVOICE_STATUS_DRAFT));
    }

    #[test]
    fn test_describe_status() {
        assert_eq!(describe_order_status(500), "accepted");
        assert_eq!(describe_order_status(750), "other");
        assert_eq!(describe_invoice_status(400), "paid");
        assert_eq!(describe_invoice_status(200), "open");
    }

    #[test]
    fn test_error_retryable() {
        assert!(SevdeskError::timeout(Duration::from_secs(30)).is_retryable());
        assert!(SevdeskError::rate_limit(None).is_retryable());
        assert!(SevdeskError::network("connection reset").is_retryable());

        assert!(!SevdeskError::auth("invalid token").is_retryable());
        assert!(!SevdeskError::parse("invalid json").is_retryable());
        assert!(
            !SevdeskError::NotFound {
                object: "Order",
                id: "1".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_display() {
        let err = SevdeskError::NotFound {
            object: "Invoice",
            id: "77".into(),
        };
        assert_eq!(err.to_string(), "Invoice 77 not found");
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_policy_with_jitter() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            jitter: true,
            ..Default::default()
        };

        let delay = policy.delay_for_attempt(0);
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_millis(1250));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = SevdeskConfig {
            max_retries: 5,
            retry_delay_ms: 250,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
    }
}
