//! Retry wrapper with exponential backoff

use super::types::{RetryPolicy, SevdeskApi, SevdeskError};
use async_trait::async_trait;
use std::future::Future;

/// Wrapper that adds retry logic to any sevDesk API implementation
pub struct RetryingApi<T: SevdeskApi> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: SevdeskApi> RetryingApi<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<R, F, Fut>(&self, operation: &str, mut call: F) -> Result<R, SevdeskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, SevdeskError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.policy.max_retries => {
                    return Err(e);
                }
                Err(e) => {
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| self.policy.delay_for_attempt(attempt));

                    tracing::debug!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying sevDesk request"
                    );

                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl<T: SevdeskApi + 'static> SevdeskApi for RetryingApi<T> {
    async fn fetch_order_status(&self, order_id: &str) -> Result<u16, SevdeskError> {
        self.run("fetch_order_status", || self.inner.fetch_order_status(order_id))
            .await
    }

    async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<u16, SevdeskError> {
        self.run("fetch_invoice_status", || {
            self.inner.fetch_invoice_status(invoice_id)
        })
        .await
    }

    async fn set_order_status(&self, order_id: &str, status: u16) -> Result<(), SevdeskError> {
        self.run("set_order_status", || {
            self.inner.set_order_status(order_id, status)
        })
        .await
    }
}
