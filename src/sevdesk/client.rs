//! HTTP client for the sevDesk REST API

use super::types::{SevdeskApi, SevdeskError};
use crate::config::SevdeskConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// sevDesk REST client
#[derive(Debug, Clone)]
pub struct SevdeskClient {
    /// API base URL, e.g. https://my.sevdesk.de/api/v1
    base_url: String,

    /// API token (sent verbatim in the Authorization header)
    api_token: Option<String>,

    /// Per-request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

/// Envelope wrapping every sevDesk response
#[derive(Debug, Deserialize)]
struct ObjectsResponse {
    objects: Value,
}

impl SevdeskClient {
    /// Create a client from config
    pub fn from_config(config: &SevdeskConfig) -> Result<Self, SevdeskError> {
        let timeout = Duration::from_secs(config.timeout);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SevdeskError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_token: config.api_token.clone(),
            timeout,
            client,
        })
    }

    fn object_url(&self, object: &str, id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/{}/{}", base, object, id)
    }

    fn token(&self) -> Result<&str, SevdeskError> {
        self.api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SevdeskError::auth("no sevDesk API token configured"))
    }

    /// Map HTTP status to SevdeskError
    ///
    /// `retry_after` is the value of the `Retry-After` header, if any; the body
    /// is only consulted when the header is missing or unusable.
    fn map_http_error(
        &self,
        status: reqwest::StatusCode,
        retry_after: Option<&str>,
        body: &str,
        object: &'static str,
        id: &str,
    ) -> SevdeskError {
        match status.as_u16() {
            401 | 403 => SevdeskError::auth(format!("HTTP {}: {}", status, body)),
            404 => SevdeskError::NotFound {
                object,
                id: id.to_string(),
            },
            429 => SevdeskError::rate_limit(
                retry_after
                    .and_then(parse_retry_after_header)
                    .or_else(|| parse_retry_after(body)),
            ),
            408 | 504 => SevdeskError::timeout(self.timeout),
            400..=499 => SevdeskError::Config {
                message: format!("HTTP {}: {}", status, body),
            },
            _ => SevdeskError::network(format!("HTTP {}: {}", status, body)),
        }
    }

    fn map_request_error(e: reqwest::Error, elapsed: Duration) -> SevdeskError {
        if e.is_timeout() {
            SevdeskError::timeout(elapsed)
        } else if e.is_connect() {
            SevdeskError::network(format!("connection failed: {}", e))
        } else {
            SevdeskError::network(format!("request failed: {}", e))
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        object: &'static str,
        id: &str,
    ) -> Result<String, SevdeskError> {
        let start = Instant::now();
        let request = request
            .header("Authorization", self.token()?)
            .header("Accept", "application/json");

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, start.elapsed()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_request_error(e, start.elapsed()))?;

        tracing::debug!(
            object,
            id,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sevDesk response"
        );

        if status.is_success() {
            Ok(body)
        } else {
            Err(self.map_http_error(status, retry_after.as_deref(), &body, object, id))
        }
    }

    async fn fetch_status(&self, object: &'static str, id: &str) -> Result<u16, SevdeskError> {
        let request = self.client.get(self.object_url(object, id));
        let body = self.send(request, object, id).await?;
        parse_status(&body, object, id)
    }
}

#[async_trait]
impl SevdeskApi for SevdeskClient {
    async fn fetch_order_status(&self, order_id: &str) -> Result<u16, SevdeskError> {
        self.fetch_status("Order", order_id).await
    }

    async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<u16, SevdeskError> {
        self.fetch_status("Invoice", invoice_id).await
    }

    async fn set_order_status(&self, order_id: &str, status: u16) -> Result<(), SevdeskError> {
        let request = self
            .client
            .put(self.object_url("Order", order_id))
            .json(&serde_json::json!({ "status": status }));
        self.send(request, "Order", order_id).await?;

        tracing::info!(order_id, status, "Updated sevDesk order status");
        Ok(())
    }
}

/// Extract the numeric status from a `{"objects": ...}` body
///
/// sevDesk returns either a single object or a one-element array, and the
/// status as a string ("500") or a number.
fn parse_status(body: &str, object: &'static str, id: &str) -> Result<u16, SevdeskError> {
    let envelope: ObjectsResponse = serde_json::from_str(body)
        .map_err(|e| SevdeskError::parse(format!("failed to parse {} response: {}", object, e)))?;

    let item = match &envelope.objects {
        Value::Array(items) => items.first().ok_or_else(|| SevdeskError::NotFound {
            object,
            id: id.to_string(),
        })?,
        other => other,
    };

    match item.get("status") {
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| SevdeskError::parse(format!("invalid {} status '{}'", object, s))),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| SevdeskError::parse(format!("invalid {} status {}", object, n))),
        _ => Err(SevdeskError::parse(format!("{} {} has no status", object, id))),
    }
}

/// Delay-seconds form of `Retry-After`; HTTP dates are ignored
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_retry_after(body: &str) -> Option<Duration> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    let seconds = json.get("retry_after").and_then(|v| v.as_f64())?;
    Duration::try_from_secs_f64(seconds).ok()
}
