//! sevDesk API access
//!
//! Only the handful of order and invoice calls the project workflow needs:
//! reading status codes for reconciliation and setting an order's status
//! when an offer is approved or reopened.

mod client;
mod retry;
mod types;

pub use client::SevdeskClient;
pub use retry::RetryingApi;
pub use types::{
    ORDER_STATUS_ACCEPTED, ORDER_STATUS_OPEN, RetryPolicy, SevdeskApi, SevdeskError,
    describe_invoice_status, describe_order_status, invoice_is_paid, order_is_accepted,
};

use crate::config::SevdeskConfig;

/// Create the configured client wrapped with retry logic
pub fn create_client(config: &SevdeskConfig) -> Result<RetryingApi<SevdeskClient>, SevdeskError> {
    let client = SevdeskClient::from_config(config)?;
    Ok(RetryingApi::new(client, RetryPolicy::from_config(config)))
}
