//! Remote config and price lookups over HTTP.

pub mod config;
pub mod price;

pub use config::{PurchaseConfig, RemoteConfigLoader};
pub use price::PriceLookup;

use crate::UnlockgateError;
use std::time::Duration;

/// Build the blocking HTTP client both loaders share.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, UnlockgateError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UnlockgateError::NetworkFailure(format!("Failed to create client: {}", e)))
}
