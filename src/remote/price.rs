//! App price lookup.
//!
//! Queries the store's lookup endpoint (`{ "results": [ { "price": ... } ] }`),
//! takes the first result's price, and persists it to `appPrice`. The
//! endpoint reports the price as either a JSON number or a string.

use crate::store::{keys, LayeredStore, Value};
use crate::UnlockgateError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LookupDocument {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    price: Option<PriceField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceField {
    Number(f64),
    Text(String),
}

impl PriceField {
    fn as_f64(&self) -> Option<f64> {
        match self {
            PriceField::Number(n) => Some(*n),
            PriceField::Text(s) => s.parse().ok(),
        }
    }
}

/// Fetches and persists the app's store price.
pub struct PriceLookup {
    url: String,
    store: Arc<LayeredStore>,
    http_timeout: Duration,
}

impl PriceLookup {
    /// Create a lookup writing into the given store.
    pub fn new(url: impl Into<String>, store: Arc<LayeredStore>, http_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            store,
            http_timeout,
        }
    }

    /// Fetch the current price, persist it, and return it.
    ///
    /// # Errors
    /// - `NetworkFailure` - transport or non-success status
    /// - `MalformedResponse` - unparseable body or no usable price
    pub fn reload(&self) -> Result<f64, UnlockgateError> {
        let client = super::build_client(self.http_timeout)?;
        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| UnlockgateError::NetworkFailure(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(UnlockgateError::NetworkFailure(format!(
                "Price endpoint returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|e| UnlockgateError::NetworkFailure(format!("Failed to read body: {}", e)))?;

        let price = parse_price(&body)?;
        self.store.set(keys::APP_PRICE, Value::Float(price))?;
        tracing::debug!(price, "app price refreshed");
        Ok(price)
    }
}

/// Extract the first result's price from a lookup document.
fn parse_price(body: &str) -> Result<f64, UnlockgateError> {
    let document: LookupDocument = serde_json::from_str(body)
        .map_err(|e| UnlockgateError::MalformedResponse(format!("Lookup parse error: {}", e)))?;

    document
        .results
        .first()
        .and_then(|r| r.price.as_ref())
        .and_then(|p| p.as_f64())
        .ok_or_else(|| UnlockgateError::MalformedResponse("no usable price in results".to_string()))
}
