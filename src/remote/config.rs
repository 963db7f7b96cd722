//! Remote purchase-config loader.
//!
//! Fetches a small JSON document, extracts the nested `purchaseConfig`
//! object, and merges the recognized keys into the store. Fallback chain:
//! remote fetch -> bundled local file -> hardcoded defaults. Nothing is
//! written until a whole document has parsed; missing fields never
//! overwrite stored values.

use crate::store::{keys, LayeredStore, Value};
use crate::UnlockgateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Typed purchase-config payload. Every field is optional; `apply` only
/// writes the fields the document carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseConfig {
    /// Whether the paywall is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_purchase: Option<bool>,

    /// Whether to hide the purchase entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_purchase_entry: Option<bool>,

    /// Evaluation count at which the review prompt first fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub try_rating_trigger_count: Option<i64>,

    /// Evaluation interval for repeat review prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_trigger_count: Option<i64>,
}

impl PurchaseConfig {
    /// The hardcoded last-resort defaults.
    pub fn defaults() -> Self {
        Self {
            need_purchase: Some(true),
            hide_purchase_entry: Some(false),
            try_rating_trigger_count: Some(20),
            rated_trigger_count: Some(100),
        }
    }

    /// Merge this payload into the store: present fields overwrite,
    /// absent fields leave stored values unchanged.
    pub fn apply(&self, store: &LayeredStore) -> Result<(), UnlockgateError> {
        if let Some(need_purchase) = self.need_purchase {
            store.set(keys::NEED_PURCHASE, Value::Bool(need_purchase))?;
        }
        if let Some(hide) = self.hide_purchase_entry {
            store.set(keys::HIDE_PURCHASE_ENTRY, Value::Bool(hide))?;
        }
        if let Some(try_count) = self.try_rating_trigger_count {
            store.set(keys::TRY_RATING_TRIGGER_COUNT, Value::Int(try_count))?;
        }
        if let Some(rated_count) = self.rated_trigger_count {
            store.set(keys::RATED_TRIGGER_COUNT, Value::Int(rated_count))?;
        }
        Ok(())
    }
}

/// Outer config document; unrecognized keys are ignored by serde.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(rename = "purchaseConfig")]
    purchase_config: Option<PurchaseConfig>,
}

/// Loads purchase config from the remote endpoint with local fallbacks.
pub struct RemoteConfigLoader {
    url: String,
    local_path: Option<PathBuf>,
    store: Arc<LayeredStore>,
    http_timeout: Duration,
}

impl RemoteConfigLoader {
    /// Create a loader writing into the given store.
    pub fn new(
        url: impl Into<String>,
        local_path: Option<PathBuf>,
        store: Arc<LayeredStore>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            local_path,
            store,
            http_timeout,
        }
    }

    /// Reload config: remote first, then bundled file, then defaults.
    ///
    /// Network and shape errors are absorbed into the fallback chain;
    /// only store write failures surface. Concurrent reloads are allowed
    /// and last-write-wins on the destination keys.
    pub fn reload(&self) -> Result<(), UnlockgateError> {
        match self.fetch_remote() {
            Ok(config) => config.apply(&self.store),
            Err(e) => {
                tracing::debug!("remote config unavailable, falling back: {}", e);
                self.load_fallback()
            }
        }
    }

    /// Fire-and-forget reload on a background thread.
    pub fn reload_detached(self: &Arc<Self>) {
        let loader = Arc::clone(self);
        std::thread::spawn(move || {
            if let Err(e) = loader.reload() {
                tracing::warn!("config reload failed: {}", e);
            }
        });
    }

    fn fetch_remote(&self) -> Result<PurchaseConfig, UnlockgateError> {
        let client = super::build_client(self.http_timeout)?;
        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| UnlockgateError::NetworkFailure(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(UnlockgateError::NetworkFailure(format!(
                "Config endpoint returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|e| UnlockgateError::NetworkFailure(format!("Failed to read body: {}", e)))?;

        parse_document(&body)
    }

    fn load_fallback(&self) -> Result<(), UnlockgateError> {
        if let Some(path) = &self.local_path {
            match load_local(path) {
                Ok(config) => return config.apply(&self.store),
                Err(e) => {
                    tracing::debug!("bundled config unusable: {}", e);
                }
            }
        }
        tracing::info!("applying hardcoded purchase-config defaults");
        PurchaseConfig::defaults().apply(&self.store)
    }
}

/// Parse a config document and extract its `purchaseConfig` object.
fn parse_document(body: &str) -> Result<PurchaseConfig, UnlockgateError> {
    let document: ConfigDocument = serde_json::from_str(body)
        .map_err(|e| UnlockgateError::MalformedResponse(format!("Config parse error: {}", e)))?;
    document
        .purchase_config
        .ok_or_else(|| UnlockgateError::MalformedResponse("missing purchaseConfig".to_string()))
}

/// Load the bundled fallback config file.
fn load_local(path: &Path) -> Result<PurchaseConfig, UnlockgateError> {
    let body = fs::read_to_string(path)
        .map_err(|e| UnlockgateError::StoreIo(format!("Failed to read bundled config: {}", e)))?;
    parse_document(&body)
}
