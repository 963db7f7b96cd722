//! Unlockgate configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the unlockgate purchase stack.
///
/// This struct contains all product-specific settings: the single unlock
/// product id, the remote config and price-lookup endpoints, and the two
/// persistent store scopes.
#[derive(Debug, Clone)]
pub struct UnlockgateConfig {
    /// The single purchasable product identifier (e.g., "com.example.app.unlock").
    pub product_id: String,

    /// URL of the remote purchase-config JSON document.
    pub config_url: String,

    /// URL of the app price lookup endpoint.
    pub price_lookup_url: String,

    /// Optional bundled fallback config file with the same `purchaseConfig` shape.
    ///
    /// Used when the remote fetch fails or returns an unusable document.
    pub local_config_path: Option<PathBuf>,

    /// Namespace for the local store scope under `dirs::data_dir()`.
    pub local_namespace: String,

    /// Namespace for the shared store scope (e.g., an app-group container
    /// readable by a companion extension). `None` degrades to local-only.
    pub shared_namespace: Option<String>,

    /// Timeout for HTTP round-trips (config and price fetch).
    pub http_timeout: Duration,

    /// How long awaited purchase/restore calls wait for a terminal billing
    /// event before failing with `Timeout`.
    pub event_timeout: Duration,
}

impl UnlockgateConfig {
    /// Create a config with the given product id and namespaces, using
    /// default timeouts (30 s HTTP, 60 s event wait).
    pub fn new(product_id: impl Into<String>, local_namespace: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            config_url: String::new(),
            price_lookup_url: String::new(),
            local_config_path: None,
            local_namespace: local_namespace.into(),
            shared_namespace: None,
            http_timeout: Duration::from_secs(30),
            event_timeout: Duration::from_secs(60),
        }
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::UnlockgateError> {
        if self.product_id.is_empty() {
            return Err(crate::UnlockgateError::ConfigError(
                "product_id cannot be empty".to_string(),
            ));
        }
        if self.local_namespace.is_empty() {
            return Err(crate::UnlockgateError::ConfigError(
                "local_namespace cannot be empty".to_string(),
            ));
        }
        if let Some(shared) = &self.shared_namespace {
            if shared == &self.local_namespace {
                return Err(crate::UnlockgateError::ConfigError(
                    "shared_namespace must differ from local_namespace".to_string(),
                ));
            }
        }
        if self.event_timeout.is_zero() {
            return Err(crate::UnlockgateError::ConfigError(
                "event_timeout cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let config = UnlockgateConfig::new("com.example.unlock", "unlockgate-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_product_id_rejected() {
        let config = UnlockgateConfig::new("", "unlockgate-test");
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_namespace_rejected() {
        let config = UnlockgateConfig::new("com.example.unlock", "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn colliding_scopes_rejected() {
        let mut config = UnlockgateConfig::new("com.example.unlock", "ns");
        config.shared_namespace = Some("ns".to_string());
        assert!(config.validate().is_err());
    }
}
