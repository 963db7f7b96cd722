//! Unlockgate error types.

use thiserror::Error;

/// Errors that can occur during purchase, restore, or config handling.
#[derive(Debug, Error)]
pub enum UnlockgateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP transport error fetching remote config or price data.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Response body could not be parsed or is missing required fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The billing API returned no products for the requested identifiers.
    #[error("No products found for the requested identifiers")]
    ProductNotFound,

    /// The billing API rejected one or more product identifiers.
    #[error("Invalid product identifiers: {ids:?}")]
    InvalidIdentifiers {
        /// The identifiers the billing API did not recognize.
        ids: Vec<String>,
    },

    /// A purchase attempt failed.
    #[error("Purchase failed: {reason}")]
    PurchaseFailed {
        /// Platform-reported failure reason.
        reason: String,
    },

    /// A restore attempt failed.
    #[error("Restore failed: {reason}")]
    RestoreFailed {
        /// Platform-reported failure reason.
        reason: String,
    },

    /// The platform disallows payments on this device/account.
    #[error("This device is not able or allowed to make payments")]
    CannotMakePayments,

    /// The user cancelled the purchase or restore.
    ///
    /// Suppressed from status notifications, but the transaction is still
    /// finished so the platform queue does not stall.
    #[error("Cancelled by user")]
    UserCancelled,

    /// Key/value store I/O error.
    #[error("Store I/O error: {0}")]
    StoreIo(String),

    /// An awaited purchase/restore event did not arrive in time.
    #[error("Timed out waiting for a billing event")]
    Timeout,
}
