//! Billing value types: products, transactions, downloads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Platform-reported catalog entry. Immutable snapshot; the catalog
/// replaces its product list wholesale on each completed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: String,
    /// Localized title.
    pub title: String,
    /// Localized description.
    pub description: String,
    /// Price in the store's currency units.
    pub price: f64,
    /// Price locale identifier (e.g., "en_US").
    pub price_locale: String,
}

/// Why a payment failed, as reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentError {
    /// The user backed out. Suppressed from status notifications.
    Cancelled,
    /// Any other platform failure.
    Other(String),
}

/// Platform transaction state for one purchase or restore attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionState {
    /// Payment is being processed; not externally visible.
    Purchasing,
    /// Awaiting external approval (e.g., ask-to-buy). The app stays usable.
    Deferred,
    /// Payment confirmed; content may still need downloading.
    Purchased,
    /// A previous purchase was restored.
    Restored,
    /// The payment failed.
    Failed(PaymentError),
}

/// One transaction-queue update for one product id.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    /// Platform transaction identifier.
    pub id: String,
    /// Product this transaction is for.
    pub product_id: String,
    /// Current transaction state.
    pub state: TransactionState,
    /// Hosted-content downloads attached to this transaction. A confirmed
    /// transaction with no downloads is content-delivered immediately.
    pub downloads: Vec<DownloadHandle>,
}

/// Reference to one hosted-content download of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadHandle {
    /// Platform download identifier.
    pub id: String,
    /// The transaction this download belongs to.
    pub transaction_id: String,
    /// Product the owning transaction is for.
    pub product_id: String,
}

/// Hosted-content download state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Queued; needs an explicit start/resume request.
    Waiting,
    /// Transferring.
    Active,
    /// Paused; no notification is emitted.
    Paused,
    /// Completed successfully.
    Finished,
    /// Failed; partial content is deleted best-effort.
    Failed,
    /// Cancelled; partial content is deleted best-effort.
    Cancelled,
}

impl DownloadState {
    /// Whether this download no longer blocks transaction completion.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DownloadState::Finished | DownloadState::Failed | DownloadState::Cancelled
        )
    }
}

/// One download progress/state event from the platform.
#[derive(Debug, Clone)]
pub struct DownloadEvent {
    /// The download this event is about.
    pub download: DownloadHandle,
    /// New download state.
    pub state: DownloadState,
    /// Progress fraction in `[0, 1]`.
    pub progress: f32,
    /// Where (partial) content landed, if the platform reported a location.
    pub content_path: Option<PathBuf>,
}

/// Result of a product-information query.
#[derive(Debug, Clone, Default)]
pub struct ProductQueryResponse {
    /// Products the store recognized.
    pub products: Vec<Product>,
    /// Identifiers the store rejected.
    pub invalid_ids: Vec<String>,
}
