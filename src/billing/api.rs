//! The platform billing API trait.
//!
//! Everything the purchase stack asks of the platform goes through this
//! seam: product queries, payment submission, restores, transaction
//! acknowledgment, and hosted-content download control. Production code
//! implements it over the real store APIs; tests drive the tracker and
//! facade with an in-memory mock.

use crate::billing::types::{DownloadHandle, Product, ProductQueryResponse};
use crate::UnlockgateError;

/// Platform billing operations.
///
/// Transaction and download *events* flow the other way: the platform
/// integration feeds them into
/// [`TransactionTracker`](crate::tracker::TransactionTracker) handlers.
pub trait BillingApi: Send + Sync {
    /// Whether this device/account is allowed to make payments at all.
    fn can_make_payments(&self) -> bool;

    /// Query product information for a set of identifiers.
    ///
    /// Blocking round-trip; the response carries both recognized products
    /// and rejected identifiers.
    fn query_products(&self, ids: &[String]) -> Result<ProductQueryResponse, UnlockgateError>;

    /// Submit a payment for a product. Resulting transaction updates are
    /// delivered asynchronously to the tracker.
    fn add_payment(&self, product: &Product) -> Result<(), UnlockgateError>;

    /// Ask the platform to replay all restorable transactions.
    fn restore_completed_transactions(&self) -> Result<(), UnlockgateError>;

    /// Acknowledge a transaction so the platform removes it from the queue.
    ///
    /// Must be called exactly once per terminal transaction, including
    /// user-cancelled failures.
    fn finish_transaction(&self, transaction_id: &str) -> Result<(), UnlockgateError>;

    /// Begin transferring hosted-content downloads.
    fn start_downloads(&self, downloads: &[DownloadHandle]) -> Result<(), UnlockgateError>;

    /// Resume/start one specific download that reported `Waiting`.
    fn resume_download(&self, download: &DownloadHandle) -> Result<(), UnlockgateError>;
}
