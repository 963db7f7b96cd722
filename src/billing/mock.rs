//! In-memory billing API for tests.

use crate::billing::api::BillingApi;
use crate::billing::types::{DownloadHandle, Product, ProductQueryResponse};
use crate::UnlockgateError;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded billing call.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingCall {
    /// `query_products` with these identifiers.
    Query(Vec<String>),
    /// `add_payment` for this product id.
    AddPayment(String),
    /// `restore_completed_transactions`.
    Restore,
    /// `finish_transaction` for this transaction id.
    Finish(String),
    /// `start_downloads` for these download ids.
    StartDownloads(Vec<String>),
    /// `resume_download` for this download id.
    ResumeDownload(String),
}

/// Recording mock of the platform billing API.
///
/// Queries are scripted with [`MockBilling::push_query_response`]; every
/// other call succeeds and is recorded for assertion.
#[derive(Default)]
pub struct MockBilling {
    calls: Mutex<Vec<BillingCall>>,
    query_responses: Mutex<VecDeque<ProductQueryResponse>>,
    payments_disabled: Mutex<bool>,
    fail_queries: Mutex<bool>,
}

impl MockBilling {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `query_products` response (FIFO).
    pub fn push_query_response(&self, response: ProductQueryResponse) {
        self.query_responses.lock().unwrap().push_back(response);
    }

    /// Make all subsequent queries fail with a transport error.
    pub fn fail_queries(&self) {
        *self.fail_queries.lock().unwrap() = true;
    }

    /// Toggle the can-make-payments answer.
    pub fn set_payments_disabled(&self, disabled: bool) {
        *self.payments_disabled.lock().unwrap() = disabled;
    }

    /// Snapshot of every recorded call, in order.
    pub fn calls(&self) -> Vec<BillingCall> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times this transaction was finished.
    pub fn finish_count(&self, transaction_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BillingCall::Finish(id) if id == transaction_id))
            .count()
    }

    fn record(&self, call: BillingCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BillingApi for MockBilling {
    fn can_make_payments(&self) -> bool {
        !*self.payments_disabled.lock().unwrap()
    }

    fn query_products(&self, ids: &[String]) -> Result<ProductQueryResponse, UnlockgateError> {
        self.record(BillingCall::Query(ids.to_vec()));
        if *self.fail_queries.lock().unwrap() {
            return Err(UnlockgateError::NetworkFailure(
                "mock query failure".to_string(),
            ));
        }
        Ok(self
            .query_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn add_payment(&self, product: &Product) -> Result<(), UnlockgateError> {
        self.record(BillingCall::AddPayment(product.id.clone()));
        Ok(())
    }

    fn restore_completed_transactions(&self) -> Result<(), UnlockgateError> {
        self.record(BillingCall::Restore);
        Ok(())
    }

    fn finish_transaction(&self, transaction_id: &str) -> Result<(), UnlockgateError> {
        self.record(BillingCall::Finish(transaction_id.to_string()));
        Ok(())
    }

    fn start_downloads(&self, downloads: &[DownloadHandle]) -> Result<(), UnlockgateError> {
        self.record(BillingCall::StartDownloads(
            downloads.iter().map(|d| d.id.clone()).collect(),
        ));
        Ok(())
    }

    fn resume_download(&self, download: &DownloadHandle) -> Result<(), UnlockgateError> {
        self.record(BillingCall::ResumeDownload(download.id.clone()));
        Ok(())
    }
}
