//! Platform billing API seam.

pub mod api;
#[cfg(any(test, feature = "test-seams"))]
pub mod mock;
pub mod types;

pub use api::BillingApi;
#[cfg(any(test, feature = "test-seams"))]
pub use mock::{BillingCall, MockBilling};
pub use types::{
    DownloadEvent, DownloadHandle, DownloadState, PaymentError, Product, ProductQueryResponse,
    TransactionState, TransactionUpdate,
};
