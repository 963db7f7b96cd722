//! # Unlockgate
//!
//! **A single-product in-app purchase state machine with durable
//! entitlement flags.**
//!
//! Unlockgate tracks one unlock product through purchase, restore, and
//! hosted-content download, persists the resulting entitlement to a
//! layered key/value store, and evaluates paywall and review-prompt
//! policy from remotely configurable flags.
//!
//! ## Features
//!
//! - **Transaction tracking** — purchase/restore/download lifecycle with
//!   exactly-once finish semantics per transaction
//! - **Sticky entitlement** — once granted, the purchased flag is never
//!   reset by transaction flow
//! - **Dual-scope persistence** — a local scope plus an optional shared
//!   scope with read-repair backfill
//! - **Remote purchase config** — JSON fetch with bundled-file and
//!   hardcoded-default fallbacks
//! - **Callback and awaitable APIs** — one-shot completion callbacks or
//!   timeout-bounded `async` variants over the same event bus
//!
//! ## Quickstart
//!
//! ```no_run
//! use unlockgate::{BillingApi, PurchaseFacade, UnlockgateConfig};
//! use std::sync::Arc;
//!
//! fn run<B: BillingApi>(billing: Arc<B>) -> Result<(), unlockgate::UnlockgateError> {
//!     let mut config = UnlockgateConfig::new("com.example.app.unlock", "example-app");
//!     config.config_url = "https://example.com/purchase-config.json".to_string();
//!
//!     let facade = PurchaseFacade::new(config, billing)?;
//!     facade.reload_config_detached();
//!
//!     if !facade.is_purchased() {
//!         let outcome = facade.fetch_products()?;
//!         if let Some(product) = outcome.products().first() {
//!             facade.purchase(product)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Integration
//!
//! The platform billing layer implements [`BillingApi`] and feeds queue
//! callbacks into [`tracker::TransactionTracker`] (via
//! [`PurchaseFacade::tracker`]). UI code subscribes to
//! [`events::EventBus`] or uses the facade's callback/awaitable variants.
//!
//! See [`UnlockgateConfig`] for the full set of knobs.

#![deny(warnings)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/unlockgate/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Persistence layer
pub mod store;

// Platform seam
pub mod billing;

// Eventing
pub mod events;

// Catalog, tracking, policy
pub mod catalog;
pub mod policy;
pub mod tracker;

// Remote config & price
pub mod remote;

// Facade (main public API)
pub mod facade;

// Re-exports for public API
pub use billing::{BillingApi, Product};
pub use catalog::CatalogOutcome;
pub use clock::{Clock, SystemClock};
pub use config::UnlockgateConfig;
pub use errors::UnlockgateError;
pub use events::{EventBus, PurchaseNotice, PurchaseStatus};
pub use facade::PurchaseFacade;
pub use store::LayeredStore;

#[cfg(any(test, feature = "test-seams"))]
pub use billing::{BillingCall, MockBilling};
#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
