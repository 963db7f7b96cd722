//! Purchase facade - the main public API for unlockgate.
//!
//! Composes the product catalog, transaction tracker, entitlement policy,
//! and remote config/price loaders behind one surface. Purchase and
//! restore results can be consumed either through one-shot callbacks or
//! awaitables; both resolve exactly once, on the first matching terminal
//! event, and ignore events for unrelated product ids.

use crate::billing::{BillingApi, Product};
use crate::catalog::{CatalogOutcome, ProductCatalog};
use crate::clock::{Clock, SystemClock};
use crate::config::UnlockgateConfig;
use crate::events::{EventBus, PurchaseNotice, PurchaseStatus};
use crate::policy::EntitlementPolicy;
use crate::remote::{PriceLookup, RemoteConfigLoader};
use crate::store::{keys, LayeredStore, Value};
use crate::tracker::TransactionTracker;
use crate::UnlockgateError;
use std::sync::Arc;

/// Main purchase facade.
///
/// Create one instance per process and share it; UI collaborators call
/// into it and observe status through its getters, callbacks, or
/// awaitables.
pub struct PurchaseFacade<B: BillingApi> {
    config: UnlockgateConfig,
    billing: Arc<B>,
    store: Arc<LayeredStore>,
    events: Arc<EventBus>,
    catalog: ProductCatalog<B>,
    tracker: Arc<TransactionTracker<B>>,
    policy: EntitlementPolicy,
    config_loader: Arc<RemoteConfigLoader>,
    price_lookup: PriceLookup,
}

impl<B: BillingApi> PurchaseFacade<B> {
    /// Create a facade with the system clock and stores opened from the
    /// configured namespaces.
    ///
    /// # Errors
    /// Returns an error if configuration validation or local store
    /// creation fails. A missing shared scope is not an error; the store
    /// degrades to local-only.
    pub fn new(config: UnlockgateConfig, billing: Arc<B>) -> Result<Self, UnlockgateError> {
        config.validate()?;
        let store = Arc::new(LayeredStore::new(
            &config.local_namespace,
            config.shared_namespace.as_deref(),
        )?);
        Ok(Self::from_parts(config, billing, store, Arc::new(SystemClock)))
    }

    /// Create a facade over an explicit store and clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_parts(
        config: UnlockgateConfig,
        billing: Arc<B>,
        store: Arc<LayeredStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, UnlockgateError> {
        config.validate()?;
        Ok(Self::from_parts(config, billing, store, clock))
    }

    fn from_parts(
        config: UnlockgateConfig,
        billing: Arc<B>,
        store: Arc<LayeredStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let catalog = ProductCatalog::new(Arc::clone(&billing));
        let tracker = Arc::new(TransactionTracker::new(
            Arc::clone(&billing),
            Arc::clone(&store),
            Arc::clone(&events),
        ));
        let policy = EntitlementPolicy::new(Arc::clone(&store), clock);
        let config_loader = Arc::new(RemoteConfigLoader::new(
            config.config_url.clone(),
            config.local_config_path.clone(),
            Arc::clone(&store),
            config.http_timeout,
        ));
        let price_lookup = PriceLookup::new(
            config.price_lookup_url.clone(),
            Arc::clone(&store),
            config.http_timeout,
        );

        Self {
            config,
            billing,
            store,
            events,
            catalog,
            tracker,
            policy,
            config_loader,
            price_lookup,
        }
    }

    // ---- wiring ----------------------------------------------------------

    /// The tracker the platform integration feeds queue events into.
    pub fn tracker(&self) -> &Arc<TransactionTracker<B>> {
        &self.tracker
    }

    /// The status event bus, for persistent UI subscriptions.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The current configuration.
    pub fn config(&self) -> &UnlockgateConfig {
        &self.config
    }

    // ---- products --------------------------------------------------------

    /// Query the store for the configured unlock product.
    pub fn fetch_products(&self) -> Result<CatalogOutcome, UnlockgateError> {
        self.catalog.query(&[self.config.product_id.clone()])
    }

    /// Query product information for an explicit identifier set.
    pub fn fetch_products_for(
        &self,
        ids: &[String],
    ) -> Result<CatalogOutcome, UnlockgateError> {
        self.catalog.query(ids)
    }

    /// Callback variant of [`Self::fetch_products`]; the callback runs
    /// exactly once with the query outcome.
    pub fn fetch_products_with<F>(&self, callback: F)
    where
        F: FnOnce(Result<CatalogOutcome, UnlockgateError>),
    {
        callback(self.fetch_products());
    }

    /// Products from the last completed query.
    pub fn products(&self) -> Vec<Product> {
        self.catalog.products()
    }

    /// Localized title for a cached product.
    pub fn title_matching(&self, product_id: &str) -> Option<String> {
        self.catalog.title_matching(product_id)
    }

    // ---- purchase --------------------------------------------------------

    /// Submit a payment for a product.
    ///
    /// # Errors
    /// - `CannotMakePayments` - payments are disabled on this device
    /// - transport errors from payment submission
    pub fn purchase(&self, product: &Product) -> Result<(), UnlockgateError> {
        if !self.billing.can_make_payments() {
            return Err(UnlockgateError::CannotMakePayments);
        }
        self.tracker.buy(product)
    }

    /// Purchase with a one-shot completion callback.
    ///
    /// The callback fires once, on the first terminal event for this
    /// product id; events for other products are ignored. If submission
    /// itself fails the error is returned here and the callback never runs.
    pub fn purchase_with<F>(&self, product: &Product, callback: F) -> Result<(), UnlockgateError>
    where
        F: FnOnce(Result<(), UnlockgateError>) + Send + 'static,
    {
        let token = self.events.subscribe_once(
            purchase_filter(product.id.clone()),
            move |notice| callback(notice_to_result(notice)),
        );
        if let Err(e) = self.purchase(product) {
            self.events.cancel_once(token);
            return Err(e);
        }
        Ok(())
    }

    /// Purchase and await the terminal event, bounded by
    /// [`UnlockgateConfig::event_timeout`].
    pub async fn purchase_awaited(&self, product: &Product) -> Result<(), UnlockgateError> {
        let (token, rx) = self.events.watch_once(purchase_filter(product.id.clone()));
        if let Err(e) = self.purchase(product) {
            self.events.cancel_once(token);
            return Err(e);
        }
        self.await_notice(token, rx).await
    }

    // ---- restore ---------------------------------------------------------

    /// Restore all completed transactions.
    pub fn restore(&self) -> Result<(), UnlockgateError> {
        self.tracker.restore()
    }

    /// Restore with a target product (falls back to purchasing it when
    /// the session restores nothing; see
    /// [`TransactionTracker::handle_restore_finished`]).
    pub fn restore_product(&self, product: &Product) -> Result<(), UnlockgateError> {
        self.tracker.restore_product(product)
    }

    /// Restore with a one-shot completion callback.
    pub fn restore_with<F>(&self, callback: F) -> Result<(), UnlockgateError>
    where
        F: FnOnce(Result<(), UnlockgateError>) + Send + 'static,
    {
        let token = self.events.subscribe_once(
            |n: &PurchaseNotice| n.status.is_restore_terminal(),
            move |notice| callback(notice_to_result(notice)),
        );
        if let Err(e) = self.restore() {
            self.events.cancel_once(token);
            return Err(e);
        }
        Ok(())
    }

    /// Targeted restore with a one-shot completion callback.
    ///
    /// Accepts purchase-terminal events for the target too, because an
    /// empty restore session falls back to a fresh purchase of it.
    pub fn restore_product_with<F>(
        &self,
        product: &Product,
        callback: F,
    ) -> Result<(), UnlockgateError>
    where
        F: FnOnce(Result<(), UnlockgateError>) + Send + 'static,
    {
        let pid = product.id.clone();
        let token = self.events.subscribe_once(
            move |n: &PurchaseNotice| {
                n.status.is_restore_terminal()
                    || (n.status.is_purchase_terminal() && n.product_id.as_deref() == Some(&pid))
            },
            move |notice| callback(notice_to_result(notice)),
        );
        if let Err(e) = self.restore_product(product) {
            self.events.cancel_once(token);
            return Err(e);
        }
        Ok(())
    }

    /// Restore and await the terminal event.
    pub async fn restore_awaited(&self) -> Result<(), UnlockgateError> {
        let (token, rx) = self
            .events
            .watch_once(|n: &PurchaseNotice| n.status.is_restore_terminal());
        if let Err(e) = self.restore() {
            self.events.cancel_once(token);
            return Err(e);
        }
        self.await_notice(token, rx).await
    }

    /// Targeted restore, awaited. Accepts purchase-terminal events for the
    /// target too, because an empty restore session falls back to a fresh
    /// purchase of it.
    pub async fn restore_product_awaited(
        &self,
        product: &Product,
    ) -> Result<(), UnlockgateError> {
        let pid = product.id.clone();
        let (token, rx) = self.events.watch_once(move |n: &PurchaseNotice| {
            n.status.is_restore_terminal()
                || (n.status.is_purchase_terminal() && n.product_id.as_deref() == Some(&pid))
        });
        if let Err(e) = self.restore_product(product) {
            self.events.cancel_once(token);
            return Err(e);
        }
        self.await_notice(token, rx).await
    }

    async fn await_notice(
        &self,
        token: crate::events::OnceToken,
        rx: tokio::sync::oneshot::Receiver<PurchaseNotice>,
    ) -> Result<(), UnlockgateError> {
        match tokio::time::timeout(self.config.event_timeout, rx).await {
            Ok(Ok(notice)) => notice_to_result(notice),
            // Channel closed: the bus went away with the waiter pending.
            Ok(Err(_)) => Err(UnlockgateError::Timeout),
            Err(_) => {
                self.events.cancel_once(token);
                Err(UnlockgateError::Timeout)
            }
        }
    }

    // ---- status & policy ---------------------------------------------------

    /// Last outward purchase/restore/download status.
    pub fn status(&self) -> Option<PurchaseStatus> {
        self.tracker.status()
    }

    /// Last failure/progress message.
    pub fn message(&self) -> String {
        self.tracker.message()
    }

    /// Last reported download progress percentage.
    pub fn download_progress(&self) -> f32 {
        self.tracker.download_progress()
    }

    /// Product id of the most recently confirmed transaction.
    pub fn purchased_id(&self) -> Option<String> {
        self.tracker.purchased_id()
    }

    /// Whether the user is entitled to the unlock.
    pub fn is_purchased(&self) -> bool {
        self.policy.is_purchased()
    }

    /// Whether the paywall applies.
    pub fn is_need_purchase(&self) -> bool {
        self.policy.is_need_purchase()
    }

    /// Whether the purchase entry point is hidden.
    pub fn hide_purchase_entry(&self) -> bool {
        self.policy.hide_purchase_entry()
    }

    /// True iff today is on or after `date` (`yyyy-MM-dd`).
    pub fn is_after(&self, date: &str) -> bool {
        self.policy.is_after(date)
    }

    /// Evaluate the review-prompt gate (advances the trigger counter).
    pub fn should_prompt_review(&self) -> Result<bool, UnlockgateError> {
        self.policy.should_prompt_review()
    }

    // ---- remote config -----------------------------------------------------

    /// Reload purchase config synchronously (falls back per the loader).
    pub fn reload_config(&self) -> Result<(), UnlockgateError> {
        self.config_loader.reload()
    }

    /// Fire-and-forget config reload on a background thread.
    pub fn reload_config_detached(&self) {
        self.config_loader.reload_detached();
    }

    /// Fetch and persist the current app price.
    pub fn reload_app_price(&self) -> Result<f64, UnlockgateError> {
        self.price_lookup.reload()
    }

    // ---- admin ---------------------------------------------------------------

    /// Explicitly clear the sticky entitlement flag.
    ///
    /// Debug/admin escape hatch only; normal flow never resets it.
    pub fn clear_entitlement(&self) -> Result<(), UnlockgateError> {
        self.store.set(keys::IS_PURCHASED_FLAG, Value::Bool(false))
    }
}

/// Terminal events for one product's purchase attempt.
fn purchase_filter(product_id: String) -> impl Fn(&PurchaseNotice) -> bool + Send + 'static {
    move |n: &PurchaseNotice| {
        n.status.is_purchase_terminal() && n.product_id.as_deref() == Some(product_id.as_str())
    }
}

/// Map a terminal notice to the caller-facing result.
fn notice_to_result(notice: PurchaseNotice) -> Result<(), UnlockgateError> {
    if notice.status.is_success() {
        return Ok(());
    }
    let reason = notice.message.unwrap_or_else(|| "unknown error".to_string());
    match notice.status {
        PurchaseStatus::RestoreFailed => Err(UnlockgateError::RestoreFailed { reason }),
        _ => Err(UnlockgateError::PurchaseFailed { reason }),
    }
}
