//! Purchase transaction tracker - the core state machine.
//!
//! Consumes transaction-queue events from the platform (purchase, restore,
//! download, removal) and turns them into stable [`PurchaseStatus`]
//! notices plus append-only completed-transaction logs. One notice is
//! emitted per processed transaction/download, not per batch.
//!
//! Platform events may arrive on any thread; handlers serialize all state
//! mutation behind one lock, and the scalar status fields are
//! last-writer-wins while the logs stay additive.

use crate::billing::{
    BillingApi, DownloadEvent, DownloadHandle, DownloadState, PaymentError, Product,
    TransactionState, TransactionUpdate,
};
use crate::events::{EventBus, PurchaseNotice, PurchaseStatus};
use crate::store::{keys, LayeredStore, Value};
use crate::UnlockgateError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Audit-log entry for one completed purchase or restore.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Platform transaction identifier.
    pub transaction_id: String,
    /// Product the transaction was for.
    pub product_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnOrigin {
    Purchase,
    Restore,
}

/// A confirmed transaction still waiting on hosted-content downloads.
struct PendingDownloads {
    product_id: String,
    origin: TxnOrigin,
    downloads: HashMap<String, DownloadState>,
}

impl PendingDownloads {
    fn all_settled(&self) -> bool {
        self.downloads.values().all(|s| s.is_settled())
    }
}

#[derive(Default)]
struct TrackerState {
    status: Option<PurchaseStatus>,
    message: String,
    download_progress: f32,
    purchased_id: Option<String>,
    /// Product to fall back to purchasing when a restore session ends
    /// without restoring it.
    restore_target: Option<Product>,
    purchased: Vec<TransactionRecord>,
    restored: Vec<TransactionRecord>,
    pending: HashMap<String, PendingDownloads>,
}

/// Billing side effects and notices computed under the state lock,
/// performed after it is released so user callbacks can re-enter.
#[derive(Default)]
struct Effects {
    finish: Vec<String>,
    start_downloads: Vec<DownloadHandle>,
    resume: Vec<DownloadHandle>,
    delete_paths: Vec<PathBuf>,
    notices: Vec<PurchaseNotice>,
}

/// Tracks outstanding purchase/restore requests and reconciles
/// transaction-queue callbacks into outward status notices.
pub struct TransactionTracker<B: BillingApi> {
    billing: Arc<B>,
    store: Arc<LayeredStore>,
    events: Arc<EventBus>,
    state: Mutex<TrackerState>,
}

impl<B: BillingApi> TransactionTracker<B> {
    /// Create a tracker over the billing seam, flag store, and event bus.
    pub fn new(billing: Arc<B>, store: Arc<LayeredStore>, events: Arc<EventBus>) -> Self {
        Self {
            billing,
            store,
            events,
            state: Mutex::new(TrackerState::default()),
        }
    }

    // ---- outgoing operations -------------------------------------------

    /// Submit a payment for a product.
    pub fn buy(&self, product: &Product) -> Result<(), UnlockgateError> {
        tracing::info!(product = %product.id, "submitting payment");
        self.billing.add_payment(product)
    }

    /// Restore all completed transactions.
    pub fn restore(&self) -> Result<(), UnlockgateError> {
        {
            let mut state = self.lock_state();
            state.restored.clear();
            state.restore_target = None;
        }
        self.billing.restore_completed_transactions()
    }

    /// Restore with a target product: if the session ends without
    /// restoring it, a fresh purchase of that product is initiated
    /// automatically (the platform's restore-falls-back-to-purchase
    /// pattern; see [`Self::handle_restore_finished`]).
    pub fn restore_product(&self, product: &Product) -> Result<(), UnlockgateError> {
        {
            let mut state = self.lock_state();
            state.restored.clear();
            state.restore_target = Some(product.clone());
        }
        self.billing.restore_completed_transactions()
    }

    // ---- incoming platform events --------------------------------------

    /// Consume a batch of transaction-queue updates.
    pub fn handle_transaction_updates(&self, updates: Vec<TransactionUpdate>) {
        for update in updates {
            let effects = {
                let mut state = self.lock_state();
                self.process_transaction(&mut state, update)
            };
            self.apply(effects);
        }
    }

    /// Consume a batch of hosted-content download events.
    pub fn handle_download_events(&self, events: Vec<DownloadEvent>) {
        for event in events {
            let effects = {
                let mut state = self.lock_state();
                self.process_download(&mut state, event)
            };
            self.apply(effects);
        }
    }

    /// Transactions removed from the platform queue. Observability only.
    pub fn handle_removed_transactions(&self, updates: Vec<TransactionUpdate>) {
        for update in updates {
            tracing::info!(
                product = %update.product_id,
                transaction = %update.id,
                "transaction removed from the payment queue"
            );
        }
    }

    /// The restore session failed at queue level (no single transaction).
    ///
    /// Cancellation is silent; any other error surfaces as `RestoreFailed`.
    pub fn handle_restore_failed(&self, error: PaymentError) {
        let notice = {
            let mut state = self.lock_state();
            match error {
                PaymentError::Cancelled => {
                    tracing::debug!("restore cancelled by user");
                    None
                }
                PaymentError::Other(message) => {
                    state.status = Some(PurchaseStatus::RestoreFailed);
                    state.message = message.clone();
                    let product_id = state.restore_target.as_ref().map(|p| p.id.clone());
                    Some(PurchaseNotice {
                        status: PurchaseStatus::RestoreFailed,
                        product_id,
                        message: Some(message),
                        progress: None,
                    })
                }
            }
        };
        if let Some(notice) = notice {
            self.events.emit(notice);
        }
    }

    /// The platform reports all restorable transactions were processed.
    ///
    /// If a target product was set for this session and it is absent from
    /// the outstanding set (or the set is empty), a fresh purchase of the
    /// target is initiated. Restores silently becoming purchases is the
    /// platform's documented pattern, preserved here deliberately.
    pub fn handle_restore_finished(&self, outstanding_product_ids: &[String]) {
        tracing::info!("all restorable transactions have been processed");

        let buy = {
            let state = self.lock_state();
            match &state.restore_target {
                Some(target)
                    if !outstanding_product_ids.iter().any(|id| id == &target.id) =>
                {
                    Some(target.clone())
                }
                _ => None,
            }
        };

        if let Some(product) = buy {
            tracing::info!(product = %product.id, "nothing to restore, falling back to purchase");
            if let Err(e) = self.buy(&product) {
                tracing::warn!("restore fallback purchase failed to submit: {}", e);
            }
        }
    }

    // ---- status getters -------------------------------------------------

    /// Last outward status, if any event has been processed.
    pub fn status(&self) -> Option<PurchaseStatus> {
        self.lock_state().status
    }

    /// Last failure/progress message.
    pub fn message(&self) -> String {
        self.lock_state().message.clone()
    }

    /// Last reported download progress percentage.
    pub fn download_progress(&self) -> f32 {
        self.lock_state().download_progress
    }

    /// Product id of the most recently confirmed transaction.
    pub fn purchased_id(&self) -> Option<String> {
        self.lock_state().purchased_id.clone()
    }

    /// Whether any purchase completed this process lifetime.
    pub fn has_purchased(&self) -> bool {
        !self.lock_state().purchased.is_empty()
    }

    /// Whether any restore completed this process lifetime.
    pub fn has_restored(&self) -> bool {
        !self.lock_state().restored.is_empty()
    }

    /// Snapshot of the purchased-transaction audit log.
    pub fn purchased_log(&self) -> Vec<TransactionRecord> {
        self.lock_state().purchased.clone()
    }

    /// Snapshot of the restored-transaction audit log.
    pub fn restored_log(&self) -> Vec<TransactionRecord> {
        self.lock_state().restored.clone()
    }

    // ---- internals -------------------------------------------------------

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().expect("tracker lock poisoned")
    }

    fn process_transaction(
        &self,
        state: &mut TrackerState,
        update: TransactionUpdate,
    ) -> Effects {
        let mut effects = Effects::default();

        match update.state {
            TransactionState::Purchasing => {
                tracing::trace!(product = %update.product_id, "payment in flight");
            }
            TransactionState::Deferred => {
                // Keep the app usable and wait; the transaction must not
                // be finished while approval is pending.
                tracing::info!(
                    product = %update.product_id,
                    "payment deferred, allow the user to continue"
                );
            }
            TransactionState::Purchased => {
                self.confirm(state, &mut effects, update, TxnOrigin::Purchase);
            }
            TransactionState::Restored => {
                self.confirm(state, &mut effects, update, TxnOrigin::Restore);
            }
            TransactionState::Failed(error) => {
                let cancelled = error == PaymentError::Cancelled;
                let message = match error {
                    PaymentError::Other(m) if !m.is_empty() => m,
                    _ => format!("Purchase of {} failed.", update.product_id),
                };
                state.status = Some(PurchaseStatus::PurchaseFailed);
                state.message = message.clone();

                // Cancelled transactions still get finished so the queue
                // does not stall, but emit no notice.
                effects.finish.push(update.id);
                if !cancelled {
                    effects.notices.push(PurchaseNotice {
                        status: PurchaseStatus::PurchaseFailed,
                        product_id: Some(update.product_id),
                        message: Some(message),
                        progress: None,
                    });
                }
            }
        }

        effects
    }

    /// Shared handling for `Purchased` and `Restored` confirmations.
    fn confirm(
        &self,
        state: &mut TrackerState,
        effects: &mut Effects,
        update: TransactionUpdate,
        origin: TxnOrigin,
    ) {
        state.purchased_id = Some(update.product_id.clone());

        let record = TransactionRecord {
            transaction_id: update.id.clone(),
            product_id: update.product_id.clone(),
        };
        let success_status = match origin {
            TxnOrigin::Purchase => {
                tracing::info!(product = %update.product_id, "delivering content");
                state.purchased.push(record);
                PurchaseStatus::PurchaseSucceeded
            }
            TxnOrigin::Restore => {
                tracing::info!(product = %update.product_id, "restoring content");
                state.restored.push(record);
                PurchaseStatus::RestoreSucceeded
            }
        };

        if update.downloads.is_empty() {
            // Content delivered immediately: finish and report success.
            state.status = Some(success_status);
            effects.finish.push(update.id);
            effects
                .notices
                .push(PurchaseNotice::status(success_status, update.product_id));
        } else {
            // Hold the transaction open until every download settles.
            state.pending.insert(
                update.id.clone(),
                PendingDownloads {
                    product_id: update.product_id.clone(),
                    origin,
                    downloads: update
                        .downloads
                        .iter()
                        .map(|d| (d.id.clone(), DownloadState::Waiting))
                        .collect(),
                },
            );
            state.status = Some(PurchaseStatus::DownloadStarted);
            effects.start_downloads = update.downloads;
            effects.notices.push(PurchaseNotice::status(
                PurchaseStatus::DownloadStarted,
                update.product_id,
            ));
        }
    }

    fn process_download(&self, state: &mut TrackerState, event: DownloadEvent) -> Effects {
        let mut effects = Effects::default();
        let txn_id = event.download.transaction_id.clone();

        match event.state {
            DownloadState::Active => {
                let progress = event.progress * 100.0;
                state.status = Some(PurchaseStatus::DownloadInProgress);
                state.download_progress = progress;
                state.purchased_id = Some(event.download.product_id.clone());
                effects.notices.push(PurchaseNotice {
                    status: PurchaseStatus::DownloadInProgress,
                    product_id: Some(event.download.product_id),
                    message: None,
                    progress: Some(progress),
                });
            }
            DownloadState::Cancelled | DownloadState::Failed => {
                if let Some(path) = event.content_path {
                    effects.delete_paths.push(path);
                }
                self.settle_download(state, &mut effects, &txn_id, &event.download.id, event.state);
            }
            DownloadState::Finished => {
                tracing::debug!(download = %event.download.id, "download finished");
                self.settle_download(state, &mut effects, &txn_id, &event.download.id, event.state);
            }
            DownloadState::Paused => {
                tracing::debug!(download = %event.download.id, "download paused");
            }
            DownloadState::Waiting => {
                effects.resume.push(event.download);
            }
        }

        effects
    }

    /// Record a settled download and re-evaluate its transaction.
    fn settle_download(
        &self,
        state: &mut TrackerState,
        effects: &mut Effects,
        txn_id: &str,
        download_id: &str,
        new_state: DownloadState,
    ) {
        let Some(pending) = state.pending.get_mut(txn_id) else {
            tracing::warn!(transaction = %txn_id, "download event for untracked transaction");
            return;
        };
        pending.downloads.insert(download_id.to_string(), new_state);

        if !pending.all_settled() {
            return;
        }

        let Some(pending) = state.pending.remove(txn_id) else {
            return;
        };
        state.status = Some(PurchaseStatus::DownloadSucceeded);
        effects.finish.push(txn_id.to_string());
        effects.notices.push(PurchaseNotice::status(
            PurchaseStatus::DownloadSucceeded,
            pending.product_id.clone(),
        ));

        // Restored transactions additionally report restore success,
        // strictly after the download notice.
        if pending.origin == TxnOrigin::Restore {
            state.status = Some(PurchaseStatus::RestoreSucceeded);
            effects.notices.push(PurchaseNotice::status(
                PurchaseStatus::RestoreSucceeded,
                pending.product_id,
            ));
        }
    }

    /// Perform billing side effects and emit notices outside the lock.
    fn apply(&self, effects: Effects) {
        for path in effects.delete_paths {
            // Partial content cleanup is best-effort.
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!("could not delete partial content {:?}: {}", path, e);
            }
        }
        if !effects.start_downloads.is_empty() {
            if let Err(e) = self.billing.start_downloads(&effects.start_downloads) {
                tracing::warn!("failed to start downloads: {}", e);
            }
        }
        for download in &effects.resume {
            if let Err(e) = self.billing.resume_download(download) {
                tracing::warn!("failed to resume download {}: {}", download.id, e);
            }
        }
        for txn_id in &effects.finish {
            if let Err(e) = self.billing.finish_transaction(txn_id) {
                tracing::warn!("failed to finish transaction {}: {}", txn_id, e);
            }
        }

        // The entitlement flag is sticky: set on every terminal success,
        // never cleared on failure.
        if effects.notices.iter().any(|n| n.status.is_success()) {
            if let Err(e) = self.store.set(keys::IS_PURCHASED_FLAG, Value::Bool(true)) {
                tracing::warn!("failed to persist entitlement flag: {}", e);
            }
        }

        for notice in effects.notices {
            self.events.emit(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{BillingCall, MockBilling};
    use crate::store::FileScope;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        billing: Arc<MockBilling>,
        store: Arc<LayeredStore>,
        events: Arc<EventBus>,
        tracker: TransactionTracker<MockBilling>,
        seen: Arc<Mutex<Vec<PurchaseNotice>>>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let local = FileScope::with_path(dir.path().join("local")).unwrap();
        let store = Arc::new(LayeredStore::from_scopes(local, None));
        let billing = Arc::new(MockBilling::new());
        let events = Arc::new(EventBus::new());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(move |n: &PurchaseNotice| {
            sink.lock().unwrap().push(n.clone());
        });

        let tracker = TransactionTracker::new(
            Arc::clone(&billing),
            Arc::clone(&store),
            Arc::clone(&events),
        );
        Fixture {
            _dir: dir,
            billing,
            store,
            events,
            tracker,
            seen,
        }
    }

    impl Fixture {
        fn statuses(&self) -> Vec<PurchaseStatus> {
            self.seen.lock().unwrap().iter().map(|n| n.status).collect()
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            title: "Unlock".to_string(),
            description: String::new(),
            price: 1.99,
            price_locale: "en_US".to_string(),
        }
    }

    fn update(
        txn: &str,
        pid: &str,
        state: TransactionState,
        downloads: Vec<DownloadHandle>,
    ) -> TransactionUpdate {
        TransactionUpdate {
            id: txn.to_string(),
            product_id: pid.to_string(),
            state,
            downloads,
        }
    }

    fn download(id: &str, txn: &str, pid: &str) -> DownloadHandle {
        DownloadHandle {
            id: id.to_string(),
            transaction_id: txn.to_string(),
            product_id: pid.to_string(),
        }
    }

    fn dl_event(handle: DownloadHandle, state: DownloadState, progress: f32) -> DownloadEvent {
        DownloadEvent {
            download: handle,
            state,
            progress,
            content_path: None,
        }
    }

    #[test]
    fn purchase_without_downloads_succeeds_and_finishes_once() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![],
        )]);

        assert_eq!(f.statuses(), vec![PurchaseStatus::PurchaseSucceeded]);
        assert_eq!(f.billing.finish_count("t1"), 1);
        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), Some(true));
        assert_eq!(f.tracker.purchased_id(), Some("unlock".to_string()));
        assert!(f.tracker.has_purchased());
        assert!(!f.tracker.has_restored());
    }

    #[test]
    fn restore_without_downloads_reports_restore_success() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Restored,
            vec![],
        )]);

        assert_eq!(f.statuses(), vec![PurchaseStatus::RestoreSucceeded]);
        assert_eq!(f.billing.finish_count("t1"), 1);
        assert!(f.tracker.has_restored());
    }

    #[test]
    fn purchasing_and_deferred_are_invisible_and_unfinished() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![
            update("t1", "unlock", TransactionState::Purchasing, vec![]),
            update("t1", "unlock", TransactionState::Deferred, vec![]),
        ]);

        assert!(f.statuses().is_empty());
        assert_eq!(f.billing.finish_count("t1"), 0);
        assert_eq!(f.tracker.status(), None);
    }

    #[test]
    fn purchase_with_downloads_starts_them_and_stays_open() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        let d2 = download("d2", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1, d2],
        )]);

        assert_eq!(f.statuses(), vec![PurchaseStatus::DownloadStarted]);
        assert_eq!(f.billing.finish_count("t1"), 0);
        assert!(f
            .billing
            .calls()
            .contains(&BillingCall::StartDownloads(vec![
                "d1".to_string(),
                "d2".to_string()
            ])));
        // No entitlement until content lands
        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), None);
    }

    #[test]
    fn partial_download_completion_never_finishes() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        let d2 = download("d2", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1.clone(), d2],
        )]);

        f.tracker
            .handle_download_events(vec![dl_event(d1, DownloadState::Finished, 1.0)]);

        assert_eq!(f.billing.finish_count("t1"), 0);
        assert!(!f.statuses().contains(&PurchaseStatus::DownloadSucceeded));
    }

    #[test]
    fn all_downloads_settled_finishes_and_succeeds() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        let d2 = download("d2", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1.clone(), d2.clone()],
        )]);

        f.tracker
            .handle_download_events(vec![dl_event(d1, DownloadState::Finished, 1.0)]);
        f.tracker
            .handle_download_events(vec![dl_event(d2, DownloadState::Failed, 0.4)]);

        assert_eq!(f.billing.finish_count("t1"), 1);
        assert_eq!(
            f.statuses(),
            vec![
                PurchaseStatus::DownloadStarted,
                PurchaseStatus::DownloadSucceeded
            ]
        );
        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), Some(true));
    }

    #[test]
    fn restored_download_completion_emits_both_notices_in_order() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Restored,
            vec![d1.clone()],
        )]);
        f.tracker
            .handle_download_events(vec![dl_event(d1, DownloadState::Finished, 1.0)]);

        assert_eq!(
            f.statuses(),
            vec![
                PurchaseStatus::DownloadStarted,
                PurchaseStatus::DownloadSucceeded,
                PurchaseStatus::RestoreSucceeded
            ]
        );
        assert_eq!(f.billing.finish_count("t1"), 1);
    }

    #[test]
    fn active_download_reports_scaled_progress() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1.clone()],
        )]);
        f.tracker
            .handle_download_events(vec![dl_event(d1, DownloadState::Active, 0.25)]);

        assert_eq!(f.tracker.download_progress(), 25.0);
        let last = f.seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.status, PurchaseStatus::DownloadInProgress);
        assert_eq!(last.progress, Some(25.0));
    }

    #[test]
    fn waiting_download_is_resumed() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1.clone()],
        )]);
        f.tracker
            .handle_download_events(vec![dl_event(d1, DownloadState::Waiting, 0.0)]);

        assert!(f
            .billing
            .calls()
            .contains(&BillingCall::ResumeDownload("d1".to_string())));
        // Waiting emits nothing
        assert_eq!(f.statuses(), vec![PurchaseStatus::DownloadStarted]);
    }

    #[test]
    fn failed_download_deletes_partial_content() {
        let f = fixture();
        let d1 = download("d1", "t1", "unlock");
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![d1.clone()],
        )]);

        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("asset.part");
        std::fs::write(&partial, b"half").unwrap();

        f.tracker.handle_download_events(vec![DownloadEvent {
            download: d1,
            state: DownloadState::Failed,
            progress: 0.5,
            content_path: Some(partial.clone()),
        }]);

        assert!(!partial.exists());
        assert_eq!(f.billing.finish_count("t1"), 1);
    }

    #[test]
    fn user_cancellation_is_silent_but_finished() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Failed(PaymentError::Cancelled),
            vec![],
        )]);

        assert!(f.statuses().is_empty());
        assert_eq!(f.billing.finish_count("t1"), 1);
        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), None);
    }

    #[test]
    fn failure_carries_platform_message() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Failed(PaymentError::Other("card declined".to_string())),
            vec![],
        )]);

        let notices = f.seen.lock().unwrap().clone();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].status, PurchaseStatus::PurchaseFailed);
        assert_eq!(notices[0].message.as_deref(), Some("card declined"));
        assert_eq!(f.billing.finish_count("t1"), 1);
    }

    #[test]
    fn failure_without_message_gets_generic_one() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Failed(PaymentError::Other(String::new())),
            vec![],
        )]);

        assert_eq!(f.tracker.message(), "Purchase of unlock failed.");
    }

    #[test]
    fn entitlement_flag_survives_later_failure() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![],
        )]);
        f.tracker.handle_transaction_updates(vec![update(
            "t2",
            "unlock",
            TransactionState::Failed(PaymentError::Other("oops".to_string())),
            vec![],
        )]);

        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), Some(true));
    }

    #[test]
    fn duplicate_confirmation_is_idempotent_on_the_flag() {
        let f = fixture();
        let confirmed = update("t1", "unlock", TransactionState::Purchased, vec![]);
        f.tracker.handle_transaction_updates(vec![confirmed.clone()]);
        f.tracker.handle_transaction_updates(vec![confirmed]);

        assert_eq!(f.store.get_bool(keys::IS_PURCHASED_FLAG), Some(true));
        // The audit log is additive, one entry per processed confirmation
        assert_eq!(f.tracker.purchased_log().len(), 2);
    }

    #[test]
    fn empty_restore_session_falls_back_to_purchase() {
        let f = fixture();
        f.tracker.restore_product(&product("unlock")).unwrap();
        f.tracker.handle_restore_finished(&[]);

        assert!(f
            .billing
            .calls()
            .contains(&BillingCall::AddPayment("unlock".to_string())));
    }

    #[test]
    fn restore_session_missing_target_falls_back_to_purchase() {
        let f = fixture();
        f.tracker.restore_product(&product("unlock")).unwrap();
        f.tracker.handle_restore_finished(&["other".to_string()]);

        assert!(f
            .billing
            .calls()
            .contains(&BillingCall::AddPayment("unlock".to_string())));
    }

    #[test]
    fn restore_session_containing_target_does_not_repurchase() {
        let f = fixture();
        f.tracker.restore_product(&product("unlock")).unwrap();
        f.tracker.handle_restore_finished(&["unlock".to_string()]);

        assert!(!f
            .billing
            .calls()
            .iter()
            .any(|c| matches!(c, BillingCall::AddPayment(_))));
    }

    #[test]
    fn untargeted_restore_never_falls_back() {
        let f = fixture();
        f.tracker.restore().unwrap();
        f.tracker.handle_restore_finished(&[]);

        assert!(!f
            .billing
            .calls()
            .iter()
            .any(|c| matches!(c, BillingCall::AddPayment(_))));
    }

    #[test]
    fn restore_failure_surfaces_unless_cancelled() {
        let f = fixture();
        f.tracker
            .handle_restore_failed(PaymentError::Other("store unreachable".to_string()));
        assert_eq!(f.statuses(), vec![PurchaseStatus::RestoreFailed]);

        f.tracker.handle_restore_failed(PaymentError::Cancelled);
        assert_eq!(f.statuses(), vec![PurchaseStatus::RestoreFailed]);
    }

    #[test]
    fn restore_clears_previous_session_log() {
        let f = fixture();
        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Restored,
            vec![],
        )]);
        assert!(f.tracker.has_restored());

        f.tracker.restore().unwrap();
        assert!(!f.tracker.has_restored());
    }

    #[test]
    fn removed_transactions_change_nothing() {
        let f = fixture();
        f.tracker.handle_removed_transactions(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![],
        )]);

        assert!(f.statuses().is_empty());
        assert_eq!(f.tracker.status(), None);
        assert!(f.billing.calls().is_empty());
    }

    #[test]
    fn download_event_for_untracked_transaction_is_ignored() {
        let f = fixture();
        let orphan = download("d9", "missing", "unlock");
        f.tracker
            .handle_download_events(vec![dl_event(orphan, DownloadState::Finished, 1.0)]);

        assert!(f.statuses().is_empty());
        assert!(f.billing.calls().is_empty());
    }

    #[test]
    fn one_shot_waiter_sees_tracker_notices() {
        let f = fixture();
        let (_token, rx) = f.events.watch_once(|n| n.status.is_purchase_terminal());

        f.tracker.handle_transaction_updates(vec![update(
            "t1",
            "unlock",
            TransactionState::Purchased,
            vec![],
        )]);

        let notice = rx.blocking_recv().unwrap();
        assert_eq!(notice.status, PurchaseStatus::PurchaseSucceeded);
        assert_eq!(notice.product_id.as_deref(), Some("unlock"));
    }
}
