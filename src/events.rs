//! Typed purchase event bus.
//!
//! Replaces ad hoc broadcast-notification plumbing with explicit
//! subscriptions: persistent callbacks with unsubscribe handles, one-shot
//! filtered callbacks (deregistered on first match), and one-shot channel
//! watchers for the awaitable facade variants.

use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Outward purchase/restore/download status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    /// A purchase attempt failed.
    PurchaseFailed,
    /// A purchase completed (no hosted content).
    PurchaseSucceeded,
    /// A restore session failed.
    RestoreFailed,
    /// A restore completed.
    RestoreSucceeded,
    /// Hosted-content downloads were kicked off.
    DownloadStarted,
    /// A download reported progress.
    DownloadInProgress,
    /// A download failed.
    DownloadFailed,
    /// All downloads of a transaction settled.
    DownloadSucceeded,
}

impl PurchaseStatus {
    /// Whether this status ends a purchase attempt (success or failure).
    pub fn is_purchase_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseStatus::PurchaseSucceeded
                | PurchaseStatus::PurchaseFailed
                | PurchaseStatus::DownloadSucceeded
                | PurchaseStatus::DownloadFailed
        )
    }

    /// Whether this status ends a restore session.
    pub fn is_restore_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseStatus::RestoreSucceeded | PurchaseStatus::RestoreFailed
        )
    }

    /// Whether this status grants the entitlement.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PurchaseStatus::PurchaseSucceeded
                | PurchaseStatus::RestoreSucceeded
                | PurchaseStatus::DownloadSucceeded
        )
    }
}

/// One status notification, emitted per processed transaction/download.
#[derive(Debug, Clone)]
pub struct PurchaseNotice {
    /// What happened.
    pub status: PurchaseStatus,
    /// Affected product id, when the event is tied to one.
    pub product_id: Option<String>,
    /// Human-readable failure/progress message.
    pub message: Option<String>,
    /// Download progress percentage (platform fraction x 100).
    pub progress: Option<f32>,
}

impl PurchaseNotice {
    /// Notice with just a status and product id.
    pub fn status(status: PurchaseStatus, product_id: impl Into<String>) -> Self {
        Self {
            status,
            product_id: Some(product_id.into()),
            message: None,
            progress: None,
        }
    }
}

type Filter = Box<dyn Fn(&PurchaseNotice) -> bool + Send>;

enum OnceSink {
    Callback(Box<dyn FnOnce(PurchaseNotice) + Send>),
    Channel(oneshot::Sender<PurchaseNotice>),
}

struct OnceWaiter {
    id: u64,
    filter: Filter,
    sink: OnceSink,
}

struct Subscriber {
    id: u64,
    callback: Arc<dyn Fn(&PurchaseNotice) + Send + Sync>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    waiters: Vec<OnceWaiter>,
}

/// Handle returned by [`EventBus::subscribe`]; pass back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Handle for a registered one-shot waiter; pass back to cancel it
/// before it fires (e.g. when the operation it waits on failed to start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnceToken(u64);

/// Typed broadcast bus for [`PurchaseNotice`] values.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<Inner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent callback for every notice.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PurchaseNotice) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        Subscription(id)
    }

    /// Remove a persistent subscription.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.subscribers.retain(|s| s.id != subscription.0);
    }

    /// Register a callback invoked once, on the first notice the filter
    /// matches, then deregistered. Non-matching notices are ignored.
    pub fn subscribe_once<F, C>(&self, filter: F, callback: C) -> OnceToken
    where
        F: Fn(&PurchaseNotice) -> bool + Send + 'static,
        C: FnOnce(PurchaseNotice) + Send + 'static,
    {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.waiters.push(OnceWaiter {
            id,
            filter: Box::new(filter),
            sink: OnceSink::Callback(Box::new(callback)),
        });
        OnceToken(id)
    }

    /// Register a one-shot channel resolved by the first matching notice.
    pub fn watch_once<F>(&self, filter: F) -> (OnceToken, oneshot::Receiver<PurchaseNotice>)
    where
        F: Fn(&PurchaseNotice) -> bool + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.waiters.push(OnceWaiter {
            id,
            filter: Box::new(filter),
            sink: OnceSink::Channel(tx),
        });
        (OnceToken(id), rx)
    }

    /// Drop a one-shot waiter that has not fired yet.
    pub fn cancel_once(&self, token: OnceToken) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.waiters.retain(|w| w.id != token.0);
    }

    /// Broadcast one notice.
    ///
    /// Callbacks run outside the bus lock, so a callback may subscribe or
    /// emit again without deadlocking.
    pub fn emit(&self, notice: PurchaseNotice) {
        let (callbacks, fired) = {
            let mut inner = self.inner.lock().expect("event bus lock poisoned");

            let callbacks: Vec<_> = inner
                .subscribers
                .iter()
                .map(|s| Arc::clone(&s.callback))
                .collect();

            let mut fired = Vec::new();
            let mut kept = Vec::new();
            for waiter in inner.waiters.drain(..) {
                if (waiter.filter)(&notice) {
                    fired.push(waiter.sink);
                } else {
                    kept.push(waiter);
                }
            }
            inner.waiters = kept;

            (callbacks, fired)
        };

        for callback in callbacks {
            callback(&notice);
        }
        for sink in fired {
            match sink {
                OnceSink::Callback(f) => f(notice.clone()),
                // The receiver may have given up (timeout); that's fine.
                OnceSink::Channel(tx) => {
                    let _ = tx.send(notice.clone());
                }
            }
        }
    }
}
