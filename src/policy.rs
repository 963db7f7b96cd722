//! Entitlement policy: pure decisions over stored flags.
//!
//! Nothing here talks to the billing API. Every function reads the layered
//! store (and the clock for date logic) and computes an answer.

use crate::clock::Clock;
use crate::store::{keys, LayeredStore, Value};
use crate::UnlockgateError;
use chrono::NaiveDate;
use std::sync::Arc;

/// Price at or below which the paywall turns on automatically.
const AUTO_PAYWALL_PRICE: f64 = 3.0;

/// Fallback review-gate thresholds when the remote config never landed.
const DEFAULT_TRY_TRIGGER: i64 = 50;
const DEFAULT_RATED_TRIGGER: i64 = 200;

/// Entitlement decisions over [`LayeredStore`] contents.
pub struct EntitlementPolicy {
    store: Arc<LayeredStore>,
    clock: Arc<dyn Clock>,
}

impl EntitlementPolicy {
    /// Create a policy over the given store and clock.
    pub fn new(store: Arc<LayeredStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Whether the user is entitled to the unlock.
    ///
    /// The stored flag is authoritative once true. If it was never set,
    /// a product that doesn't require purchase counts as already entitled.
    pub fn is_purchased(&self) -> bool {
        if self.store.get_bool(keys::IS_PURCHASED_FLAG).unwrap_or(false) {
            return true;
        }
        !self.is_need_purchase()
    }

    /// Whether the paywall applies.
    pub fn is_need_purchase(&self) -> bool {
        if self.hide_purchase_entry() {
            return false;
        }
        if self.store.get_bool(keys::NEED_PURCHASE).unwrap_or(false) {
            return true;
        }
        // Low-priced apps get the paywall automatically; an unknown price
        // reads as 0 and therefore enables it.
        let app_price = self.store.get_f64(keys::APP_PRICE).unwrap_or(0.0);
        app_price <= AUTO_PAYWALL_PRICE
    }

    /// Whether the purchase entry point is hidden entirely.
    pub fn hide_purchase_entry(&self) -> bool {
        self.store
            .get_bool(keys::HIDE_PURCHASE_ENTRY)
            .unwrap_or(false)
    }

    /// True iff today's calendar date is on or after `date` (`yyyy-MM-dd`).
    ///
    /// An unparseable date counts as a zero-day difference, i.e. true.
    pub fn is_after(&self, date: &str) -> bool {
        let today = self.clock.today().format("%Y-%m-%d").to_string();
        days_between(date, &today) >= 0
    }

    /// Evaluate the review-prompt gate and advance the trigger counter.
    ///
    /// Fires when the counter first reaches `tryRatingTriggerCount`, then
    /// every `ratedTriggerCount` evaluations after that. The counter
    /// increments on every call regardless of the outcome.
    pub fn should_prompt_review(&self) -> Result<bool, UnlockgateError> {
        let try_trigger = self
            .store
            .get_i64(keys::TRY_RATING_TRIGGER_COUNT)
            .unwrap_or(DEFAULT_TRY_TRIGGER);
        let rated_trigger = self
            .store
            .get_i64(keys::RATED_TRIGGER_COUNT)
            .unwrap_or(DEFAULT_RATED_TRIGGER);
        let current = self
            .store
            .get_i64(keys::CURRENT_TRIGGER_COUNT)
            .unwrap_or(0);

        let mut fired = current == try_trigger;
        if !fired && current > try_trigger && rated_trigger > 0 {
            fired = (current - try_trigger) % rated_trigger == 0;
        }

        self.store
            .set(keys::CURRENT_TRIGGER_COUNT, Value::Int(current + 1))?;

        Ok(fired)
    }
}

/// Whole-day difference between two `yyyy-MM-dd` strings (`to - from`).
///
/// Unparseable inputs count as 0 days.
pub fn days_between(from: &str, to: &str) -> i64 {
    let (Ok(from), Ok(to)) = (
        NaiveDate::parse_from_str(from, "%Y-%m-%d"),
        NaiveDate::parse_from_str(to, "%Y-%m-%d"),
    ) else {
        return 0;
    };
    (to - from).num_days()
}
