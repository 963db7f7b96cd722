//! Dual-scope persistent key/value storage.
//!
//! Entitlement flags are written redundantly to a local scope and an
//! optional shared scope (an app-group-style container a companion process
//! can also read). [`LayeredStore`] documents the precedence and
//! repair-on-read contract; [`FileScope`] is one physical scope.

pub mod file;
pub mod layered;

pub use file::{FileScope, Value};
pub use layered::LayeredStore;

/// Well-known entitlement flag keys.
pub mod keys {
    /// Authoritative purchased flag; sticky once true.
    pub const IS_PURCHASED_FLAG: &str = "isPurchasedFlag";
    /// Whether the paywall is enabled.
    pub const NEED_PURCHASE: &str = "needPurchase";
    /// Whether the purchase entry point is hidden entirely.
    pub const HIDE_PURCHASE_ENTRY: &str = "hidePurchaseEntry";
    /// Last known app price from the lookup endpoint.
    pub const APP_PRICE: &str = "appPrice";
    /// Evaluation count at which the review prompt first fires.
    pub const TRY_RATING_TRIGGER_COUNT: &str = "tryRatingTriggerCount";
    /// Evaluation interval for repeat review prompts.
    pub const RATED_TRIGGER_COUNT: &str = "ratedTriggerCount";
    /// Running count of rating-gate evaluations.
    pub const CURRENT_TRIGGER_COUNT: &str = "currentTriggerCount";
}
