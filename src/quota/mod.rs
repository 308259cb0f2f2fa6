//! Per-user daily recipe search quota, sized by subscription tier.

mod gate;
pub mod middleware;
mod plan;
mod store;
pub mod usage;

pub use gate::{GateDecision, QuotaExceeded, QuotaGate, SearchAllowance, SearchLimits};
pub use plan::{PlanTier, SubscriptionSnapshot, UNLIMITED_SEARCHES};
pub use store::{PgQuotaStore, QuotaStore};

#[cfg(test)]
pub(crate) use store::memory;
