use serde::{Deserialize, Serialize};

use super::repo::Subscription;
use crate::quota::{PlanTier, UNLIMITED_SEARCHES};

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub daily_search_limit: i32,
    pub unlimited: bool,
}

impl From<PlanTier> for PlanInfo {
    fn from(tier: PlanTier) -> Self {
        let limit = tier.daily_cap();
        Self {
            key: tier.key(),
            name: tier.name(),
            daily_search_limit: limit,
            unlimited: limit == UNLIMITED_SEARCHES,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub plan_type: String,
    #[serde(default = "default_duration_days")]
    pub duration_days: i64,
}

fn default_duration_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub struct MySubscription {
    pub tier: PlanTier,
    pub daily_search_limit: i32,
    pub subscription: Option<Subscription>,
}
