use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Daily cap used in place of "no limit".
pub const UNLIMITED_SEARCHES: i32 = 999_999;

/// Subscription level deciding how many recipe searches a user gets per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanTier {
    Free,
    Basic,
    Premium,
    Pro,
    Unlimited,
}

impl PlanTier {
    pub const ALL: [PlanTier; 5] = [
        PlanTier::Free,
        PlanTier::Basic,
        PlanTier::Premium,
        PlanTier::Pro,
        PlanTier::Unlimited,
    ];

    /// Maps a free-form `plan_type` onto a tier. Matching is a
    /// case-insensitive substring test, so "Pro Monthly" is `Pro`.
    pub fn from_plan_type(plan_type: &str) -> Self {
        let p = plan_type.to_ascii_lowercase();
        if p.contains("unlimited") {
            PlanTier::Unlimited
        } else if p.contains("pro") {
            PlanTier::Pro
        } else if p.contains("premium") {
            PlanTier::Premium
        } else if p.contains("basic") {
            PlanTier::Basic
        } else {
            PlanTier::Free
        }
    }

    /// Exact lookup by key, used when a user picks a plan.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(key))
    }

    pub fn key(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Premium => "premium",
            PlanTier::Pro => "pro",
            PlanTier::Unlimited => "unlimited",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Basic => "Basic",
            PlanTier::Premium => "Premium",
            PlanTier::Pro => "Pro",
            PlanTier::Unlimited => "Unlimited",
        }
    }

    pub fn daily_cap(self) -> i32 {
        match self {
            PlanTier::Free => 3,
            PlanTier::Basic => 10,
            PlanTier::Premium => 30,
            PlanTier::Pro => 50,
            PlanTier::Unlimited => UNLIMITED_SEARCHES,
        }
    }

    /// Whether a bigger plan exists for this user to move to.
    pub fn can_upgrade(self) -> bool {
        !matches!(self, PlanTier::Pro | PlanTier::Unlimited)
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the quota gate needs to know about a user's subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub is_subscribed: bool,
    pub plan_type: Option<String>,
    pub status: Option<String>,
    pub expiry_date: Option<OffsetDateTime>,
}

impl SubscriptionSnapshot {
    pub fn active(plan_type: &str, expiry_date: OffsetDateTime) -> Self {
        Self {
            is_subscribed: true,
            plan_type: Some(plan_type.to_string()),
            status: Some("active".into()),
            expiry_date: Some(expiry_date),
        }
    }

    /// Resolves the tier in effect at `now`. Anything not subscribed,
    /// not active or already expired falls back to `Free`.
    pub fn tier(&self, now: OffsetDateTime) -> PlanTier {
        if !self.is_subscribed {
            return PlanTier::Free;
        }
        if self.status.as_deref() != Some("active") {
            return PlanTier::Free;
        }
        match (&self.plan_type, self.expiry_date) {
            (Some(plan_type), Some(expiry)) if expiry > now => PlanTier::from_plan_type(plan_type),
            _ => PlanTier::Free,
        }
    }
}
