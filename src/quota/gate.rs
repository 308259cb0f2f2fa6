use std::fmt;

use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::debug;
use uuid::Uuid;

use super::{
    plan::PlanTier,
    store::QuotaStore,
    usage::{self, ConsumeOutcome},
};
use crate::error::AppError;

/// Attached to the request once a search has been counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchAllowance {
    pub plan: PlanTier,
    pub limit: i32,
    pub used: i32,
    pub remaining: i32,
}

impl SearchAllowance {
    /// Used when a request reaches the gate with no user attached.
    pub fn fallback() -> Self {
        let limit = PlanTier::Free.daily_cap();
        Self {
            plan: PlanTier::Free,
            limit,
            used: 0,
            remaining: limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaExceeded {
    pub plan: PlanTier,
    pub limit: i32,
    pub upgrade_required: bool,
}

impl QuotaExceeded {
    pub fn new(plan: PlanTier) -> Self {
        Self {
            plan,
            limit: plan.daily_cap(),
            upgrade_required: plan.can_upgrade(),
        }
    }
}

impl fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Daily search limit of {} reached on the {} plan",
            self.limit, self.plan
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(SearchAllowance),
    Exceeded(QuotaExceeded),
}

/// Read-only view of today's quota.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLimits {
    pub plan: PlanTier,
    pub limit: i32,
    pub used: i32,
    pub remaining: i32,
    pub last_search_date: Option<String>,
    pub upgrade_available: bool,
}

pub struct QuotaGate<'a> {
    store: &'a dyn QuotaStore,
    offset: UtcOffset,
}

impl<'a> QuotaGate<'a> {
    pub fn new(store: &'a dyn QuotaStore, offset: UtcOffset) -> Self {
        Self { store, offset }
    }

    pub fn today(&self) -> Date {
        usage::today(self.offset)
    }

    pub async fn check(&self, user_id: Uuid) -> Result<GateDecision, AppError> {
        self.check_at(user_id, self.today(), OffsetDateTime::now_utc())
            .await
    }

    pub async fn check_at(
        &self,
        user_id: Uuid,
        today: Date,
        now: OffsetDateTime,
    ) -> Result<GateDecision, AppError> {
        let plan = self.plan_for(user_id, now).await?;
        let limit = plan.daily_cap();

        let outcome = self
            .store
            .consume_search(user_id, today, limit)
            .await
            .map_err(AppError::QuotaCheck)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let decision = match outcome {
            ConsumeOutcome::Consumed { used } => GateDecision::Allowed(SearchAllowance {
                plan,
                limit,
                used,
                remaining: (limit - used).max(0),
            }),
            ConsumeOutcome::Exhausted { .. } => GateDecision::Exceeded(QuotaExceeded::new(plan)),
        };
        debug!(%user_id, %plan, ?decision, "search quota checked");
        Ok(decision)
    }

    pub async fn status(&self, user_id: Uuid) -> Result<SearchLimits, AppError> {
        self.status_at(user_id, self.today(), OffsetDateTime::now_utc())
            .await
    }

    /// Same arithmetic as `check_at` but nothing is written back.
    pub async fn status_at(
        &self,
        user_id: Uuid,
        today: Date,
        now: OffsetDateTime,
    ) -> Result<SearchLimits, AppError> {
        let plan = self.plan_for(user_id, now).await?;
        let mut usage = self
            .store
            .usage(user_id)
            .await
            .map_err(AppError::QuotaCheck)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        // Report the stored day, the roll-over below is never persisted.
        let last_search_date = usage.last_search_date;
        usage.roll_over(today);

        let limit = plan.daily_cap();
        Ok(SearchLimits {
            plan,
            limit,
            used: usage.count,
            remaining: usage.remaining(limit),
            last_search_date: last_search_date.map(usage::format_day),
            upgrade_available: plan.can_upgrade(),
        })
    }

    async fn plan_for(&self, user_id: Uuid, now: OffsetDateTime) -> Result<PlanTier, AppError> {
        let sub = self
            .store
            .subscription(user_id)
            .await
            .map_err(AppError::QuotaCheck)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(sub.tier(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{
        plan::{SubscriptionSnapshot, UNLIMITED_SEARCHES},
        store::memory::{BrokenQuotaStore, InMemoryQuotaStore},
        usage::SearchUsage,
    };
    use time::{macros::date, Duration};

    const TODAY: Date = date!(2024 - 05 - 20);
    const YESTERDAY: Date = date!(2024 - 05 - 19);

    fn now() -> OffsetDateTime {
        TODAY.midnight().assume_utc() + Duration::hours(12)
    }

    fn store_with(sub: SubscriptionSnapshot, usage: SearchUsage) -> (InMemoryQuotaStore, Uuid) {
        let store = InMemoryQuotaStore::default();
        let id = Uuid::new_v4();
        store.insert_user(id, sub, usage);
        (store, id)
    }

    fn sub(plan: &str) -> SubscriptionSnapshot {
        SubscriptionSnapshot::active(plan, now() + Duration::days(30))
    }

    #[tokio::test]
    async fn rejects_when_cap_reached_today() {
        let (store, id) = store_with(sub("basic"), SearchUsage::new(10, Some(TODAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let decision = gate.check_at(id, TODAY, now()).await.unwrap();
        assert_eq!(
            decision,
            GateDecision::Exceeded(QuotaExceeded {
                plan: PlanTier::Basic,
                limit: 10,
                upgrade_required: true,
            })
        );
        assert_eq!(store.usage_of(id).unwrap().count, 10);
    }

    #[tokio::test]
    async fn prior_day_resets_to_one() {
        let (store, id) = store_with(sub("premium"), SearchUsage::new(30, Some(YESTERDAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let GateDecision::Allowed(allowance) = gate.check_at(id, TODAY, now()).await.unwrap() else {
            panic!("expected search to be allowed");
        };
        assert_eq!(allowance.used, 1);
        assert_eq!(allowance.remaining, 29);
        assert_eq!(store.usage_of(id).unwrap(), SearchUsage::new(1, Some(TODAY)));
    }

    #[tokio::test]
    async fn free_user_last_search_then_rejected() {
        let (store, id) = store_with(SubscriptionSnapshot::default(), SearchUsage::new(2, Some(TODAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let first = gate.check_at(id, TODAY, now()).await.unwrap();
        assert_eq!(
            first,
            GateDecision::Allowed(SearchAllowance {
                plan: PlanTier::Free,
                limit: 3,
                used: 3,
                remaining: 0,
            })
        );

        let second = gate.check_at(id, TODAY, now()).await.unwrap();
        assert!(matches!(second, GateDecision::Exceeded(q) if q.limit == 3 && q.upgrade_required));
    }

    #[tokio::test]
    async fn expired_plan_is_capped_as_free() {
        let expired = SubscriptionSnapshot::active("pro", now() - Duration::days(1));
        let (store, id) = store_with(expired, SearchUsage::new(3, Some(TODAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let decision = gate.check_at(id, TODAY, now()).await.unwrap();
        assert!(matches!(decision, GateDecision::Exceeded(q) if q.plan == PlanTier::Free));
    }

    #[tokio::test]
    async fn pro_exhaustion_does_not_ask_for_upgrade() {
        let (store, id) = store_with(sub("Pro"), SearchUsage::new(50, Some(TODAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let decision = gate.check_at(id, TODAY, now()).await.unwrap();
        assert!(matches!(decision, GateDecision::Exceeded(q) if q.limit == 50 && !q.upgrade_required));
    }

    #[tokio::test]
    async fn unlimited_sentinel_never_rejects_realistic_volume() {
        let (store, id) = store_with(sub("unlimited"), SearchUsage::default());
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        for _ in 0..1_000 {
            let decision = gate.check_at(id, TODAY, now()).await.unwrap();
            assert!(matches!(decision, GateDecision::Allowed(_)));
        }
        let usage = store.usage_of(id).unwrap();
        assert_eq!(usage.count, 1_000);
        assert_eq!(usage.remaining(UNLIMITED_SEARCHES), UNLIMITED_SEARCHES - 1_000);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = InMemoryQuotaStore::default();
        let gate = QuotaGate::new(&store, UtcOffset::UTC);
        let err = gate.check_at(Uuid::new_v4(), TODAY, now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_quota_check_error() {
        let gate = QuotaGate::new(&BrokenQuotaStore, UtcOffset::UTC);
        let err = gate.check_at(Uuid::new_v4(), TODAY, now()).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaCheck(_)));
    }

    #[tokio::test]
    async fn status_reports_rollover_without_writing() {
        let (store, id) = store_with(sub("basic"), SearchUsage::new(9, Some(YESTERDAY)));
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let limits = gate.status_at(id, TODAY, now()).await.unwrap();
        assert_eq!(limits.used, 0);
        assert_eq!(limits.remaining, 10);
        assert_eq!(limits.last_search_date.as_deref(), Some("2024-05-19"));
        assert_eq!(store.usage_of(id).unwrap().count, 9);
    }

    #[tokio::test]
    async fn status_for_new_user_has_no_search_date() {
        let (store, id) = store_with(SubscriptionSnapshot::default(), SearchUsage::default());
        let gate = QuotaGate::new(&store, UtcOffset::UTC);

        let limits = gate.status_at(id, TODAY, now()).await.unwrap();
        assert_eq!(limits.used, 0);
        assert_eq!(limits.remaining, 3);
        assert_eq!(limits.last_search_date, None);
        assert_eq!(store.usage_of(id).unwrap(), SearchUsage::default());
    }
}
