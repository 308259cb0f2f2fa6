use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{
    plan::SubscriptionSnapshot,
    usage::{ConsumeOutcome, SearchUsage},
};

/// Persistence used by the quota gate. `None` means the user does not exist.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn subscription(&self, user_id: Uuid) -> anyhow::Result<Option<SubscriptionSnapshot>>;

    async fn usage(&self, user_id: Uuid) -> anyhow::Result<Option<SearchUsage>>;

    /// Rolls the day over if needed and counts one search unless `cap` is
    /// already reached, as a single step.
    async fn consume_search(
        &self,
        user_id: Uuid,
        today: Date,
        cap: i32,
    ) -> anyhow::Result<Option<ConsumeOutcome>>;
}

#[derive(Clone)]
pub struct PgQuotaStore {
    db: PgPool,
}

impl PgQuotaStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    is_subscribed: bool,
    plan_type: Option<String>,
    status: Option<String>,
    expiry_date: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
struct UsageRow {
    daily_search_count: i32,
    last_search_date: Option<Date>,
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn subscription(&self, user_id: Uuid) -> anyhow::Result<Option<SubscriptionSnapshot>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT u.is_subscribed, s.plan_type, s.status, s.expiry_date
              FROM users u
              LEFT JOIN subscriptions s ON s.id = u.subscription_id
             WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load subscription for quota")?;

        Ok(row.map(|r| SubscriptionSnapshot {
            is_subscribed: r.is_subscribed,
            plan_type: r.plan_type,
            status: r.status,
            expiry_date: r.expiry_date,
        }))
    }

    async fn usage(&self, user_id: Uuid) -> anyhow::Result<Option<SearchUsage>> {
        let row = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT daily_search_count, last_search_date
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load search usage")?;

        Ok(row.map(|r| SearchUsage::new(r.daily_search_count, r.last_search_date)))
    }

    async fn consume_search(
        &self,
        user_id: Uuid,
        today: Date,
        cap: i32,
    ) -> anyhow::Result<Option<ConsumeOutcome>> {
        // Reset, cap check and increment in one statement so concurrent
        // searches from the same user cannot both take the last slot.
        let used = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
               SET daily_search_count = CASE
                       WHEN last_search_date IS NULL OR last_search_date < $2 THEN 1
                       ELSE daily_search_count + 1
                   END,
                   last_search_date = GREATEST(COALESCE(last_search_date, $2), $2)
             WHERE id = $1
               AND (last_search_date IS NULL
                    OR last_search_date < $2
                    OR daily_search_count < $3)
            RETURNING daily_search_count
            "#,
        )
        .bind(user_id)
        .bind(today)
        .bind(cap)
        .fetch_optional(&self.db)
        .await
        .context("consume daily search")?;

        if let Some(used) = used {
            return Ok(Some(ConsumeOutcome::Consumed { used }));
        }

        // Nothing updated: either the cap is reached or the user is gone.
        Ok(self
            .usage(user_id)
            .await?
            .map(|u| ConsumeOutcome::Exhausted { used: u.count }))
    }
}


#[cfg(test)]
mod pg_tests {
    use time::macros::date;

    use super::*;
    use crate::state::AppState;

    const TODAY: Date = date!(2024 - 05 - 20);

    async fn seed(db: &PgPool, count: i32, last: Option<Date>) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, daily_search_count, last_search_date)
            VALUES ($1, 'x', $2, $3)
            RETURNING id
            "#,
        )
        .bind(format!("{}@quota.test", Uuid::new_v4()))
        .bind(count)
        .bind(last)
        .fetch_one(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn new_day_resets_to_one() {
        let db = AppState::test_db().await;
        let store = PgQuotaStore::new(db.clone());
        let id = seed(&db, 10, TODAY.previous_day()).await;

        let out = store.consume_search(id, TODAY, 10).await.unwrap();
        assert_eq!(out, Some(ConsumeOutcome::Consumed { used: 1 }));
        assert_eq!(
            store.usage(id).await.unwrap(),
            Some(SearchUsage::new(1, Some(TODAY)))
        );
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn never_searched_counts_first_search() {
        let db = AppState::test_db().await;
        let store = PgQuotaStore::new(db.clone());
        let id = seed(&db, 0, None).await;

        let out = store.consume_search(id, TODAY, 3).await.unwrap();
        assert_eq!(out, Some(ConsumeOutcome::Consumed { used: 1 }));
        assert_eq!(
            store.usage(id).await.unwrap(),
            Some(SearchUsage::new(1, Some(TODAY)))
        );
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn same_day_increments_then_stops_at_cap() {
        let db = AppState::test_db().await;
        let store = PgQuotaStore::new(db.clone());
        let id = seed(&db, 2, Some(TODAY)).await;

        let out = store.consume_search(id, TODAY, 3).await.unwrap();
        assert_eq!(out, Some(ConsumeOutcome::Consumed { used: 3 }));

        let out = store.consume_search(id, TODAY, 3).await.unwrap();
        assert_eq!(out, Some(ConsumeOutcome::Exhausted { used: 3 }));
        assert_eq!(store.usage(id).await.unwrap().unwrap().count, 3);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn future_date_is_kept_and_counted() {
        let db = AppState::test_db().await;
        let store = PgQuotaStore::new(db.clone());
        let tomorrow = TODAY.next_day();
        let id = seed(&db, 1, tomorrow).await;

        let out = store.consume_search(id, TODAY, 3).await.unwrap();
        assert_eq!(out, Some(ConsumeOutcome::Consumed { used: 2 }));
        assert_eq!(
            store.usage(id).await.unwrap(),
            Some(SearchUsage::new(2, tomorrow))
        );
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn unknown_user_is_none() {
        let db = AppState::test_db().await;
        let store = PgQuotaStore::new(db);

        let out = store.consume_search(Uuid::new_v4(), TODAY, 3).await.unwrap();
        assert_eq!(out, None);
    }
}
