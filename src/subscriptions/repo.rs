use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::quota::PlanTier;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_type: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry_date: OffsetDateTime,
}

/// The subscription currently linked from the user row, if any.
pub async fn current(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let row = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT s.id, s.user_id, s.plan_type, s.status, s.started_at, s.expiry_date
          FROM subscriptions s
          JOIN users u ON u.subscription_id = s.id
         WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("load current subscription")?;

    Ok(row)
}

/// Cancels whatever is active for the user and links a fresh subscription.
pub async fn activate(
    db: &PgPool,
    user_id: Uuid,
    tier: PlanTier,
    duration: Duration,
) -> anyhow::Result<Subscription> {
    let mut tx = db.begin().await.context("begin tx")?;

    sqlx::query(
        r#"
        UPDATE subscriptions
           SET status = 'cancelled'
         WHERE user_id = $1 AND status = 'active'
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .context("cancel previous subscriptions")?;

    let expiry = OffsetDateTime::now_utc() + duration;
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, plan_type, status, expiry_date)
        VALUES ($1, $2, 'active', $3)
        RETURNING id, user_id, plan_type, status, started_at, expiry_date
        "#,
    )
    .bind(user_id)
    .bind(tier.key())
    .bind(expiry)
    .fetch_one(&mut *tx)
    .await
    .context("insert subscription")?;

    sqlx::query(
        r#"
        UPDATE users
           SET is_subscribed = TRUE, subscription_id = $2
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(sub.id)
    .execute(&mut *tx)
    .await
    .context("link subscription to user")?;

    tx.commit().await.context("commit tx")?;
    Ok(sub)
}

/// Returns the cancelled subscription, or `None` if nothing was active.
pub async fn cancel(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let cancelled = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
           SET status = 'cancelled'
         WHERE user_id = $1 AND status = 'active'
        RETURNING id, user_id, plan_type, status, started_at, expiry_date
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("cancel subscription")?;

    sqlx::query(
        r#"
        UPDATE users
           SET is_subscribed = FALSE, subscription_id = NULL
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .context("unlink subscription")?;

    tx.commit().await.context("commit tx")?;
    Ok(cancelled)
}
