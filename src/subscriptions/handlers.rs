use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};

use super::{
    dto::{ActivateRequest, MySubscription, PlanInfo},
    repo::{self, Subscription},
};
use crate::{auth::AuthUser, error::AppError, quota::PlanTier, state::AppState};

const MAX_DURATION_DAYS: i64 = 366;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/plans", get(list_plans))
        .route("/subscriptions/me", get(my_subscription))
        .route("/subscriptions", post(activate))
        .route("/subscriptions/cancel", post(cancel))
}

pub async fn list_plans() -> Json<Vec<PlanInfo>> {
    Json(PlanTier::ALL.into_iter().map(PlanInfo::from).collect())
}

#[instrument(skip(state))]
pub async fn my_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MySubscription>, AppError> {
    let tier = state
        .quota
        .subscription(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?
        .tier(OffsetDateTime::now_utc());
    let subscription = repo::current(&state.db, user_id).await?;

    Ok(Json(MySubscription {
        tier,
        daily_search_limit: tier.daily_cap(),
        subscription,
    }))
}

/// Resolves the tier a user asked for. Free needs no subscription row.
fn requested_tier(body: &ActivateRequest) -> Result<PlanTier, AppError> {
    let tier = PlanTier::from_key(&body.plan_type)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown plan {:?}", body.plan_type)))?;
    if tier == PlanTier::Free {
        return Err(AppError::BadRequest(
            "The free plan does not need a subscription".into(),
        ));
    }
    if !(1..=MAX_DURATION_DAYS).contains(&body.duration_days) {
        return Err(AppError::BadRequest(format!(
            "duration_days must be between 1 and {MAX_DURATION_DAYS}"
        )));
    }
    Ok(tier)
}

#[instrument(skip(state))]
pub async fn activate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ActivateRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let tier = requested_tier(&body)?;
    let sub = repo::activate(&state.db, user_id, tier, Duration::days(body.duration_days)).await?;
    info!(%user_id, plan = %tier, subscription_id = %sub.id, "subscription activated");
    Ok((StatusCode::CREATED, Json(sub)))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Subscription>, AppError> {
    let sub = repo::cancel(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No active subscription".into()))?;
    info!(%user_id, subscription_id = %sub.id, "subscription cancelled");
    Ok(Json(sub))
}
