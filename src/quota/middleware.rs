use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::gate::{GateDecision, QuotaGate, SearchAllowance};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

/// Counts one search against the caller's daily quota before the handler
/// runs. Must sit behind `require_auth`.
pub async fn search_quota(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(AuthUser(user_id)) = req.extensions().get::<AuthUser>().copied() else {
        // No user on the request: let it through on a free allowance
        // without touching any counter.
        warn!(uri = %req.uri(), "search quota reached without a user, using free fallback");
        req.extensions_mut().insert(SearchAllowance::fallback());
        return next.run(req).await;
    };

    let gate = QuotaGate::new(state.quota.as_ref(), state.config.quota.utc_offset);
    match gate.check(user_id).await {
        Ok(GateDecision::Allowed(allowance)) => {
            req.extensions_mut().insert(allowance);
            next.run(req).await
        }
        Ok(GateDecision::Exceeded(exceeded)) => {
            info!(%user_id, plan = %exceeded.plan, limit = exceeded.limit, "daily search limit reached");
            AppError::QuotaExceeded(exceeded).into_response()
        }
        Err(e) => e.into_response(),
    }
}
