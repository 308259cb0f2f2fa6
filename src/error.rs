use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::quota::QuotaExceeded;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    QuotaExceeded(QuotaExceeded),

    #[error("Error checking search limits")]
    QuotaCheck(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::QuotaCheck(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::QuotaExceeded(q) => json!({
                "success": false,
                "message": self.to_string(),
                "error": "daily_limit_exceeded",
                "limit": q.limit,
                "remaining": 0,
                "plan": q.plan,
                "upgradeRequired": q.upgrade_required,
            }),
            // Internal details stay in the logs.
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                json!({ "success": false, "message": "Internal server error" })
            }
            AppError::QuotaCheck(e) => {
                tracing::error!(error = ?e, "search quota check failed");
                json!({ "success": false, "message": self.to_string() })
            }
            _ => json!({ "success": false, "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::PlanTier;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn quota_exceeded_renders_429_payload() {
        let err = AppError::QuotaExceeded(QuotaExceeded::new(PlanTier::Basic));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "daily_limit_exceeded");
        assert_eq!(body["limit"], 10);
        assert_eq!(body["remaining"], 0);
        assert_eq!(body["plan"], "Basic");
        assert_eq!(body["upgradeRequired"], true);
        assert_eq!(body["message"], "Daily search limit of 10 reached on the Basic plan");
    }

    #[tokio::test]
    async fn quota_check_failure_is_generic_500() {
        let err = AppError::QuotaCheck(anyhow::anyhow!("connection reset"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(res).await;
        assert_eq!(body["message"], "Error checking search limits");
    }
}
