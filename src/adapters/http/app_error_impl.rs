use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

const DAILY_LIMIT_MESSAGE: &str =
    "You have reached your daily limit of 3 mind maps. Upgrade to Pro for unlimited access.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        match self {
            AppError::Database(_) => {
                tracing::error!(error = %self, "Request failed");
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, "Database error")
            }
            AppError::InvalidSignature => {
                error_resp(StatusCode::UNAUTHORIZED, code, "Invalid signature")
            }
            AppError::InvalidCredentials => {
                error_resp(StatusCode::UNAUTHORIZED, code, "Unauthorized")
            }
            AppError::InvalidInput(msg) => error_resp(StatusCode::BAD_REQUEST, code, &msg),
            AppError::DailyLimitReached => {
                let body = json!({
                    "error": "Daily limit reached",
                    "code": code.as_str(),
                    "message": DAILY_LIMIT_MESSAGE,
                    "upgradeRequired": true,
                });
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            AppError::AlreadySubscribed => error_resp(
                StatusCode::BAD_REQUEST,
                code,
                "User already has an active subscription",
            ),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, code, "Not found"),
            AppError::Provider(msg) => {
                tracing::error!(error = %msg, "Upstream provider failed");
                error_resp(StatusCode::BAD_GATEWAY, code, &msg)
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, "Internal server error")
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, error: &str) -> Response {
    let body = json!({ "error": error, "code": code.as_str() });
    (status, Json(body)).into_response()
}
