use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

/// Header carrying `t=<timestamp>,v1=<hex>`.
pub const SIGNATURE_HEADER: &str = "creem-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/creem", post(handle_creem_webhook))
}

/// POST /api/webhooks/creem
///
/// The body is taken as raw bytes so the signature is checked over exactly
/// what the provider signed, before any decoding. Retryable failures surface
/// as 5xx so the provider redelivers.
async fn handle_creem_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    app_state
        .billing_use_cases
        .handle_webhook(&body, signature)
        .await?;

    Ok(Json(json!({ "received": true })))
}
