use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    adapters::http::{app_state::AppState, extract::AuthUser},
    app_error::{AppError, AppResult},
    domain::entities::subscription::PlanType,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/customer-portal", post(customer_portal))
        .route("/subscription", get(get_subscription))
}

#[derive(Deserialize, Default)]
struct CheckoutPayload {
    plan: Option<String>,
}

#[derive(Serialize)]
struct UrlResponse {
    url: String,
}

/// POST /api/create-checkout-session
async fn create_checkout_session(
    State(app_state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    // An empty body means the default plan.
    let payload: CheckoutPayload = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| AppError::InvalidInput("Invalid request body".into()))?
    };
    let plan = match payload.plan.as_deref() {
        None => PlanType::Pro,
        Some(code) => PlanType::parse(code)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown plan: {code}")))?,
    };

    let checkout = app_state
        .billing_use_cases
        .create_checkout(user.user_id, user.email.as_deref(), plan)
        .await?;

    Ok(Json(UrlResponse {
        url: checkout.checkout_url,
    }))
}

/// POST /api/customer-portal
async fn customer_portal(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let url = app_state
        .billing_use_cases
        .customer_portal_url(user.user_id)
        .await?;
    Ok(Json(UrlResponse { url }))
}

/// GET /api/subscription
/// The effective subscription, or the implicit free plan.
async fn get_subscription(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .billing_use_cases
        .get_subscription(user.user_id)
        .await?;

    let body = match subscription {
        Some(sub) => json!(sub),
        None => json!({ "plan_type": PlanType::Free.as_str() }),
    };
    Ok(Json(body))
}
