pub mod billing;
pub mod generate;
pub mod webhooks;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhooks::router())
        .merge(generate::router())
        .merge(billing::router())
}

/// GET /api/health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
