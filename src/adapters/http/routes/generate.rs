use std::str::FromStr;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{
        app_state::AppState,
        extract::{ClientIp, MaybeAuthUser},
    },
    app_error::{AppError, AppResult},
    application::use_cases::quota::QuotaIdentity,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-structure", post(generate_structure))
        .route("/generate-image", post(generate_image))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct GenerateStructurePayload {
    #[serde(default)]
    text: String,
    language: Option<String>,
}

#[derive(Serialize)]
struct GenerateStructureResponse {
    success: bool,
    structure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateImagePayload {
    #[serde(default)]
    structure: String,
    style: Option<String>,
    ratio: Option<String>,
    language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageResponse {
    success: bool,
    image_url: String,
}

/// Absent fields take the default; unknown labels are a client error.
fn option_or_default<T: FromStr + Default>(value: Option<&str>) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(T::default()),
        Some(s) => s.parse().map_err(|e: T::Err| AppError::InvalidInput(e.to_string())),
    }
}

fn identity(user: &MaybeAuthUser, ip: ClientIp) -> QuotaIdentity {
    QuotaIdentity::new(user.0.as_ref().map(|u| u.user_id), ip.0)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/generate-structure
async fn generate_structure(
    State(app_state): State<AppState>,
    user: MaybeAuthUser,
    ip: ClientIp,
    Json(payload): Json<GenerateStructurePayload>,
) -> AppResult<impl IntoResponse> {
    let language = option_or_default(payload.language.as_deref())?;

    let output = app_state
        .generation_use_cases
        .generate_structure(&identity(&user, ip), &payload.text, language)
        .await?;

    Ok(Json(GenerateStructureResponse {
        success: true,
        structure: output.structure,
        usage: output.usage,
    }))
}

/// POST /api/generate-image
async fn generate_image(
    State(app_state): State<AppState>,
    user: MaybeAuthUser,
    ip: ClientIp,
    Json(payload): Json<GenerateImagePayload>,
) -> AppResult<impl IntoResponse> {
    let style = option_or_default(payload.style.as_deref())?;
    let ratio = option_or_default(payload.ratio.as_deref())?;
    let language = option_or_default(payload.language.as_deref())?;

    let output = app_state
        .generation_use_cases
        .generate_image(&identity(&user, ip), &payload.structure, style, ratio, language)
        .await?;

    Ok(Json(GenerateImageResponse {
        success: true,
        image_url: output.image_url,
    }))
}
