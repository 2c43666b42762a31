//! Request extractors: bearer-token identity and client IP.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

/// A caller authenticated by `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl AuthUser {
    fn from_headers(headers: &HeaderMap, state: &AppState) -> AppResult<Self> {
        let bearer = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AppError::InvalidCredentials)?;
        let claims = jwt::verify(bearer.token(), &state.config.jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.user_id()?,
            email: claims.email,
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        AuthUser::from_headers(&parts.headers, state)
    }
}

/// Optional identity: a missing or invalid token means an anonymous caller.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }
        match AuthUser::from_headers(&parts.headers, state) {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid bearer token, treating caller as anonymous");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

/// Best-effort client address used as the anonymous quota key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let connect_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // Only trust forwarded headers if explicitly configured (when behind a reverse proxy)
        let ip = if state.config.trust_proxy {
            forwarded_ip(&parts.headers).or(connect_ip)
        } else {
            connect_ip
        };
        Ok(ClientIp(ip))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    // Extract IP from X-Forwarded-For or X-Real-IP headers
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let trimmed = first.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    if let Some(real) = headers.get("x-real-ip")
        && let Ok(val) = real.to_str()
        && !val.trim().is_empty()
    {
        return Some(val.trim().to_string());
    }
    None
}
