use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// Claims of an access token minted by the auth backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl AuthClaims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidCredentials)
    }
}

/// Mint a token in the auth backend's format.
#[cfg(test)]
pub fn issue(
    user_id: Uuid,
    email: Option<&str>,
    secret: &SecretString,
    ttl: chrono::Duration,
) -> AppResult<String> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = chrono::Utc::now().timestamp();
    let claims = AuthClaims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        iat: now,
        exp: now + ttl.num_seconds(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &SecretString) -> AppResult<AuthClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The auth backend stamps an audience we do not pin.
    validation.validate_aud = false;
    decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::InvalidCredentials
    })
}
