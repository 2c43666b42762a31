//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use crate::{
    application::jwt,
    domain::entities::subscription::{PlanType, Subscription, SubscriptionStatus},
    infra::config::{AiConfig, AppConfig, PaymentConfig},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_comicmind";
pub const TEST_JWT_SECRET: &str = "jwt_test_secret_comicmind_0123456789";

/// Build a `creem-signature` header value for `body`.
pub fn sign_webhook(body: impl AsRef<[u8]>, secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body.as_ref());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// `Authorization` header value for a signed-in test user.
pub fn bearer_for(user_id: Uuid, email: Option<&str>) -> String {
    let token = jwt::issue(
        user_id,
        email,
        &SecretString::new(TEST_JWT_SECRET.into()),
        chrono::Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {token}")
}

/// Create an active pro subscription with sensible defaults.
pub fn create_test_subscription(overrides: impl FnOnce(&mut Subscription)) -> Subscription {
    let now = test_datetime();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        plan_type: PlanType::Pro,
        status: SubscriptionStatus::Active,
        external_customer_id: Some(format!("cus_test{}", Uuid::new_v4().simple())),
        external_subscription_id: Some(format!("sub_test{}", Uuid::new_v4().simple())),
        external_price_id: Some("prod_test_pro".to_string()),
        current_period_start: Some(now),
        current_period_end: Some(now + chrono::Duration::days(30)),
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };
    overrides(&mut subscription);
    subscription
}

pub fn create_test_payment_config() -> PaymentConfig {
    PaymentConfig {
        api_key: SecretString::new("creem_test_key".into()),
        webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        api_base_url: Url::parse("https://test-api.creem.test").unwrap(),
        product_id_pro: "prod_test_pro".to_string(),
        portal_base_url: Url::parse("https://portal.creem.test/self-serve").unwrap(),
        webhook_tolerance_secs: None,
    }
}

pub fn create_test_config(overrides: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig {
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        app_origin: Url::parse("https://comicmind.test").unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "postgres://unused".to_string(),
        trust_proxy: false,
        quota_fail_open: true,
        run_migrations: false,
        body_limit_bytes: 64 * 1024,
        payment: create_test_payment_config(),
        ai: AiConfig {
            api_key: SecretString::new("ai_test_key".into()),
            api_url: Url::parse("https://ai.test/v1/chat/completions").unwrap(),
            structure_model: "structure-model".to_string(),
            image_model: "image-model".to_string(),
        },
    };
    overrides(&mut config);
    config
}

/// Returns a fixed test datetime for deterministic tests.
fn test_datetime() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_test_subscription_applies_overrides() {
        let user_id = Uuid::new_v4();
        let sub = create_test_subscription(|s| {
            s.user_id = user_id;
            s.status = SubscriptionStatus::PastDue;
        });
        assert_eq!(sub.user_id, user_id);
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.plan_type, PlanType::Pro);
    }

    #[test]
    fn sign_webhook_has_timestamp_and_v1() {
        let header = sign_webhook("{}", TEST_WEBHOOK_SECRET, 42);
        assert!(header.starts_with("t=42,v1="));
        assert_eq!(header.len(), "t=42,v1=".len() + 64);
    }
}
