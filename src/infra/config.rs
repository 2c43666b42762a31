use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

const CREEM_LIVE_API: &str = "https://api.creem.io";
const CREEM_TEST_API: &str = "https://test-api.creem.io";
const CREEM_TEST_KEY_PREFIX: &str = "creem_test_";

pub struct AppConfig {
    /// Shared with the auth backend that issues bearer tokens.
    pub jwt_secret: SecretString,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Whether to trust X-Forwarded-For / X-Real-IP. Only enable behind a reverse proxy.
    pub trust_proxy: bool,
    /// Let generation through when the quota store is unreachable.
    pub quota_fail_open: bool,
    pub run_migrations: bool,
    pub body_limit_bytes: usize,
    pub payment: PaymentConfig,
    pub ai: AiConfig,
}

pub struct PaymentConfig {
    pub api_key: SecretString,
    pub webhook_secret: SecretString,
    pub api_base_url: Url,
    pub product_id_pro: String,
    pub portal_base_url: Url,
    /// Max age of a webhook timestamp. `None` disables the check.
    pub webhook_tolerance_secs: Option<u64>,
}

pub struct AiConfig {
    pub api_key: SecretString,
    pub api_url: Url,
    pub structure_model: String,
    pub image_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = SecretString::new(get_env::<String>("AUTH_JWT_SECRET").into());
        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let database_url: String = get_env("DATABASE_URL");
        // Default to false - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);
        let quota_fail_open: bool = get_env_default("QUOTA_FAIL_OPEN", true);
        let run_migrations: bool = get_env_default("RUN_MIGRATIONS", true);
        let body_limit_bytes: usize = get_env_default("BODY_LIMIT_BYTES", 256 * 1024);

        Self {
            jwt_secret,
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            trust_proxy,
            quota_fail_open,
            run_migrations,
            body_limit_bytes,
            payment: PaymentConfig::from_env(),
            ai: AiConfig::from_env(),
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let api_key: String = get_env("CREEM_API_KEY");
        let webhook_secret = SecretString::new(get_env::<String>("CREEM_WEBHOOK_SECRET").into());
        let api_base_url: Url = std::env::var("CREEM_API_BASE_URL")
            .ok()
            .map(|s| s.parse().expect("CREEM_API_BASE_URL must be a valid URL"))
            .unwrap_or_else(|| default_creem_base_url(&api_key));
        let product_id_pro: String = get_env("CREEM_PRODUCT_ID_PRO");
        let portal_base_url: Url = get_env_default(
            "CREEM_PORTAL_BASE_URL",
            Url::parse("https://app.creem.io/self-serve").expect("static URL"),
        );
        let webhook_tolerance_secs: Option<u64> = std::env::var("CREEM_WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0);

        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret,
            api_base_url,
            product_id_pro,
            portal_base_url,
            webhook_tolerance_secs,
        }
    }

    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with(CREEM_TEST_KEY_PREFIX)
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: SecretString::new(get_env::<String>("AI_API_KEY").into()),
            api_url: get_env("AI_API_URL"),
            structure_model: get_env_default(
                "AI_STRUCTURE_MODEL",
                "gemini-2.5-flash".to_string(),
            ),
            image_model: get_env_default("AI_IMAGE_MODEL", "gpt-4o-image".to_string()),
        }
    }
}

/// Test keys talk to the sandbox API.
pub fn default_creem_base_url(api_key: &str) -> Url {
    let base = if api_key.starts_with(CREEM_TEST_KEY_PREFIX) {
        CREEM_TEST_API
    } else {
        CREEM_LIVE_API
    };
    Url::parse(base).expect("static URL")
}
