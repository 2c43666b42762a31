//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (payment provider, AI provider) are built here rather
//! than constructing `reqwest::Client` directly.

use reqwest::Client;
use std::time::Duration;

/// Connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for ordinary API calls such as checkout creation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image generation routinely takes well over a minute.
pub const AI_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

pub fn try_build_client() -> Result<Client, reqwest::Error> {
    build_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

pub fn try_build_ai_client() -> Result<Client, reqwest::Error> {
    build_with_timeout(AI_REQUEST_TIMEOUT)
}

fn build_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
}
