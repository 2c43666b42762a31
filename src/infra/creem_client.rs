use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
    infra::config::PaymentConfig,
};

pub struct CreemClient {
    client: Client,
    api_key: SecretString,
    webhook_secret: SecretString,
    api_base_url: Url,
    product_id_pro: String,
    portal_base_url: Url,
    success_url: String,
    webhook_tolerance_secs: Option<u64>,
}

impl CreemClient {
    pub fn new(client: Client, config: &PaymentConfig, app_origin: &Url) -> Self {
        let success_url = format!(
            "{}/settings?success=true",
            app_origin.as_str().trim_end_matches('/')
        );
        Self {
            client,
            api_key: config.api_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base_url: config.api_base_url.clone(),
            product_id_pro: config.product_id_pro.clone(),
            portal_base_url: config.portal_base_url.clone(),
            success_url,
            webhook_tolerance_secs: config.webhook_tolerance_secs,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.as_str().trim_end_matches('/'), path)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read Creem response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Creem API error");
            return Err(AppError::Provider(format!(
                "Failed to create checkout session. Creem API responded with: {status}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Creem response");
            AppError::Provider(format!("Failed to parse Creem response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentProviderPort for CreemClient {
    fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let tolerance = self.webhook_tolerance_secs.map(|secs| (secs, now));
        verify_webhook_signature(
            payload,
            signature_header,
            self.webhook_secret.expose_secret(),
            tolerance,
        )
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        let body = CreemCheckoutBody {
            product_id: &self.product_id_pro,
            customer: CreemCustomer {
                email: request.email.as_deref(),
            },
            success_url: &self.success_url,
            metadata: CreemCheckoutMetadata {
                user_id: request.user_id.to_string(),
                plan: request.plan.as_str(),
            },
        };

        let endpoint = self.endpoint("/v1/checkouts");
        tracing::info!(endpoint = %endpoint, "Creating Creem checkout");

        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Creem request failed: {e}")))?;

        let session: CreemCheckoutSession = self.handle_response(response).await?;
        let checkout_url = session
            .checkout_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Provider("Creem response has no checkout_url".into()))?;

        Ok(CheckoutResult {
            checkout_url,
            session_id: session.id,
        })
    }

    fn customer_portal_url(&self, customer_id: &str) -> String {
        format!(
            "{}/{}",
            self.portal_base_url.as_str().trim_end_matches('/'),
            customer_id
        )
    }
}

/// Verify a `t=<ts>,v1=<hex>` webhook signature over `<ts>.` followed by the raw body.
///
/// `tolerance` is `(max_age_secs, now)`; with `None` the timestamp is only
/// used as signed material. Any malformed input yields `false`.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance: Option<(u64, i64)>,
) -> bool {
    if payload.is_empty() || signature_header.is_empty() || secret.is_empty() {
        return false;
    }

    // Parse signature header: "t=timestamp,v1=signature,..."
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if signatures.is_empty() {
        return false;
    }

    if let Some((max_age, now)) = tolerance {
        let Ok(ts) = timestamp.parse::<i64>() else {
            return false;
        };
        if now.abs_diff(ts) > max_age {
            return false;
        }
    }

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Creem Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreemCheckoutBody<'a> {
    product_id: &'a str,
    customer: CreemCustomer<'a>,
    success_url: &'a str,
    metadata: CreemCheckoutMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct CreemCustomer<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreemCheckoutMetadata<'a> {
    user_id: String,
    plan: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreemCheckoutSession {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    checkout_url: Option<String>,
}
