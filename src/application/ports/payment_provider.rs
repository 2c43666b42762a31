use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::subscription::PlanType};

/// What the provider needs to open a hosted checkout for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub plan: PlanType,
}

/// Result of creating a checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    /// Hosted page the user is redirected to
    pub checkout_url: String,
    pub session_id: Option<String>,
}

/// Payment provider port.
///
/// Webhook authentication lives here too: the signing scheme is a property of
/// the provider, and the secret comes from the same injected configuration as
/// the API key.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    /// Check the raw webhook body against its signature header. Never errors;
    /// any malformed input is simply not authentic.
    fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> bool;

    /// Create a hosted checkout. The internal user id and plan must be echoed
    /// back in the completion event's metadata.
    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult>;

    /// Self-serve billing portal for an existing provider customer.
    fn customer_portal_url(&self, customer_id: &str) -> String;
}
