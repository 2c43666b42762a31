//! Payment provider webhook events.
//!
//! Only four event types change local state. Everything else parses into
//! [`BillingEvent::Unknown`] and is acknowledged without side effects.

use serde::Deserialize;
use thiserror::Error;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
pub const PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Invalid webhook payload: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Missing data.object for {event_type}")]
    MissingObject { event_type: String },

    #[error("Invalid data.object for {event_type}: {source}")]
    InvalidObject {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A provider identifier that may arrive either as a bare id or as an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExternalRef {
    Id(String),
    Object { id: String },
}

impl ExternalRef {
    pub fn id(&self) -> &str {
        match self {
            ExternalRef::Id(id) => id,
            ExternalRef::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<ExternalRef>,
    #[serde(default)]
    pub subscription: Option<ExternalRef>,
    #[serde(default, alias = "price")]
    pub product: Option<ExternalRef>,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
}

impl CheckoutSession {
    /// The internal user id attached at checkout creation, if present and non-empty.
    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.user_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn plan(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.plan.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: Option<String>,
    pub subscription: ExternalRef,
    #[serde(default)]
    pub period_start: Option<i64>,
    #[serde(default)]
    pub period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSession),
    PaymentSucceeded(Invoice),
    PaymentFailed(Invoice),
    SubscriptionDeleted(ProviderSubscription),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: Option<String>,
    pub event_type: String,
    pub event: BillingEvent,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    object: Option<serde_json::Value>,
}

impl WebhookEvent {
    /// Parse an already-authenticated request body.
    pub fn parse(body: &str) -> Result<Self, EventParseError> {
        let envelope: Envelope = serde_json::from_str(body).map_err(EventParseError::Malformed)?;
        let object = envelope.data.and_then(|d| d.object);
        let event_type = envelope.event_type;

        let event = match event_type.as_str() {
            CHECKOUT_COMPLETED => {
                BillingEvent::CheckoutCompleted(decode_object(&event_type, object)?)
            }
            PAYMENT_SUCCEEDED => BillingEvent::PaymentSucceeded(decode_object(&event_type, object)?),
            PAYMENT_FAILED => BillingEvent::PaymentFailed(decode_object(&event_type, object)?),
            SUBSCRIPTION_DELETED => {
                BillingEvent::SubscriptionDeleted(decode_object(&event_type, object)?)
            }
            _ => BillingEvent::Unknown,
        };

        Ok(Self {
            id: envelope.id,
            event_type,
            event,
        })
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    event_type: &str,
    object: Option<serde_json::Value>,
) -> Result<T, EventParseError> {
    let object = object.ok_or_else(|| EventParseError::MissingObject {
        event_type: event_type.to_string(),
    })?;
    serde_json::from_value(object).map_err(|source| EventParseError::InvalidObject {
        event_type: event_type.to_string(),
        source,
    })
}
