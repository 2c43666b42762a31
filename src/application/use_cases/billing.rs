//! Subscription reconciliation from payment provider webhooks, plus the
//! user-facing checkout and portal actions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
    domain::entities::{
        billing_event::{
            BillingEvent, CheckoutSession, EventParseError, Invoice,
            ProviderSubscription, WebhookEvent,
        },
        subscription::{PlanType, Subscription, SubscriptionStatus, estimated_period_end},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubscriptionInput {
    pub user_id: Uuid,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub external_price_id: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

#[async_trait]
pub trait SubscriptionRepoTrait: Send + Sync {
    /// The user's active or trialing row, if any.
    async fn get_effective_for_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;

    /// Insert a new row. Returns `None` when storage already holds an
    /// effective row for the user (concurrent duplicate delivery).
    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Option<Subscription>>;

    /// Renewal: set active and refresh the period. Rows that were ever
    /// cancelled, and rows whose user already holds another effective
    /// subscription, are left untouched. Returns the number of rows updated.
    async fn mark_renewed(
        &self,
        external_subscription_id: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<u64>;

    /// Unconditional status change. Moving to cancelled also stamps the
    /// first cancellation time. Returns the number of rows updated.
    async fn set_status(
        &self,
        external_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64>;
}

/// What a verified webhook did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    SubscriptionCreated { user_id: Uuid },
    AlreadySubscribed { user_id: Uuid },
    SubscriptionUpdated {
        external_subscription_id: String,
        status: SubscriptionStatus,
    },
    NoMatchingSubscription { external_subscription_id: String },
    Ignored { event_type: String },
}

#[derive(Clone)]
pub struct BillingUseCases {
    repo: Arc<dyn SubscriptionRepoTrait>,
    provider: Arc<dyn PaymentProviderPort>,
}

impl BillingUseCases {
    pub fn new(repo: Arc<dyn SubscriptionRepoTrait>, provider: Arc<dyn PaymentProviderPort>) -> Self {
        Self { repo, provider }
    }

    // ========================================================================
    // Webhooks
    // ========================================================================

    /// Authenticate, parse and apply one webhook delivery.
    ///
    /// The signature is checked against the raw body before any parsing, and
    /// a rejected delivery never reaches the repository.
    #[instrument(skip_all, fields(payload_len = payload.len()))]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> AppResult<WebhookOutcome> {
        if !self.provider.verify_webhook_signature(payload, signature_header) {
            tracing::warn!(
                has_signature = !signature_header.is_empty(),
                "Rejected webhook with invalid signature"
            );
            return Err(AppError::InvalidSignature);
        }

        let payload = std::str::from_utf8(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook with non UTF-8 body");
            AppError::InvalidInput("Invalid webhook payload".into())
        })?;

        let event = WebhookEvent::parse(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected unparseable webhook");
            match e {
                EventParseError::Malformed(_) => AppError::InvalidInput("Invalid webhook payload".into()),
                other => AppError::InvalidInput(other.to_string()),
            }
        })?;

        self.apply_event(event).await
    }

    #[instrument(skip(self, event), fields(event_type = %event.event_type, event_id = ?event.id))]
    pub async fn apply_event(&self, event: WebhookEvent) -> AppResult<WebhookOutcome> {
        tracing::info!("Received billing webhook");

        let outcome = match event.event {
            BillingEvent::CheckoutCompleted(session) => self.on_checkout_completed(&session).await,
            BillingEvent::PaymentSucceeded(invoice) => self.on_payment_succeeded(&invoice).await,
            BillingEvent::PaymentFailed(invoice) => self.on_payment_failed(&invoice).await,
            BillingEvent::SubscriptionDeleted(sub) => self.on_subscription_deleted(&sub).await,
            BillingEvent::Unknown => {
                tracing::info!("Unhandled webhook event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
        };

        if let Err(e) = &outcome {
            tracing::error!(
                error = %e,
                retryable = e.is_retryable(),
                "Webhook processing failed"
            );
        }
        outcome
    }

    async fn on_checkout_completed(&self, session: &CheckoutSession) -> AppResult<WebhookOutcome> {
        let user_id_str = session.user_id().ok_or_else(|| {
            tracing::error!(session_id = ?session.id, "No user_id in checkout metadata");
            AppError::InvalidInput("No user_id found".into())
        })?;
        let user_id = Uuid::parse_str(user_id_str)
            .map_err(|_| AppError::InvalidInput("Invalid user_id in metadata".into()))?;

        let plan_type = match session.plan() {
            None => PlanType::Pro,
            Some(code) => PlanType::parse(code)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown plan: {code}")))?,
        };

        // At-least-once delivery: a replayed completion must not add a second row.
        if let Some(existing) = self.repo.get_effective_for_user(user_id).await? {
            tracing::info!(
                %user_id,
                subscription_id = %existing.id,
                "User already has an effective subscription, skipping insert"
            );
            return Ok(WebhookOutcome::AlreadySubscribed { user_id });
        }

        let now = Utc::now();
        let input = CreateSubscriptionInput {
            user_id,
            plan_type,
            status: SubscriptionStatus::Active,
            external_customer_id: session.customer.as_ref().map(|c| c.id().to_string()),
            external_subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
            external_price_id: session.product.as_ref().map(|p| p.id().to_string()),
            current_period_start: now,
            current_period_end: estimated_period_end(now),
        };

        match self.repo.create(&input).await? {
            Some(created) => {
                tracing::info!(%user_id, subscription_id = %created.id, "Subscription created");
                Ok(WebhookOutcome::SubscriptionCreated { user_id })
            }
            None => {
                tracing::info!(%user_id, "Concurrent delivery already created the subscription");
                Ok(WebhookOutcome::AlreadySubscribed { user_id })
            }
        }
    }

    async fn on_payment_succeeded(&self, invoice: &Invoice) -> AppResult<WebhookOutcome> {
        let sub_id = invoice.subscription.id();
        let updated = self
            .repo
            .mark_renewed(
                sub_id,
                invoice.period_start.and_then(timestamp_to_utc),
                invoice.period_end.and_then(timestamp_to_utc),
            )
            .await?;
        Ok(update_outcome(sub_id, SubscriptionStatus::Active, updated))
    }

    async fn on_payment_failed(&self, invoice: &Invoice) -> AppResult<WebhookOutcome> {
        self.apply_status(invoice.subscription.id(), SubscriptionStatus::PastDue)
            .await
    }

    async fn on_subscription_deleted(
        &self,
        subscription: &ProviderSubscription,
    ) -> AppResult<WebhookOutcome> {
        self.apply_status(&subscription.id, SubscriptionStatus::Cancelled)
            .await
    }

    async fn apply_status(
        &self,
        sub_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<WebhookOutcome> {
        let updated = self.repo.set_status(sub_id, status).await?;
        Ok(update_outcome(sub_id, status, updated))
    }

    // ========================================================================
    // User actions
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn get_subscription(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        self.repo.get_effective_for_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        plan: PlanType,
    ) -> AppResult<CheckoutResult> {
        if plan == PlanType::Free {
            return Err(AppError::InvalidInput(
                "The free plan does not require checkout".into(),
            ));
        }

        if self.repo.get_effective_for_user(user_id).await?.is_some() {
            return Err(AppError::AlreadySubscribed);
        }

        let request = CheckoutRequest {
            user_id,
            email: email.map(str::to_string),
            plan,
        };
        let result = self.provider.create_checkout(&request).await?;
        tracing::info!(%user_id, session_id = ?result.session_id, "Checkout session created");
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn customer_portal_url(&self, user_id: Uuid) -> AppResult<String> {
        let customer_id = self
            .repo
            .get_effective_for_user(user_id)
            .await?
            .and_then(|s| s.external_customer_id)
            .filter(|id| !id.is_empty())
            .ok_or(AppError::NotFound)?;
        Ok(self.provider.customer_portal_url(&customer_id))
    }
}

/// Convert a Unix timestamp to a UTC datetime
fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn update_outcome(sub_id: &str, status: SubscriptionStatus, updated: u64) -> WebhookOutcome {
    if updated == 0 {
        // Tolerated: the provider may know subscriptions we never stored, and
        // renewals of cancelled or superseded rows are not applied.
        tracing::warn!(
            external_subscription_id = sub_id,
            status = status.as_str(),
            "No subscription row matched webhook update"
        );
        return WebhookOutcome::NoMatchingSubscription {
            external_subscription_id: sub_id.to_string(),
        };
    }
    tracing::info!(
        external_subscription_id = sub_id,
        status = status.as_str(),
        rows = updated,
        "Subscription updated"
    );
    WebhookOutcome::SubscriptionUpdated {
        external_subscription_id: sub_id.to_string(),
        status,
    }
}
