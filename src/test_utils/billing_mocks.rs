//! In-memory doubles for the subscription repository and payment provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
        use_cases::billing::{CreateSubscriptionInput, SubscriptionRepoTrait},
    },
    domain::entities::subscription::{Subscription, SubscriptionStatus},
    infra::creem_client::verify_webhook_signature,
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// In-memory implementation of SubscriptionRepoTrait for testing.
///
/// Mirrors the storage guarantees of the Postgres schema: at most one
/// active/trialing row per user, and renewals skip rows that were ever
/// cancelled or that another effective row supersedes.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<Vec<Subscription>>,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        }
    }

    /// Make every write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of repository calls made, reads included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn rows_for_user(&self, user_id: Uuid) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn effective_count_for_user(&self, user_id: Uuid) -> usize {
        self.rows_for_user(user_id)
            .iter()
            .filter(|s| s.is_effective())
            .count()
    }

    fn begin_write(&self) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("Database operation failed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepoTrait for InMemorySubscriptionRepo {
    async fn get_effective_for_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_effective())
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Option<Subscription>> {
        self.begin_write()?;
        let mut subscriptions = self.subscriptions.lock().unwrap();

        if input.status.is_effective()
            && subscriptions
                .iter()
                .any(|s| s.user_id == input.user_id && s.is_effective())
        {
            return Ok(None);
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_type: input.plan_type,
            status: input.status,
            external_customer_id: input.external_customer_id.clone(),
            external_subscription_id: input.external_subscription_id.clone(),
            external_price_id: input.external_price_id.clone(),
            current_period_start: Some(input.current_period_start),
            current_period_end: Some(input.current_period_end),
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        subscriptions.push(subscription.clone());
        Ok(Some(subscription))
    }

    async fn mark_renewed(
        &self,
        external_subscription_id: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        self.begin_write()?;
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let superseded: Vec<Uuid> = subscriptions
            .iter()
            .filter(|sub| {
                subscriptions.iter().any(|other| {
                    other.user_id == sub.user_id && other.id != sub.id && other.is_effective()
                })
            })
            .map(|sub| sub.id)
            .collect();

        let mut updated = 0;
        for sub in subscriptions.iter_mut() {
            if sub.external_subscription_id.as_deref() == Some(external_subscription_id)
                && sub.status != SubscriptionStatus::Cancelled
                && sub.cancelled_at.is_none()
                && !superseded.contains(&sub.id)
            {
                sub.status = SubscriptionStatus::Active;
                sub.current_period_start = period_start.or(sub.current_period_start);
                sub.current_period_end = period_end.or(sub.current_period_end);
                sub.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn set_status(
        &self,
        external_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        self.begin_write()?;
        let mut updated = 0;
        for sub in self.subscriptions.lock().unwrap().iter_mut() {
            if sub.external_subscription_id.as_deref() == Some(external_subscription_id) {
                sub.status = status;
                if status == SubscriptionStatus::Cancelled && sub.cancelled_at.is_none() {
                    sub.cancelled_at = Some(Utc::now());
                }
                sub.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

// ============================================================================
// RecordingPaymentProvider
// ============================================================================

/// Payment provider double: real signature verification, recorded checkouts.
pub struct RecordingPaymentProvider {
    webhook_secret: String,
    checkout_requests: Mutex<Vec<CheckoutRequest>>,
    fail_checkout: AtomicBool,
}

impl RecordingPaymentProvider {
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
            checkout_requests: Mutex::new(Vec::new()),
            fail_checkout: AtomicBool::new(false),
        }
    }

    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkout_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProviderPort for RecordingPaymentProvider {
    fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> bool {
        verify_webhook_signature(payload, signature_header, &self.webhook_secret, None)
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(AppError::Provider("Creem API responded with: 500".into()));
        }
        self.checkout_requests.lock().unwrap().push(request.clone());
        Ok(CheckoutResult {
            checkout_url: format!("https://checkout.creem.test/{}", request.user_id),
            session_id: Some(format!("ch_{}", Uuid::new_v4().simple())),
        })
    }

    fn customer_portal_url(&self, customer_id: &str) -> String {
        format!("https://portal.creem.test/self-serve/{customer_id}")
    }
}
