//! Test app state builder for HTTP-level testing.
//!
//! This module provides `TestAppStateBuilder` which creates an `AppState`
//! wired to in-memory doubles instead of Postgres, Creem and the AI provider.

use std::sync::Arc;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        billing::BillingUseCases,
        generation::{GenerationModels, GenerationUseCases},
        quota::{QuotaFailurePolicy, QuotaGate, QuotaStoreTrait},
    },
    domain::entities::subscription::Subscription,
    infra::config::AppConfig,
    test_utils::{
        FailingQuotaStore, InMemoryQuotaStore, InMemorySubscriptionRepo, RecordingPaymentProvider,
        ScriptedAiProvider, TEST_WEBHOOK_SECRET, create_test_config,
    },
};

/// Handles on the doubles behind a built `AppState`, for assertions.
pub struct TestMocks {
    pub subscriptions: Arc<InMemorySubscriptionRepo>,
    pub payments: Arc<RecordingPaymentProvider>,
    pub ai: Arc<ScriptedAiProvider>,
    pub quota: Arc<InMemoryQuotaStore>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let sub = create_test_subscription(|s| s.user_id = user_id);
///
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_subscription(sub)
///     .with_ai(ScriptedAiProvider::replying(["https://cdn.test/a.png"]))
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    subscriptions: Vec<Subscription>,
    ai: ScriptedAiProvider,
    quota_limit: u32,
    failing_quota: bool,
    config: AppConfig,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            subscriptions: vec![],
            ai: ScriptedAiProvider::replying(["https://cdn.test/default.png"]),
            quota_limit: 3,
            failing_quota: false,
            config: create_test_config(|_| {}),
        }
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_ai(mut self, ai: ScriptedAiProvider) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_quota_limit(mut self, limit: u32) -> Self {
        self.quota_limit = limit;
        self
    }

    /// Route quota calls to a store that always errors (policy stays fail-open).
    pub fn with_failing_quota(mut self) -> Self {
        self.failing_quota = true;
        self
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.config.trust_proxy = trust_proxy;
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let subscriptions = Arc::new(InMemorySubscriptionRepo::with_subscriptions(
            self.subscriptions,
        ));
        let payments = Arc::new(RecordingPaymentProvider::new(TEST_WEBHOOK_SECRET));
        let ai = Arc::new(self.ai);
        let quota = Arc::new(InMemoryQuotaStore::with_limit(self.quota_limit));

        let quota_store: Arc<dyn QuotaStoreTrait> = if self.failing_quota {
            Arc::new(FailingQuotaStore::new())
        } else {
            quota.clone()
        };
        let gate = Arc::new(QuotaGate::new(
            quota_store,
            QuotaFailurePolicy::from_fail_open(self.config.quota_fail_open),
        ));

        let billing_use_cases = Arc::new(BillingUseCases::new(
            subscriptions.clone(),
            payments.clone(),
        ));
        let generation_use_cases = Arc::new(GenerationUseCases::new(
            ai.clone(),
            gate,
            subscriptions.clone(),
            GenerationModels {
                structure_model: self.config.ai.structure_model.clone(),
                image_model: self.config.ai.image_model.clone(),
            },
        ));

        let app_state = AppState {
            config: Arc::new(self.config),
            billing_use_cases,
            generation_use_cases,
        };

        (
            app_state,
            TestMocks {
                subscriptions,
                payments,
                ai,
                quota,
            },
        )
    }
}
