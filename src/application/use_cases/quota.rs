use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Who is spending quota: a signed-in user, an anonymous client IP, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaIdentity {
    pub user_id: Option<Uuid>,
    pub ip: Option<String>,
}

impl QuotaIdentity {
    pub fn new(user_id: Option<Uuid>, ip: Option<String>) -> Self {
        Self { user_id, ip }
    }
}

/// Storage-side daily counter. Increments must not lose counts under
/// concurrency. The check is a plain read, so requests that pass it together
/// can overshoot the limit; the gate adds no serialization of its own.
#[async_trait]
pub trait QuotaStoreTrait: Send + Sync {
    async fn check_daily_limit(&self, identity: &QuotaIdentity) -> AppResult<bool>;
    async fn record_usage(&self, identity: &QuotaIdentity) -> AppResult<()>;
}

/// What the gate answers when the quota store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaFailurePolicy {
    /// Let the request through (availability over strict enforcement).
    #[default]
    FailOpen,
    FailClosed,
}

impl QuotaFailurePolicy {
    pub fn from_fail_open(fail_open: bool) -> Self {
        if fail_open {
            QuotaFailurePolicy::FailOpen
        } else {
            QuotaFailurePolicy::FailClosed
        }
    }

    fn on_error(&self) -> bool {
        matches!(self, QuotaFailurePolicy::FailOpen)
    }
}

#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn QuotaStoreTrait>,
    policy: QuotaFailurePolicy,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn QuotaStoreTrait>, policy: QuotaFailurePolicy) -> Self {
        Self { store, policy }
    }

    #[instrument(skip(self))]
    pub async fn may_proceed(&self, identity: &QuotaIdentity) -> bool {
        match self.store.check_daily_limit(identity).await {
            Ok(allowed) => {
                if !allowed {
                    tracing::info!(
                        user_id = ?identity.user_id,
                        ip = ?identity.ip,
                        "Daily quota exhausted"
                    );
                }
                allowed
            }
            Err(e) => {
                let allowed = self.policy.on_error();
                tracing::error!(
                    error = %e,
                    policy = ?self.policy,
                    allowed,
                    "Quota check failed"
                );
                allowed
            }
        }
    }

    /// Count one operation against the identity. Call only after the guarded
    /// operation succeeded. Failures are logged and never surfaced.
    #[instrument(skip(self))]
    pub async fn record_usage(&self, identity: &QuotaIdentity) {
        if let Err(e) = self.store.record_usage(identity).await {
            tracing::error!(
                error = %e,
                user_id = ?identity.user_id,
                ip = ?identity.ip,
                "Failed to record usage"
            );
        }
    }
}
