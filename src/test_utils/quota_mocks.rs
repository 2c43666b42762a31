//! In-memory doubles for the quota store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::quota::{QuotaIdentity, QuotaStoreTrait},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UsageKey {
    User(Uuid),
    Ip(String),
}

impl From<&QuotaIdentity> for UsageKey {
    fn from(identity: &QuotaIdentity) -> Self {
        match (identity.user_id, &identity.ip) {
            (Some(user_id), _) => UsageKey::User(user_id),
            (None, ip) => UsageKey::Ip(ip.clone().unwrap_or_else(|| "unknown".into())),
        }
    }
}

/// Per-identity daily counter with the same keying as the SQL functions.
pub struct InMemoryQuotaStore {
    limit: u32,
    usage: Mutex<HashMap<UsageKey, u32>>,
    check_calls: AtomicUsize,
    record_calls: AtomicUsize,
}

impl InMemoryQuotaStore {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            usage: Mutex::new(HashMap::new()),
            check_calls: AtomicUsize::new(0),
            record_calls: AtomicUsize::new(0),
        }
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn used(&self, identity: &QuotaIdentity) -> u32 {
        self.usage
            .lock()
            .unwrap()
            .get(&UsageKey::from(identity))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl QuotaStoreTrait for InMemoryQuotaStore {
    async fn check_daily_limit(&self, identity: &QuotaIdentity) -> AppResult<bool> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.used(identity) < self.limit)
    }

    async fn record_usage(&self, identity: &QuotaIdentity) -> AppResult<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .usage
            .lock()
            .unwrap()
            .entry(UsageKey::from(identity))
            .or_insert(0) += 1;
        Ok(())
    }
}

/// Quota store whose every call fails, as when the database is unreachable.
#[derive(Default)]
pub struct FailingQuotaStore {
    check_calls: AtomicUsize,
    record_calls: AtomicUsize,
}

impl FailingQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaStoreTrait for FailingQuotaStore {
    async fn check_daily_limit(&self, _identity: &QuotaIdentity) -> AppResult<bool> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Database("connection refused".into()))
    }

    async fn record_usage(&self, _identity: &QuotaIdentity) -> AppResult<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Database("connection refused".into()))
    }
}
