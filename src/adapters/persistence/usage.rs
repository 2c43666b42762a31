use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::quota::{QuotaIdentity, QuotaStoreTrait},
};

/// Both calls go to database functions. The increment is an atomic upsert on
/// the per-day row; the limit check is a separate read.
#[async_trait]
impl QuotaStoreTrait for PostgresPersistence {
    async fn check_daily_limit(&self, identity: &QuotaIdentity) -> AppResult<bool> {
        let allowed: bool = sqlx::query_scalar("SELECT check_daily_limit($1, $2)")
            .bind(identity.user_id)
            .bind(identity.ip.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(allowed)
    }

    async fn record_usage(&self, identity: &QuotaIdentity) -> AppResult<()> {
        sqlx::query("SELECT record_usage($1, $2)")
            .bind(identity.user_id)
            .bind(identity.ip.as_deref())
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
