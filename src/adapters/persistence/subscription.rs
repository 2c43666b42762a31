use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{CreateSubscriptionInput, SubscriptionRepoTrait},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_type: row.get("plan_type"),
        status: row.get("status"),
        external_customer_id: row.get("external_customer_id"),
        external_subscription_id: row.get("external_subscription_id"),
        external_price_id: row.get("external_price_id"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        cancelled_at: row.get("cancelled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan_type, status, external_customer_id, external_subscription_id,
    external_price_id, current_period_start, current_period_end, cancelled_at,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepoTrait for PostgresPersistence {
    async fn get_effective_for_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE user_id = $1 AND status IN ('active', 'trialing')
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Option<Subscription>> {
        // The partial unique index on (user_id) WHERE status IN ('active', 'trialing')
        // turns a concurrent duplicate insert into zero returned rows.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_type, status, external_customer_id,
                external_subscription_id, external_price_id,
                current_period_start, current_period_end
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.plan_type)
        .bind(input.status)
        .bind(&input.external_customer_id)
        .bind(&input.external_subscription_id)
        .bind(&input.external_price_id)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn mark_renewed(
        &self,
        external_subscription_id: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        // A row that was ever cancelled stays out of reach, and a row is not
        // reactivated while the user holds another effective subscription.
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'active',
                current_period_start = COALESCE($2, current_period_start),
                current_period_end = COALESCE($3, current_period_end),
                updated_at = NOW()
            WHERE external_subscription_id = $1
              AND status <> 'cancelled'
              AND cancelled_at IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM subscriptions other
                  WHERE other.user_id = subscriptions.user_id
                    AND other.id <> subscriptions.id
                    AND other.status IN ('active', 'trialing')
              )
            "#,
        )
        .bind(external_subscription_id)
        .bind(period_start)
        .bind(period_end)
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => Ok(result.rows_affected()),
            // A checkout committed between the NOT EXISTS check and the write.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::warn!(
                    external_subscription_id,
                    "Renewal skipped: user already holds an effective subscription"
                );
                Ok(0)
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn set_status(
        &self,
        external_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2,
                cancelled_at = CASE
                    WHEN $2 = 'cancelled'::subscription_status THEN COALESCE(cancelled_at, NOW())
                    ELSE cancelled_at
                END,
                updated_at = NOW()
            WHERE external_subscription_id = $1
            "#,
        )
        .bind(external_subscription_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
