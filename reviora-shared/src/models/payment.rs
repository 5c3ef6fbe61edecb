/// Payment transaction model and database operations
///
/// An internal ledger of plan charges, written when an upgrade request is
/// approved. There is no payment-provider integration; these rows exist so
/// billing history survives plan changes and admin turnover.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE payment_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     subscription_request_id UUID REFERENCES subscription_requests(id) ON DELETE SET NULL,
///     amount_cents INTEGER NOT NULL,
///     currency VARCHAR(3) NOT NULL DEFAULT 'USD',
///     plan VARCHAR(50) NOT NULL,
///     recorded_by UUID REFERENCES admin_users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Payment transaction model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentTransaction {
    /// Unique transaction ID
    pub id: Uuid,

    /// User who was charged
    pub user_id: Uuid,

    /// Upgrade request the charge came from, if any
    pub subscription_request_id: Option<Uuid>,

    /// Charge amount in cents
    pub amount_cents: i32,

    /// ISO currency code
    pub currency: String,

    /// Plan the charge paid for
    pub plan: String,

    /// Admin who recorded the charge
    pub recorded_by: Option<Uuid>,

    /// When the transaction was recorded
    pub created_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Lists transactions for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let transactions = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, user_id, subscription_request_id, amount_cents, currency,
                   plan, recorded_by, created_at
            FROM payment_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(transactions)
    }

    /// Lists all transactions, newest first (admin billing view)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_all(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let transactions = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, user_id, subscription_request_id, amount_cents, currency,
                   plan, recorded_by, created_at
            FROM payment_transactions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests for database operations are in the tests/ directory
}
