/// Subscription usage counters and database operations
///
/// Tracks how much of each limited resource a user has consumed in the
/// current calendar month. Increments are a single upsert statement so
/// concurrent requests can never lose updates; there is deliberately no
/// read-modify-write path.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscription_usage (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     usage_type VARCHAR(50) NOT NULL,
///     period DATE NOT NULL,
///     used INTEGER NOT NULL DEFAULT 0,
///     PRIMARY KEY (user_id, usage_type, period),
///     CONSTRAINT subscription_usage_type_check CHECK (
///         usage_type IN ('questionnaires', 'responses', 'exports')
///     )
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::usage::{SubscriptionUsage, UsageKind};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let user_id = Uuid::new_v4();
///
/// // Record one questionnaire creation
/// let usage = SubscriptionUsage::increment(&pool, user_id, UsageKind::Questionnaires, 1).await?;
/// println!("Used this month: {}", usage.used);
/// # Ok(())
/// # }
/// ```

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kinds of limited resources
///
/// Each kind has its own counter row per user per month and its own column in
/// the plan limit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    /// Questionnaires created
    Questionnaires,

    /// Responses collected across the user's questionnaires
    Responses,

    /// Data exports generated
    Exports,
}

impl UsageKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Questionnaires => "questionnaires",
            UsageKind::Responses => "responses",
            UsageKind::Exports => "exports",
        }
    }

    /// Parses kind from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "questionnaires" => Some(UsageKind::Questionnaires),
            "responses" => Some(UsageKind::Responses),
            "exports" => Some(UsageKind::Exports),
            _ => None,
        }
    }

    /// All kinds, in display order
    pub fn all() -> [UsageKind; 3] {
        [
            UsageKind::Questionnaires,
            UsageKind::Responses,
            UsageKind::Exports,
        ]
    }
}

/// One usage counter row: a user's consumption of one resource in one month
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionUsage {
    /// User the counter belongs to
    pub user_id: Uuid,

    /// Which resource is being counted (stored as text)
    pub usage_type: String,

    /// Billing month (first day of the month)
    pub period: NaiveDate,

    /// Amount consumed in this period
    pub used: i32,
}

impl SubscriptionUsage {
    /// First day of the current month in UTC
    pub fn current_period() -> NaiveDate {
        let now = Utc::now().date_naive();
        // with_day(1) cannot fail for day 1
        now.with_day(1).unwrap_or(now)
    }

    /// Gets current usage of one kind for a user (this month's period)
    ///
    /// Returns 0 when no counter row exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn get_current(
        pool: &PgPool,
        user_id: Uuid,
        kind: UsageKind,
    ) -> Result<Self, sqlx::Error> {
        let period = Self::current_period();

        let usage = sqlx::query_as::<_, SubscriptionUsage>(
            r#"
            SELECT user_id, usage_type, period, used
            FROM subscription_usage
            WHERE user_id = $1 AND usage_type = $2 AND period = $3
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(period)
        .fetch_optional(pool)
        .await?;

        Ok(usage.unwrap_or(SubscriptionUsage {
            user_id,
            usage_type: kind.as_str().to_string(),
            period,
            used: 0,
        }))
    }

    /// Atomically increments a usage counter
    ///
    /// Creates the counter row if this is the first consumption of the month.
    /// The whole increment is one INSERT .. ON CONFLICT .. DO UPDATE
    /// statement, so two concurrent requests both land.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `user_id` - User consuming the resource
    /// * `kind` - Which resource
    /// * `count` - How many units to add (usually 1)
    ///
    /// # Returns
    ///
    /// The updated counter row
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn increment(
        pool: &PgPool,
        user_id: Uuid,
        kind: UsageKind,
        count: i32,
    ) -> Result<Self, sqlx::Error> {
        let period = Self::current_period();

        let usage = sqlx::query_as::<_, SubscriptionUsage>(
            r#"
            INSERT INTO subscription_usage (user_id, usage_type, period, used)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, usage_type, period)
            DO UPDATE SET used = subscription_usage.used + EXCLUDED.used
            RETURNING user_id, usage_type, period, used
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(period)
        .bind(count)
        .fetch_one(pool)
        .await?;

        Ok(usage)
    }

    /// Gets all current-month counters for a user
    ///
    /// Kinds the user has not touched this month are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn get_all_current(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let period = Self::current_period();

        let usage = sqlx::query_as::<_, SubscriptionUsage>(
            r#"
            SELECT user_id, usage_type, period, used
            FROM subscription_usage
            WHERE user_id = $1 AND period = $2
            ORDER BY usage_type ASC
            "#,
        )
        .bind(user_id)
        .bind(period)
        .fetch_all(pool)
        .await?;

        Ok(usage)
    }

    /// Gets usage history for a user (last N months)
    ///
    /// # Returns
    ///
    /// Counter rows ordered by period descending (most recent first)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn get_history(
        pool: &PgPool,
        user_id: Uuid,
        months: i32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let usage = sqlx::query_as::<_, SubscriptionUsage>(
            r#"
            SELECT user_id, usage_type, period, used
            FROM subscription_usage
            WHERE user_id = $1
              AND period >= (date_trunc('month', CURRENT_DATE) - ($2::INTEGER || ' months')::INTERVAL)::DATE
            ORDER BY period DESC, usage_type ASC
            "#,
        )
        .bind(user_id)
        .bind(months)
        .fetch_all(pool)
        .await?;

        Ok(usage)
    }

    /// Deletes all usage counters for a user
    ///
    /// Called when a plan change is approved so the user starts the new plan
    /// with a clean slate.
    ///
    /// # Returns
    ///
    /// Number of counter rows deleted
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn reset_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscription_usage WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes old usage records (for data retention policies)
    ///
    /// # Returns
    ///
    /// Number of records deleted
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn delete_before(pool: &PgPool, before_date: NaiveDate) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscription_usage WHERE period < $1")
            .bind(before_date)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_period_is_first_of_month() {
        let period = SubscriptionUsage::current_period();
        assert_eq!(period.day(), 1);

        let now = Utc::now().date_naive();
        assert_eq!(period.month(), now.month());
        assert_eq!(period.year(), now.year());
    }

    #[test]
    fn test_usage_kind_round_trip() {
        for kind in UsageKind::all() {
            assert_eq!(UsageKind::from_str(kind.as_str()), Some(kind));
        }

        assert_eq!(UsageKind::from_str("widgets"), None);
    }

    // Integration tests for database operations are in the tests/ directory
}
