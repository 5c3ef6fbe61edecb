/// Subscription upgrade request model and database operations
///
/// Users ask for a plan change; an administrator approves or rejects. A user
/// can have at most one pending request (enforced twice: a friendly check in
/// the workflow service and a partial unique index that closes the race).
///
/// # State Machine
///
/// ```text
/// pending → approved
///         → rejected
/// ```
///
/// Approved and rejected are terminal; a processed request is never touched
/// again.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscription_requests (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     current_plan VARCHAR(50) NOT NULL,
///     requested_plan VARCHAR(50) NOT NULL,
///     status VARCHAR(50) NOT NULL DEFAULT 'pending',
///     note TEXT,
///     processed_by UUID REFERENCES admin_users(id) ON DELETE SET NULL,
///     processed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT subscription_requests_status_check CHECK (
///         status IN ('pending', 'approved', 'rejected')
///     )
/// );
///
/// CREATE UNIQUE INDEX subscription_requests_one_pending
///     ON subscription_requests (user_id) WHERE status = 'pending';
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Upgrade request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an administrator's decision
    Pending,

    /// Approved; the plan change has been applied
    Approved,

    /// Rejected; the user keeps their current plan
    Rejected,
}

impl RequestStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    /// Checks if status is terminal (the request has been processed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

/// Subscription upgrade request model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionRequest {
    /// Unique request ID
    pub id: Uuid,

    /// User asking for the change
    pub user_id: Uuid,

    /// Plan the user was on when the request was made
    pub current_plan: String,

    /// Plan the user wants
    pub requested_plan: String,

    /// Current lifecycle state (stored as text)
    pub status: String,

    /// Optional note from the requester or the processing admin
    pub note: Option<String>,

    /// Admin who processed the request (None while pending)
    pub processed_by: Option<Uuid>,

    /// When the request was processed (None while pending)
    pub processed_at: Option<DateTime<Utc>>,

    /// When the request was created
    pub created_at: DateTime<Utc>,

    /// When the request was last updated
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRequest {
    /// Gets the parsed status enum
    pub fn get_status(&self) -> Option<RequestStatus> {
        RequestStatus::from_str(&self.status)
    }
}

/// Input for creating a new upgrade request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Requesting user
    pub user_id: Uuid,

    /// Plan the user is on right now
    pub current_plan: String,

    /// Plan the user wants
    pub requested_plan: String,

    /// Optional note for the reviewing admin
    pub note: Option<String>,
}

impl SubscriptionRequest {
    /// Creates a new request in pending state
    ///
    /// # Errors
    ///
    /// Returns an error if the user already has a pending request (partial
    /// unique index violation) or the database fails. Callers should map the
    /// unique violation to their duplicate-request error.
    pub async fn create(
        pool: &PgPool,
        data: CreateSubscriptionRequest,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            INSERT INTO subscription_requests (user_id, current_plan, requested_plan, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, current_plan, requested_plan, status, note,
                      processed_by, processed_at, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.current_plan)
        .bind(data.requested_plan)
        .bind(data.note)
        .fetch_one(pool)
        .await?;

        Ok(request)
    }

    /// Finds a request by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            SELECT id, user_id, current_plan, requested_plan, status, note,
                   processed_by, processed_at, created_at, updated_at
            FROM subscription_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    /// Finds a user's pending request, if any
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_pending_by_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            SELECT id, user_id, current_plan, requested_plan, status, note,
                   processed_by, processed_at, created_at, updated_at
            FROM subscription_requests
            WHERE user_id = $1 AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    /// Lists pending requests, oldest first (admin review queue)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            SELECT id, user_id, current_plan, requested_plan, status, note,
                   processed_by, processed_at, created_at, updated_at
            FROM subscription_requests
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Lists all requests made by a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            SELECT id, user_id, current_plan, requested_plan, status, note,
                   processed_by, processed_at, created_at, updated_at
            FROM subscription_requests
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Counts pending requests
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscription_requests WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::from_str(status.as_str()), Some(status));
        }

        assert_eq!(RequestStatus::from_str("withdrawn"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    // Integration tests for database operations are in the tests/ directory
}
