/// User model and database operations
///
/// This module provides the User model and CRUD operations for account
/// management. Every user carries their subscription plan and status directly;
/// plan limits themselves are never stored per-user (see `crate::limits`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     subscription_plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     subscription_status VARCHAR(50) NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     deleted_at TIMESTAMPTZ,
///     CONSTRAINT users_plan_check CHECK (
///         subscription_plan IN ('free', 'starter', 'business', 'admin')
///     ),
///     CONSTRAINT users_status_check CHECK (
///         subscription_status IN ('active', 'inactive', 'suspended', 'canceled')
///     )
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::user::{User, CreateUser};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// // Create a new user (starts on the free plan, active)
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jamie Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// println!("Created user: {}", user.id);
///
/// // Find by email
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Subscription plan tiers
///
/// Plans determine usage limits and pricing. The limit table itself lives in
/// `crate::limits::PlanLimits` and is keyed by this enum at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// Free plan (1 questionnaire, 100 responses/month)
    #[serde(rename = "free")]
    Free,

    /// Starter plan ($19/month, 10 questionnaires)
    #[serde(rename = "starter")]
    Starter,

    /// Business plan ($79/month, 100 questionnaires)
    #[serde(rename = "business")]
    Business,

    /// Internal admin plan (unlimited everything)
    #[serde(rename = "admin")]
    Admin,
}

impl SubscriptionPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Business => "business",
            SubscriptionPlan::Admin => "admin",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionPlan::Free),
            "starter" => Some(SubscriptionPlan::Starter),
            "business" => Some(SubscriptionPlan::Business),
            "admin" => Some(SubscriptionPlan::Admin),
            _ => None,
        }
    }
}

/// Subscription lifecycle states
///
/// Anything other than `Active` fails limit checks closed (the user cannot
/// create limited resources until the subscription is active again).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Subscription is in good standing
    #[serde(rename = "active")]
    Active,

    /// Lapsed or never activated
    #[serde(rename = "inactive")]
    Inactive,

    /// Suspended by an administrator
    #[serde(rename = "suspended")]
    Suspended,

    /// Canceled by the user
    #[serde(rename = "canceled")]
    Canceled,
}

impl SubscriptionStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "inactive" => Some(SubscriptionStatus::Inactive),
            "suspended" => Some(SubscriptionStatus::Suspended),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
/// Deletion is soft: `deleted_at` is set and the row stays for audit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    ///
    /// Must be unique across all users
    pub email: String,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// Argon2id password hash
    ///
    /// Never store plaintext passwords!
    /// Use `argon2` crate for hashing/verification
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Current subscription plan (stored as text)
    pub subscription_plan: String,

    /// Current subscription status (stored as text)
    pub subscription_status: String,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was soft-deleted (None for live accounts)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Gets the parsed plan enum
    pub fn plan(&self) -> Option<SubscriptionPlan> {
        SubscriptionPlan::from_str(&self.subscription_plan)
    }

    /// Gets the parsed status enum
    pub fn status(&self) -> Option<SubscriptionStatus> {
        SubscriptionStatus::from_str(&self.subscription_status)
    }

    /// Whether the account has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a new user
///
/// Email and password_hash are required. New accounts start on the free plan
/// with an active subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (will be matched case-insensitively via CITEXT)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New display name (use Some(None) to clear)
    pub name: Option<Option<String>>,

    /// Update email verification status
    pub email_verified: Option<bool>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// New users land on the free plan with status `active` (column defaults).
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - User creation data
    ///
    /// # Returns
    ///
    /// The newly created user with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, email_verified, password_hash, name,
                      subscription_plan, subscription_status,
                      created_at, updated_at, last_login_at, deleted_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// Soft-deleted users are still returned; callers that care should check
    /// `is_deleted()`.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, email_verified, password_hash, name,
                   subscription_plan, subscription_status,
                   created_at, updated_at, last_login_at, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// Email lookup is case-insensitive (via CITEXT column type).
    /// Soft-deleted accounts are excluded so their email can be re-registered.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, email_verified, password_hash, name,
                   subscription_plan, subscription_status,
                   created_at, updated_at, last_login_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at`
    /// timestamp is automatically set to the current time.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `id` - ID of user to update
    /// * `data` - Fields to update (only non-None values are updated)
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists for another user
    /// - Database connection fails
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Only the fields actually present end up in the SET clause
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email_verified.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email_verified = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, email, email_verified, password_hash, name, \
             subscription_plan, subscription_status, created_at, updated_at, last_login_at, deleted_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name_opt) = data.name {
            q = q.bind(name_opt);
        }
        if let Some(verified) = data.email_verified {
            q = q.bind(verified);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Changes the subscription plan
    ///
    /// Called by the upgrade workflow when a request is approved. Usage
    /// counters are reset separately by the caller.
    ///
    /// # Returns
    ///
    /// True if the user was found and updated, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update_plan(
        pool: &PgPool,
        id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_plan = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Changes the subscription status
    ///
    /// # Returns
    ///
    /// True if the user was found and updated, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    ///
    /// This is typically called after successful authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deletes a user by ID
    ///
    /// Sets `deleted_at`; the row is kept for audit and foreign keys stay
    /// intact. Already-deleted users are not touched again.
    ///
    /// # Returns
    ///
    /// True if the user was live and is now deleted, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all users with pagination
    ///
    /// Includes soft-deleted accounts (admin listing shows the full history).
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `limit` - Maximum number of users to return
    /// * `offset` - Number of users to skip (for pagination)
    ///
    /// # Returns
    ///
    /// Vector of users, ordered by creation date (newest first)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, email_verified, password_hash, name,
                   subscription_plan, subscription_status,
                   created_at, updated_at, last_login_at, deleted_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts total number of users
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        for plan in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Starter,
            SubscriptionPlan::Business,
            SubscriptionPlan::Admin,
        ] {
            assert_eq!(SubscriptionPlan::from_str(plan.as_str()), Some(plan));
        }

        assert_eq!(SubscriptionPlan::from_str("platinum"), None);
        assert_eq!(SubscriptionPlan::from_str(""), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }

        assert_eq!(SubscriptionStatus::from_str("paused"), None);
    }

    #[test]
    fn test_create_user_struct() {
        let create_user = CreateUser {
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: Some("Test User".to_string()),
        };

        assert_eq!(create_user.email, "test@example.com");
        assert_eq!(create_user.password_hash, "hash");
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
        assert!(update.name.is_none());
        assert!(update.email_verified.is_none());
    }

    // Integration tests for database operations are in the tests/ directory
}
