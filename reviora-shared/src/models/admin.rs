/// Admin user and role models with database operations
///
/// Administrators are regular users with an attached admin_users row. Access
/// control combines three things: named permission strings (role plus
/// per-admin extras), an integer role level for coarse comparisons, and the
/// `*` wildcard that short-circuits every permission check.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE admin_roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     permissions TEXT[] NOT NULL DEFAULT '{}',
///     level INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE admin_users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     role_id UUID NOT NULL REFERENCES admin_roles(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     totp_secret VARCHAR(64),
///     two_factor_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     custom_permissions TEXT[] NOT NULL DEFAULT '{}',
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::admin::{AdminUser, AdminRole};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// if let Some(admin) = AdminUser::find_by_user_id(&pool, Uuid::new_v4()).await? {
///     let role = AdminRole::find_by_id(&pool, admin.role_id).await?;
///     println!("Admin permissions: {:?}", admin.merged_permissions(role.as_ref()));
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Admin role with named permissions and an integer level
///
/// Levels order roles for coarse checks (a billing view might require
/// level >= 50); permission strings gate individual operations.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminRole {
    /// Unique role ID
    pub id: Uuid,

    /// Role name, e.g. "support" or "super_admin"
    pub name: String,

    /// Granted permission strings; "*" grants everything
    pub permissions: Vec<String>,

    /// Numeric level for hierarchy comparisons (higher = more powerful)
    pub level: i32,

    /// When the role was created
    pub created_at: DateTime<Utc>,

    /// When the role was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an admin role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdminRole {
    /// Role name
    pub name: String,

    /// Granted permissions
    pub permissions: Vec<String>,

    /// Numeric level
    pub level: i32,
}

impl AdminRole {
    /// Creates a new admin role
    ///
    /// # Errors
    ///
    /// Returns an error if the name already exists or the database fails
    pub async fn create(pool: &PgPool, data: CreateAdminRole) -> Result<Self, sqlx::Error> {
        let role = sqlx::query_as::<_, AdminRole>(
            r#"
            INSERT INTO admin_roles (name, permissions, level)
            VALUES ($1, $2, $3)
            RETURNING id, name, permissions, level, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.permissions)
        .bind(data.level)
        .fetch_one(pool)
        .await?;

        Ok(role)
    }

    /// Finds a role by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, AdminRole>(
            r#"
            SELECT id, name, permissions, level, created_at, updated_at
            FROM admin_roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Finds a role by name
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, AdminRole>(
            r#"
            SELECT id, name, permissions, level, created_at, updated_at
            FROM admin_roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Lists all roles ordered by level descending
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let roles = sqlx::query_as::<_, AdminRole>(
            r#"
            SELECT id, name, permissions, level, created_at, updated_at
            FROM admin_roles
            ORDER BY level DESC, name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(roles)
    }
}

/// Admin user model
///
/// Links a regular user account to an admin role. The TOTP secret is only
/// present once 2FA setup has begun; `two_factor_enabled` flips after the
/// first successful code verification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminUser {
    /// Unique admin user ID (distinct from the user ID)
    pub id: Uuid,

    /// Underlying user account
    pub user_id: Uuid,

    /// Assigned role
    pub role_id: Uuid,

    /// Inactive admins fail authentication even with a valid token
    pub is_active: bool,

    /// Base32-encoded TOTP secret (None until 2FA setup starts)
    #[serde(skip_serializing)]
    pub totp_secret: Option<String>,

    /// Whether 2FA is required at login
    pub two_factor_enabled: bool,

    /// Extra permission strings granted beyond the role
    pub custom_permissions: Vec<String>,

    /// When the admin last logged in
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the admin user was created
    pub created_at: DateTime<Utc>,

    /// When the admin user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an admin user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdminUser {
    /// Existing user account to promote
    pub user_id: Uuid,

    /// Role to assign
    pub role_id: Uuid,
}

impl AdminUser {
    /// Role permissions merged with this admin's custom grants
    ///
    /// Duplicates are fine; permission checks only test membership.
    pub fn merged_permissions(&self, role: Option<&AdminRole>) -> Vec<String> {
        let mut permissions: Vec<String> = role
            .map(|r| r.permissions.clone())
            .unwrap_or_default();
        permissions.extend(self.custom_permissions.iter().cloned());
        permissions
    }

    /// Creates a new admin user
    ///
    /// # Errors
    ///
    /// Returns an error if the user is already an admin (unique constraint)
    /// or the database fails
    pub async fn create(pool: &PgPool, data: CreateAdminUser) -> Result<Self, sqlx::Error> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (user_id, role_id)
            VALUES ($1, $2)
            RETURNING id, user_id, role_id, is_active, totp_secret, two_factor_enabled,
                      custom_permissions, last_login_at, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.role_id)
        .fetch_one(pool)
        .await?;

        Ok(admin)
    }

    /// Finds an admin user by its own ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, user_id, role_id, is_active, totp_secret, two_factor_enabled,
                   custom_permissions, last_login_at, created_at, updated_at
            FROM admin_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(admin)
    }

    /// Finds an admin user by the underlying user account
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, user_id, role_id, is_active, totp_secret, two_factor_enabled,
                   custom_permissions, last_login_at, created_at, updated_at
            FROM admin_users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(admin)
    }

    /// Stores a TOTP secret during 2FA setup
    ///
    /// Does not enable 2FA yet; `set_two_factor_enabled` flips the flag once
    /// the admin proves they can produce a valid code.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn set_totp_secret(
        pool: &PgPool,
        id: Uuid,
        secret: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET totp_secret = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(secret)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Enables or disables the 2FA requirement
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn set_two_factor_enabled(
        pool: &PgPool,
        id: Uuid,
        enabled: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET two_factor_enabled = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Activates or deactivates an admin
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all admin users
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let admins = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, user_id, role_id, is_active, totp_secret, two_factor_enabled,
                   custom_permissions, last_login_at, created_at, updated_at
            FROM admin_users
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_with_custom(custom: Vec<&str>) -> AdminUser {
        let now = Utc::now();
        AdminUser {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            is_active: true,
            totp_secret: None,
            two_factor_enabled: false,
            custom_permissions: custom.into_iter().map(String::from).collect(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn role_with(permissions: Vec<&str>, level: i32) -> AdminRole {
        let now = Utc::now();
        AdminRole {
            id: Uuid::new_v4(),
            name: "support".to_string(),
            permissions: permissions.into_iter().map(String::from).collect(),
            level,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_merged_permissions() {
        let admin = admin_with_custom(vec!["billing:read"]);
        let role = role_with(vec!["users:read", "subscriptions:read"], 10);

        let merged = admin.merged_permissions(Some(&role));
        assert!(merged.contains(&"users:read".to_string()));
        assert!(merged.contains(&"subscriptions:read".to_string()));
        assert!(merged.contains(&"billing:read".to_string()));
    }

    #[test]
    fn test_merged_permissions_without_role() {
        let admin = admin_with_custom(vec!["users:read"]);
        let merged = admin.merged_permissions(None);
        assert_eq!(merged, vec!["users:read".to_string()]);
    }

    // Integration tests for database operations are in the tests/ directory
}
