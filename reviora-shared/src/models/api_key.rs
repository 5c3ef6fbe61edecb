/// API Key model and database operations
///
/// API keys give server-to-server integrations programmatic access to a
/// user's questionnaires and responses without a browser login.
///
/// # Security
///
/// - Keys are stored as SHA-256 hashes (never plaintext)
/// - Keys are prefixed with "rk_" for identification
/// - Full key is only returned on creation (never again)
/// - Keys can be scoped to specific permissions
/// - Keys can be revoked or set to expire
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     key_prefix VARCHAR(10) NOT NULL,
///     key_hash VARCHAR(64) NOT NULL UNIQUE,
///     scopes TEXT[] NOT NULL DEFAULT ARRAY['questionnaires:read', 'responses:read'],
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_used_at TIMESTAMPTZ,
///     revoked BOOLEAN NOT NULL DEFAULT FALSE,
///     revoked_at TIMESTAMPTZ,
///     expires_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::api_key::{ApiKey, CreateApiKey};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let user_id = Uuid::new_v4();
///
/// // Create a new API key
/// let (api_key, plaintext_key) = ApiKey::create(&pool, CreateApiKey {
///     user_id,
///     name: "Reporting integration".to_string(),
///     scopes: vec!["responses:read".to_string()],
///     expires_at: None,
/// }).await?;
///
/// // IMPORTANT: Save plaintext_key now - it's never shown again!
/// println!("API Key: {}", plaintext_key);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::api_key::{generate_api_key, hash_api_key, has_scope};

/// API Key model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique API key ID
    pub id: Uuid,

    /// User this key belongs to
    pub user_id: Uuid,

    /// Human-readable name for the key
    pub name: String,

    /// First 10 characters of the key (for display: "rk_abc1234...")
    pub key_prefix: String,

    /// SHA-256 hash of the full key (never store plaintext!)
    pub key_hash: String,

    /// Permission scopes (e.g., ["questionnaires:read", "responses:read"])
    pub scopes: Vec<String>,

    /// When the key was created
    pub created_at: DateTime<Utc>,

    /// When the key was last used
    pub last_used_at: Option<DateTime<Utc>>,

    /// Whether the key has been revoked
    pub revoked: bool,

    /// When the key was revoked (if applicable)
    pub revoked_at: Option<DateTime<Utc>>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for creating a new API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiKey {
    /// Owning user
    pub user_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Permission scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_scopes() -> Vec<String> {
    vec![
        "questionnaires:read".to_string(),
        "responses:read".to_string(),
    ]
}

impl ApiKey {
    /// Extracts the display prefix from a key (first 10 chars)
    pub fn extract_prefix(key: &str) -> String {
        key.chars().take(10).collect()
    }

    /// Checks if the API key is expired
    ///
    /// Returns true if expires_at is set and is in the past
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            expires_at < Utc::now()
        } else {
            false
        }
    }

    /// Creates a new API key
    ///
    /// Returns both the database record and the plaintext key.
    /// **IMPORTANT**: The plaintext key is only returned once and never stored!
    ///
    /// # Returns
    ///
    /// Tuple of (ApiKey record, plaintext key string)
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn create(pool: &PgPool, data: CreateApiKey) -> Result<(Self, String), sqlx::Error> {
        let (plaintext_key, key_hash) = generate_api_key();
        let key_prefix = Self::extract_prefix(&plaintext_key);

        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, name, key_prefix, key_hash, scopes, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, key_prefix, key_hash, scopes, created_at,
                      last_used_at, revoked, revoked_at, expires_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.name)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(&data.scopes)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok((api_key, plaintext_key))
    }

    /// Finds an API key by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, name, key_prefix, key_hash, scopes, created_at,
                   last_used_at, revoked, revoked_at, expires_at
            FROM api_keys
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(api_key)
    }

    /// Validates an API key and returns the key record if valid
    ///
    /// Checks:
    /// - Key hash matches
    /// - Not revoked
    /// - Not expired
    ///
    /// Also updates last_used_at timestamp if valid.
    pub async fn validate(pool: &PgPool, plaintext_key: &str) -> Result<Option<Self>, sqlx::Error> {
        let key_hash = hash_api_key(plaintext_key);

        // Find and validate the key
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET last_used_at = NOW()
            WHERE key_hash = $1
              AND revoked = FALSE
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING id, user_id, name, key_prefix, key_hash, scopes, created_at,
                      last_used_at, revoked, revoked_at, expires_at
            "#,
        )
        .bind(key_hash)
        .fetch_optional(pool)
        .await?;

        Ok(api_key)
    }

    /// Revokes an API key, checking ownership
    ///
    /// The key is only revoked when it belongs to the given user.
    pub async fn revoke_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked = TRUE, revoked_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all API keys for a user
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, name, key_prefix, key_hash, scopes, created_at,
                   last_used_at, revoked, revoked_at, expires_at
            FROM api_keys
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }

    /// Checks if the key grants a specific scope
    ///
    /// Supports the `*` and `resource:*` wildcards.
    pub fn has_scope(&self, scope: &str) -> bool {
        has_scope(&self.scopes, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefix() {
        let key = "rk_abc123xyz9";
        assert_eq!(ApiKey::extract_prefix(key), "rk_abc123x");
    }

    #[test]
    fn test_has_scope() {
        let api_key = ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Test".to_string(),
            key_prefix: "rk_test".to_string(),
            key_hash: "hash".to_string(),
            scopes: vec![
                "questionnaires:read".to_string(),
                "responses:read".to_string(),
            ],
            created_at: Utc::now(),
            last_used_at: None,
            revoked: false,
            revoked_at: None,
            expires_at: None,
        };

        assert!(api_key.has_scope("questionnaires:read"));
        assert!(api_key.has_scope("responses:read"));
        assert!(!api_key.has_scope("responses:write"));
    }

    #[test]
    fn test_wildcard_scope() {
        let mut api_key = ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Test".to_string(),
            key_prefix: "rk_test".to_string(),
            key_hash: "hash".to_string(),
            scopes: vec!["*".to_string()],
            created_at: Utc::now(),
            last_used_at: None,
            revoked: false,
            revoked_at: None,
            expires_at: None,
        };

        assert!(api_key.has_scope("anything:at:all"));

        api_key.scopes = vec![];
        assert!(!api_key.has_scope("questionnaires:read"));
    }

    #[test]
    fn test_default_scopes() {
        let scopes = default_scopes();
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains(&"questionnaires:read".to_string()));
        assert!(scopes.contains(&"responses:read".to_string()));
    }
}
