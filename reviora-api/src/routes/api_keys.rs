/// API key management endpoints
///
/// This module provides CRUD endpoints for API key management.
/// All endpoints require JWT authentication; keys created here authenticate
/// integration traffic through the `X-Api-Key` header.
///
/// # Endpoints
///
/// - `POST /api/v1/api-keys` - Create API key
/// - `GET /api/v1/api-keys` - List API keys
/// - `DELETE /api/v1/api-keys/:id` - Revoke API key

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{success, Envelope},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use reviora_shared::{
    auth::{api_key as api_key_util, middleware::AuthContext},
    models::api_key::{ApiKey, CreateApiKey},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create API key request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    /// API key name/description
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Comma-separated scopes (e.g., "questionnaires:read,responses:read")
    ///
    /// Available scopes:
    /// - `*`: All permissions
    /// - `questionnaires:*`: All questionnaire permissions
    /// - `questionnaires:read`: Read questionnaires
    /// - `questionnaires:write`: Create/update questionnaires
    /// - `responses:read`: Read responses
    /// - `reviews:read`: Read reviews
    #[validate(length(min = 1, message = "At least one scope is required"))]
    pub scopes: String,

    /// Optional expiration date (ISO 8601)
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Create API key response
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    /// API key ID
    pub id: String,

    /// The plaintext API key (ONLY returned on creation)
    ///
    /// IMPORTANT: This is the only time the plaintext key is shown.
    /// Store it securely as it cannot be retrieved later.
    pub key: String,

    /// API key name
    pub name: String,

    /// Scopes
    pub scopes: Vec<String>,

    /// Created at
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Expires at
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// API key list item (masked)
#[derive(Debug, Serialize)]
pub struct ApiKeyListItem {
    /// API key ID
    pub id: String,

    /// API key name
    pub name: String,

    /// Key prefix (e.g., "rk_abc1234")
    pub key_prefix: String,

    /// Scopes
    pub scopes: Vec<String>,

    /// Whether key is revoked
    pub revoked: bool,

    /// Created at
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last used at
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Expires at
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<ApiKey> for ApiKeyListItem {
    fn from(key: ApiKey) -> Self {
        ApiKeyListItem {
            id: key.id.to_string(),
            name: key.name,
            key_prefix: key.key_prefix,
            scopes: key.scopes,
            revoked: key.revoked,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
        }
    }
}

/// List API keys response
#[derive(Debug, Serialize)]
pub struct ListApiKeysResponse {
    /// API keys
    pub keys: Vec<ApiKeyListItem>,
}

/// Revoke API key response
#[derive(Debug, Serialize)]
pub struct RevokeApiKeyResponse {
    /// Whether key was revoked
    pub revoked: bool,
}

/// Create API key
///
/// Creates a new API key for the authenticated user.
/// Returns the plaintext key ONLY on creation.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/api-keys
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "name": "Reporting integration",
///   "scopes": "questionnaires:read,responses:read",
///   "expires_at": "2027-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Missing or invalid JWT token
/// - `500 Internal Server Error`: Server error
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateApiKeyRequest>,
) -> ApiResult<Json<Envelope<CreateApiKeyResponse>>> {
    req.validate()?;

    let scopes = api_key_util::parse_scopes(&req.scopes);
    if scopes.is_empty() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "scopes".to_string(),
            message: "At least one scope is required".to_string(),
        }]));
    }

    // Generates and hashes the key internally; the plaintext comes back once
    let (api_key, plaintext_key) = ApiKey::create(
        &state.db,
        CreateApiKey {
            user_id: auth.user_id,
            name: req.name,
            scopes,
            expires_at: req.expires_at,
        },
    )
    .await?;

    Ok(success(CreateApiKeyResponse {
        id: api_key.id.to_string(),
        key: plaintext_key,
        name: api_key.name,
        scopes: api_key.scopes,
        created_at: api_key.created_at,
        expires_at: api_key.expires_at,
    }))
}

/// List API keys
///
/// Lists all API keys belonging to the authenticated user.
/// Keys are masked (only prefix shown).
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/api-keys
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid JWT token
/// - `500 Internal Server Error`: Server error
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<ListApiKeysResponse>>> {
    let api_keys = ApiKey::list_by_user(&state.db, auth.user_id).await?;

    let keys = api_keys.into_iter().map(ApiKeyListItem::from).collect();

    Ok(success(ListApiKeysResponse { keys }))
}

/// Revoke API key
///
/// Revokes an API key, preventing it from being used for authentication.
/// The key row is kept for audit; only the revoked flag flips.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/v1/api-keys/:id
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid JWT token
/// - `404 Not Found`: API key not found or owned by someone else
/// - `500 Internal Server Error`: Server error
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<RevokeApiKeyResponse>>> {
    // The user_id filter doubles as the ownership check
    let revoked = ApiKey::revoke_for_user(&state.db, id, auth.user_id).await?;

    if !revoked {
        return Err(ApiError::NotFound("API key not found".to_string()));
    }

    Ok(success(RevokeApiKeyResponse { revoked }))
}
