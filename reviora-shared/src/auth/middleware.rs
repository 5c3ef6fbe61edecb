/// Authentication middleware for Axum
///
/// Three layers, used on different route groups:
///
/// - **User JWT**: validates `Authorization: Bearer` access tokens and adds
///   an [`AuthContext`] extension. Stateless.
/// - **API key**: validates `X-Api-Key` keys against the database and adds
///   an [`AuthContext`] with the key's scopes.
/// - **Admin chain**: token extraction (Bearer header, then `adminToken`
///   cookie, then `token` query parameter), JWT validation, admin/user/role
///   loading with active checks, session lookup by the `session_id` claim,
///   the 2FA gate, and finally an [`AdminContext`] extension plus a session
///   activity touch.
///
/// A valid JWT whose session is absent or bound to a different admin fails
/// with 401 `Invalid Session`, which is distinct from the 401s for malformed
/// or expired tokens. An admin with 2FA enabled on an unverified session gets
/// 403 with `requiresTwoFactor: true`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use reviora_shared::auth::middleware::{create_user_auth_middleware, AuthContext};
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     format!("user {} on plan {}", auth.user_id, auth.plan)
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(create_user_auth_middleware("secret")));
/// ```
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::jwt::{validate_access_token, validate_admin_token, JwtError};
use super::session::{AdminSession, SessionStore};
use crate::models::admin::{AdminRole, AdminUser};
use crate::models::api_key::ApiKey;
use crate::models::user::User;

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// JWT token authentication
    Jwt,

    /// API key authentication
    ApiKey,
}

/// Authentication context added to request extensions
///
/// Handlers extract it with Axum's `Extension` extractor. The plan is taken
/// from the token (or the key owner's account) and is informational; limit
/// enforcement always reads the current plan from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Subscription plan at authentication time
    pub plan: String,

    /// Authentication method used
    pub method: AuthMethod,

    /// API key scopes (only for API key auth)
    pub scopes: Option<Vec<String>>,
}

impl AuthContext {
    /// Creates auth context from JWT claims
    pub fn from_jwt(user_id: Uuid, plan: String) -> Self {
        AuthContext {
            user_id,
            plan,
            method: AuthMethod::Jwt,
            scopes: None,
        }
    }

    /// Creates auth context from a validated API key
    pub fn from_api_key(user_id: Uuid, plan: String, scopes: Vec<String>) -> Self {
        AuthContext {
            user_id,
            plan,
            method: AuthMethod::ApiKey,
            scopes: Some(scopes),
        }
    }

    /// Checks if this context has a specific scope
    ///
    /// JWT auth always passes; API key auth checks the scope list.
    pub fn has_scope(&self, required_scope: &str) -> bool {
        match self.method {
            AuthMethod::Jwt => true,
            AuthMethod::ApiKey => match &self.scopes {
                Some(scopes) => super::api_key::has_scope(scopes, required_scope),
                None => false,
            },
        }
    }
}

/// Admin context added to request extensions by the admin auth chain
///
/// Carries the loaded admin, their underlying user account, the role, and
/// the merged permission set route guards check against.
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// The admin_users row
    pub admin_user: AdminUser,

    /// The underlying user account
    pub user: User,

    /// The admin's role
    pub role: AdminRole,

    /// Session backing this request
    pub session_id: Uuid,

    /// Role permissions merged with per-admin custom grants
    pub permissions: Vec<String>,
}

impl AdminContext {
    /// Builds a context, merging role and custom permissions
    pub fn new(admin_user: AdminUser, user: User, role: AdminRole, session_id: Uuid) -> Self {
        let permissions = admin_user.merged_permissions(Some(&role));
        AdminContext {
            admin_user,
            user,
            role,
            session_id,
            permissions,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials supplied
    #[error("Authentication required")]
    MissingCredentials,

    /// Token failed validation
    #[error("Invalid Token")]
    InvalidToken,

    /// Token is past its expiry
    #[error("Token Expired")]
    TokenExpired,

    /// API key unknown, revoked, or expired
    #[error("Invalid API Key")]
    InvalidApiKey,

    /// Session absent, expired, or bound to a different admin
    #[error("Invalid Session")]
    InvalidSession,

    /// Admin deactivated or user account deleted
    #[error("Account Disabled")]
    AccountDisabled,

    /// 2FA enabled but this session has not completed verification
    #[error("Two-factor authentication required")]
    TwoFactorRequired,

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
            }
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid Token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Token Expired"),
            AuthError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid API Key")
            }
            AuthError::InvalidSession => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid Session")
            }
            AuthError::AccountDisabled => (StatusCode::FORBIDDEN, "FORBIDDEN", "Account Disabled"),
            AuthError::TwoFactorRequired => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Two-factor authentication required",
            ),
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth middleware database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        };

        let mut error = json!({ "code": code, "message": message });
        if matches!(self, AuthError::TwoFactorRequired) {
            error["requiresTwoFactor"] = json!(true);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

/// User JWT authentication middleware
///
/// Validates access tokens from the `Authorization: Bearer <token>` header
/// and inserts an [`AuthContext`] extension.
///
/// # Errors
///
/// Returns 401 if the header is missing, the token is invalid, or the token
/// has expired.
pub async fn user_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_access_token(&token, &secret).map_err(map_jwt_error)?;

    let auth_context = AuthContext::from_jwt(claims.sub, claims.plan.clone());
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// API key authentication middleware
///
/// Validates keys from the `X-Api-Key` header against the database. Revoked
/// and expired keys fail the lookup; keys whose owner has been deleted are
/// rejected as invalid. Inserts an [`AuthContext`] carrying the key's scopes.
///
/// # Errors
///
/// Returns 401 for missing, malformed, unknown, revoked, or expired keys.
pub async fn api_key_auth_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let api_key_header = req
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    if !super::api_key::validate_api_key_format(api_key_header) {
        return Err(AuthError::InvalidApiKey);
    }

    let api_key = ApiKey::validate(&pool, api_key_header)
        .await
        .map_err(|e| AuthError::Database(format!("API key lookup failed: {}", e)))?
        .ok_or(AuthError::InvalidApiKey)?;

    let user = User::find_by_id(&pool, api_key.user_id)
        .await
        .map_err(|e| AuthError::Database(format!("User lookup failed: {}", e)))?
        .ok_or(AuthError::InvalidApiKey)?;

    if user.is_deleted() {
        return Err(AuthError::InvalidApiKey);
    }

    let auth_context = AuthContext::from_api_key(
        api_key.user_id,
        user.subscription_plan.clone(),
        api_key.scopes.clone(),
    );
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Admin authentication middleware
///
/// Runs the full admin chain and inserts an [`AdminContext`] extension on
/// success. The session's `last_activity` is touched after authentication;
/// a touch failure is logged and does not fail the request.
///
/// # Errors
///
/// - 401 `Invalid Token` / `Token Expired` for JWT failures and unknown admins
/// - 401 `Invalid Session` when the session is absent or mismatched
/// - 403 `Account Disabled` for deactivated admins or deleted users
/// - 403 with `requiresTwoFactor` when the 2FA gate blocks the session
pub async fn admin_auth_middleware(
    pool: PgPool,
    secret: String,
    sessions: Arc<dyn SessionStore>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_admin_token(&req).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_admin_token(&token, &secret).map_err(map_jwt_error)?;

    let admin = AdminUser::find_by_id(&pool, claims.sub)
        .await
        .map_err(|e| AuthError::Database(format!("Admin lookup failed: {}", e)))?
        .ok_or(AuthError::InvalidToken)?;

    if !admin.is_active {
        return Err(AuthError::AccountDisabled);
    }

    let user = User::find_by_id(&pool, admin.user_id)
        .await
        .map_err(|e| AuthError::Database(format!("User lookup failed: {}", e)))?
        .ok_or(AuthError::InvalidToken)?;

    if user.is_deleted() {
        return Err(AuthError::AccountDisabled);
    }

    let session = sessions
        .get(claims.session_id)
        .await
        .map_err(|e| AuthError::Database(format!("Session lookup failed: {}", e)))?;
    let session = authorize_session(&admin, session)?;

    let role = AdminRole::find_by_id(&pool, admin.role_id)
        .await
        .map_err(|e| AuthError::Database(format!("Role lookup failed: {}", e)))?
        .ok_or(AuthError::InvalidToken)?;

    if let Err(e) = sessions.touch(session.id).await {
        tracing::warn!(error = %e, session_id = %session.id, "Failed to touch session");
    }

    let context = AdminContext::new(admin, user, role, session.id);
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Applies the session checks that follow JWT validation
///
/// The session must exist, must belong to the authenticated admin, and must
/// have passed 2FA verification if the admin requires it.
fn authorize_session(
    admin: &AdminUser,
    session: Option<AdminSession>,
) -> Result<AdminSession, AuthError> {
    let session = session.ok_or(AuthError::InvalidSession)?;

    if session.admin_user_id != admin.id {
        return Err(AuthError::InvalidSession);
    }

    if admin.two_factor_enabled && !session.two_factor_verified {
        return Err(AuthError::TwoFactorRequired);
    }

    Ok(session)
}

fn map_jwt_error(e: JwtError) -> AuthError {
    match e {
        JwtError::Expired => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Extracts the admin token: Bearer header, then `adminToken` cookie, then
/// `token` query parameter
///
/// Public because the admin login routes (2FA verify, logout) accept the
/// token through the same three channels without going through the full
/// middleware chain.
pub fn extract_admin_token(req: &Request) -> Option<String> {
    if let Some(token) = bearer_token(req) {
        return Some(token);
    }

    if let Some(cookies) = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = cookie_value(cookies, "adminToken") {
            return Some(token.to_string());
        }
    }

    req.uri()
        .query()
        .and_then(|q| query_value(q, "token"))
        .map(|s| s.to_string())
}

fn cookie_value<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    header_value.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

fn query_value<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Creates a user JWT middleware closure for `middleware::from_fn`
pub fn create_user_auth_middleware(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(user_auth_middleware(secret, req, next))
    }
}

/// Creates an API key middleware closure for `middleware::from_fn`
pub fn create_api_key_middleware(
    pool: PgPool,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    move |req, next| {
        let pool = pool.clone();
        Box::pin(api_key_auth_middleware(pool, req, next))
    }
}

/// Creates an admin auth middleware closure for `middleware::from_fn`
pub fn create_admin_auth_middleware(
    pool: PgPool,
    secret: impl Into<String>,
    sessions: Arc<dyn SessionStore>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    let secret = secret.into();
    move |req, next| {
        Box::pin(admin_auth_middleware(
            pool.clone(),
            secret.clone(),
            sessions.clone(),
            req,
            next,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn admin(two_factor_enabled: bool) -> AdminUser {
        let now = Utc::now();
        AdminUser {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            is_active: true,
            totp_secret: None,
            two_factor_enabled,
            custom_permissions: vec![],
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_auth_context_from_jwt() {
        let user_id = Uuid::new_v4();
        let context = AuthContext::from_jwt(user_id, "starter".to_string());

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.plan, "starter");
        assert_eq!(context.method, AuthMethod::Jwt);
        assert!(context.scopes.is_none());
    }

    #[test]
    fn test_auth_context_has_scope_jwt() {
        let context = AuthContext::from_jwt(Uuid::new_v4(), "free".to_string());

        // JWT users have all scopes
        assert!(context.has_scope("questionnaires:read"));
        assert!(context.has_scope("anything"));
    }

    #[test]
    fn test_auth_context_has_scope_api_key() {
        let context = AuthContext::from_api_key(
            Uuid::new_v4(),
            "business".to_string(),
            vec!["questionnaires:read".to_string()],
        );

        assert!(context.has_scope("questionnaires:read"));
        assert!(!context.has_scope("questionnaires:write"));
    }

    #[test]
    fn test_authorize_session_missing() {
        let admin = admin(false);
        let err = authorize_session(&admin, None).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[test]
    fn test_authorize_session_mismatched_admin() {
        let admin = admin(false);
        // Session bound to a different admin
        let session = AdminSession::new(Uuid::new_v4());

        let err = authorize_session(&admin, Some(session)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[test]
    fn test_authorize_session_two_factor_gate() {
        let admin = admin(true);
        let session = AdminSession::new(admin.id);

        let err = authorize_session(&admin, Some(session)).unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorRequired));
    }

    #[test]
    fn test_authorize_session_verified_passes_gate() {
        let admin = admin(true);
        let mut session = AdminSession::new(admin.id);
        session.two_factor_verified = true;

        let result = authorize_session(&admin, Some(session));
        assert!(result.is_ok());
    }

    #[test]
    fn test_authorize_session_without_two_factor() {
        let admin = admin(false);
        let session = AdminSession::new(admin.id);

        // Unverified session is fine when 2FA is disabled
        assert!(authorize_session(&admin, Some(session)).is_ok());
    }

    #[test]
    fn test_cookie_value() {
        let header_value = "theme=dark; adminToken=abc.def.ghi; lang=en";
        assert_eq!(cookie_value(header_value, "adminToken"), Some("abc.def.ghi"));
        assert_eq!(cookie_value(header_value, "theme"), Some("dark"));
        assert_eq!(cookie_value(header_value, "missing"), None);
    }

    #[test]
    fn test_query_value() {
        let query = "token=abc.def.ghi&format=csv";
        assert_eq!(query_value(query, "token"), Some("abc.def.ghi"));
        assert_eq!(query_value(query, "format"), Some("csv"));
        assert_eq!(query_value(query, "missing"), None);
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidSession.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::TwoFactorRequired.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Database("boom".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_two_factor_response_carries_flag() {
        let response = AuthError::TwoFactorRequired.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["requiresTwoFactor"], true);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_invalid_session_message() {
        let response = AuthError::InvalidSession.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"]["message"], "Invalid Session");
    }
}
