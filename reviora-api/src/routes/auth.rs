/// Account authentication endpoints
///
/// This module provides the public authentication endpoints for regular
/// accounts (questionnaire owners). Admin authentication is separate and
/// lives in `admin_auth`.
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register a new account
/// - `POST /api/v1/auth/login` - Login and get tokens
/// - `POST /api/v1/auth/refresh` - Refresh access token
///
/// Tokens embed the subscription plan at issue time for display purposes;
/// limit enforcement always reads the current plan from the database.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{success, Envelope},
};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use reviora_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Public view of a user account (no password hash)
#[derive(Debug, Serialize)]
pub struct UserProfile {
    /// User ID
    pub id: String,

    /// Email address
    pub email: String,

    /// Display name
    pub name: Option<String>,

    /// Current subscription plan
    pub subscription_plan: String,

    /// Current subscription status
    pub subscription_status: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            subscription_plan: user.subscription_plan.clone(),
            subscription_status: user.subscription_status.clone(),
            created_at: user.created_at,
        }
    }
}

/// Register / login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The account
    pub user: UserProfile,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Register a new account
///
/// New accounts start on the free plan with an active subscription.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "owner@example.com",
///   "password": "SecureP@ss123",
///   "name": "Jane Doe"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or weak password
/// - `409 Conflict`: Email already registered
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    req.validate()?;
    password::validate_password_strength(&req.password)?;

    let password_hash = password::hash_password(&req.password)?;

    // Unique email violations surface as 409 through the sqlx error mapping
    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        },
    )
    .await?;

    let (access_token, refresh_token) = issue_tokens(&user, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "account registered");

    Ok(success(AuthResponse {
        user: UserProfile::from(&user),
        access_token,
        refresh_token,
    }))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "owner@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials or deleted account
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    req.validate()?;

    // Unknown email and wrong password produce the same 401
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if user.is_deleted() {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    User::update_last_login(&state.db, user.id).await?;

    let (access_token, refresh_token) = issue_tokens(&user, state.jwt_secret())?;

    Ok(success(AuthResponse {
        user: UserProfile::from(&user),
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<Envelope<RefreshResponse>>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(success(RefreshResponse { access_token }))
}

fn issue_tokens(user: &User, secret: &str) -> Result<(String, String), ApiError> {
    let access_claims = jwt::Claims::new(user.id, &user.subscription_plan, jwt::TokenType::Access);
    let refresh_claims =
        jwt::Claims::new(user.id, &user.subscription_plan, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, secret)?;
    let refresh_token = jwt::create_token(&refresh_claims, secret)?;

    Ok((access_token, refresh_token))
}
