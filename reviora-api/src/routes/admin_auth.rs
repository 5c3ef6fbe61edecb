/// Enterprise admin authentication endpoints
///
/// Admin auth is session-backed: login creates a server-side session and
/// issues a JWT bound to it through the `session_id` claim. Tokens without
/// a live session are useless, restarting the server invalidates every
/// admin login, and the 2FA state lives on the session rather than in the
/// token.
///
/// Failed logins are tracked per email: five failures inside fifteen
/// minutes lock the account and further attempts get 429 with a
/// `Retry-After` header.
///
/// # Endpoints
///
/// - `POST /api/v1/admin/auth/login` - Login (lockout-guarded)
/// - `POST /api/v1/admin/auth/2fa/verify` - Complete the TOTP challenge
/// - `POST /api/v1/admin/auth/logout` - Remove the session
///
/// The 2FA verify and logout endpoints accept the token through the same
/// three channels as the admin middleware: `Authorization: Bearer`, the
/// `adminToken` cookie, or the `token` query parameter.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{success, Envelope},
};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, HeaderValue},
    Json,
};
use chrono::Duration;
use reviora_shared::{
    auth::{
        jwt::{create_admin_token, validate_admin_token, AdminClaims},
        lockout::LockoutStatus,
        middleware::{extract_admin_token, AuthError},
        password,
        session::AdminSession,
        totp,
    },
    models::{
        admin::{AdminRole, AdminUser},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Admin login request
#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    /// Email of the underlying user account
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,

    /// Extends the token to 30 days and sets the `adminToken` cookie
    #[serde(default, rename = "rememberMe")]
    pub remember_me: bool,
}

/// Admin profile returned after a completed login
#[derive(Debug, Serialize)]
pub struct AdminProfile {
    /// Admin user ID
    pub id: String,

    /// Email of the underlying account
    pub email: String,

    /// Display name
    pub name: Option<String>,

    /// Role name
    pub role: String,

    /// Merged role + custom permissions
    pub permissions: Vec<String>,

    /// Whether 2FA is enabled for this admin
    #[serde(rename = "twoFactorEnabled")]
    pub two_factor_enabled: bool,
}

/// Admin login response
///
/// When 2FA is enabled the token comes back as `twoFactorToken` and only
/// unlocks the 2FA verify endpoint until the challenge is completed.
#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    /// Whether the TOTP challenge is still outstanding
    #[serde(rename = "requiresTwoFactor")]
    pub requires_two_factor: bool,

    /// Session-bound JWT (absent while 2FA is outstanding)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Session-bound JWT for the 2FA verify call
    #[serde(rename = "twoFactorToken", skip_serializing_if = "Option::is_none")]
    pub two_factor_token: Option<String>,

    /// Admin profile (absent while 2FA is outstanding)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminProfile>,
}

/// 2FA verify request
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyTwoFactorRequest {
    /// Six-digit TOTP code
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

/// 2FA verify response
#[derive(Debug, Serialize)]
pub struct VerifyTwoFactorResponse {
    /// Always true on success
    pub verified: bool,

    /// The same token, now past the 2FA gate
    pub token: String,

    /// Admin profile
    pub admin: AdminProfile,
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always true; the session is gone
    #[serde(rename = "loggedOut")]
    pub logged_out: bool,
}

/// Admin login
///
/// # Flow
///
/// 1. Lockout check on the submitted email (429 when locked)
/// 2. Credential check against the users table; any failure counts toward
///    the lockout and returns the same 401
/// 3. The account must be an active admin; inactive admins get 403
/// 4. A session is created and a JWT bound to it is issued (24h, or 30d
///    with `rememberMe`, which also sets the `adminToken` cookie)
/// 5. With 2FA enabled the response carries `requiresTwoFactor` and a
///    `twoFactorToken` instead of the profile
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/admin/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "admin@reviora.app",
///   "password": "SecureP@ss123",
///   "rememberMe": true
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Bad credentials or not an admin account
/// - `403 Forbidden`: Admin deactivated
/// - `429 Too Many Requests`: Locked out, `Retry-After` set
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AdminLoginRequest>,
) -> ApiResult<(HeaderMap, Json<Envelope<AdminLoginResponse>>)> {
    req.validate()?;

    let lockout_key = req.email.to_lowercase();

    if let LockoutStatus::Locked { retry_after_secs } = state.lockout.check(&lockout_key) {
        return Err(ApiError::AccountLocked {
            retry_after: retry_after_secs,
        });
    }

    // Any credential failure counts toward the lockout and yields the same
    // 401, so responses do not reveal which part was wrong
    let Some((user, admin)) = authenticate(&state, &req.email, &req.password).await? else {
        if let LockoutStatus::Locked { retry_after_secs } =
            state.lockout.record_failure(&lockout_key)
        {
            return Err(ApiError::AccountLocked {
                retry_after: retry_after_secs,
            });
        }
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    if !admin.is_active {
        return Err(ApiError::Forbidden("Account Disabled".to_string()));
    }

    state.lockout.clear(&lockout_key);

    let session = AdminSession::new(admin.id).with_client(client_ip(&headers), user_agent(&headers));
    let session_id = session.id;
    state.sessions.insert(session).await?;

    let claims = if req.remember_me {
        AdminClaims::with_expiration(admin.id, session_id, Duration::days(30))
    } else {
        AdminClaims::new(admin.id, session_id)
    };
    let token = create_admin_token(&claims, state.jwt_secret())?;

    AdminUser::update_last_login(&state.db, admin.id).await?;

    let mut response_headers = HeaderMap::new();
    if req.remember_me {
        response_headers.insert(
            header::SET_COOKIE,
            admin_cookie(&token, 30 * 24 * 60 * 60, state.config.api.production)?,
        );
    }

    tracing::info!(
        admin_user_id = %admin.id,
        session_id = %session_id,
        two_factor = admin.two_factor_enabled,
        "admin login"
    );

    let body = if admin.two_factor_enabled {
        AdminLoginResponse {
            requires_two_factor: true,
            token: None,
            two_factor_token: Some(token),
            admin: None,
        }
    } else {
        let role = load_role(&state, &admin).await?;
        AdminLoginResponse {
            requires_two_factor: false,
            token: Some(token),
            two_factor_token: None,
            admin: Some(profile(&admin, &user, &role)),
        }
    };

    Ok((response_headers, success(body)))
}

/// Complete the TOTP challenge for a session
///
/// The token from the login response identifies the session; a correct
/// code flips its `two_factor_verified` flag, after which the same token
/// passes the admin middleware.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/admin/auth/2fa/verify
/// Authorization: Bearer <twoFactorToken>
/// Content-Type: application/json
///
/// { "code": "123456" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: 2FA is not enabled for this admin
/// - `401 Unauthorized`: Invalid token, dead session, or wrong code
pub async fn verify_two_factor(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Envelope<VerifyTwoFactorResponse>>> {
    let token = extract_admin_token(&req).ok_or(AuthError::MissingCredentials)?;
    let Json(payload) = Json::<VerifyTwoFactorRequest>::from_request(req, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    payload.validate()?;

    let claims = validate_admin_token(&token, state.jwt_secret())?;

    let admin = AdminUser::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if !admin.is_active {
        return Err(AuthError::AccountDisabled.into());
    }

    let session = state
        .sessions
        .get(claims.session_id)
        .await?
        .filter(|s| s.admin_user_id == admin.id)
        .ok_or(AuthError::InvalidSession)?;

    let secret = admin.totp_secret.as_deref().ok_or_else(|| {
        ApiError::BadRequest("Two-factor authentication is not enabled".to_string())
    })?;

    if !totp::verify_code(secret, &payload.code)? {
        return Err(ApiError::Unauthorized(
            "Invalid verification code".to_string(),
        ));
    }

    state.sessions.set_two_factor_verified(session.id).await?;

    let user = User::find_by_id(&state.db, admin.user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    let role = load_role(&state, &admin).await?;

    tracing::info!(
        admin_user_id = %admin.id,
        session_id = %session.id,
        "two-factor challenge completed"
    );

    Ok(success(VerifyTwoFactorResponse {
        verified: true,
        token,
        admin: profile(&admin, &user, &role),
    }))
}

/// Admin logout
///
/// Removes the server-side session, which invalidates every token bound to
/// it, and clears the `adminToken` cookie.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/admin/auth/logout
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
pub async fn logout(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(HeaderMap, Json<Envelope<LogoutResponse>>)> {
    let token = extract_admin_token(&req).ok_or(AuthError::MissingCredentials)?;
    let claims = validate_admin_token(&token, state.jwt_secret())?;

    state.sessions.remove(claims.session_id).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        admin_cookie("", 0, state.config.api.production)?,
    );

    tracing::info!(
        admin_user_id = %claims.sub,
        session_id = %claims.session_id,
        "admin logout"
    );

    Ok((response_headers, success(LogoutResponse { logged_out: true })))
}

/// Looks up the (user, admin) pair for a credential check
///
/// Returns None for unknown emails, wrong passwords, deleted users, and
/// non-admin accounts; callers treat all four identically.
async fn authenticate(
    state: &AppState,
    email: &str,
    submitted_password: &str,
) -> Result<Option<(User, AdminUser)>, ApiError> {
    let Some(user) = User::find_by_email(&state.db, email).await? else {
        return Ok(None);
    };

    if !password::verify_password(submitted_password, &user.password_hash)? {
        return Ok(None);
    }

    if user.is_deleted() {
        return Ok(None);
    }

    let Some(admin) = AdminUser::find_by_user_id(&state.db, user.id).await? else {
        return Ok(None);
    };

    Ok(Some((user, admin)))
}

async fn load_role(state: &AppState, admin: &AdminUser) -> Result<AdminRole, ApiError> {
    AdminRole::find_by_id(&state.db, admin.role_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Admin role missing".to_string()))
}

fn profile(admin: &AdminUser, user: &User, role: &AdminRole) -> AdminProfile {
    AdminProfile {
        id: admin.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: role.name.clone(),
        permissions: admin.merged_permissions(Some(role)),
        two_factor_enabled: admin.two_factor_enabled,
    }
}

fn admin_cookie(token: &str, max_age_secs: u64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "adminToken={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Cookie encoding failed: {}", e)))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cookie_format() {
        let cookie = admin_cookie("abc.def.ghi", 3600, false).unwrap();
        let value = cookie.to_str().unwrap();

        assert!(value.starts_with("adminToken=abc.def.ghi;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=3600"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn test_admin_cookie_secure_in_production() {
        let cookie = admin_cookie("abc", 60, true).unwrap();
        assert!(cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );

        assert_eq!(client_ip(&headers), Some("203.0.113.9".to_string()));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
