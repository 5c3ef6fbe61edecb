/// JWT token generation and validation
///
/// Tokens are signed with HS256 (HMAC-SHA256). Two claim shapes exist:
/// user tokens for the public API and admin tokens for the admin surface.
///
/// # Security
///
/// - **Algorithm**: HS256
/// - **Validation**: signature, expiration, not-before and issuer checks
/// - **Secrets**: at least 32 bytes, from configuration
///
/// # Token Types
///
/// - **Access**: short-lived (24h), authenticates API requests
/// - **Refresh**: long-lived (30d), mints new access tokens
/// - **Admin**: carries a `session_id` tying it to a server-side session;
///   the token alone never authenticates an admin request
///
/// # Example
///
/// ```
/// use reviora_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "free", TokenType::Access);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer stamped into and required from every token
pub const ISSUER: &str = "reviora";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    /// Default expiration duration for the token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    /// Token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims for user-facing API tokens
///
/// # Standard Claims
///
/// - `sub`: user ID
/// - `iss`: always "reviora"
/// - `iat` / `exp` / `nbf`: timestamps
///
/// # Custom Claims
///
/// - `plan`: subscription plan at issue time (informational; limit checks
///   always read the database)
/// - `token_type`: access or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Subscription plan at issue time
    pub plan: String,

    /// Token type
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default expiration for the token type
    pub fn new(user_id: Uuid, plan: &str, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, plan, token_type, token_type.default_expiration())
    }

    /// Creates claims with a custom expiration
    pub fn with_expiration(
        user_id: Uuid,
        plan: &str,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            plan: plan.to_string(),
            token_type,
        }
    }

    /// Whether the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Claims for admin tokens
///
/// Admin tokens bind to a server-side session through `session_id`. A
/// stolen or replayed token is useless once the session is gone, and the
/// 2FA state lives on the session rather than in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject (admin user ID, not the base user ID)
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Server-side session this token belongs to
    pub session_id: Uuid,
}

impl AdminClaims {
    /// Creates admin claims with a 24 hour expiration
    pub fn new(admin_user_id: Uuid, session_id: Uuid) -> Self {
        Self::with_expiration(admin_user_id, session_id, Duration::hours(24))
    }

    /// Creates admin claims with a custom expiration ("remember me")
    pub fn with_expiration(admin_user_id: Uuid, session_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: admin_user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            session_id,
        }
    }
}

/// Creates a signed JWT from user claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Creates a signed JWT from admin claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_admin_token(claims: &AdminClaims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    }
}

/// Validates a user JWT and extracts its claims
///
/// Verifies the signature, expiration, not-before time and issuer.
///
/// # Errors
///
/// Returns `JwtError::Expired` for expired tokens, distinct from other
/// validation failures so callers can answer "Token Expired" precisely
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )
    .map_err(map_decode_error)?;

    Ok(token_data.claims)
}

/// Validates an admin JWT and extracts its claims
///
/// # Errors
///
/// Same distinctions as [`validate_token`]
pub fn validate_admin_token(token: &str, secret: &str) -> Result<AdminClaims, JwtError> {
    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )
    .map_err(map_decode_error)?;

    Ok(token_data.claims)
}

/// Validates a user token and requires it to be an access token
///
/// # Errors
///
/// Returns `JwtError::ValidationError` when handed a refresh token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::ValidationError(
            "Expected access token, got refresh token".to_string(),
        ));
    }

    Ok(claims)
}

/// Validates a user token and requires it to be a refresh token
///
/// # Errors
///
/// Returns `JwtError::ValidationError` when handed an access token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::ValidationError(
            "Expected refresh token, got access token".to_string(),
        ));
    }

    Ok(claims)
}

/// Mints a new access token from a valid refresh token
///
/// The new token copies the user and plan from the refresh claims.
///
/// # Errors
///
/// Returns an error if the refresh token is invalid or expired
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let refresh_claims = validate_refresh_token(refresh_token, secret)?;

    let access_claims = Claims::new(refresh_claims.sub, &refresh_claims.plan, TokenType::Access);

    create_token(&access_claims, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "starter", TokenType::Access);

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.plan, "starter");
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, "free", TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.plan, "free");
        assert_eq!(validated.token_type, TokenType::Access);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), "free", TokenType::Access);
        let token = create_token(&claims, "secret-one").expect("Should create token");

        assert!(validate_token(&token, "different-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_distinct() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "free",
            TokenType::Access,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).expect("Should create token");
        let result = validate_token(&token, SECRET);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_access_and_refresh_are_distinct() {
        let access = create_token(
            &Claims::new(Uuid::new_v4(), "free", TokenType::Access),
            SECRET,
        )
        .unwrap();
        let refresh = create_token(
            &Claims::new(Uuid::new_v4(), "free", TokenType::Refresh),
            SECRET,
        )
        .unwrap();

        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(validate_access_token(&refresh, SECRET).is_err());
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_refresh_access_token() {
        let user_id = Uuid::new_v4();

        let refresh_claims = Claims::new(user_id, "business", TokenType::Refresh);
        let refresh_token = create_token(&refresh_claims, SECRET).unwrap();

        let new_access = refresh_access_token(&refresh_token, SECRET).unwrap();
        let validated = validate_access_token(&new_access, SECRET).unwrap();

        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.plan, "business");
    }

    #[test]
    fn test_refresh_with_access_token_fails() {
        let access_claims = Claims::new(Uuid::new_v4(), "free", TokenType::Access);
        let access_token = create_token(&access_claims, SECRET).unwrap();

        assert!(refresh_access_token(&access_token, SECRET).is_err());
    }

    #[test]
    fn test_admin_token_carries_session() {
        let admin_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let claims = AdminClaims::new(admin_id, session_id);
        let token = create_admin_token(&claims, SECRET).expect("Should create token");

        let validated = validate_admin_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, admin_id);
        assert_eq!(validated.session_id, session_id);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_admin_token_not_interchangeable_with_user_token() {
        // A user token is missing session_id, so admin validation must fail
        let user_token = create_token(
            &Claims::new(Uuid::new_v4(), "free", TokenType::Access),
            SECRET,
        )
        .unwrap();

        assert!(validate_admin_token(&user_token, SECRET).is_err());
    }

    #[test]
    fn test_admin_remember_me_expiration() {
        let claims = AdminClaims::with_expiration(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Duration::days(30),
        );

        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, Duration::days(30).num_seconds());
    }
}
