/// Authentication and authorization utilities
///
/// This module provides the authentication primitives for Reviora:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT token generation and validation (user and admin claims)
/// - [`totp`]: RFC 6238 time-based one-time passwords for admin 2FA
/// - [`session`]: admin session store (in-memory and Redis backends)
/// - [`lockout`]: failed-login lockout windows
/// - [`api_key`]: API key generation and validation utilities
/// - [`permissions`]: permission-string and role-level checks
/// - [`middleware`]: Axum middleware wiring it all together
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **2FA**: TOTP with ±1 step clock skew tolerance
/// - **API Keys**: Secure random generation with SHA-256 hashing
/// - **Constant-time Comparison**: all verification uses constant-time operations
///
/// # Example
///
/// ```no_run
/// use reviora_shared::auth::jwt::{create_token, Claims, TokenType};
/// use reviora_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// // JWT token generation
/// let claims = Claims::new(Uuid::new_v4(), "starter", TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```
pub mod api_key;
pub mod jwt;
pub mod lockout;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod session;
pub mod totp;
