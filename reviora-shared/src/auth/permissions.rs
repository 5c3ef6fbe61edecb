/// Authorization checks for admin and user requests
///
/// Reviora's admin access control is permission-string based: every admin
/// carries a merged set of granted permissions (role grants plus per-admin
/// extras) and an integer role level inherited from the role. Route guards
/// check a named permission like `users:read`, and sensitive routes add a
/// minimum level on top.
///
/// The `*` wildcard grants every permission and short-circuits the check.
///
/// User-facing requests authenticated with an API key are additionally
/// scope-checked; JWT-authenticated requests always pass scope checks.
///
/// # Example
///
/// ```no_run
/// use reviora_shared::auth::permissions::{require_level, require_permission};
///
/// # fn example(permissions: &[String], role_level: i32) -> Result<(), Box<dyn std::error::Error>> {
/// // Transactions view needs billing:read and a senior role
/// require_permission(permissions, "billing:read")?;
/// require_level(role_level, 50)?;
/// # Ok(())
/// # }
/// ```
use uuid::Uuid;

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    /// Granted set does not contain the required permission
    #[error("Missing required permission: {0}")]
    MissingPermission(String),

    /// Role level is below the required minimum
    #[error("Insufficient role level: requires {required}, has {actual}")]
    InsufficientLevel { required: i32, actual: i32 },

    /// API key does not carry the required scope
    #[error("Missing required scope: {0}")]
    MissingScope(String),

    /// User does not own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Tests whether a granted permission set contains a required permission
///
/// Exact string match, with `*` granting everything.
pub fn has_permission(granted: &[String], required: &str) -> bool {
    granted.iter().any(|p| p == "*" || p == required)
}

/// Requires a named permission from a granted set
///
/// # Errors
///
/// Returns `PermissionError::MissingPermission` if absent
pub fn require_permission(granted: &[String], required: &str) -> Result<(), PermissionError> {
    if !has_permission(granted, required) {
        return Err(PermissionError::MissingPermission(required.to_string()));
    }

    Ok(())
}

/// Requires a minimum role level
///
/// Levels are ordered ascending; a level-80 admin passes a level-50 check.
///
/// # Errors
///
/// Returns `PermissionError::InsufficientLevel` if below the minimum
pub fn require_level(actual: i32, required: i32) -> Result<(), PermissionError> {
    if actual < required {
        return Err(PermissionError::InsufficientLevel { required, actual });
    }

    Ok(())
}

/// Requires a scope on the authentication context
///
/// JWT authentication always passes; API keys are checked against their
/// scope list.
///
/// # Errors
///
/// Returns `PermissionError::MissingScope` if the key lacks the scope
pub fn require_scope(auth: &AuthContext, required_scope: &str) -> Result<(), PermissionError> {
    if !auth.has_scope(required_scope) {
        return Err(PermissionError::MissingScope(required_scope.to_string()));
    }

    Ok(())
}

/// Requires that the authenticated user owns a resource
///
/// # Errors
///
/// Returns `PermissionError::NotAuthorized` on mismatch
pub fn require_ownership(
    auth: &AuthContext,
    resource_owner_id: Uuid,
) -> Result<(), PermissionError> {
    if auth.user_id != resource_owner_id {
        return Err(PermissionError::NotAuthorized);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants(list: Vec<&str>) -> Vec<String> {
        list.into_iter().map(String::from).collect()
    }

    #[test]
    fn test_has_permission_exact_match() {
        let granted = grants(vec!["users:read", "subscriptions:manage"]);

        assert!(has_permission(&granted, "users:read"));
        assert!(has_permission(&granted, "subscriptions:manage"));
        assert!(!has_permission(&granted, "users:manage"));
        assert!(!has_permission(&granted, "billing:read"));
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let granted = grants(vec!["*"]);

        assert!(has_permission(&granted, "users:read"));
        assert!(has_permission(&granted, "billing:read"));
        assert!(has_permission(&granted, "anything:at:all"));
    }

    #[test]
    fn test_empty_grants_deny() {
        let granted: Vec<String> = Vec::new();
        assert!(!has_permission(&granted, "users:read"));
    }

    #[test]
    fn test_permission_is_not_prefix_matched() {
        let granted = grants(vec!["users:read"]);
        assert!(!has_permission(&granted, "users:readwrite"));
        assert!(!has_permission(&granted, "users"));
    }

    #[test]
    fn test_require_permission() {
        let granted = grants(vec!["subscriptions:read"]);

        assert!(require_permission(&granted, "subscriptions:read").is_ok());

        let err = require_permission(&granted, "subscriptions:manage").unwrap_err();
        assert!(err.to_string().contains("subscriptions:manage"));
    }

    #[test]
    fn test_require_level() {
        assert!(require_level(50, 50).is_ok());
        assert!(require_level(80, 50).is_ok());

        let err = require_level(10, 50).unwrap_err();
        match err {
            PermissionError::InsufficientLevel { required, actual } => {
                assert_eq!(required, 50);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_scope() {
        let jwt_auth = AuthContext::from_jwt(Uuid::new_v4(), "starter".to_string());

        // JWT always has scope
        assert!(require_scope(&jwt_auth, "questionnaires:read").is_ok());
        assert!(require_scope(&jwt_auth, "anything").is_ok());

        let key_auth = AuthContext::from_api_key(
            Uuid::new_v4(),
            "free".to_string(),
            grants(vec!["questionnaires:read", "responses:read"]),
        );

        assert!(require_scope(&key_auth, "questionnaires:read").is_ok());
        assert!(require_scope(&key_auth, "responses:read").is_ok());
        assert!(require_scope(&key_auth, "responses:write").is_err());
    }

    #[test]
    fn test_require_ownership() {
        let user_id = Uuid::new_v4();
        let auth = AuthContext::from_jwt(user_id, "free".to_string());

        assert!(require_ownership(&auth, user_id).is_ok());
        assert!(require_ownership(&auth, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_permission_error_display() {
        let err = PermissionError::MissingPermission("users:manage".to_string());
        assert!(err.to_string().contains("users:manage"));

        let err = PermissionError::NotAuthorized;
        assert!(err.to_string().contains("Not authorized"));
    }
}
