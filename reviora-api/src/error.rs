/// Error handling for the API server
///
/// One error enum for every handler; `IntoResponse` turns each variant into
/// the right HTTP status, so handlers return `ApiResult<T>` and bail with
/// `?`.
///
/// Every error renders as the standard envelope
/// `{"success": false, "error": {"code", "message", ...}}`. Subscription
/// limit denials carry their stable `SUBSCRIPTION_ERROR_*` codes, auth
/// failures use the named message strings clients match on (`Invalid Token`,
/// `Invalid Session`, ...), and lockout responses add a `Retry-After` header.
///
/// # Example
///
/// ```
/// use reviora_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// # async fn fetch_data() -> ApiResult<serde_json::Value> { Ok(json!({})) }
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     let data = fetch_data().await?;
///     Ok(Json(json!({ "success": true, "data": data })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use reviora_shared::auth::jwt::JwtError;
use reviora_shared::auth::middleware::AuthError;
use reviora_shared::auth::password::PasswordError;
use reviora_shared::auth::permissions::PermissionError;
use reviora_shared::auth::session::SessionError;
use reviora_shared::auth::totp::TotpError;
use reviora_shared::email::EmailError;
use reviora_shared::limits::{LimitError, LimitErrorCode};
use reviora_shared::subscription::WorkflowError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Bad request with a domain error code (400), e.g. `INVALID_STATUS`
    BadRequestCode {
        code: &'static str,
        message: String,
    },

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Forbidden pending two-factor verification (403 + `requiresTwoFactor`)
    TwoFactorRequired,

    /// Subscription limit denial (402) with its `SUBSCRIPTION_ERROR_*` code
    LimitExceeded {
        code: &'static str,
        message: String,
    },

    /// Subscription not active (403, `SUBSCRIPTION_ERROR_005`)
    SubscriptionInactive(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) with a domain error code, e.g. `PENDING_REQUEST_EXISTS`
    Conflict {
        code: &'static str,
        message: String,
    },

    /// Validation errors (400, `VALIDATION_ERROR` with field details)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Login lockout (429 + `Retry-After`)
    AccountLocked { retry_after: u64 },

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error payload inside the response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (e.g., "SUBSCRIPTION_ERROR_001", "VALIDATION_ERROR")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Set on the 2FA gate so clients can prompt for a code
    #[serde(
        rename = "requiresTwoFactor",
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_two_factor: Option<bool>,
}

/// Error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false` for errors
    pub success: bool,

    /// The error payload
    pub error: ErrorBody,
}

impl ErrorResponse {
    fn new(code: &str, message: String, details: Option<Vec<ValidationErrorDetail>>) -> Self {
        ErrorResponse {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
                requires_two_factor: None,
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::BadRequestCode { code, message } => {
                write!(f, "Bad request ({}): {}", code, message)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::TwoFactorRequired => write!(f, "Two-factor verification required"),
            ApiError::LimitExceeded { code, message } => {
                write!(f, "Limit exceeded ({}): {}", code, message)
            }
            ApiError::SubscriptionInactive(msg) => {
                write!(f, "Subscription inactive: {}", msg)
            }
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict { code, message } => write!(f, "Conflict ({}): {}", code, message),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::AccountLocked { retry_after } => {
                write!(f, "Account locked, retry after {}s", retry_after)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Handle lockout separately to add the Retry-After header
        if let ApiError::AccountLocked { retry_after } = &self {
            let body = Json(ErrorResponse::new(
                "ACCOUNT_LOCKED",
                "Account Locked".to_string(),
                None,
            ));

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            response.headers_mut().insert(
                "Retry-After",
                axum::http::HeaderValue::from_str(&retry_after.to_string()).unwrap(),
            );
            return response;
        }

        // The 2FA gate carries an extra flag inside the error payload
        if let ApiError::TwoFactorRequired = &self {
            let mut body = ErrorResponse::new(
                "FORBIDDEN",
                "Two-factor authentication required".to_string(),
                None,
            );
            body.error.requires_two_factor = Some(true);
            return (StatusCode::FORBIDDEN, Json(body)).into_response();
        }

        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::BadRequestCode { code, message } => {
                (StatusCode::BAD_REQUEST, code, message, None)
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            ApiError::TwoFactorRequired => unreachable!("handled above"),
            ApiError::LimitExceeded { code, message } => {
                (StatusCode::PAYMENT_REQUIRED, code, message, None)
            }
            ApiError::SubscriptionInactive(msg) => (
                StatusCode::FORBIDDEN,
                LimitErrorCode::InactiveSubscription.as_str(),
                msg,
                None,
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::AccountLocked { .. } => unreachable!("handled above"),
            ApiError::InternalError(msg) => {
                // Clients get a generic message; the detail goes to the log
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse::new(error_code, message, details));

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Unique violations surface as 409 rather than 500
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict {
                            code: "CONFLICT",
                            message: "Email already registered".to_string(),
                        };
                    }
                    return ApiError::Conflict {
                        code: "CONFLICT",
                        message: format!("Constraint violation: {}", constraint),
                    };
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert limit service errors to API errors
///
/// Limit denials become 402 responses carrying their per-resource code;
/// the inactive-subscription denial is 403 per the API contract.
impl From<LimitError> for ApiError {
    fn from(err: LimitError) -> Self {
        match err {
            LimitError::LimitExceeded {
                kind,
                current,
                limit,
            } => ApiError::LimitExceeded {
                code: LimitErrorCode::for_kind(kind).as_str(),
                message: format!("{} limit reached ({}/{})", kind.as_str(), current, limit),
            },
            LimitError::SubscriptionInactive { status } => ApiError::SubscriptionInactive(
                format!("Subscription is not active (status: {})", status),
            ),
            LimitError::UnknownPlan(plan) => ApiError::BadRequestCode {
                code: LimitErrorCode::UnknownPlan.as_str(),
                message: format!("Unknown subscription plan: {}", plan),
            },
            LimitError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            LimitError::Database(e) => ApiError::from(e),
        }
    }
}

/// Convert upgrade workflow errors to API errors
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::UnknownPlan(plan) => ApiError::BadRequestCode {
                code: LimitErrorCode::UnknownPlan.as_str(),
                message: format!("Unknown subscription plan: {}", plan),
            },
            WorkflowError::AlreadyOnPlan(plan) => ApiError::BadRequestCode {
                code: "INVALID_PLAN",
                message: format!("Already subscribed to plan: {}", plan),
            },
            WorkflowError::PendingRequestExists => ApiError::Conflict {
                code: "PENDING_REQUEST_EXISTS",
                message: "A pending subscription request already exists".to_string(),
            },
            WorkflowError::RequestNotFound(id) => {
                ApiError::NotFound(format!("Subscription request not found: {}", id))
            }
            WorkflowError::InvalidStatus { status } => ApiError::BadRequestCode {
                code: "INVALID_STATUS",
                message: format!("Request already processed (status: {})", status),
            },
            WorkflowError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            WorkflowError::Database(e) => ApiError::from(e),
        }
    }
}

/// Convert auth middleware errors to API errors
///
/// Login routes run parts of the auth chain by hand (token extraction,
/// session checks) and need the same response mapping.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            AuthError::InvalidToken => ApiError::Unauthorized("Invalid Token".to_string()),
            AuthError::TokenExpired => ApiError::Unauthorized("Token Expired".to_string()),
            AuthError::InvalidApiKey => ApiError::Unauthorized("Invalid API Key".to_string()),
            AuthError::InvalidSession => ApiError::Unauthorized("Invalid Session".to_string()),
            AuthError::AccountDisabled => ApiError::Forbidden("Account Disabled".to_string()),
            AuthError::TwoFactorRequired => ApiError::TwoFactorRequired,
            AuthError::Database(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert permission errors to API errors
impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::MissingPermission(_) => {
                ApiError::Forbidden("Insufficient Permissions".to_string())
            }
            PermissionError::InsufficientLevel { .. } => {
                ApiError::Forbidden("Insufficient Role Level".to_string())
            }
            PermissionError::MissingScope(scope) => {
                ApiError::Forbidden(format!("Missing required scope: {}", scope))
            }
            PermissionError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::WeakPassword(msg) => ApiError::BadRequest(msg),
            other => ApiError::InternalError(format!("Password operation failed: {}", other)),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token Expired".to_string()),
            _ => ApiError::Unauthorized("Invalid Token".to_string()),
        }
    }
}

/// Convert session store errors to API errors
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::InternalError(format!("Session store error: {}", err))
    }
}

/// Convert TOTP errors to API errors
///
/// The secret comes from the database, so a decode failure is a server
/// problem rather than client input.
impl From<TotpError> for ApiError {
    fn from(err: TotpError) -> Self {
        ApiError::InternalError(format!("TOTP error: {}", err))
    }
}

/// Convert email errors to API errors
impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::InternalError(format!("Email error: {}", err))
    }
}

/// Convert validator errors to API errors
///
/// Lets handlers validate request DTOs with a bare `req.validate()?`.
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviora_shared::models::usage::UsageKind;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_limit_error_mapping() {
        let err = ApiError::from(LimitError::LimitExceeded {
            kind: UsageKind::Questionnaires,
            current: 1,
            limit: 1,
        });

        match err {
            ApiError::LimitExceeded { code, .. } => assert_eq!(code, "SUBSCRIPTION_ERROR_001"),
            other => panic!("unexpected mapping: {other}"),
        }

        let err = ApiError::from(LimitError::SubscriptionInactive {
            status: "suspended".to_string(),
        });
        assert!(matches!(err, ApiError::SubscriptionInactive(_)));
    }

    #[test]
    fn test_workflow_error_mapping() {
        let err = ApiError::from(WorkflowError::PendingRequestExists);
        match err {
            ApiError::Conflict { code, .. } => assert_eq!(code, "PENDING_REQUEST_EXISTS"),
            other => panic!("unexpected mapping: {other}"),
        }

        let err = ApiError::from(WorkflowError::InvalidStatus {
            status: "approved".to_string(),
        });
        match err {
            ApiError::BadRequestCode { code, .. } => assert_eq!(code, "INVALID_STATUS"),
            other => panic!("unexpected mapping: {other}"),
        }
    }

    #[test]
    fn test_permission_error_messages() {
        let err = ApiError::from(PermissionError::MissingPermission("users:read".to_string()));
        assert_eq!(err.to_string(), "Forbidden: Insufficient Permissions");

        let err = ApiError::from(PermissionError::InsufficientLevel {
            required: 50,
            actual: 10,
        });
        assert_eq!(err.to_string(), "Forbidden: Insufficient Role Level");
    }

    #[tokio::test]
    async fn test_account_locked_sets_retry_after() {
        let response = ApiError::AccountLocked { retry_after: 300 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok()),
            Some("300")
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "ACCOUNT_LOCKED");
        assert_eq!(body["error"]["message"], "Account Locked");
    }

    #[tokio::test]
    async fn test_two_factor_required_envelope() {
        let response = ApiError::TwoFactorRequired.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["requiresTwoFactor"], true);
    }

    #[tokio::test]
    async fn test_validation_error_is_400() {
        let err = ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "title".to_string(),
            message: "Title is required".to_string(),
        }]);
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "title");
    }
}
