/// Admin panel endpoints
///
/// Everything here sits behind the admin middleware chain (session-backed
/// JWT, active admin, 2FA verified when enabled), so handlers receive a
/// ready-made [`AdminContext`] and only check the fine-grained permission
/// for their operation. Billing data additionally requires role level 50.
///
/// # Endpoints
///
/// - `GET /api/v1/admin/subscription/requests` - Pending upgrade queue
/// - `POST /api/v1/admin/subscription/requests/:id` - Approve/reject
/// - `GET /api/v1/admin/users` - User directory
/// - `PUT /api/v1/admin/users/:id/status` - Suspend or reactivate
/// - `GET /api/v1/admin/transactions` - Payment ledger

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{success, Envelope},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reviora_shared::{
    auth::{
        middleware::AdminContext,
        permissions::{require_level, require_permission},
    },
    models::{
        payment::PaymentTransaction,
        subscription_request::SubscriptionRequest,
        user::{SubscriptionStatus, User},
    },
    subscription::UpgradeDecision,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Pagination parameters for admin listings
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size (max 100)
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Offset into the result set
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Decision on a pending upgrade request
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequestBody {
    /// "approve" or "reject"
    pub decision: String,

    /// Optional note shown to the user
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

/// Pending request queue page
#[derive(Debug, Serialize)]
pub struct RequestQueueResponse {
    /// Pending requests, oldest first
    pub requests: Vec<SubscriptionRequest>,

    /// Total pending count across all pages
    pub total: i64,

    /// Applied page size
    pub limit: i64,

    /// Applied offset
    pub offset: i64,
}

/// User directory entry
///
/// A projection of the users table; the password hash stays server-side.
#[derive(Debug, Serialize)]
pub struct UserListItem {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Whether the email was verified
    pub email_verified: bool,

    /// Display name
    pub name: Option<String>,

    /// Current plan
    pub subscription_plan: String,

    /// Current status
    pub subscription_status: String,

    /// Account creation time
    pub created_at: DateTime<Utc>,

    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,

    /// Soft-deletion time (None for live accounts)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserListItem {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            email_verified: user.email_verified,
            name: user.name,
            subscription_plan: user.subscription_plan,
            subscription_status: user.subscription_status,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
            deleted_at: user.deleted_at,
        }
    }
}

/// User directory page
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    /// Users, newest first
    pub users: Vec<UserListItem>,

    /// Total user count across all pages
    pub total: i64,

    /// Applied page size
    pub limit: i64,

    /// Applied offset
    pub offset: i64,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusRequest {
    /// New status: "active", "suspended", or "cancelled"
    pub status: String,
}

/// Transaction ledger page
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Transactions, newest first
    pub transactions: Vec<PaymentTransaction>,

    /// Applied page size
    pub limit: i64,

    /// Applied offset
    pub offset: i64,
}

/// Lists pending subscription upgrade requests
///
/// Requires the `subscriptions:read` permission. The queue is ordered
/// oldest first so long-waiting requests surface at the top.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/admin/subscription/requests?limit=50&offset=0
/// Authorization: Bearer <admin-token>
/// ```
pub async fn list_subscription_requests(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<RequestQueueResponse>>> {
    require_permission(&ctx.permissions, "subscriptions:read")?;

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let requests = state.subscriptions.pending_requests(limit, offset).await?;
    let total = SubscriptionRequest::count_pending(&state.db).await?;

    Ok(success(RequestQueueResponse {
        requests,
        total,
        limit,
        offset,
    }))
}

/// Approves or rejects a pending upgrade request
///
/// Requires the `subscriptions:manage` permission. Approval switches the
/// user's plan, records a payment transaction, and emails the user; both
/// outcomes stamp the deciding admin onto the request. A request can only
/// be processed once: the second decision gets 400 regardless of who made
/// the first.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/admin/subscription/requests/:id
/// Authorization: Bearer <admin-token>
/// Content-Type: application/json
///
/// { "decision": "approve", "note": "Welcome aboard" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown decision, or request already processed
/// - `404 Not Found`: No request with that ID
pub async fn process_subscription_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<ProcessRequestBody>,
) -> ApiResult<Json<Envelope<SubscriptionRequest>>> {
    require_permission(&ctx.permissions, "subscriptions:manage")?;
    req.validate()?;

    let decision = UpgradeDecision::from_str(&req.decision).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown decision '{}', expected 'approve' or 'reject'",
            req.decision
        ))
    })?;

    let request = state
        .subscriptions
        .process_request(request_id, ctx.admin_user.id, decision, req.note)
        .await?;

    Ok(success(request))
}

/// Lists user accounts
///
/// Requires the `users:read` permission. Soft-deleted accounts are
/// included so admins can audit past removals; `deleted_at` marks them.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/admin/users?limit=50&offset=0
/// Authorization: Bearer <admin-token>
/// ```
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<UserListResponse>>> {
    require_permission(&ctx.permissions, "users:read")?;

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let users = User::list(&state.db, limit, offset).await?;
    let total = User::count(&state.db).await?;

    Ok(success(UserListResponse {
        users: users.into_iter().map(UserListItem::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Changes a user's subscription status
///
/// Requires the `users:manage` permission. Suspension takes effect on the
/// user's next limit-enforced operation: enforcement checks status before
/// quota, so suspended users get 403 everywhere limits apply.
///
/// # Endpoint
///
/// ```text
/// PUT /api/v1/admin/users/:id/status
/// Authorization: Bearer <admin-token>
/// Content-Type: application/json
///
/// { "status": "suspended" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status value
/// - `404 Not Found`: No user with that ID
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> ApiResult<Json<Envelope<UserListItem>>> {
    require_permission(&ctx.permissions, "users:manage")?;

    let status = SubscriptionStatus::from_str(&req.status).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown status '{}', expected 'active', 'suspended', or 'cancelled'",
            req.status
        ))
    })?;

    let updated = User::update_status(&state.db, user_id, status).await?;
    if !updated {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %user_id,
        status = %req.status,
        admin_user_id = %ctx.admin_user.id,
        "user status changed"
    );

    Ok(success(UserListItem::from(user)))
}

/// Lists payment transactions
///
/// Requires the `billing:read` permission and role level 50 or above;
/// billing data is the most sensitive surface in the panel.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/admin/transactions?limit=50&offset=0
/// Authorization: Bearer <admin-token>
/// ```
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<TransactionListResponse>>> {
    require_permission(&ctx.permissions, "billing:read")?;
    require_level(ctx.role.level, 50)?;

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let transactions = PaymentTransaction::list_all(&state.db, limit, offset).await?;

    Ok(success(TransactionListResponse {
        transactions,
        limit,
        offset,
    }))
}
