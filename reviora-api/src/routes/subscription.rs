/// Subscription endpoints for account holders
///
/// Everything here is scoped to the authenticated user: their plan, their
/// usage counters, and their upgrade requests. Processing requests is an
/// admin operation and lives in the `admin` module.
///
/// # Endpoints
///
/// - `GET /api/v1/subscription/plans` - Plan table with limits
/// - `GET /api/v1/subscription/usage` - Current usage against plan limits
/// - `POST /api/v1/subscription/upgrade` - Request a plan change
/// - `GET /api/v1/subscription/requests` - Own request history

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{success, Envelope},
};
use axum::{extract::State, Extension, Json};
use reviora_shared::{
    auth::middleware::AuthContext,
    limits::{PlanLimits, UsageOverview},
    models::{subscription_request::SubscriptionRequest, user::SubscriptionPlan},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One subscribable plan with its limits
#[derive(Debug, Serialize)]
pub struct PlanInfo {
    /// Plan name used in upgrade requests
    pub name: &'static str,

    /// Monthly price in cents
    pub monthly_price_cents: i32,

    /// Maximum questionnaires (None = unlimited)
    pub questionnaires: Option<u32>,

    /// Maximum responses per month
    pub responses: Option<u32>,

    /// Maximum exports per month
    pub exports: Option<u32>,
}

/// Plan table response
#[derive(Debug, Serialize)]
pub struct ListPlansResponse {
    /// Subscribable plans, cheapest first
    pub plans: Vec<PlanInfo>,
}

/// Upgrade request body
#[derive(Debug, Deserialize, Validate)]
pub struct UpgradeRequest {
    /// Target plan name
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan: String,

    /// Optional note for the reviewing admin
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

/// Request history response
#[derive(Debug, Serialize)]
pub struct ListRequestsResponse {
    /// The caller's upgrade requests, newest first
    pub requests: Vec<SubscriptionRequest>,
}

/// List the subscribable plans and their limits
///
/// The internal `admin` plan is not offered here.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/subscription/plans
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_plans(
    State(_state): State<AppState>,
) -> ApiResult<Json<Envelope<ListPlansResponse>>> {
    let plans = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Starter,
        SubscriptionPlan::Business,
    ]
    .into_iter()
    .map(|plan| {
        let limits = PlanLimits::for_plan(plan);
        PlanInfo {
            name: plan.as_str(),
            monthly_price_cents: limits.monthly_price_cents,
            questionnaires: limits.questionnaires,
            responses: limits.responses,
            exports: limits.exports,
        }
    })
    .collect();

    Ok(success(ListPlansResponse { plans }))
}

/// Current usage against the caller's plan limits
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/subscription/usage
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "plan": "free",
///     "status": "active",
///     "period": "2026-08-01",
///     "usage": [
///       { "usage_type": "questionnaires", "used": 1, "limit": 1, "remaining": 0 },
///       { "usage_type": "responses", "used": 42, "limit": 100, "remaining": 58 },
///       { "usage_type": "exports", "used": 0, "limit": 5, "remaining": 5 }
///     ]
///   }
/// }
/// ```
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<UsageOverview>>> {
    let overview = state.limits.usage_overview(auth.user_id).await?;

    Ok(success(overview))
}

/// Request an upgrade to another plan
///
/// The request lands in the admin review queue as `pending`. Only one
/// pending request per user is allowed.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/subscription/upgrade
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "plan": "starter",
///   "note": "Need more questionnaires for Q4"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown plan, or already on the requested plan
/// - `409 Conflict`: A pending request already exists
///   (`PENDING_REQUEST_EXISTS`)
pub async fn request_upgrade(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<Envelope<SubscriptionRequest>>> {
    req.validate()?;

    let request = state
        .subscriptions
        .request_upgrade(auth.user_id, &req.plan, req.note)
        .await?;

    Ok(success(request))
}

/// The caller's upgrade request history, newest first
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/subscription/requests
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<ListRequestsResponse>>> {
    let requests = state.subscriptions.requests_for_user(auth.user_id).await?;

    Ok(success(ListRequestsResponse { requests }))
}
