/// Plan limit enforcement for subscription tiers
///
/// This module provides usage limit enforcement based on user subscription
/// plans. Limits are enforced on:
/// - Questionnaires created
/// - Responses collected per month
/// - Data exports per month
///
/// # Limits by Plan
///
/// **Free Plan:**
/// - Questionnaires: 1
/// - Responses/month: 100
/// - Exports/month: 5
///
/// **Starter Plan ($19/month):**
/// - Questionnaires: 10
/// - Responses/month: 2,000
/// - Exports/month: 50
///
/// **Business Plan ($79/month):**
/// - Questionnaires: 100
/// - Responses/month: 50,000
/// - Exports/month: 500
///
/// **Admin Plan (internal):**
/// - Everything unlimited
///
/// Limits are a static lookup table keyed by plan, never stored per user.
/// A check compares `current + count` against the table at request time, so
/// a request that would push usage past the limit is denied while one that
/// lands exactly on it is allowed.
///
/// Checks fail closed: any subscription status other than `active` denies.
///
/// # Example
///
/// ```no_run
/// use reviora_shared::limits::LimitService;
/// use reviora_shared::models::usage::UsageKind;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let limits = LimitService::new(pool);
///
/// // Check before creating a questionnaire
/// let result = limits.check(user_id, UsageKind::Questionnaires, 1).await?;
/// if !result.allowed {
///     return Err(result.reason.unwrap_or_default().into());
/// }
///
/// // Create the questionnaire, then record the consumption
/// limits.record(user_id, UsageKind::Questionnaires, 1).await?;
/// # Ok(())
/// # }
/// ```

use crate::models::usage::{SubscriptionUsage, UsageKind};
use crate::models::user::{SubscriptionPlan, SubscriptionStatus, User};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Stable error codes for limit denials
///
/// These strings are part of the API contract and must never change once
/// clients depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitErrorCode {
    /// Questionnaire limit reached
    QuestionnaireLimit,

    /// Monthly response limit reached
    ResponseLimit,

    /// Monthly export limit reached
    ExportLimit,

    /// Plan name not present in the limit table
    UnknownPlan,

    /// Subscription status is not active
    InactiveSubscription,
}

impl LimitErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitErrorCode::QuestionnaireLimit => "SUBSCRIPTION_ERROR_001",
            LimitErrorCode::ResponseLimit => "SUBSCRIPTION_ERROR_002",
            LimitErrorCode::ExportLimit => "SUBSCRIPTION_ERROR_003",
            LimitErrorCode::UnknownPlan => "SUBSCRIPTION_ERROR_004",
            LimitErrorCode::InactiveSubscription => "SUBSCRIPTION_ERROR_005",
        }
    }

    /// The denial code for an exceeded resource
    pub fn for_kind(kind: UsageKind) -> Self {
        match kind {
            UsageKind::Questionnaires => LimitErrorCode::QuestionnaireLimit,
            UsageKind::Responses => LimitErrorCode::ResponseLimit,
            UsageKind::Exports => LimitErrorCode::ExportLimit,
        }
    }
}

/// Limit enforcement error
#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    /// Usage limit exceeded for a resource
    #[error("{} limit reached ({current}/{limit})", kind.as_str())]
    LimitExceeded {
        kind: UsageKind,
        current: u32,
        limit: u32,
    },

    /// Subscription is not in active status
    #[error("Subscription is not active (status: {status})")]
    SubscriptionInactive { status: String },

    /// Plan name has no entry in the limit table
    #[error("Unknown subscription plan: {0}")]
    UnknownPlan(String),

    /// User does not exist (or was deleted)
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LimitError {
    /// Stable error code for denials, None for infrastructure errors
    pub fn code(&self) -> Option<LimitErrorCode> {
        match self {
            LimitError::LimitExceeded { kind, .. } => Some(LimitErrorCode::for_kind(*kind)),
            LimitError::SubscriptionInactive { .. } => Some(LimitErrorCode::InactiveSubscription),
            LimitError::UnknownPlan(_) => Some(LimitErrorCode::UnknownPlan),
            LimitError::UserNotFound(_) => None,
            LimitError::Database(_) => None,
        }
    }
}

/// Static limit table for a plan
///
/// `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    /// Maximum questionnaires
    pub questionnaires: Option<u32>,

    /// Maximum responses per month
    pub responses: Option<u32>,

    /// Maximum exports per month
    pub exports: Option<u32>,

    /// Monthly price in cents (0 for free and internal plans)
    pub monthly_price_cents: i32,
}

impl PlanLimits {
    /// Gets the limit table entry for a plan
    pub fn for_plan(plan: SubscriptionPlan) -> Self {
        match plan {
            SubscriptionPlan::Free => PlanLimits {
                questionnaires: Some(1),
                responses: Some(100),
                exports: Some(5),
                monthly_price_cents: 0,
            },
            SubscriptionPlan::Starter => PlanLimits {
                questionnaires: Some(10),
                responses: Some(2_000),
                exports: Some(50),
                monthly_price_cents: 1_900,
            },
            SubscriptionPlan::Business => PlanLimits {
                questionnaires: Some(100),
                responses: Some(50_000),
                exports: Some(500),
                monthly_price_cents: 7_900,
            },
            SubscriptionPlan::Admin => PlanLimits {
                questionnaires: None,
                responses: None,
                exports: None,
                monthly_price_cents: 0,
            },
        }
    }

    /// Gets the limit for a specific resource kind
    pub fn get(&self, kind: UsageKind) -> Option<u32> {
        match kind {
            UsageKind::Questionnaires => self.questionnaires,
            UsageKind::Responses => self.responses,
            UsageKind::Exports => self.exports,
        }
    }
}

/// Result of a limit check
///
/// Denials carry a human-readable reason and a stable error code; allowed
/// results carry the current usage and the limit (None means unlimited).
#[derive(Debug, Clone, Serialize)]
pub struct LimitCheck {
    /// Whether the request is within limits
    pub allowed: bool,

    /// Human-readable denial reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Stable error code for denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,

    /// Current usage (when known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,

    /// Plan limit (None = unlimited; absent when the check never got that far)
    pub limit: Option<u32>,
}

impl LimitCheck {
    /// Creates an allowed result
    pub fn allowed(current: u32, limit: Option<u32>) -> Self {
        LimitCheck {
            allowed: true,
            reason: None,
            error_code: None,
            current: Some(current),
            limit,
        }
    }

    /// Creates a denial for an exceeded limit
    pub fn exceeded(kind: UsageKind, current: u32, limit: u32) -> Self {
        LimitCheck {
            allowed: false,
            reason: Some(format!(
                "{} limit reached ({}/{})",
                kind.as_str(),
                current,
                limit
            )),
            error_code: Some(LimitErrorCode::for_kind(kind).as_str()),
            current: Some(current),
            limit: Some(limit),
        }
    }

    /// Creates a denial that never reached the counter (inactive, unknown plan)
    pub fn denied(code: LimitErrorCode, reason: impl Into<String>) -> Self {
        LimitCheck {
            allowed: false,
            reason: Some(reason.into()),
            error_code: Some(code.as_str()),
            current: None,
            limit: None,
        }
    }
}

/// Plan limit enforcement service
///
/// Looks up the user's plan, compares the usage counter against the static
/// limit table, and records consumption after successful operations.
#[derive(Clone)]
pub struct LimitService {
    db: PgPool,
}

impl LimitService {
    /// Creates a new limit service
    pub fn new(db: PgPool) -> Self {
        LimitService { db }
    }

    /// Checks whether a user may consume `count` more of a resource
    ///
    /// Denials (limit exceeded, inactive subscription, unknown plan) come
    /// back as a `LimitCheck` with `allowed: false`. Only infrastructure
    /// problems (missing user, database failure) surface as errors.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use reviora_shared::limits::LimitService;
    /// # use reviora_shared::models::usage::UsageKind;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    /// let limits = LimitService::new(pool);
    ///
    /// let result = limits.check(user_id, UsageKind::Responses, 1).await?;
    /// if result.allowed {
    ///     println!("Within limits: {:?}/{:?}", result.current, result.limit);
    /// } else {
    ///     println!("Denied: {:?}", result.error_code);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn check(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        count: u32,
    ) -> Result<LimitCheck, LimitError> {
        match self.evaluate(user_id, kind, count).await {
            Ok(check) => Ok(check),
            Err(LimitError::LimitExceeded {
                kind,
                current,
                limit,
            }) => Ok(LimitCheck::exceeded(kind, current, limit)),
            Err(err @ LimitError::SubscriptionInactive { .. }) => Ok(LimitCheck::denied(
                LimitErrorCode::InactiveSubscription,
                err.to_string(),
            )),
            Err(err @ LimitError::UnknownPlan(_)) => Ok(LimitCheck::denied(
                LimitErrorCode::UnknownPlan,
                err.to_string(),
            )),
            Err(other) => Err(other),
        }
    }

    /// Enforces a limit, returning an error on any denial
    ///
    /// Convenience for request handlers that want to bail with `?`.
    ///
    /// # Errors
    ///
    /// Returns `LimitError::LimitExceeded`, `SubscriptionInactive` or
    /// `UnknownPlan` on denial.
    pub async fn enforce(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        count: u32,
    ) -> Result<(), LimitError> {
        self.evaluate(user_id, kind, count).await?;
        Ok(())
    }

    /// Records consumption after a successful operation
    ///
    /// The increment is a single atomic upsert, so concurrent requests
    /// cannot lose updates.
    pub async fn record(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        count: u32,
    ) -> Result<SubscriptionUsage, LimitError> {
        let usage = SubscriptionUsage::increment(&self.db, user_id, kind, count as i32).await?;
        Ok(usage)
    }

    /// Resets all usage counters for a user
    ///
    /// Called when a plan change takes effect so the new limits start from
    /// a clean slate.
    pub async fn reset(&self, user_id: Uuid) -> Result<u64, LimitError> {
        let deleted = SubscriptionUsage::reset_for_user(&self.db, user_id).await?;
        Ok(deleted)
    }

    /// Gets the limit table for a user's current plan
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or `UnknownPlan` when the lookup fails
    pub async fn limits_for_user(&self, user_id: Uuid) -> Result<PlanLimits, LimitError> {
        let user = self.load_user(user_id).await?;
        let plan = user
            .plan()
            .ok_or_else(|| LimitError::UnknownPlan(user.subscription_plan.clone()))?;
        Ok(PlanLimits::for_plan(plan))
    }

    /// Current usage of every resource kind against the user's plan limits
    ///
    /// Backs the subscription usage endpoint.
    pub async fn usage_overview(&self, user_id: Uuid) -> Result<UsageOverview, LimitError> {
        let user = self.load_user(user_id).await?;
        let plan = user
            .plan()
            .ok_or_else(|| LimitError::UnknownPlan(user.subscription_plan.clone()))?;
        let limits = PlanLimits::for_plan(plan);

        let mut entries = Vec::with_capacity(UsageKind::all().len());
        for kind in UsageKind::all() {
            let usage = SubscriptionUsage::get_current(&self.db, user_id, kind).await?;
            let used = usage.used.max(0) as u32;
            let limit = limits.get(kind);

            entries.push(UsageEntry {
                usage_type: kind.as_str(),
                used,
                limit,
                remaining: limit.map(|l| l.saturating_sub(used)),
            });
        }

        Ok(UsageOverview {
            plan: user.subscription_plan.clone(),
            status: user.subscription_status.clone(),
            period: SubscriptionUsage::current_period(),
            usage: entries,
        })
    }

    /// Full check pipeline with denials as typed errors
    async fn evaluate(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        count: u32,
    ) -> Result<LimitCheck, LimitError> {
        let user = self.load_user(user_id).await?;

        // Fail closed on anything but an active subscription
        match user.status() {
            Some(SubscriptionStatus::Active) => {}
            _ => {
                return Err(LimitError::SubscriptionInactive {
                    status: user.subscription_status.clone(),
                })
            }
        }

        let plan = user
            .plan()
            .ok_or_else(|| LimitError::UnknownPlan(user.subscription_plan.clone()))?;
        let limits = PlanLimits::for_plan(plan);

        let usage = SubscriptionUsage::get_current(&self.db, user_id, kind).await?;
        let current = usage.used.max(0) as u32;

        match limits.get(kind) {
            // Unlimited plans always allow, regardless of usage
            None => Ok(LimitCheck::allowed(current, None)),
            Some(limit) => {
                if current + count > limit {
                    Err(LimitError::LimitExceeded {
                        kind,
                        current,
                        limit,
                    })
                } else {
                    Ok(LimitCheck::allowed(current, Some(limit)))
                }
            }
        }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, LimitError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(LimitError::UserNotFound(user_id))?;

        if user.is_deleted() {
            return Err(LimitError::UserNotFound(user_id));
        }

        Ok(user)
    }
}

/// Usage summary returned by the subscription usage endpoint
#[derive(Debug, Clone, Serialize)]
pub struct UsageOverview {
    /// Plan name as stored
    pub plan: String,

    /// Subscription status as stored
    pub status: String,

    /// Billing month the counters cover
    pub period: chrono::NaiveDate,

    /// One entry per resource kind
    pub usage: Vec<UsageEntry>,
}

/// One resource's usage against its plan limit
#[derive(Debug, Clone, Serialize)]
pub struct UsageEntry {
    /// Resource kind name
    pub usage_type: &'static str,

    /// Amount consumed this period
    pub used: u32,

    /// Plan limit (None = unlimited)
    pub limit: Option<u32>,

    /// Remaining allowance (None = unlimited)
    pub remaining: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits_free() {
        let limits = PlanLimits::for_plan(SubscriptionPlan::Free);
        assert_eq!(limits.questionnaires, Some(1));
        assert_eq!(limits.responses, Some(100));
        assert_eq!(limits.exports, Some(5));
        assert_eq!(limits.monthly_price_cents, 0);
    }

    #[test]
    fn test_plan_limits_starter() {
        let limits = PlanLimits::for_plan(SubscriptionPlan::Starter);
        assert_eq!(limits.questionnaires, Some(10));
        assert_eq!(limits.responses, Some(2_000));
        assert_eq!(limits.exports, Some(50));
        assert_eq!(limits.monthly_price_cents, 1_900);
    }

    #[test]
    fn test_plan_limits_business() {
        let limits = PlanLimits::for_plan(SubscriptionPlan::Business);
        assert_eq!(limits.questionnaires, Some(100));
        assert_eq!(limits.responses, Some(50_000));
        assert_eq!(limits.exports, Some(500));
        assert_eq!(limits.monthly_price_cents, 7_900);
    }

    #[test]
    fn test_plan_limits_admin_unlimited() {
        let limits = PlanLimits::for_plan(SubscriptionPlan::Admin);
        assert_eq!(limits.questionnaires, None);
        assert_eq!(limits.responses, None);
        assert_eq!(limits.exports, None);
    }

    #[test]
    fn test_plan_limits_get() {
        let limits = PlanLimits::for_plan(SubscriptionPlan::Starter);
        assert_eq!(limits.get(UsageKind::Questionnaires), Some(10));
        assert_eq!(limits.get(UsageKind::Responses), Some(2_000));
        assert_eq!(limits.get(UsageKind::Exports), Some(50));
    }

    #[test]
    fn test_error_codes_by_kind() {
        assert_eq!(
            LimitErrorCode::for_kind(UsageKind::Questionnaires).as_str(),
            "SUBSCRIPTION_ERROR_001"
        );
        assert_eq!(
            LimitErrorCode::for_kind(UsageKind::Responses).as_str(),
            "SUBSCRIPTION_ERROR_002"
        );
        assert_eq!(
            LimitErrorCode::for_kind(UsageKind::Exports).as_str(),
            "SUBSCRIPTION_ERROR_003"
        );
        assert_eq!(
            LimitErrorCode::UnknownPlan.as_str(),
            "SUBSCRIPTION_ERROR_004"
        );
        assert_eq!(
            LimitErrorCode::InactiveSubscription.as_str(),
            "SUBSCRIPTION_ERROR_005"
        );
    }

    #[test]
    fn test_limit_check_allowed() {
        let check = LimitCheck::allowed(3, Some(10));
        assert!(check.allowed);
        assert_eq!(check.current, Some(3));
        assert_eq!(check.limit, Some(10));
        assert!(check.error_code.is_none());
    }

    #[test]
    fn test_limit_check_exceeded() {
        let check = LimitCheck::exceeded(UsageKind::Questionnaires, 1, 1);
        assert!(!check.allowed);
        assert_eq!(check.error_code, Some("SUBSCRIPTION_ERROR_001"));
        assert_eq!(check.current, Some(1));
        assert_eq!(check.limit, Some(1));
        assert!(check.reason.is_some());
    }

    #[test]
    fn test_limit_check_denied() {
        let check = LimitCheck::denied(
            LimitErrorCode::InactiveSubscription,
            "Subscription is not active (status: suspended)",
        );
        assert!(!check.allowed);
        assert_eq!(check.error_code, Some("SUBSCRIPTION_ERROR_005"));
        assert!(check.current.is_none());
    }

    #[test]
    fn test_limit_error_display() {
        let err = LimitError::LimitExceeded {
            kind: UsageKind::Questionnaires,
            current: 1,
            limit: 1,
        };
        assert_eq!(err.to_string(), "questionnaires limit reached (1/1)");
        assert_eq!(err.code(), Some(LimitErrorCode::QuestionnaireLimit));

        let err = LimitError::UnknownPlan("platinum".to_string());
        assert_eq!(err.to_string(), "Unknown subscription plan: platinum");
        assert_eq!(err.code(), Some(LimitErrorCode::UnknownPlan));

        let err = LimitError::UserNotFound(Uuid::nil());
        assert!(err.code().is_none());
    }

    // Integration tests for database operations are in the tests/ directory
}
