/// Subscription upgrade workflow
///
/// Plan changes go through an admin-reviewed request queue instead of
/// self-service billing. A user files an upgrade request, an admin approves
/// or rejects it, and approval applies the plan change atomically.
///
/// # Request Lifecycle
///
/// ```text
/// pending --> approved   (plan applied, usage reset, payment recorded)
///        \-> rejected
/// ```
///
/// Both outcomes are terminal. A user can have at most one pending request
/// at a time; this is checked in the service and backed by a partial unique
/// index, so concurrent submissions cannot slip through.
///
/// Approval runs in a single database transaction: flip the request out of
/// pending, update the user's plan and status, reset usage counters and
/// record the payment. The decision email is sent after commit and is
/// best-effort only.
///
/// # Example
///
/// ```no_run
/// use reviora_shared::subscription::{SubscriptionService, UpgradeDecision};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, admin_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let service = SubscriptionService::new(pool, None);
///
/// let request = service
///     .request_upgrade(user_id, "starter", Some("Growing team".to_string()))
///     .await?;
///
/// // Later, an admin approves it
/// service
///     .process_request(request.id, admin_id, UpgradeDecision::Approve, None)
///     .await?;
/// # Ok(())
/// # }
/// ```

use crate::email::EmailService;
use crate::limits::PlanLimits;
use crate::models::subscription_request::{
    CreateSubscriptionRequest, RequestStatus, SubscriptionRequest,
};
use crate::models::user::{SubscriptionPlan, User};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// Upgrade workflow error
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Requested plan has no entry in the plan table
    #[error("Unknown subscription plan: {0}")]
    UnknownPlan(String),

    /// Requested plan is the user's current plan
    #[error("Already subscribed to plan: {0}")]
    AlreadyOnPlan(String),

    /// User already has a request awaiting review
    #[error("A pending subscription request already exists")]
    PendingRequestExists,

    /// No request with that ID
    #[error("Subscription request not found: {0}")]
    RequestNotFound(Uuid),

    /// Request is not pending (already approved or rejected)
    #[error("Request already processed (status: {status})")]
    InvalidStatus { status: String },

    /// User does not exist (or was deleted)
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    /// Stable error code for business-rule denials, None for infrastructure
    /// errors
    pub fn code(&self) -> Option<&'static str> {
        match self {
            WorkflowError::UnknownPlan(_) => Some("SUBSCRIPTION_ERROR_004"),
            WorkflowError::AlreadyOnPlan(_) => Some("INVALID_PLAN"),
            WorkflowError::PendingRequestExists => Some("PENDING_REQUEST_EXISTS"),
            WorkflowError::InvalidStatus { .. } => Some("INVALID_STATUS"),
            WorkflowError::RequestNotFound(_) => None,
            WorkflowError::UserNotFound(_) => None,
            WorkflowError::Database(_) => None,
        }
    }
}

/// Admin decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeDecision {
    /// Apply the plan change
    Approve,

    /// Leave the user on their current plan
    Reject,
}

impl UpgradeDecision {
    /// The terminal request status this decision produces
    pub fn as_status(&self) -> RequestStatus {
        match self {
            UpgradeDecision::Approve => RequestStatus::Approved,
            UpgradeDecision::Reject => RequestStatus::Rejected,
        }
    }

    /// Parses a decision from a request body value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(UpgradeDecision::Approve),
            "reject" => Some(UpgradeDecision::Reject),
            _ => None,
        }
    }
}

/// Subscription upgrade workflow service
#[derive(Clone)]
pub struct SubscriptionService {
    db: PgPool,
    mailer: Option<Arc<EmailService>>,
}

impl SubscriptionService {
    /// Creates a new subscription service
    ///
    /// Pass `None` for the mailer to disable decision emails (tests,
    /// environments without SMTP).
    pub fn new(db: PgPool, mailer: Option<Arc<EmailService>>) -> Self {
        SubscriptionService { db, mailer }
    }

    /// Files an upgrade request for admin review
    ///
    /// # Errors
    ///
    /// - `UnknownPlan` if the target plan is not in the plan table
    /// - `AlreadyOnPlan` if the user already has the target plan
    /// - `PendingRequestExists` if a request is already awaiting review,
    ///   whether detected by the pre-check or by the unique index when two
    ///   submissions race
    pub async fn request_upgrade(
        &self,
        user_id: Uuid,
        requested_plan: &str,
        note: Option<String>,
    ) -> Result<SubscriptionRequest, WorkflowError> {
        let user = self.load_user(user_id).await?;

        let plan = SubscriptionPlan::from_str(requested_plan)
            .ok_or_else(|| WorkflowError::UnknownPlan(requested_plan.to_string()))?;

        if user.subscription_plan == plan.as_str() {
            return Err(WorkflowError::AlreadyOnPlan(requested_plan.to_string()));
        }

        if SubscriptionRequest::find_pending_by_user(&self.db, user_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::PendingRequestExists);
        }

        let request = SubscriptionRequest::create(
            &self.db,
            CreateSubscriptionRequest {
                user_id,
                current_plan: user.subscription_plan.clone(),
                requested_plan: plan.as_str().to_string(),
                note,
            },
        )
        .await
        .map_err(|err| {
            // The partial unique index closes the window between the
            // pre-check above and the insert
            if let sqlx::Error::Database(ref db_err) = err {
                if db_err.is_unique_violation() {
                    return WorkflowError::PendingRequestExists;
                }
            }
            WorkflowError::Database(err)
        })?;

        tracing::info!(
            user_id = %user_id,
            requested_plan = %request.requested_plan,
            request_id = %request.id,
            "subscription upgrade requested"
        );

        Ok(request)
    }

    /// Processes a pending request with an admin decision
    ///
    /// Approval updates the user's plan, reactivates the subscription,
    /// resets usage counters and records a payment transaction, all in one
    /// transaction with the status flip. Rejection only flips the status.
    ///
    /// Either way the requesting user is emailed afterwards; email failures
    /// are logged and never propagated.
    ///
    /// # Errors
    ///
    /// - `RequestNotFound` if no request has that ID
    /// - `InvalidStatus` if the request was already processed (the guarded
    ///   update means only one of two racing admins can win)
    pub async fn process_request(
        &self,
        request_id: Uuid,
        admin_user_id: Uuid,
        decision: UpgradeDecision,
        note: Option<String>,
    ) -> Result<SubscriptionRequest, WorkflowError> {
        let mut tx = self.db.begin().await?;

        let transitioned = Self::transition(
            &mut tx,
            request_id,
            decision.as_status(),
            admin_user_id,
            note.as_deref(),
        )
        .await?;

        let Some(request) = transitioned else {
            tx.rollback().await?;

            // Say which way it failed: unknown ID or already processed
            let existing = SubscriptionRequest::find_by_id(&self.db, request_id).await?;
            return Err(match existing {
                Some(req) => WorkflowError::InvalidStatus { status: req.status },
                None => WorkflowError::RequestNotFound(request_id),
            });
        };

        if decision == UpgradeDecision::Approve {
            let plan = SubscriptionPlan::from_str(&request.requested_plan)
                .ok_or_else(|| WorkflowError::UnknownPlan(request.requested_plan.clone()))?;

            Self::apply_approval(&mut tx, &request, plan, admin_user_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            user_id = %request.user_id,
            status = %request.status,
            processed_by = %admin_user_id,
            "subscription request processed"
        );

        self.notify_user(&request, decision).await;

        Ok(request)
    }

    /// Pending requests for the admin review queue, oldest first
    pub async fn pending_requests(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubscriptionRequest>, WorkflowError> {
        let requests = SubscriptionRequest::list_pending(&self.db, limit, offset).await?;
        Ok(requests)
    }

    /// A user's own request history, newest first
    pub async fn requests_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionRequest>, WorkflowError> {
        let requests = SubscriptionRequest::list_by_user(&self.db, user_id).await?;
        Ok(requests)
    }

    /// Flips a pending request into a terminal status
    ///
    /// The `status = 'pending'` guard makes this the single serialization
    /// point: whoever loses the race gets None back.
    async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: RequestStatus,
        processed_by: Uuid,
        note: Option<&str>,
    ) -> Result<Option<SubscriptionRequest>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRequest>(
            r#"
            UPDATE subscription_requests
            SET status = $2,
                processed_by = $3,
                processed_at = NOW(),
                note = COALESCE($4, note),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING id, user_id, current_plan, requested_plan, status, note,
                      processed_by, processed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(processed_by)
        .bind(note)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Applies an approved plan change inside the processing transaction
    async fn apply_approval(
        tx: &mut Transaction<'_, Postgres>,
        request: &SubscriptionRequest,
        plan: SubscriptionPlan,
        admin_user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        // Plan change also reactivates a lapsed subscription
        sqlx::query(
            r#"
            UPDATE users
            SET subscription_plan = $2,
                subscription_status = 'active',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request.user_id)
        .bind(plan.as_str())
        .execute(&mut **tx)
        .await?;

        // The new plan starts with clean counters
        sqlx::query("DELETE FROM subscription_usage WHERE user_id = $1")
            .bind(request.user_id)
            .execute(&mut **tx)
            .await?;

        let amount_cents = PlanLimits::for_plan(plan).monthly_price_cents;
        sqlx::query(
            r#"
            INSERT INTO payment_transactions
                (user_id, subscription_request_id, amount_cents, plan, recorded_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request.user_id)
        .bind(request.id)
        .bind(amount_cents)
        .bind(plan.as_str())
        .bind(admin_user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Emails the requesting user about the decision, best-effort
    async fn notify_user(&self, request: &SubscriptionRequest, decision: UpgradeDecision) {
        let Some(mailer) = &self.mailer else {
            return;
        };

        let user = match User::find_by_id(&self.db, request.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    request_id = %request.id,
                    "could not load user for decision email"
                );
                return;
            }
        };

        let approved = decision == UpgradeDecision::Approve;
        if let Err(err) = mailer
            .send_upgrade_decision(
                &user.email,
                user.name.as_deref(),
                &request.requested_plan,
                approved,
                request.note.as_deref(),
            )
            .await
        {
            tracing::warn!(
                error = %err,
                user_id = %user.id,
                "failed to send upgrade decision email"
            );
        }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, WorkflowError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(WorkflowError::UserNotFound(user_id))?;

        if user.is_deleted() {
            return Err(WorkflowError::UserNotFound(user_id));
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_to_status() {
        assert_eq!(
            UpgradeDecision::Approve.as_status(),
            RequestStatus::Approved
        );
        assert_eq!(UpgradeDecision::Reject.as_status(), RequestStatus::Rejected);
    }

    #[test]
    fn test_decision_from_str() {
        assert_eq!(UpgradeDecision::from_str("approve"), Some(UpgradeDecision::Approve));
        assert_eq!(UpgradeDecision::from_str("reject"), Some(UpgradeDecision::Reject));
        assert_eq!(UpgradeDecision::from_str("maybe"), None);
    }

    #[test]
    fn test_workflow_error_codes() {
        assert_eq!(
            WorkflowError::PendingRequestExists.code(),
            Some("PENDING_REQUEST_EXISTS")
        );
        assert_eq!(
            WorkflowError::InvalidStatus {
                status: "approved".to_string()
            }
            .code(),
            Some("INVALID_STATUS")
        );
        assert_eq!(
            WorkflowError::UnknownPlan("platinum".to_string()).code(),
            Some("SUBSCRIPTION_ERROR_004")
        );
        assert!(WorkflowError::RequestNotFound(Uuid::nil()).code().is_none());
    }

    // Integration tests for database operations are in the tests/ directory
}
