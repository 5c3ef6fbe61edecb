/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use reviora_api::{app::AppState, config::Config};
/// use reviora_shared::auth::session::MemorySessionStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(
///     config.session.idle_timeout_seconds,
/// )));
/// let state = AppState::new(pool, config, sessions, None);
/// let app = reviora_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use reviora_shared::auth::lockout::{LockoutPolicy, LockoutTracker};
use reviora_shared::auth::middleware::{create_admin_auth_middleware, create_user_auth_middleware};
use reviora_shared::auth::session::SessionStore;
use reviora_shared::email::EmailService;
use reviora_shared::limits::LimitService;
use reviora_shared::subscription::SubscriptionService;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Admin session store (in-memory or Redis, injected at startup)
    pub sessions: Arc<dyn SessionStore>,

    /// Failed-login lockout tracker for admin accounts
    pub lockout: Arc<LockoutTracker>,

    /// Subscription limit enforcement
    pub limits: LimitService,

    /// Subscription upgrade workflow
    pub subscriptions: SubscriptionService,
}

impl AppState {
    /// Creates new application state
    ///
    /// The session store and mailer are injected so tests and single-process
    /// deployments can run on the in-memory store without SMTP.
    pub fn new(
        db: PgPool,
        config: Config,
        sessions: Arc<dyn SessionStore>,
        mailer: Option<Arc<EmailService>>,
    ) -> Self {
        let lockout = Arc::new(LockoutTracker::new(LockoutPolicy {
            max_failures: config.lockout.max_failures,
            window: Duration::from_secs(config.lockout.window_seconds),
        }));

        Self {
            limits: LimitService::new(db.clone()),
            subscriptions: SubscriptionService::new(db.clone(), mailer),
            db,
            config: Arc::new(config),
            sessions,
            lockout,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                                # Health check (public)
/// └── /api/v1/
///     ├── /auth/                             # Account authentication (public)
///     │   ├── POST /register /login /refresh
///     ├── /questionnaires/                   # Questionnaire management (user JWT)
///     │   ├── POST / GET /                   # Create (limit-enforced), list
///     │   ├── GET/PUT/DELETE /:id
///     │   ├── POST /:id/publish
///     │   ├── POST/GET /:id/questions
///     │   ├── GET /:id/export                # Limit-enforced export
///     │   ├── GET /:id/responses             # Owner's response list
///     │   └── POST /:id/responses            # PUBLIC respondent submit
///     ├── /questions/:id                     # PUT/DELETE (user JWT)
///     ├── /reviews/                          # POST/GET public, PUT /:id/publish (owner)
///     ├── /analytics/questionnaires/:id/     # summary, breakdown (user JWT)
///     ├── /subscription/                     # plans, usage, upgrade, requests (user JWT)
///     ├── /api-keys/                         # POST / GET / DELETE /:id (user JWT)
///     ├── /admin/auth/                       # login, 2fa/verify, logout
///     └── /admin/                            # Admin chain + permission checks
///         ├── GET  /subscription/requests
///         ├── POST /subscription/requests/:id
///         ├── GET  /users
///         ├── PUT  /users/:id/status
///         └── GET  /transactions
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public endpoints: account auth, respondent submission, review reads,
    // and the admin login flow (which manages its own token handling)
    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route(
            "/questionnaires/:id/responses",
            post(routes::responses::submit_response),
        )
        .route(
            "/reviews",
            post(routes::reviews::create_review).get(routes::reviews::list_reviews),
        )
        .route("/admin/auth/login", post(routes::admin_auth::login))
        .route(
            "/admin/auth/2fa/verify",
            post(routes::admin_auth::verify_two_factor),
        )
        .route("/admin/auth/logout", post(routes::admin_auth::logout));

    // Account-holder endpoints behind user JWT auth
    let user_routes = Router::new()
        .route(
            "/questionnaires",
            post(routes::questionnaires::create_questionnaire)
                .get(routes::questionnaires::list_questionnaires),
        )
        .route(
            "/questionnaires/:id",
            get(routes::questionnaires::get_questionnaire)
                .put(routes::questionnaires::update_questionnaire)
                .delete(routes::questionnaires::delete_questionnaire),
        )
        .route(
            "/questionnaires/:id/publish",
            post(routes::questionnaires::publish_questionnaire),
        )
        .route(
            "/questionnaires/:id/questions",
            post(routes::questions::create_question).get(routes::questions::list_questions),
        )
        .route(
            "/questionnaires/:id/export",
            get(routes::questionnaires::export_questionnaire),
        )
        .route(
            "/questionnaires/:id/responses",
            get(routes::responses::list_responses),
        )
        .route(
            "/questions/:id",
            put(routes::questions::update_question).delete(routes::questions::delete_question),
        )
        .route(
            "/reviews/:id/publish",
            put(routes::reviews::publish_review),
        )
        .route(
            "/analytics/questionnaires/:id/summary",
            get(routes::analytics::questionnaire_summary),
        )
        .route(
            "/analytics/questionnaires/:id/breakdown",
            get(routes::analytics::questionnaire_breakdown),
        )
        .route("/subscription/plans", get(routes::subscription::list_plans))
        .route("/subscription/usage", get(routes::subscription::get_usage))
        .route(
            "/subscription/upgrade",
            post(routes::subscription::request_upgrade),
        )
        .route(
            "/subscription/requests",
            get(routes::subscription::list_requests),
        )
        .route(
            "/api-keys",
            post(routes::api_keys::create_api_key).get(routes::api_keys::list_api_keys),
        )
        .route("/api-keys/:id", delete(routes::api_keys::revoke_api_key))
        .layer(axum::middleware::from_fn(create_user_auth_middleware(
            state.jwt_secret().to_string(),
        )));

    // Admin endpoints behind the full admin auth chain
    let admin_routes = Router::new()
        .route(
            "/admin/subscription/requests",
            get(routes::admin::list_subscription_requests),
        )
        .route(
            "/admin/subscription/requests/:id",
            post(routes::admin::process_subscription_request),
        )
        .route("/admin/users", get(routes::admin::list_users))
        .route(
            "/admin/users/:id/status",
            put(routes::admin::update_user_status),
        )
        .route("/admin/transactions", get(routes::admin::list_transactions))
        .layer(axum::middleware::from_fn(create_admin_auth_middleware(
            state.db.clone(),
            state.jwt_secret().to_string(),
            state.sessions.clone(),
        )));

    let v1_routes = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Spawns the background task that sweeps expired admin sessions
///
/// Runs until the returned handle is aborted or the runtime shuts down.
/// Expired sessions are also rejected lazily on read, so the sweep only
/// bounds memory held by abandoned sessions.
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sessions.sweep().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Swept expired admin sessions"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reviora_shared::auth::session::{AdminSession, MemorySessionStore};
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn test_session_sweeper_removes_expired() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(8 * 60 * 60)));

        let mut stale = AdminSession::new(Uuid::new_v4());
        stale.last_activity = Utc::now() - chrono::Duration::hours(10);
        store.insert(stale).await.unwrap();

        let fresh = AdminSession::new(Uuid::new_v4());
        let fresh_id = fresh.id;
        store.insert(fresh).await.unwrap();

        let handle = spawn_session_sweeper(store.clone(), Duration::from_secs(300));

        // Paused clock fast-forwards past the first sweep
        tokio::time::sleep(Duration::from_secs(301)).await;

        assert_eq!(store.len(), 1);
        assert!(store.get(fresh_id).await.unwrap().is_some());
        handle.abort();
    }
}
