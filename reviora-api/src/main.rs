//! # Reviora API Server
//!
//! This is the main API server for Reviora, a multi-tenant survey and review
//! platform with subscription plans.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Questionnaire, question, response and review endpoints
//! - Subscription limit enforcement and the upgrade-request workflow
//! - Account auth (JWT) plus enterprise admin auth (sessions, TOTP 2FA, lockout)
//! - API key management for integrations
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p reviora-api
//! ```

use std::sync::Arc;
use std::time::Duration;

use reviora_api::app::{build_router, spawn_session_sweeper, AppState};
use reviora_api::config::Config;
use reviora_shared::auth::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use reviora_shared::db::pool::{create_pool, DatabaseConfig};
use reviora_shared::db::migrations::run_migrations;
use reviora_shared::email::{EmailConfig, EmailService, EmailTransportConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviora_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Reviora API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let idle_timeout = Duration::from_secs(config.session.idle_timeout_seconds);
    let sessions: Arc<dyn SessionStore> = match &config.session.redis_url {
        Some(url) => Arc::new(RedisSessionStore::connect(url, idle_timeout).await?),
        None => {
            tracing::info!("Using in-memory admin session store");
            Arc::new(MemorySessionStore::new(idle_timeout))
        }
    };

    let mailer = Some(Arc::new(EmailService::new(email_config(&config))?));

    let sweep_interval = Duration::from_secs(config.session.sweep_interval_seconds);
    let bind_address = config.bind_address();

    let state = AppState::new(pool, config, sessions.clone(), mailer);
    let app = build_router(state);

    let sweeper = spawn_session_sweeper(sessions, sweep_interval);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Maps the server's email settings onto the shared mailer configuration
fn email_config(config: &Config) -> EmailConfig {
    let transport = match &config.email.smtp_host {
        Some(host) => EmailTransportConfig::Smtp {
            host: host.clone(),
            port: config.email.smtp_port,
            username: config.email.smtp_username.clone(),
            password: config.email.smtp_password.clone(),
            use_tls: true,
        },
        None => EmailTransportConfig::File {
            path: config.email.file_dir.clone(),
        },
    };

    EmailConfig {
        transport,
        from_email: config.email.from_email.clone(),
        from_name: "Reviora".to_string(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
