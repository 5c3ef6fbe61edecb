/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing (required, min 32 chars)
/// - `SESSION_IDLE_TIMEOUT_SECONDS`: Admin session inactivity window (default: 28800)
/// - `SESSION_SWEEP_INTERVAL_SECONDS`: Expired-session sweep cadence (default: 300)
/// - `SESSION_REDIS_URL`: Optional Redis URL for session backing
/// - `LOCKOUT_MAX_FAILURES`: Failed admin logins before lockout (default: 5)
/// - `LOCKOUT_WINDOW_SECONDS`: Lockout window length (default: 900)
/// - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD`: SMTP relay;
///   when `SMTP_HOST` is unset mail is written to `EMAIL_FILE_DIR` (default: ./emails)
/// - `EMAIL_FROM`: From address (default: noreply@reviora.app)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use reviora_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Admin session configuration
    pub session: SessionConfig,

    /// Admin login lockout configuration
    pub lockout: LockoutConfig,

    /// Outgoing email configuration
    pub email: EmailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive (development)
    pub cors_origins: Vec<String>,

    /// Whether the server runs behind HTTPS in production
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Admin session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds of inactivity before an admin session expires
    pub idle_timeout_seconds: u64,

    /// How often the background sweep removes expired sessions
    pub sweep_interval_seconds: u64,

    /// Redis URL for session backing; None keeps sessions in process memory
    pub redis_url: Option<String>,
}

/// Admin login lockout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failed attempts before the account locks
    pub max_failures: u32,

    /// Window length in seconds, measured from the first failure
    pub window_seconds: u64,
}

/// Outgoing email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host; None writes mail to `file_dir` instead
    pub smtp_host: Option<String>,

    /// SMTP port
    pub smtp_port: u16,

    /// SMTP username
    pub smtp_username: String,

    /// SMTP password
    pub smtp_password: String,

    /// Directory for file-transport mail in development
    pub file_dir: String,

    /// From address for outgoing mail
    pub from_email: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    ///
    /// # Example
    ///
    /// ```no_run
    /// use reviora_api::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_env()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("PRODUCTION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let idle_timeout_seconds = env::var("SESSION_IDLE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "28800".to_string())
            .parse::<u64>()?;

        let sweep_interval_seconds = env::var("SESSION_SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()?;

        let session_redis_url = env::var("SESSION_REDIS_URL").ok();

        let lockout_max_failures = env::var("LOCKOUT_MAX_FAILURES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let lockout_window_seconds = env::var("LOCKOUT_WINDOW_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()?;

        let smtp_host = env::var("SMTP_HOST").ok();
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()?;
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let email_file_dir = env::var("EMAIL_FILE_DIR").unwrap_or_else(|_| "./emails".to_string());
        let from_email =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@reviora.app".to_string());

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            session: SessionConfig {
                idle_timeout_seconds,
                sweep_interval_seconds,
                redis_url: session_redis_url,
            },
            lockout: LockoutConfig {
                max_failures: lockout_max_failures,
                window_seconds: lockout_window_seconds,
            },
            email: EmailConfig {
                smtp_host,
                smtp_port,
                smtp_username,
                smtp_password,
                file_dir: email_file_dir,
                from_email,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            session: SessionConfig {
                idle_timeout_seconds: 28800,
                sweep_interval_seconds: 300,
                redis_url: None,
            },
            lockout: LockoutConfig {
                max_failures: 5,
                window_seconds: 900,
            },
            email: EmailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: String::new(),
                smtp_password: String::new(),
                file_dir: "./emails".to_string(),
                from_email: "noreply@reviora.app".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address() {
        let config = test_config();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_defaults_match_policy() {
        let config = test_config();

        // 8 hour idle window, swept every 5 minutes
        assert_eq!(config.session.idle_timeout_seconds, 8 * 60 * 60);
        assert_eq!(config.session.sweep_interval_seconds, 300);

        // 5 failures in a 15 minute window
        assert_eq!(config.lockout.max_failures, 5);
        assert_eq!(config.lockout.window_seconds, 15 * 60);
    }
}
