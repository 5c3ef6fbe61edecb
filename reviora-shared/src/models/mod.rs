/// Database models for Reviora
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts with subscription plan and status
/// - `questionnaire`: Survey definitions owned by users
/// - `question`: Individual questions within a questionnaire
/// - `response`: Submitted responses to questionnaires
/// - `answer`: Individual answers within a response
/// - `review`: Public reviews with ratings and comments
/// - `usage`: Per-period usage counters for plan limits
/// - `subscription_request`: Plan upgrade requests awaiting admin review
/// - `payment`: Payment transaction records
/// - `admin`: Admin roles and admin user accounts
/// - `api_key`: API keys for programmatic access
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::user::{User, CreateUser};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jane Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod admin;
pub mod answer;
pub mod api_key;
pub mod payment;
pub mod question;
pub mod questionnaire;
pub mod response;
pub mod review;
pub mod subscription_request;
pub mod usage;
pub mod user;
