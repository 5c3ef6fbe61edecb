/// Questionnaire model and database operations
///
/// A questionnaire is the unit the plan limit counts: creating one consumes
/// the owner's `questionnaires` quota. Respondents only ever see published,
/// still-open questionnaires.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE questionnaires (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     published BOOLEAN NOT NULL DEFAULT FALSE,
///     closes_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviora_shared::models::questionnaire::{Questionnaire, CreateQuestionnaire};
/// use reviora_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let questionnaire = Questionnaire::create(&pool, CreateQuestionnaire {
///     owner_id: Uuid::new_v4(),
///     title: "Customer satisfaction Q3".to_string(),
///     description: Some("Post-purchase survey".to_string()),
///     closes_at: None,
/// }).await?;
///
/// // Open it for responses
/// Questionnaire::publish(&pool, questionnaire.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Questionnaire model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Questionnaire {
    /// Unique questionnaire ID
    pub id: Uuid,

    /// User who owns the questionnaire (quota is charged here)
    pub owner_id: Uuid,

    /// Title shown to respondents
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Whether the questionnaire accepts responses
    pub published: bool,

    /// Optional closing time; responses after this are rejected
    pub closes_at: Option<DateTime<Utc>>,

    /// When the questionnaire was created
    pub created_at: DateTime<Utc>,

    /// When the questionnaire was last updated
    pub updated_at: DateTime<Utc>,
}

impl Questionnaire {
    /// Whether the questionnaire currently accepts responses
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !self.published {
            return false;
        }
        match self.closes_at {
            Some(closes_at) => now < closes_at,
            None => true,
        }
    }
}

/// Input for creating a new questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionnaire {
    /// Owning user
    pub owner_id: Uuid,

    /// Title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional closing time
    pub closes_at: Option<DateTime<Utc>>,
}

/// Input for updating a questionnaire
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuestionnaire {
    /// New title
    pub title: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// New closing time (use Some(None) to clear)
    pub closes_at: Option<Option<DateTime<Utc>>>,
}

impl Questionnaire {
    /// Creates a new questionnaire in draft (unpublished) state
    ///
    /// The caller is responsible for enforcing the owner's plan limit BEFORE
    /// calling this (see `crate::limits::LimitService`).
    ///
    /// # Errors
    ///
    /// Returns an error if the owner does not exist or the database fails
    pub async fn create(pool: &PgPool, data: CreateQuestionnaire) -> Result<Self, sqlx::Error> {
        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (owner_id, title, description, closes_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, description, published, closes_at,
                      created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.closes_at)
        .fetch_one(pool)
        .await?;

        Ok(questionnaire)
    }

    /// Finds a questionnaire by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            SELECT id, owner_id, title, description, published, closes_at,
                   created_at, updated_at
            FROM questionnaires
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(questionnaire)
    }

    /// Lists questionnaires owned by a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questionnaires = sqlx::query_as::<_, Questionnaire>(
            r#"
            SELECT id, owner_id, title, description, published, closes_at,
                   created_at, updated_at
            FROM questionnaires
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(questionnaires)
    }

    /// Counts questionnaires owned by a user
    ///
    /// This is the live count the limit checker compares against the plan
    /// table (usage counters track lifetime creations; the live count is
    /// reported for dashboards).
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM questionnaires WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Updates a questionnaire
    ///
    /// Only non-None fields in `data` will be updated.
    ///
    /// # Returns
    ///
    /// The updated questionnaire if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateQuestionnaire,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE questionnaires SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.closes_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(", closes_at = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, owner_id, title, description, published, \
             closes_at, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Questionnaire>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description_opt) = data.description {
            q = q.bind(description_opt);
        }
        if let Some(closes_opt) = data.closes_at {
            q = q.bind(closes_opt);
        }

        let questionnaire = q.fetch_optional(pool).await?;

        Ok(questionnaire)
    }

    /// Publishes a questionnaire, opening it for responses
    ///
    /// # Returns
    ///
    /// True if the questionnaire was found, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn publish(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE questionnaires
            SET published = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a questionnaire and (via cascade) its questions and responses
    ///
    /// # Returns
    ///
    /// True if a questionnaire was deleted, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questionnaires WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn questionnaire(published: bool, closes_at: Option<DateTime<Utc>>) -> Questionnaire {
        let now = Utc::now();
        Questionnaire {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Test".to_string(),
            description: None,
            published,
            closes_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_open_draft() {
        let q = questionnaire(false, None);
        assert!(!q.is_open(Utc::now()));
    }

    #[test]
    fn test_is_open_published_no_deadline() {
        let q = questionnaire(true, None);
        assert!(q.is_open(Utc::now()));
    }

    #[test]
    fn test_is_open_respects_deadline() {
        let now = Utc::now();
        let q = questionnaire(true, Some(now + Duration::hours(1)));
        assert!(q.is_open(now));
        assert!(!q.is_open(now + Duration::hours(2)));
    }

    // Integration tests for database operations are in the tests/ directory
}
