/// Review model and database operations
///
/// Reviews are standalone rating + comment entries attached to a
/// questionnaire, optionally linked to the response they came from. Owners
/// moderate them through the `published` flag; only published reviews appear
/// on public pages.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reviews (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     questionnaire_id UUID NOT NULL REFERENCES questionnaires(id) ON DELETE CASCADE,
///     response_id UUID REFERENCES responses(id) ON DELETE SET NULL,
///     rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
///     comment TEXT,
///     published BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Review model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    /// Unique review ID
    pub id: Uuid,

    /// Questionnaire the review is attached to
    pub questionnaire_id: Uuid,

    /// Response the review came from (None for directly submitted reviews)
    pub response_id: Option<Uuid>,

    /// Star rating, 1..=5
    pub rating: i32,

    /// Optional free-form comment
    pub comment: Option<String>,

    /// Whether the review is publicly visible
    pub published: bool,

    /// When the review was created
    pub created_at: DateTime<Utc>,

    /// When the review was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    /// Questionnaire being reviewed
    pub questionnaire_id: Uuid,

    /// Source response, if any
    pub response_id: Option<Uuid>,

    /// Star rating, 1..=5
    pub rating: i32,

    /// Optional comment
    pub comment: Option<String>,
}

impl Review {
    /// Creates a new review in unpublished state
    ///
    /// # Errors
    ///
    /// Returns an error if the rating is outside 1..=5 (CHECK constraint) or
    /// the database fails
    pub async fn create(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (questionnaire_id, response_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, questionnaire_id, response_id, rating, comment, published,
                      created_at, updated_at
            "#,
        )
        .bind(data.questionnaire_id)
        .bind(data.response_id)
        .bind(data.rating)
        .bind(data.comment)
        .fetch_one(pool)
        .await?;

        Ok(review)
    }

    /// Finds a review by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, questionnaire_id, response_id, rating, comment, published,
                   created_at, updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(review)
    }

    /// Lists reviews for a questionnaire, newest first
    ///
    /// When `published_only` is true, unpublished reviews are filtered out
    /// (the public listing); owners pass false to moderate everything.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: Uuid,
        published_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, questionnaire_id, response_id, rating, comment, published,
                   created_at, updated_at
            FROM reviews
            WHERE questionnaire_id = $1
              AND (NOT $2 OR published)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(questionnaire_id)
        .bind(published_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(reviews)
    }

    /// Sets the published flag on a review
    ///
    /// # Returns
    ///
    /// True if the review was found, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        published: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET published = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(published)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Average published rating for a questionnaire (None with no reviews)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn average_rating(
        pool: &PgPool,
        questionnaire_id: Uuid,
    ) -> Result<Option<f64>, sqlx::Error> {
        let (avg,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT AVG(rating)::DOUBLE PRECISION
            FROM reviews
            WHERE questionnaire_id = $1 AND published
            "#,
        )
        .bind(questionnaire_id)
        .fetch_one(pool)
        .await?;

        Ok(avg)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests for database operations are in the tests/ directory
}
