/// Answer model and database operations
///
/// One row per answered question per response. The value column is JSONB so
/// every question kind stores its natural shape: a number for ratings, a
/// string for single choice and text, an array of strings for multi choice.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE answers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     response_id UUID NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
///     question_id UUID NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
///     value JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (response_id, question_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Answer model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Answer {
    /// Unique answer ID
    pub id: Uuid,

    /// Response this answer belongs to
    pub response_id: Uuid,

    /// Question being answered
    pub question_id: Uuid,

    /// Answer value (shape depends on the question kind)
    pub value: JsonValue,

    /// When the answer was recorded
    pub created_at: DateTime<Utc>,
}

impl Answer {
    /// Lists answers for a response
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_response(
        pool: &PgPool,
        response_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, response_id, question_id, value, created_at
            FROM answers
            WHERE response_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(response_id)
        .fetch_all(pool)
        .await?;

        Ok(answers)
    }

    /// Lists all answers for one question across responses
    ///
    /// Used by the analytics breakdown to aggregate answer distributions.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_question(
        pool: &PgPool,
        question_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, response_id, question_id, value, created_at
            FROM answers
            WHERE question_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(question_id)
        .fetch_all(pool)
        .await?;

        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    // Answer rows are only ever created through Response::create_with_answers;
    // integration tests for database operations are in the tests/ directory
}
