/// Response model and database operations
///
/// A response is one respondent's submission to a questionnaire. Answers are
/// stored per-question in the `answers` table and written atomically with the
/// response row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE responses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     questionnaire_id UUID NOT NULL REFERENCES questionnaires(id) ON DELETE CASCADE,
///     respondent_email CITEXT,
///     submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::answer::Answer;

/// Response model representing one submission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Response {
    /// Unique response ID
    pub id: Uuid,

    /// Questionnaire this response belongs to
    pub questionnaire_id: Uuid,

    /// Optional respondent email (anonymous submissions leave this unset)
    pub respondent_email: Option<String>,

    /// When the response was submitted
    pub submitted_at: DateTime<Utc>,
}

/// One answer in a submission, before it has an ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
    /// Question being answered
    pub question_id: Uuid,

    /// Answer value (number for rating, string for single_choice/text,
    /// array of strings for multi_choice)
    pub value: JsonValue,
}

impl Response {
    /// Creates a response together with its answers in one transaction
    ///
    /// Either the response and every answer land, or nothing does. Validation
    /// (questionnaire open, required questions answered, owner quota) happens
    /// before this call.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; the transaction is rolled back
    pub async fn create_with_answers(
        pool: &PgPool,
        questionnaire_id: Uuid,
        respondent_email: Option<String>,
        answers: Vec<NewAnswer>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let response = sqlx::query_as::<_, Response>(
            r#"
            INSERT INTO responses (questionnaire_id, respondent_email)
            VALUES ($1, $2)
            RETURNING id, questionnaire_id, respondent_email, submitted_at
            "#,
        )
        .bind(questionnaire_id)
        .bind(respondent_email)
        .fetch_one(&mut *tx)
        .await?;

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO answers (response_id, question_id, value)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(response.id)
            .bind(answer.question_id)
            .bind(answer.value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(response)
    }

    /// Finds a response by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let response = sqlx::query_as::<_, Response>(
            r#"
            SELECT id, questionnaire_id, respondent_email, submitted_at
            FROM responses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(response)
    }

    /// Lists responses for a questionnaire, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let responses = sqlx::query_as::<_, Response>(
            r#"
            SELECT id, questionnaire_id, respondent_email, submitted_at
            FROM responses
            WHERE questionnaire_id = $1
            ORDER BY submitted_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(questionnaire_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(responses)
    }

    /// Counts responses for a questionnaire
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM responses WHERE questionnaire_id = $1")
                .bind(questionnaire_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Loads the answers belonging to this response
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn answers(&self, pool: &PgPool) -> Result<Vec<Answer>, sqlx::Error> {
        Answer::list_by_response(pool, self.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_answer_value_shapes() {
        let rating = NewAnswer {
            question_id: Uuid::new_v4(),
            value: json!(4),
        };
        assert!(rating.value.is_number());

        let multi = NewAnswer {
            question_id: Uuid::new_v4(),
            value: json!(["fast", "reliable"]),
        };
        assert!(multi.value.is_array());
    }

    // Integration tests for database operations are in the tests/ directory
}
