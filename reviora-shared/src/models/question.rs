/// Question model and database operations
///
/// Questions belong to a questionnaire and are ordered by `position`.
/// Choice-style questions keep their options in a JSONB array; rating
/// questions are fixed to the 1..=5 scale.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE questions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     questionnaire_id UUID NOT NULL REFERENCES questionnaires(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL,
///     prompt TEXT NOT NULL,
///     kind VARCHAR(50) NOT NULL,
///     options JSONB NOT NULL DEFAULT '[]',
///     required BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT questions_kind_check CHECK (
///         kind IN ('rating', 'single_choice', 'multi_choice', 'text')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Question kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// 1..=5 star rating
    Rating,

    /// Pick exactly one option
    SingleChoice,

    /// Pick any number of options
    MultiChoice,

    /// Free-form text answer
    Text,
}

impl QuestionKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Rating => "rating",
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::Text => "text",
        }
    }

    /// Parses kind from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rating" => Some(QuestionKind::Rating),
            "single_choice" => Some(QuestionKind::SingleChoice),
            "multi_choice" => Some(QuestionKind::MultiChoice),
            "text" => Some(QuestionKind::Text),
            _ => None,
        }
    }

    /// Whether this kind expects an option list
    pub fn uses_options(&self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }
}

/// Question model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    /// Unique question ID
    pub id: Uuid,

    /// Questionnaire this question belongs to
    pub questionnaire_id: Uuid,

    /// Order within the questionnaire (0-based)
    pub position: i32,

    /// Question text shown to respondents
    pub prompt: String,

    /// Question kind (stored as text)
    pub kind: String,

    /// Options for choice kinds (JSONB array of strings)
    pub options: JsonValue,

    /// Whether an answer is required to submit a response
    pub required: bool,

    /// When the question was created
    pub created_at: DateTime<Utc>,

    /// When the question was last updated
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Gets the parsed kind enum
    pub fn get_kind(&self) -> Option<QuestionKind> {
        QuestionKind::from_str(&self.kind)
    }
}

/// Input for creating a new question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestion {
    /// Parent questionnaire
    pub questionnaire_id: Uuid,

    /// Order within the questionnaire
    pub position: i32,

    /// Question text
    pub prompt: String,

    /// Question kind
    pub kind: QuestionKind,

    /// Options for choice kinds (ignored for rating/text)
    #[serde(default = "default_options")]
    pub options: JsonValue,

    /// Whether an answer is required
    #[serde(default)]
    pub required: bool,
}

fn default_options() -> JsonValue {
    JsonValue::Array(vec![])
}

/// Input for updating a question
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuestion {
    /// New position
    pub position: Option<i32>,

    /// New prompt
    pub prompt: Option<String>,

    /// New options array
    pub options: Option<JsonValue>,

    /// New required flag
    pub required: Option<bool>,
}

impl Question {
    /// Creates a new question
    ///
    /// # Errors
    ///
    /// Returns an error if the questionnaire does not exist or the database
    /// fails
    pub async fn create(pool: &PgPool, data: CreateQuestion) -> Result<Self, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (questionnaire_id, position, prompt, kind, options, required)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, questionnaire_id, position, prompt, kind, options, required,
                      created_at, updated_at
            "#,
        )
        .bind(data.questionnaire_id)
        .bind(data.position)
        .bind(data.prompt)
        .bind(data.kind.as_str())
        .bind(data.options)
        .bind(data.required)
        .fetch_one(pool)
        .await?;

        Ok(question)
    }

    /// Finds a question by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, questionnaire_id, position, prompt, kind, options, required,
                   created_at, updated_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(question)
    }

    /// Lists questions for a questionnaire ordered by position
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, questionnaire_id, position, prompt, kind, options, required,
                   created_at, updated_at
            FROM questions
            WHERE questionnaire_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(questionnaire_id)
        .fetch_all(pool)
        .await?;

        Ok(questions)
    }

    /// Updates a question
    ///
    /// # Returns
    ///
    /// The updated question if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateQuestion,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE questions SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.position.is_some() {
            bind_count += 1;
            query.push_str(&format!(", position = ${}", bind_count));
        }
        if data.prompt.is_some() {
            bind_count += 1;
            query.push_str(&format!(", prompt = ${}", bind_count));
        }
        if data.options.is_some() {
            bind_count += 1;
            query.push_str(&format!(", options = ${}", bind_count));
        }
        if data.required.is_some() {
            bind_count += 1;
            query.push_str(&format!(", required = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, questionnaire_id, position, prompt, kind, \
             options, required, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Question>(&query).bind(id);

        if let Some(position) = data.position {
            q = q.bind(position);
        }
        if let Some(prompt) = data.prompt {
            q = q.bind(prompt);
        }
        if let Some(options) = data.options {
            q = q.bind(options);
        }
        if let Some(required) = data.required {
            q = q.bind(required);
        }

        let question = q.fetch_optional(pool).await?;

        Ok(question)
    }

    /// Deletes a question and (via cascade) its answers
    ///
    /// # Returns
    ///
    /// True if a question was deleted, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            QuestionKind::Rating,
            QuestionKind::SingleChoice,
            QuestionKind::MultiChoice,
            QuestionKind::Text,
        ] {
            assert_eq!(QuestionKind::from_str(kind.as_str()), Some(kind));
        }

        assert_eq!(QuestionKind::from_str("essay"), None);
    }

    #[test]
    fn test_uses_options() {
        assert!(QuestionKind::SingleChoice.uses_options());
        assert!(QuestionKind::MultiChoice.uses_options());
        assert!(!QuestionKind::Rating.uses_options());
        assert!(!QuestionKind::Text.uses_options());
    }

    // Integration tests for database operations are in the tests/ directory
}
