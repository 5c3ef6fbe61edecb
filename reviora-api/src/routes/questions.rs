/// Question management endpoints
///
/// Questions live inside a questionnaire; every operation here verifies the
/// caller owns the parent questionnaire first. Questions are not a limited
/// resource, only the questionnaires that hold them are.
///
/// # Endpoints
///
/// - `POST /api/v1/questionnaires/:id/questions` - Add a question
/// - `GET /api/v1/questionnaires/:id/questions` - List questions in order
/// - `PUT /api/v1/questions/:id` - Update a question
/// - `DELETE /api/v1/questions/:id` - Delete a question

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{questionnaires::load_owned, success, Envelope},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use reviora_shared::{
    auth::middleware::AuthContext,
    models::question::{CreateQuestion, Question, QuestionKind, UpdateQuestion},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

/// Create question request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    /// Order within the questionnaire (0-based)
    #[validate(range(min = 0, message = "Position must be non-negative"))]
    pub position: i32,

    /// Question text shown to respondents
    #[validate(length(min = 1, max = 1000, message = "Prompt must be 1-1000 characters"))]
    pub prompt: String,

    /// Question kind: rating, single_choice, multi_choice, or text
    pub kind: String,

    /// Options for choice kinds (array of strings)
    #[serde(default)]
    pub options: Vec<String>,

    /// Whether an answer is required to submit a response
    #[serde(default)]
    pub required: bool,
}

/// Update question request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    /// New position
    #[validate(range(min = 0, message = "Position must be non-negative"))]
    pub position: Option<i32>,

    /// New prompt
    #[validate(length(min = 1, max = 1000, message = "Prompt must be 1-1000 characters"))]
    pub prompt: Option<String>,

    /// New options array (choice kinds only)
    pub options: Option<Vec<String>>,

    /// New required flag
    pub required: Option<bool>,
}

/// List questions response
#[derive(Debug, Serialize)]
pub struct ListQuestionsResponse {
    /// Questions ordered by position
    pub questions: Vec<Question>,
}

/// Delete question response
#[derive(Debug, Serialize)]
pub struct DeleteQuestionResponse {
    /// Whether a question was deleted
    pub deleted: bool,
}

/// Add a question to a questionnaire
///
/// Choice kinds (`single_choice`, `multi_choice`) must come with at least
/// two options; `rating` and `text` kinds ignore the options array.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/questionnaires/:id/questions
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "position": 0,
///   "prompt": "How satisfied are you?",
///   "kind": "rating",
///   "required": true
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown kind, or choice kind without options
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn create_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(questionnaire_id): Path<Uuid>,
    Json(req): Json<CreateQuestionRequest>,
) -> ApiResult<Json<Envelope<Question>>> {
    req.validate()?;

    load_owned(&state, &auth, questionnaire_id).await?;

    let kind = QuestionKind::from_str(&req.kind).ok_or_else(|| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "kind".to_string(),
            message: format!(
                "Unknown question kind '{}' (expected rating, single_choice, multi_choice, or text)",
                req.kind
            ),
        }])
    })?;

    if kind.uses_options() && req.options.len() < 2 {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "options".to_string(),
            message: "Choice questions need at least two options".to_string(),
        }]));
    }

    let options = if kind.uses_options() {
        JsonValue::from(req.options)
    } else {
        JsonValue::Array(vec![])
    };

    let question = Question::create(
        &state.db,
        CreateQuestion {
            questionnaire_id,
            position: req.position,
            prompt: req.prompt,
            kind,
            options,
            required: req.required,
        },
    )
    .await?;

    Ok(success(question))
}

/// List a questionnaire's questions in display order
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(questionnaire_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ListQuestionsResponse>>> {
    load_owned(&state, &auth, questionnaire_id).await?;

    let questions = Question::list_by_questionnaire(&state.db, questionnaire_id).await?;

    Ok(success(ListQuestionsResponse { questions }))
}

/// Update a question
///
/// The kind is immutable after creation; changing it would invalidate
/// existing answers. Options can only be replaced on choice kinds.
///
/// # Errors
///
/// - `400 Bad Request`: Options on a non-choice kind, or too few options
/// - `403 Forbidden`: Parent questionnaire belongs to someone else
/// - `404 Not Found`: Unknown question
pub async fn update_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuestionRequest>,
) -> ApiResult<Json<Envelope<Question>>> {
    req.validate()?;

    let question = load_question_owned(&state, &auth, id).await?;

    let options = match req.options {
        Some(options) => {
            let is_choice = question
                .get_kind()
                .map(|k| k.uses_options())
                .unwrap_or(false);

            if !is_choice {
                return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "options".to_string(),
                    message: "Only choice questions have options".to_string(),
                }]));
            }
            if options.len() < 2 {
                return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "options".to_string(),
                    message: "Choice questions need at least two options".to_string(),
                }]));
            }

            Some(JsonValue::from(options))
        }
        None => None,
    };

    let updated = Question::update(
        &state.db,
        id,
        UpdateQuestion {
            position: req.position,
            prompt: req.prompt,
            options,
            required: req.required,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(success(updated))
}

/// Delete a question and its answers
///
/// # Errors
///
/// - `403 Forbidden`: Parent questionnaire belongs to someone else
/// - `404 Not Found`: Unknown question
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<DeleteQuestionResponse>>> {
    load_question_owned(&state, &auth, id).await?;

    let deleted = Question::delete(&state.db, id).await?;

    Ok(success(DeleteQuestionResponse { deleted }))
}

/// Loads a question and verifies the caller owns its questionnaire
async fn load_question_owned(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> Result<Question, ApiError> {
    let question = Question::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    load_owned(state, auth, question.questionnaire_id).await?;

    Ok(question)
}
