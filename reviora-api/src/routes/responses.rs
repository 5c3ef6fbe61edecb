/// Response endpoints
///
/// Submission is the one write endpoint respondents reach without an
/// account: it is public, validated against the questionnaire's state, and
/// limit-enforced against the OWNER's plan — a free-plan questionnaire stops
/// accepting responses once its owner's monthly quota is spent.
///
/// # Endpoints
///
/// - `POST /api/v1/questionnaires/:id/responses` - Public submit
/// - `GET /api/v1/questionnaires/:id/responses` - Owner's response list

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{questionnaires::load_owned, success, Envelope},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reviora_shared::{
    auth::middleware::AuthContext,
    models::{
        question::Question,
        questionnaire::Questionnaire,
        response::{NewAnswer, Response},
        usage::UsageKind,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

/// Submit response request
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    /// Optional respondent email (anonymous submissions omit it)
    #[validate(email(message = "Invalid email format"))]
    pub respondent_email: Option<String>,

    /// Answers, one per answered question
    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<SubmittedAnswer>,
}

/// One submitted answer
#[derive(Debug, Deserialize, Serialize)]
pub struct SubmittedAnswer {
    /// The question being answered
    pub question_id: Uuid,

    /// Answer value: number for rating, string for single_choice/text,
    /// array of strings for multi_choice
    pub value: JsonValue,
}

/// Submit response result
#[derive(Debug, Serialize)]
pub struct SubmitResponseResult {
    /// ID of the stored response
    pub response_id: Uuid,

    /// When it was recorded
    pub submitted_at: DateTime<Utc>,
}

/// List responses query parameters
#[derive(Debug, Deserialize)]
pub struct ListResponsesQuery {
    /// Page size (max 100)
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Offset into the result set
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// One response with its answers, as the owner sees it
#[derive(Debug, Serialize)]
pub struct ResponseDetail {
    /// Response ID
    pub id: Uuid,

    /// Respondent email, if given
    pub respondent_email: Option<String>,

    /// When the response was submitted
    pub submitted_at: DateTime<Utc>,

    /// Answer values keyed by question ID
    pub answers: Vec<AnswerDetail>,
}

/// One answer within a response
#[derive(Debug, Serialize)]
pub struct AnswerDetail {
    /// Question the answer belongs to
    pub question_id: Uuid,

    /// The raw answer value
    pub value: JsonValue,
}

/// List responses result
#[derive(Debug, Serialize)]
pub struct ListResponsesResult {
    /// Responses, newest first
    pub responses: Vec<ResponseDetail>,

    /// Total response count for the questionnaire
    pub total: i64,
}

/// Submit a response to a published questionnaire (public)
///
/// # Validation order
///
/// 1. Questionnaire exists and is published — drafts are invisible, so both
///    cases return 404
/// 2. Questionnaire has not closed (`closes_at` in the past → 400)
/// 3. Every answer maps to a question of this questionnaire
/// 4. Every required question has an answer
/// 5. The owner's `responses` quota has room (402 on exhaustion, charged to
///    the owner, not the respondent)
///
/// The response row and its answers are inserted in one transaction, then
/// the owner's usage counter is incremented.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/questionnaires/:id/responses
/// Content-Type: application/json
///
/// {
///   "respondent_email": "buyer@example.com",
///   "answers": [
///     { "question_id": "...", "value": 4 },
///     { "question_id": "...", "value": ["fast", "reliable"] }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Closed questionnaire, unknown question, or missing
///   required answer
/// - `402 Payment Required`: Owner's response limit reached
///   (`SUBSCRIPTION_ERROR_002`)
/// - `403 Forbidden`: Owner's subscription not active
/// - `404 Not Found`: Unknown or unpublished questionnaire
pub async fn submit_response(
    State(state): State<AppState>,
    Path(questionnaire_id): Path<Uuid>,
    Json(req): Json<SubmitResponseRequest>,
) -> ApiResult<Json<Envelope<SubmitResponseResult>>> {
    req.validate()?;

    let questionnaire = Questionnaire::find_by_id(&state.db, questionnaire_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    // Drafts look like missing questionnaires from the outside
    if !questionnaire.published {
        return Err(ApiError::NotFound("Questionnaire not found".to_string()));
    }

    if !questionnaire.is_open(Utc::now()) {
        return Err(ApiError::BadRequestCode {
            code: "QUESTIONNAIRE_CLOSED",
            message: "This questionnaire is no longer accepting responses".to_string(),
        });
    }

    let questions = Question::list_by_questionnaire(&state.db, questionnaire_id).await?;
    validate_answers(&questions, &req.answers)?;

    state
        .limits
        .enforce(questionnaire.owner_id, UsageKind::Responses, 1)
        .await?;

    let answers = req
        .answers
        .into_iter()
        .map(|a| NewAnswer {
            question_id: a.question_id,
            value: a.value,
        })
        .collect();

    let response = Response::create_with_answers(
        &state.db,
        questionnaire_id,
        req.respondent_email,
        answers,
    )
    .await?;

    state
        .limits
        .record(questionnaire.owner_id, UsageKind::Responses, 1)
        .await?;

    tracing::info!(
        questionnaire_id = %questionnaire_id,
        response_id = %response.id,
        "response submitted"
    );

    Ok(success(SubmitResponseResult {
        response_id: response.id,
        submitted_at: response.submitted_at,
    }))
}

/// List a questionnaire's responses with answers (owner only)
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/questionnaires/:id/responses?limit=50&offset=0
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn list_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(questionnaire_id): Path<Uuid>,
    Query(query): Query<ListResponsesQuery>,
) -> ApiResult<Json<Envelope<ListResponsesResult>>> {
    load_owned(&state, &auth, questionnaire_id).await?;

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let raw = Response::list_by_questionnaire(&state.db, questionnaire_id, limit, offset).await?;
    let total = Response::count_by_questionnaire(&state.db, questionnaire_id).await?;

    let mut responses = Vec::with_capacity(raw.len());
    for response in raw {
        let answers = response
            .answers(&state.db)
            .await?
            .into_iter()
            .map(|a| AnswerDetail {
                question_id: a.question_id,
                value: a.value,
            })
            .collect();

        responses.push(ResponseDetail {
            id: response.id,
            respondent_email: response.respondent_email,
            submitted_at: response.submitted_at,
            answers,
        });
    }

    Ok(success(ListResponsesResult { responses, total }))
}

/// Checks submitted answers against the questionnaire's questions
///
/// Every answer must reference a question of this questionnaire, no question
/// may be answered twice, and every required question must be answered.
fn validate_answers(questions: &[Question], answers: &[SubmittedAnswer]) -> Result<(), ApiError> {
    let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();

    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for answer in answers {
        if !known.contains(&answer.question_id) {
            errors.push(ValidationErrorDetail {
                field: "answers".to_string(),
                message: format!("Unknown question: {}", answer.question_id),
            });
        } else if !seen.insert(answer.question_id) {
            errors.push(ValidationErrorDetail {
                field: "answers".to_string(),
                message: format!("Duplicate answer for question: {}", answer.question_id),
            });
        }
    }

    for question in questions.iter().filter(|q| q.required) {
        if !seen.contains(&question.id) {
            errors.push(ValidationErrorDetail {
                field: "answers".to_string(),
                message: format!("Required question not answered: {}", question.prompt),
            });
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(id: Uuid, required: bool) -> Question {
        let now = Utc::now();
        Question {
            id,
            questionnaire_id: Uuid::new_v4(),
            position: 0,
            prompt: "How satisfied are you?".to_string(),
            kind: "rating".to_string(),
            options: json!([]),
            required,
            created_at: now,
            updated_at: now,
        }
    }

    fn answer(question_id: Uuid) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            value: json!(4),
        }
    }

    #[test]
    fn test_validate_answers_accepts_complete_submission() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![question(q1, true), question(q2, false)];

        assert!(validate_answers(&questions, &[answer(q1)]).is_ok());
        assert!(validate_answers(&questions, &[answer(q1), answer(q2)]).is_ok());
    }

    #[test]
    fn test_validate_answers_rejects_unknown_question() {
        let q1 = Uuid::new_v4();
        let questions = vec![question(q1, false)];

        let err = validate_answers(&questions, &[answer(Uuid::new_v4())]).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_validate_answers_rejects_missing_required() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![question(q1, true), question(q2, false)];

        // Answering only the optional question leaves the required one open
        let err = validate_answers(&questions, &[answer(q2)]).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_validate_answers_rejects_duplicates() {
        let q1 = Uuid::new_v4();
        let questions = vec![question(q1, false)];

        let err = validate_answers(&questions, &[answer(q1), answer(q1)]).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}
