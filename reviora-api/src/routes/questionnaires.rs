/// Questionnaire management endpoints
///
/// All endpoints require JWT authentication and operate on the caller's own
/// questionnaires. Creation is limit-enforced: the owner's plan quota is
/// checked before the insert and the usage counter recorded after it.
///
/// # Endpoints
///
/// - `POST /api/v1/questionnaires` - Create questionnaire (limit-enforced)
/// - `GET /api/v1/questionnaires` - List own questionnaires
/// - `GET /api/v1/questionnaires/:id` - Get one questionnaire with questions
/// - `PUT /api/v1/questionnaires/:id` - Update title/description/deadline
/// - `DELETE /api/v1/questionnaires/:id` - Delete (cascades to responses)
/// - `POST /api/v1/questionnaires/:id/publish` - Open for responses
/// - `GET /api/v1/questionnaires/:id/export` - Full data export (limit-enforced)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{success, Envelope},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reviora_shared::{
    auth::{middleware::AuthContext, permissions::require_ownership},
    models::{
        question::Question,
        questionnaire::{CreateQuestionnaire, Questionnaire, UpdateQuestionnaire},
        response::Response,
        review::Review,
        usage::UsageKind,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

/// Create questionnaire request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionnaireRequest {
    /// Title shown to respondents
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional longer description
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Optional closing time; responses after this are rejected
    pub closes_at: Option<DateTime<Utc>>,
}

/// Update questionnaire request
///
/// Omitted fields are left unchanged; explicit nulls clear the optional
/// fields.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionnaireRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description (null clears it)
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    /// New closing time (null clears it)
    #[serde(default, deserialize_with = "double_option")]
    pub closes_at: Option<Option<DateTime<Utc>>>,
}

/// Distinguishes an absent field (no change) from an explicit null (clear)
///
/// With `#[serde(default)]` an omitted field stays None; a present field,
/// null included, lands in Some.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// List questionnaires query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
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

/// Questionnaire with its questions, as returned by the get endpoint
#[derive(Debug, Serialize)]
pub struct QuestionnaireDetail {
    /// The questionnaire
    #[serde(flatten)]
    pub questionnaire: Questionnaire,

    /// Questions in display order
    pub questions: Vec<Question>,
}

/// List response
#[derive(Debug, Serialize)]
pub struct ListQuestionnairesResponse {
    /// The caller's questionnaires, newest first
    pub questionnaires: Vec<Questionnaire>,

    /// Live count of questionnaires the caller owns
    pub total: i64,
}

/// Publish response
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Always true after a successful publish
    pub published: bool,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Whether a questionnaire was deleted
    pub deleted: bool,
}

/// One exported response with its answers
#[derive(Debug, Serialize)]
pub struct ExportedResponse {
    /// Response ID
    pub id: Uuid,

    /// Respondent email, if given
    pub respondent_email: Option<String>,

    /// When the response was submitted
    pub submitted_at: DateTime<Utc>,

    /// Answer values keyed by question ID
    pub answers: Vec<ExportedAnswer>,
}

/// One exported answer
#[derive(Debug, Serialize)]
pub struct ExportedAnswer {
    /// Question the answer belongs to
    pub question_id: Uuid,

    /// The raw answer value
    pub value: JsonValue,
}

/// Full questionnaire export
///
/// Everything an owner needs to take their data elsewhere: the
/// questionnaire, its questions, every response with answers, and the
/// published reviews.
#[derive(Debug, Serialize)]
pub struct ExportBundle {
    /// The questionnaire
    pub questionnaire: Questionnaire,

    /// Questions in display order
    pub questions: Vec<Question>,

    /// All responses with their answers
    pub responses: Vec<ExportedResponse>,

    /// Published reviews
    pub reviews: Vec<Review>,

    /// When the export was generated
    pub exported_at: DateTime<Utc>,
}

/// Create a questionnaire
///
/// The owner's plan limit is enforced before the insert: a free account
/// that already has one questionnaire gets a 402 with
/// `SUBSCRIPTION_ERROR_001`. On success the `questionnaires` usage counter
/// is incremented.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/questionnaires
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "title": "Customer satisfaction Q3",
///   "description": "Post-purchase survey",
///   "closes_at": "2026-09-30T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Missing or invalid JWT token
/// - `402 Payment Required`: Plan limit reached
/// - `403 Forbidden`: Subscription not active
/// - `500 Internal Server Error`: Server error
pub async fn create_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateQuestionnaireRequest>,
) -> ApiResult<Json<Envelope<Questionnaire>>> {
    req.validate()?;

    state
        .limits
        .enforce(auth.user_id, UsageKind::Questionnaires, 1)
        .await?;

    let questionnaire = Questionnaire::create(
        &state.db,
        CreateQuestionnaire {
            owner_id: auth.user_id,
            title: req.title,
            description: req.description,
            closes_at: req.closes_at,
        },
    )
    .await?;

    state
        .limits
        .record(auth.user_id, UsageKind::Questionnaires, 1)
        .await?;

    tracing::info!(
        questionnaire_id = %questionnaire.id,
        owner_id = %auth.user_id,
        "questionnaire created"
    );

    Ok(success(questionnaire))
}

/// List the caller's questionnaires, newest first
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/questionnaires?limit=50&offset=0
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_questionnaires(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<ListQuestionnairesResponse>>> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let questionnaires =
        Questionnaire::list_by_owner(&state.db, auth.user_id, limit, offset).await?;
    let total = Questionnaire::count_by_owner(&state.db, auth.user_id).await?;

    Ok(success(ListQuestionnairesResponse {
        questionnaires,
        total,
    }))
}

/// Get one questionnaire with its questions
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn get_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<QuestionnaireDetail>>> {
    let questionnaire = load_owned(&state, &auth, id).await?;
    let questions = Question::list_by_questionnaire(&state.db, questionnaire.id).await?;

    Ok(success(QuestionnaireDetail {
        questionnaire,
        questions,
    }))
}

/// Update a questionnaire's title, description, or closing time
///
/// Partial update: omitted fields are untouched, explicit nulls clear the
/// description and closing time.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn update_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuestionnaireRequest>,
) -> ApiResult<Json<Envelope<Questionnaire>>> {
    req.validate()?;

    load_owned(&state, &auth, id).await?;

    let updated = Questionnaire::update(
        &state.db,
        id,
        UpdateQuestionnaire {
            title: req.title,
            description: req.description,
            closes_at: req.closes_at,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    Ok(success(updated))
}

/// Delete a questionnaire and everything under it
///
/// Questions, responses, answers, and reviews go with it via cascade.
/// Usage counters are NOT decremented: they count lifetime creations
/// within the billing period.
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn delete_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<DeleteResponse>>> {
    load_owned(&state, &auth, id).await?;

    let deleted = Questionnaire::delete(&state.db, id).await?;

    tracing::info!(questionnaire_id = %id, owner_id = %auth.user_id, "questionnaire deleted");

    Ok(success(DeleteResponse { deleted }))
}

/// Publish a questionnaire, opening it for responses
///
/// Publishing is one-way; there is no unpublish. Owners close a
/// questionnaire by setting `closes_at`.
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn publish_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<PublishResponse>>> {
    load_owned(&state, &auth, id).await?;

    let published = Questionnaire::publish(&state.db, id).await?;
    if !published {
        return Err(ApiError::NotFound("Questionnaire not found".to_string()));
    }

    tracing::info!(questionnaire_id = %id, "questionnaire published");

    Ok(success(PublishResponse { published }))
}

/// Export a questionnaire's full data as JSON
///
/// Exports are a limited resource: the owner's plan quota is enforced
/// before the data is assembled and the `exports` counter recorded after.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/questionnaires/:id/export
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `402 Payment Required`: Export limit reached (`SUBSCRIPTION_ERROR_003`)
/// - `403 Forbidden`: Not the owner, or subscription not active
/// - `404 Not Found`: Unknown questionnaire
pub async fn export_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ExportBundle>>> {
    let questionnaire = load_owned(&state, &auth, id).await?;

    state
        .limits
        .enforce(auth.user_id, UsageKind::Exports, 1)
        .await?;

    let questions = Question::list_by_questionnaire(&state.db, id).await?;

    // Exports are unpaginated on purpose; the response quota bounds the size
    let total = Response::count_by_questionnaire(&state.db, id).await?;
    let raw_responses = Response::list_by_questionnaire(&state.db, id, total.max(1), 0).await?;

    let mut responses = Vec::with_capacity(raw_responses.len());
    for response in raw_responses {
        let answers = response
            .answers(&state.db)
            .await?
            .into_iter()
            .map(|a| ExportedAnswer {
                question_id: a.question_id,
                value: a.value,
            })
            .collect();

        responses.push(ExportedResponse {
            id: response.id,
            respondent_email: response.respondent_email,
            submitted_at: response.submitted_at,
            answers,
        });
    }

    let reviews = Review::list_by_questionnaire(&state.db, id, true, i64::MAX, 0).await?;

    state
        .limits
        .record(auth.user_id, UsageKind::Exports, 1)
        .await?;

    tracing::info!(
        questionnaire_id = %id,
        owner_id = %auth.user_id,
        responses = responses.len(),
        "questionnaire exported"
    );

    Ok(success(ExportBundle {
        questionnaire,
        questions,
        responses,
        reviews,
        exported_at: Utc::now(),
    }))
}

/// Loads a questionnaire and verifies the caller owns it
///
/// Shared by every owner-scoped handler in this module and by the
/// question/response/analytics routes.
pub(crate) async fn load_owned(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> Result<Questionnaire, ApiError> {
    let questionnaire = Questionnaire::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    require_ownership(auth, questionnaire.owner_id)?;

    Ok(questionnaire)
}
