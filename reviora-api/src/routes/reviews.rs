/// Review endpoints
///
/// Reviews are star ratings with an optional comment, attached to a
/// questionnaire and optionally linked to the response they came from.
/// Anyone can submit one against a published questionnaire; they start
/// unpublished and only appear publicly after the owner publishes them.
///
/// # Endpoints
///
/// - `POST /api/v1/reviews` - Public review submission
/// - `GET /api/v1/reviews?questionnaire_id=...` - Public published listing
/// - `PUT /api/v1/reviews/:id/publish` - Owner moderation toggle

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{success, Envelope},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use reviora_shared::{
    auth::{middleware::AuthContext, permissions::require_ownership},
    models::{
        questionnaire::Questionnaire,
        response::Response,
        review::{CreateReview, Review},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create review request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    /// Questionnaire being reviewed
    pub questionnaire_id: Uuid,

    /// Response this review came from, if any
    pub response_id: Option<Uuid>,

    /// Star rating
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    /// Optional free-form comment
    #[validate(length(max = 5000, message = "Comment must be at most 5000 characters"))]
    pub comment: Option<String>,
}

/// List reviews query parameters
#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    /// Questionnaire whose reviews to list
    pub questionnaire_id: Uuid,

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

/// List reviews result
#[derive(Debug, Serialize)]
pub struct ListReviewsResult {
    /// Published reviews, newest first
    pub reviews: Vec<Review>,

    /// Average published rating (None with no published reviews)
    pub average_rating: Option<f64>,
}

/// Publish toggle request
#[derive(Debug, Deserialize)]
pub struct PublishReviewRequest {
    /// Desired published state (defaults to publishing)
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// Publish toggle response
#[derive(Debug, Serialize)]
pub struct PublishReviewResponse {
    /// The review's published state after the update
    pub published: bool,
}

/// Submit a review (public)
///
/// The questionnaire must exist and be published; drafts are invisible to
/// the public so both failures return 404. A linked response, when given,
/// must belong to the same questionnaire.
///
/// Reviews start unpublished and wait for owner moderation.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/reviews
/// Content-Type: application/json
///
/// {
///   "questionnaire_id": "...",
///   "rating": 5,
///   "comment": "Great service"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Rating out of range, or response from another
///   questionnaire
/// - `404 Not Found`: Unknown or unpublished questionnaire
pub async fn create_review(
    State(state): State<AppState>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<Json<Envelope<Review>>> {
    req.validate()?;

    let questionnaire = Questionnaire::find_by_id(&state.db, req.questionnaire_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    if !questionnaire.published {
        return Err(ApiError::NotFound("Questionnaire not found".to_string()));
    }

    if let Some(response_id) = req.response_id {
        let response = Response::find_by_id(&state.db, response_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Response not found".to_string()))?;

        if response.questionnaire_id != req.questionnaire_id {
            return Err(ApiError::BadRequest(
                "Response belongs to a different questionnaire".to_string(),
            ));
        }
    }

    let review = Review::create(
        &state.db,
        CreateReview {
            questionnaire_id: req.questionnaire_id,
            response_id: req.response_id,
            rating: req.rating,
            comment: req.comment,
        },
    )
    .await?;

    tracing::info!(
        review_id = %review.id,
        questionnaire_id = %review.questionnaire_id,
        rating = review.rating,
        "review submitted"
    );

    Ok(success(review))
}

/// List published reviews for a questionnaire (public)
///
/// Only published reviews are visible here; owners see everything through
/// their own endpoints. Includes the average published rating.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/reviews?questionnaire_id=...&limit=50&offset=0
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Unknown or unpublished questionnaire
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ListReviewsQuery>,
) -> ApiResult<Json<Envelope<ListReviewsResult>>> {
    let questionnaire = Questionnaire::find_by_id(&state.db, query.questionnaire_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    if !questionnaire.published {
        return Err(ApiError::NotFound("Questionnaire not found".to_string()));
    }

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let reviews =
        Review::list_by_questionnaire(&state.db, query.questionnaire_id, true, limit, offset)
            .await?;
    let average_rating = Review::average_rating(&state.db, query.questionnaire_id).await?;

    Ok(success(ListReviewsResult {
        reviews,
        average_rating,
    }))
}

/// Publish or unpublish a review (owner only)
///
/// # Endpoint
///
/// ```text
/// PUT /api/v1/reviews/:id/publish
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "published": true }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The questionnaire belongs to someone else
/// - `404 Not Found`: Unknown review
pub async fn publish_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishReviewRequest>,
) -> ApiResult<Json<Envelope<PublishReviewResponse>>> {
    let review = Review::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

    let questionnaire = Questionnaire::find_by_id(&state.db, review.questionnaire_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not found".to_string()))?;

    require_ownership(&auth, questionnaire.owner_id)?;

    let updated = Review::set_published(&state.db, id, req.published).await?;
    if !updated {
        return Err(ApiError::NotFound("Review not found".to_string()));
    }

    tracing::info!(review_id = %id, published = req.published, "review moderation updated");

    Ok(success(PublishReviewResponse {
        published: req.published,
    }))
}
