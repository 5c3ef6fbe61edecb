/// Analytics endpoints
///
/// Aggregations are computed in SQL at request time; nothing is
/// precomputed or stored. Both endpoints are owner-only.
///
/// # Endpoints
///
/// - `GET /api/v1/analytics/questionnaires/:id/summary` - Response volume
/// - `GET /api/v1/analytics/questionnaires/:id/breakdown` - Per-question
///   answer distribution

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{questionnaires::load_owned, success, Envelope},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;
use reviora_shared::{
    auth::middleware::AuthContext,
    models::{question::Question, response::Response, review::Review},
};
use serde::Serialize;
use uuid::Uuid;

/// Daily response count
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    /// The day (UTC)
    pub day: NaiveDate,

    /// Responses submitted that day
    pub count: i64,
}

/// Questionnaire summary
#[derive(Debug, Serialize)]
pub struct SummaryResult {
    /// Questionnaire ID
    pub questionnaire_id: Uuid,

    /// Total responses
    pub total_responses: i64,

    /// Responses per day, oldest first (days without responses are absent)
    pub daily: Vec<DailyCount>,

    /// Average published review rating
    pub average_rating: Option<f64>,
}

/// One answer value and how often it was picked
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OptionCount {
    /// The answer value as text
    pub option: String,

    /// How many answers carried this value
    pub count: i64,
}

/// Answer distribution for one question
#[derive(Debug, Serialize)]
pub struct QuestionBreakdown {
    /// Question ID
    pub question_id: Uuid,

    /// Question text
    pub prompt: String,

    /// Question kind
    pub kind: String,

    /// Total answers recorded
    pub total_answers: i64,

    /// Value distribution, most common first
    ///
    /// Empty for text questions; free-form values have no meaningful
    /// distribution.
    pub distribution: Vec<OptionCount>,

    /// Mean value for rating questions, None for other kinds
    pub average: Option<f64>,
}

/// Breakdown result
#[derive(Debug, Serialize)]
pub struct BreakdownResult {
    /// Questionnaire ID
    pub questionnaire_id: Uuid,

    /// One entry per question, in display order
    pub questions: Vec<QuestionBreakdown>,
}

/// Response volume summary for a questionnaire (owner only)
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/analytics/questionnaires/:id/summary
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn questionnaire_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<SummaryResult>>> {
    load_owned(&state, &auth, id).await?;

    let total_responses = Response::count_by_questionnaire(&state.db, id).await?;

    let daily = sqlx::query_as::<_, DailyCount>(
        r#"
        SELECT (submitted_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count
        FROM responses
        WHERE questionnaire_id = $1
        GROUP BY day
        ORDER BY day ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let average_rating = Review::average_rating(&state.db, id).await?;

    Ok(success(SummaryResult {
        questionnaire_id: id,
        total_responses,
        daily,
        average_rating,
    }))
}

/// Per-question answer distribution for a questionnaire (owner only)
///
/// Scalar answers (rating, single choice) group directly on the value;
/// multi-choice answers are unnested so each selected option counts once.
/// Text answers only report a count.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/analytics/questionnaires/:id/breakdown
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Questionnaire belongs to someone else
/// - `404 Not Found`: Unknown questionnaire
pub async fn questionnaire_breakdown(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<BreakdownResult>>> {
    load_owned(&state, &auth, id).await?;

    let questions = Question::list_by_questionnaire(&state.db, id).await?;

    let mut breakdowns = Vec::with_capacity(questions.len());
    for question in questions {
        breakdowns.push(breakdown_for(&state, question).await?);
    }

    Ok(success(BreakdownResult {
        questionnaire_id: id,
        questions: breakdowns,
    }))
}

async fn breakdown_for(
    state: &AppState,
    question: Question,
) -> Result<QuestionBreakdown, crate::error::ApiError> {
    let (total_answers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM answers WHERE question_id = $1")
            .bind(question.id)
            .fetch_one(&state.db)
            .await?;

    let distribution = match question.kind.as_str() {
        // Scalar JSONB values: extract as text and group
        "rating" | "single_choice" => {
            sqlx::query_as::<_, OptionCount>(
                r#"
                SELECT (value #>> '{}') AS option, COUNT(*) AS count
                FROM answers
                WHERE question_id = $1
                GROUP BY option
                ORDER BY count DESC, option ASC
                "#,
            )
            .bind(question.id)
            .fetch_all(&state.db)
            .await?
        }
        // Array values: one row per selected option
        "multi_choice" => {
            sqlx::query_as::<_, OptionCount>(
                r#"
                SELECT elem AS option, COUNT(*) AS count
                FROM answers
                CROSS JOIN LATERAL jsonb_array_elements_text(value) AS elem
                WHERE question_id = $1
                GROUP BY elem
                ORDER BY count DESC, elem ASC
                "#,
            )
            .bind(question.id)
            .fetch_all(&state.db)
            .await?
        }
        _ => Vec::new(),
    };

    let average = if question.kind == "rating" {
        let (avg,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT AVG((value #>> '{}')::NUMERIC)::DOUBLE PRECISION
            FROM answers
            WHERE question_id = $1
            "#,
        )
        .bind(question.id)
        .fetch_one(&state.db)
        .await?;
        avg
    } else {
        None
    };

    Ok(QuestionBreakdown {
        question_id: question.id,
        prompt: question.prompt,
        kind: question.kind,
        total_answers,
        distribution,
        average,
    })
}
