use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::{ApiResult, AppError};
use crate::api::AppState;
use crate::database::models::UserProfile;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub rating: i64,
    pub comment: Option<String>,
    #[serde(default)]
    pub ai_low_confidence: bool,
    /// Optional subset of the session's context chunks the rating refers
    /// to; defaults to all of them.
    pub context_chunk_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback_id: Uuid,
    pub flagged_chunks: u64,
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let outcome = state
        .feedback
        .submit_feedback(
            request.user_id,
            request.session_id,
            request.rating,
            request.comment.as_deref(),
            request.ai_low_confidence,
            request.context_chunk_ids.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            feedback_id: outcome.feedback.id,
            flagged_chunks: outcome.flagged_chunks,
        }),
    ))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state
        .ledger
        .profile(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))?;
    Ok(Json(profile))
}
