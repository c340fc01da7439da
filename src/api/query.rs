use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiResult;
use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub user_id: Uuid,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub used_chunk_ids: Vec<Uuid>,
    pub grounded: bool,
}

pub async fn answer_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let result = state
        .retrieval
        .answer_query(request.user_id, &request.query)
        .await?;

    Ok(Json(QueryResponse {
        session_id: result.session_id,
        answer: result.answer,
        used_chunk_ids: result.used_chunk_ids,
        grounded: result.grounded,
    }))
}
