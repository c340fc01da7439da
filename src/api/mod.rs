pub mod errors;
pub mod exams;
pub mod feedback;
pub mod materials;
pub mod query;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;

use crate::exam::grading::GradingEngine;
use crate::progress::flagging::FeedbackService;
use crate::progress::ledger::ProgressLedger;
use crate::rag::ingest::IngestionPipeline;
use crate::rag::retrieval::RetrievalEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub retrieval: Arc<RetrievalEngine>,
    pub grading: Arc<GradingEngine>,
    pub ingestion: Arc<IngestionPipeline>,
    pub feedback: Arc<FeedbackService>,
    pub ledger: Arc<ProgressLedger>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(query::answer_query))
        .route("/api/materials", post(materials::upload_material))
        .route("/api/materials/{material_id}", get(materials::get_material))
        .route(
            "/api/materials/{material_id}/ingest",
            post(materials::reingest_material),
        )
        .route(
            "/api/materials/{material_id}/summary",
            post(materials::summarize_material),
        )
        .route("/api/exams", post(exams::create_exam))
        .route("/api/exams/{exam_id}/attempts", post(exams::start_attempt))
        .route(
            "/api/attempts/{attempt_id}/submit",
            post(exams::submit_answers),
        )
        .route("/api/feedback", post(feedback::submit_feedback))
        .route("/api/users/{user_id}/profile", get(feedback::get_profile))
        .with_state(state)
}
