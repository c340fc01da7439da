use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::{ApiResult, AppError};
use crate::api::AppState;
use crate::database::models::StudyMaterial;
use crate::database::queries;

#[derive(Debug, Deserialize)]
pub struct UploadMaterialRequest {
    pub title: String,
    pub description: Option<String>,
    pub uploaded_by: Uuid,
    pub course_ref: Option<String>,
    /// Reference the document parser can resolve (path or object key).
    pub file_ref: String,
}

#[derive(Debug, Serialize)]
pub struct UploadMaterialResponse {
    pub material: StudyMaterial,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MaterialResponse {
    pub material: StudyMaterial,
    pub chunk_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub material_id: Uuid,
    pub summary: String,
}

/// Accepts the material and kicks off ingestion in the background;
/// responds 202 before chunks exist.
pub async fn upload_material(
    State(state): State<AppState>,
    Json(request): Json<UploadMaterialRequest>,
) -> ApiResult<(StatusCode, Json<UploadMaterialResponse>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::invalid_input("title must not be empty"));
    }
    if request.file_ref.trim().is_empty() {
        return Err(AppError::invalid_input("file_ref must not be empty"));
    }

    let material = queries::materials::create_material(
        &state.pool,
        request.title.trim(),
        request.description.as_deref(),
        request.uploaded_by,
        request.course_ref.as_deref(),
        &request.file_ref,
    )
    .await?;

    let ingestion = state.ingestion.clone();
    let spawned = material.clone();
    tokio::spawn(async move {
        if let Err(err) = ingestion.ingest_material(&spawned).await {
            tracing::error!(material_id = %spawned.id, "ingestion failed: {}", err);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadMaterialResponse {
            material,
            status: "ingesting",
        }),
    ))
}

/// Re-runs ingestion for an existing material, e.g. after its source file
/// was replaced. 202 like the initial upload.
pub async fn reingest_material(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<UploadMaterialResponse>)> {
    let material = queries::materials::get_material(&state.pool, material_id)
        .await?
        .ok_or_else(|| AppError::not_found("material"))?;

    let ingestion = state.ingestion.clone();
    let spawned = material.clone();
    tokio::spawn(async move {
        if let Err(err) = ingestion.ingest_material(&spawned).await {
            tracing::error!(material_id = %spawned.id, "ingestion failed: {}", err);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadMaterialResponse {
            material,
            status: "ingesting",
        }),
    ))
}

pub async fn summarize_material(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<Json<SummaryResponse>> {
    let summary = state.retrieval.summarize_material(material_id).await?;
    Ok(Json(SummaryResponse {
        material_id,
        summary,
    }))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<Json<MaterialResponse>> {
    let material = queries::materials::get_material(&state.pool, material_id)
        .await?
        .ok_or_else(|| AppError::not_found("material"))?;

    let chunks = queries::chunks::list_chunks_for_material(&state.pool, material_id).await?;

    Ok(Json(MaterialResponse {
        material,
        chunk_count: chunks.len() as i64,
    }))
}
