use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::StudyMaterial;

pub async fn create_material(
    executor: impl SqliteExecutor<'_>,
    title: &str,
    description: Option<&str>,
    uploaded_by: Uuid,
    course_ref: Option<&str>,
    file_ref: &str,
) -> Result<StudyMaterial, sqlx::Error> {
    let material = StudyMaterial {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.map(str::to_string),
        uploaded_by,
        course_ref: course_ref.map(str::to_string),
        file_ref: file_ref.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO study_materials (id, title, description, uploaded_by, course_ref, file_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(material.id)
    .bind(&material.title)
    .bind(&material.description)
    .bind(material.uploaded_by)
    .bind(&material.course_ref)
    .bind(&material.file_ref)
    .bind(material.created_at)
    .execute(executor)
    .await?;

    Ok(material)
}

pub async fn get_material(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
) -> Result<Option<StudyMaterial>, sqlx::Error> {
    sqlx::query_as::<_, StudyMaterial>("SELECT * FROM study_materials WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}
