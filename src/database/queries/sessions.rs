use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::RetrievalSession;

pub async fn insert_session(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    query_text: &str,
    answer: &str,
    chunk_ids: &[Uuid],
    grounded: bool,
) -> Result<RetrievalSession, sqlx::Error> {
    let session = RetrievalSession {
        id: Uuid::new_v4(),
        user_id,
        query_text: query_text.to_string(),
        answer: answer.to_string(),
        chunk_ids: serde_json::to_string(chunk_ids).unwrap_or_else(|_| "[]".to_string()),
        grounded,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO retrieval_sessions (id, user_id, query_text, answer, chunk_ids, grounded, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(&session.query_text)
    .bind(&session.answer)
    .bind(&session.chunk_ids)
    .bind(session.grounded)
    .bind(session.created_at)
    .execute(executor)
    .await?;

    Ok(session)
}

pub async fn get_session(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
) -> Result<Option<RetrievalSession>, sqlx::Error> {
    sqlx::query_as::<_, RetrievalSession>("SELECT * FROM retrieval_sessions WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}
