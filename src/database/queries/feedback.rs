use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::AiFeedback;

pub async fn insert_feedback(
    executor: impl SqliteExecutor<'_>,
    session_id: Uuid,
    user_id: Uuid,
    rating: i64,
    comment: Option<&str>,
    ai_low_confidence: bool,
) -> Result<AiFeedback, sqlx::Error> {
    let feedback = AiFeedback {
        id: Uuid::new_v4(),
        session_id,
        user_id,
        rating,
        comment: comment.map(str::to_string),
        ai_low_confidence,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO ai_feedback (id, session_id, user_id, rating, comment, ai_low_confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(feedback.id)
    .bind(feedback.session_id)
    .bind(feedback.user_id)
    .bind(feedback.rating)
    .bind(&feedback.comment)
    .bind(feedback.ai_low_confidence)
    .bind(feedback.created_at)
    .execute(executor)
    .await?;

    Ok(feedback)
}

pub async fn insert_feedback_chunks(
    executor: impl SqliteExecutor<'_>,
    feedback_id: Uuid,
    chunk_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    if chunk_ids.is_empty() {
        return Ok(());
    }

    let mut builder = sqlx::QueryBuilder::new(
        "INSERT INTO ai_feedback_chunks (feedback_id, chunk_id) ",
    );
    builder.push_values(chunk_ids, |mut row, chunk_id| {
        row.push_bind(feedback_id).push_bind(chunk_id);
    });
    builder.build().execute(executor).await?;

    Ok(())
}
