use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::{AttemptStatus, MockExamAnswer, MockExamAttempt};

pub async fn find_active_attempt(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    exam_id: Uuid,
) -> Result<Option<MockExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, MockExamAttempt>(
        "SELECT * FROM mock_exam_attempts
         WHERE user_id = ?1 AND exam_id = ?2 AND status = 'in_progress'",
    )
    .bind(user_id)
    .bind(exam_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_attempt(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    exam_id: Uuid,
) -> Result<MockExamAttempt, sqlx::Error> {
    let attempt = MockExamAttempt {
        id: Uuid::new_v4(),
        exam_id,
        user_id,
        status: AttemptStatus::InProgress,
        started_at: Utc::now(),
        completed_at: None,
        score: None,
    };

    sqlx::query(
        "INSERT INTO mock_exam_attempts (id, exam_id, user_id, status, started_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(attempt.id)
    .bind(attempt.exam_id)
    .bind(attempt.user_id)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .execute(executor)
    .await?;

    Ok(attempt)
}

pub async fn get_attempt(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
) -> Result<Option<MockExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, MockExamAttempt>("SELECT * FROM mock_exam_attempts WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Marks an attempt completed, but only if it is still in progress. Returns
/// the number of rows updated, so a concurrent submission that lost the race
/// sees 0 and can bail out.
pub async fn complete_attempt(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
    score: f64,
    completed_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE mock_exam_attempts
         SET status = 'completed', score = ?2, completed_at = ?3
         WHERE id = ?1 AND status = 'in_progress'",
    )
    .bind(id)
    .bind(score)
    .bind(completed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_answer(
    executor: impl SqliteExecutor<'_>,
    answer: &MockExamAnswer,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO mock_exam_answers
            (id, attempt_id, question_id, submitted_content, selected_choice_key,
             is_correct, points_awarded, feedback, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(answer.id)
    .bind(answer.attempt_id)
    .bind(answer.question_id)
    .bind(&answer.submitted_content)
    .bind(&answer.selected_choice_key)
    .bind(answer.is_correct)
    .bind(answer.points_awarded)
    .bind(&answer.feedback)
    .bind(answer.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn list_answers(
    executor: impl SqliteExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Vec<MockExamAnswer>, sqlx::Error> {
    sqlx::query_as::<_, MockExamAnswer>(
        "SELECT * FROM mock_exam_answers WHERE attempt_id = ?1",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Count and average score over a user's completed attempts.
pub async fn completed_stats(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
) -> Result<(i64, Option<f64>), sqlx::Error> {
    sqlx::query_as::<_, (i64, Option<f64>)>(
        "SELECT COUNT(*), AVG(score) FROM mock_exam_attempts
         WHERE user_id = ?1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}
