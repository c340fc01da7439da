use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::{MockExam, MockExamQuestion, QuestionType};

pub async fn create_exam(
    executor: impl SqliteExecutor<'_>,
    title: &str,
    description: Option<&str>,
    duration_minutes: i64,
) -> Result<MockExam, sqlx::Error> {
    let exam = MockExam {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.map(str::to_string),
        duration_minutes,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO mock_exams (id, title, description, duration_minutes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(exam.id)
    .bind(&exam.title)
    .bind(&exam.description)
    .bind(exam.duration_minutes)
    .bind(exam.created_at)
    .execute(executor)
    .await?;

    Ok(exam)
}

pub async fn get_exam(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
) -> Result<Option<MockExam>, sqlx::Error> {
    sqlx::query_as::<_, MockExam>("SELECT * FROM mock_exams WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn add_question(
    executor: impl SqliteExecutor<'_>,
    exam_id: Uuid,
    position: i64,
    question_text: &str,
    question_type: QuestionType,
    options: Option<&str>,
    correct_key: Option<&str>,
    points: f64,
    source_chunk_id: Option<Uuid>,
) -> Result<MockExamQuestion, sqlx::Error> {
    let question = MockExamQuestion {
        id: Uuid::new_v4(),
        exam_id,
        position,
        question_text: question_text.to_string(),
        question_type,
        options: options.map(str::to_string),
        correct_key: correct_key.map(str::to_string),
        points,
        source_chunk_id,
    };

    sqlx::query(
        "INSERT INTO mock_exam_questions
            (id, exam_id, position, question_text, question_type, options, correct_key,
             points, source_chunk_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(question.id)
    .bind(question.exam_id)
    .bind(question.position)
    .bind(&question.question_text)
    .bind(question.question_type)
    .bind(&question.options)
    .bind(&question.correct_key)
    .bind(question.points)
    .bind(question.source_chunk_id)
    .execute(executor)
    .await?;

    Ok(question)
}

pub async fn list_questions(
    executor: impl SqliteExecutor<'_>,
    exam_id: Uuid,
) -> Result<Vec<MockExamQuestion>, sqlx::Error> {
    sqlx::query_as::<_, MockExamQuestion>(
        "SELECT * FROM mock_exam_questions WHERE exam_id = ?1 ORDER BY position",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}
