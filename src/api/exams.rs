use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::{ApiResult, AppError};
use crate::api::AppState;
use crate::database::models::{MockExam, MockExamAnswer, MockExamAttempt, QuestionType};
use crate::database::queries;
use crate::error::CoreError;
use crate::exam::grading::SubmittedAnswer;

#[derive(Debug, Deserialize)]
pub struct CreateExamRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_duration() -> i64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub question_text: String,
    pub question_type: QuestionType,
    /// Option key -> option text, required for multiple choice.
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
    pub correct_key: Option<String>,
    #[serde(default = "default_points")]
    pub points: f64,
    pub source_chunk_id: Option<Uuid>,
}

fn default_points() -> f64 {
    1.0
}

#[derive(Debug, Serialize)]
pub struct CreateExamResponse {
    pub exam: MockExam,
    pub question_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<SubmittedAnswerRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedAnswerRequest {
    pub question_id: Uuid,
    pub content: Option<String>,
    pub selected_choice_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptResultResponse {
    pub attempt: MockExamAttempt,
    pub points_earned: f64,
    pub points_possible: f64,
    pub percent_score: f64,
    pub answers: Vec<MockExamAnswer>,
}

pub async fn create_exam(
    State(state): State<AppState>,
    Json(request): Json<CreateExamRequest>,
) -> ApiResult<(StatusCode, Json<CreateExamResponse>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::invalid_input("title must not be empty"));
    }
    if request.questions.is_empty() {
        return Err(AppError::invalid_input("an exam needs at least one question"));
    }
    if request.duration_minutes <= 0 {
        return Err(AppError::invalid_input("duration must be positive"));
    }
    for question in &request.questions {
        validate_question(question)?;
    }

    let mut tx = state.pool.begin().await.map_err(CoreError::Database)?;
    let exam = queries::exams::create_exam(
        &mut *tx,
        request.title.trim(),
        request.description.as_deref(),
        request.duration_minutes,
    )
    .await?;

    for (position, question) in request.questions.iter().enumerate() {
        let options = question
            .options
            .as_ref()
            .map(|o| serde_json::Value::Object(o.clone()).to_string());
        queries::exams::add_question(
            &mut *tx,
            exam.id,
            position as i64,
            question.question_text.trim(),
            question.question_type,
            options.as_deref(),
            question.correct_key.as_deref(),
            question.points,
            question.source_chunk_id,
        )
        .await?;
    }
    tx.commit().await.map_err(CoreError::Database)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateExamResponse {
            exam,
            question_count: request.questions.len(),
        }),
    ))
}

fn validate_question(question: &CreateQuestionRequest) -> Result<(), AppError> {
    if question.question_text.trim().is_empty() {
        return Err(AppError::invalid_input("question text must not be empty"));
    }
    if question.points <= 0.0 {
        return Err(AppError::invalid_input("question points must be positive"));
    }
    if question.question_type == QuestionType::MultipleChoice {
        let options = question
            .options
            .as_ref()
            .ok_or_else(|| AppError::invalid_input("multiple choice questions need options"))?;
        let correct = question
            .correct_key
            .as_deref()
            .ok_or_else(|| AppError::invalid_input("multiple choice questions need a correct_key"))?;
        if !options.contains_key(correct) {
            return Err(AppError::invalid_input(
                "correct_key must be one of the option keys",
            ));
        }
    }
    Ok(())
}

pub async fn start_attempt(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
    Json(request): Json<StartAttemptRequest>,
) -> ApiResult<(StatusCode, Json<MockExamAttempt>)> {
    let attempt = state.grading.start_attempt(request.user_id, exam_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

pub async fn submit_answers(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(request): Json<SubmitAnswersRequest>,
) -> ApiResult<Json<AttemptResultResponse>> {
    let answers: Vec<SubmittedAnswer> = request
        .answers
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_id: a.question_id,
            content: a.content,
            selected_choice_key: a.selected_choice_key,
        })
        .collect();

    let result = state.grading.submit_answers(attempt_id, answers).await?;

    Ok(Json(AttemptResultResponse {
        attempt: result.attempt,
        points_earned: result.points_earned,
        points_possible: result.points_possible,
        percent_score: result.percent_score,
        answers: result.answers,
    }))
}
