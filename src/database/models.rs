use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudyMaterial {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub uploaded_by: Uuid,
    pub course_ref: Option<String>,
    pub file_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub study_material_id: Uuid,
    /// Order of the chunk within its material; dense and unique per
    /// material, starting at 0.
    pub seq: i64,
    pub content: String,
    /// Byte length of the prefix of `content` repeated from the previous
    /// chunk; slicing it off from every chunk after the first reconstructs
    /// the original text.
    pub overlap_len: i64,
    /// Id of the chunk in the vector index.
    pub vector_id: String,
    /// JSON-encoded embedding vector, kept alongside the content so the
    /// in-process index can be rebuilt after a restart.
    pub embedding: String,
    pub embedding_provider: String,
    pub review_flags_count: i64,
    pub created_at: DateTime<Utc>,
}

impl DocumentChunk {
    pub fn embedding_vector(&self) -> Result<Vec<f32>, serde_json::Error> {
        serde_json::from_str(&self.embedding)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RetrievalSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query_text: String,
    pub answer: String,
    /// JSON array of chunk ids, most similar first.
    pub chunk_ids: String,
    pub grounded: bool,
    pub created_at: DateTime<Utc>,
}

impl RetrievalSession {
    pub fn chunk_id_list(&self) -> Vec<Uuid> {
        serde_json::from_str(&self.chunk_ids).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockExam {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockExamQuestion {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub position: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    /// JSON object of option key -> option text, for multiple choice.
    pub options: Option<String>,
    /// Canonical correct option key, for multiple choice.
    pub correct_key: Option<String>,
    pub points: f64,
    /// Chunk the question was derived from; used to ground AI grading.
    pub source_chunk_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockExamAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exam_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Sum of points awarded across the attempt's answers; set on
    /// completion.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockExamAnswer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub submitted_content: Option<String>,
    pub selected_choice_key: Option<String>,
    pub is_correct: Option<bool>,
    pub points_awarded: f64,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate view; mutated exclusively by the progress ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub mock_exams_completed: i64,
    pub average_mock_exam_score: Option<f64>,
    pub study_materials_uploaded_count: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_kind: String,
    pub source_entity_id: Uuid,
    pub points_awarded: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiFeedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub rating: i64,
    pub comment: Option<String>,
    pub ai_low_confidence: bool,
    pub created_at: DateTime<Utc>,
}
