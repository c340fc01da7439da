// Feedback intake and chunk flagging. A poor rating (<= 2) or a
// low-confidence answer flags every chunk that backed the rated session for
// human review.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::AiFeedback;
use crate::database::queries;
use crate::error::{CoreError, CoreResult};

const POOR_RATING_THRESHOLD: i64 = 2;

pub struct FeedbackService {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    pub feedback: AiFeedback,
    /// Number of chunks whose review counter was raised.
    pub flagged_chunks: u64,
}

impl FeedbackService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a rating against a retrieval session. `context_chunk_ids`
    /// narrows the feedback to a subset of the session's recorded chunks;
    /// ids the session never used are rejected rather than trusted, since
    /// the session row is the authority on what backed the answer.
    pub async fn submit_feedback(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        rating: i64,
        comment: Option<&str>,
        ai_low_confidence: bool,
        context_chunk_ids: Option<&[Uuid]>,
    ) -> CoreResult<FeedbackOutcome> {
        if !(1..=5).contains(&rating) {
            return Err(CoreError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let session = queries::sessions::get_session(&self.pool, session_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("retrieval session {}", session_id)))?;

        let session_chunks = session.chunk_id_list();
        let selected: Vec<Uuid> = match context_chunk_ids {
            Some(ids) => {
                for id in ids {
                    if !session_chunks.contains(id) {
                        return Err(CoreError::Validation(format!(
                            "chunk {} was not used by session {}",
                            id, session_id
                        )));
                    }
                }
                ids.to_vec()
            }
            None => session_chunks,
        };

        // Re-ingestion can retire chunks a session still points at; flag and
        // link only the survivors.
        let chunk_ids = queries::chunks::filter_existing(&self.pool, &selected).await?;
        let should_flag = rating <= POOR_RATING_THRESHOLD || ai_low_confidence;

        let mut tx = self.pool.begin().await.map_err(CoreError::Database)?;

        let feedback = queries::feedback::insert_feedback(
            &mut *tx,
            session_id,
            user_id,
            rating,
            comment,
            ai_low_confidence,
        )
        .await?;
        queries::feedback::insert_feedback_chunks(&mut *tx, feedback.id, &chunk_ids).await?;

        let flagged_chunks = if should_flag {
            queries::chunks::increment_review_flags(&mut *tx, &chunk_ids).await?
        } else {
            0
        };

        tx.commit().await.map_err(CoreError::Database)?;

        if flagged_chunks > 0 {
            tracing::info!(
                session_id = %session_id,
                rating,
                ai_low_confidence,
                flagged_chunks,
                "chunks flagged for review"
            );
        }

        Ok(FeedbackOutcome {
            feedback,
            flagged_chunks,
        })
    }
}
