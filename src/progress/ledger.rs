// Idempotent progress ledger. Every award runs in one transaction keyed by
// the activity log's uniqueness constraint: if the event row inserts, the
// profile aggregates move with it; if it already exists, nothing changes.

use sqlx::SqlitePool;

use crate::config::Config;
use crate::database::models::UserProfile;
use crate::database::queries;
use crate::error::{CoreError, CoreResult};
use crate::progress::events::ActivityEvent;

pub struct ProgressLedger {
    pool: SqlitePool,
    points_material_uploaded: i64,
    points_exam_completed: i64,
}

impl ProgressLedger {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            points_material_uploaded: config.points_material_uploaded,
            points_exam_completed: config.points_exam_completed,
        }
    }

    fn points_for(&self, event: &ActivityEvent) -> i64 {
        match event {
            ActivityEvent::ExamCompleted { .. } => self.points_exam_completed,
            ActivityEvent::MaterialUploaded { .. } => self.points_material_uploaded,
        }
    }

    /// Apply an event to the user's progress. Returns `true` if the event
    /// was fresh and awarded, `false` if it had already been recorded.
    pub async fn record(&self, event: ActivityEvent) -> CoreResult<bool> {
        let user_id = event.user_id();
        let points = self.points_for(&event);

        let mut tx = self.pool.begin().await.map_err(CoreError::Database)?;

        let inserted = queries::activity::try_insert_event(
            &mut *tx,
            user_id,
            event.kind(),
            event.source_entity_id(),
            points,
        )
        .await?;

        if !inserted {
            tx.rollback().await.map_err(CoreError::Database)?;
            tracing::debug!(
                user_id = %user_id,
                kind = event.kind(),
                source = %event.source_entity_id(),
                "duplicate activity event ignored"
            );
            return Ok(false);
        }

        queries::profiles::ensure_profile(&mut *tx, user_id).await?;

        match event {
            ActivityEvent::ExamCompleted { .. } => {
                let (completed, average) =
                    queries::attempts::completed_stats(&mut *tx, user_id).await?;
                let average = average.map(round2);
                queries::profiles::set_exam_stats(&mut *tx, user_id, completed, average).await?;
            }
            ActivityEvent::MaterialUploaded { .. } => {
                queries::profiles::increment_upload_count(&mut *tx, user_id).await?;
            }
        }

        queries::profiles::add_points(&mut *tx, user_id, points).await?;
        tx.commit().await.map_err(CoreError::Database)?;

        tracing::info!(
            user_id = %user_id,
            kind = event.kind(),
            points,
            "activity event awarded"
        );
        Ok(true)
    }

    pub async fn profile(&self, user_id: uuid::Uuid) -> CoreResult<Option<UserProfile>> {
        Ok(queries::profiles::get_profile(&self.pool, user_id).await?)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(80.0), 80.0);
        assert_eq!(round2(0.005), 0.01);
    }
}
