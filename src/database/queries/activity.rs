use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

/// Records an activity event, keyed by (user, kind, source entity). Returns
/// `true` when the row was inserted and `false` when an identical event was
/// already recorded, which is what makes replayed dispatches no-ops.
pub async fn try_insert_event(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    event_kind: &str,
    source_entity_id: Uuid,
    points_awarded: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO activity_log (id, user_id, event_kind, source_entity_id, points_awarded, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (user_id, event_kind, source_entity_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(event_kind)
    .bind(source_entity_id)
    .bind(points_awarded)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_events(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    event_kind: &str,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM activity_log WHERE user_id = ?1 AND event_kind = ?2",
    )
    .bind(user_id)
    .bind(event_kind)
    .fetch_one(executor)
    .await?;

    Ok(count)
}
