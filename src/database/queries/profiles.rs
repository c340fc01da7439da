use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::database::models::UserProfile;

/// Creates an empty profile row for the user if one does not exist yet.
pub async fn ensure_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_profiles (user_id) VALUES (?1)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Relative update so concurrent awards never clobber each other.
pub async fn add_points(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    points: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE user_profiles SET total_points = total_points + ?2 WHERE user_id = ?1")
        .bind(user_id)
        .bind(points)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn set_exam_stats(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    completed_count: i64,
    average_score: Option<f64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles
         SET mock_exams_completed = ?2, average_mock_exam_score = ?3
         WHERE user_id = ?1",
    )
    .bind(user_id)
    .bind(completed_count)
    .bind(average_score)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn increment_upload_count(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles
         SET study_materials_uploaded_count = study_materials_uploaded_count + 1
         WHERE user_id = ?1",
    )
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}
