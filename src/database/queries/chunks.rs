use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

use crate::database::models::DocumentChunk;

pub async fn insert_chunk(
    executor: impl SqliteExecutor<'_>,
    chunk: &DocumentChunk,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO document_chunks
            (id, study_material_id, seq, content, overlap_len, vector_id,
             embedding, embedding_provider, review_flags_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(chunk.id)
    .bind(chunk.study_material_id)
    .bind(chunk.seq)
    .bind(&chunk.content)
    .bind(chunk.overlap_len)
    .bind(&chunk.vector_id)
    .bind(&chunk.embedding)
    .bind(&chunk.embedding_provider)
    .bind(chunk.review_flags_count)
    .bind(chunk.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_all_chunks(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<DocumentChunk>, sqlx::Error> {
    sqlx::query_as::<_, DocumentChunk>(
        "SELECT * FROM document_chunks ORDER BY study_material_id, seq",
    )
    .fetch_all(executor)
    .await
}

pub async fn delete_chunks_for_material(
    executor: impl SqliteExecutor<'_>,
    material_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM document_chunks WHERE study_material_id = ?1")
        .bind(material_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn get_chunk(
    executor: impl SqliteExecutor<'_>,
    id: Uuid,
) -> Result<Option<DocumentChunk>, sqlx::Error> {
    sqlx::query_as::<_, DocumentChunk>("SELECT * FROM document_chunks WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_chunks_for_material(
    executor: impl SqliteExecutor<'_>,
    material_id: Uuid,
) -> Result<Vec<DocumentChunk>, sqlx::Error> {
    sqlx::query_as::<_, DocumentChunk>(
        "SELECT * FROM document_chunks WHERE study_material_id = ?1 ORDER BY seq",
    )
    .bind(material_id)
    .fetch_all(executor)
    .await
}

/// Resolve vector ids back to chunk rows. Order of the result is not
/// significant; callers re-order by similarity.
pub async fn get_chunks_by_vector_ids(
    executor: impl SqliteExecutor<'_>,
    vector_ids: &[String],
) -> Result<Vec<DocumentChunk>, sqlx::Error> {
    if vector_ids.is_empty() {
        return Ok(vec![]);
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM document_chunks WHERE vector_id IN (");
    let mut separated = builder.separated(", ");
    for vector_id in vector_ids {
        separated.push_bind(vector_id);
    }
    separated.push_unseparated(")");

    builder.build_query_as::<DocumentChunk>().fetch_all(executor).await
}

/// Of the given chunk ids, return the ones that still exist. Sessions can
/// outlive their chunks when a material is re-ingested.
pub async fn filter_existing(
    executor: impl SqliteExecutor<'_>,
    chunk_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    if chunk_ids.is_empty() {
        return Ok(vec![]);
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM document_chunks WHERE id IN (");
    let mut separated = builder.separated(", ");
    for chunk_id in chunk_ids {
        separated.push_bind(*chunk_id);
    }
    separated.push_unseparated(")");

    let rows: Vec<(Uuid,)> = builder.build_query_as().fetch_all(executor).await?;
    let existing: std::collections::HashSet<Uuid> = rows.into_iter().map(|(id,)| id).collect();
    Ok(chunk_ids
        .iter()
        .copied()
        .filter(|id| existing.contains(id))
        .collect())
}

/// Atomically raise the review counter on every listed chunk by one.
/// A single relative UPDATE, so concurrent increments cannot be lost.
pub async fn increment_review_flags(
    executor: impl SqliteExecutor<'_>,
    chunk_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if chunk_ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "UPDATE document_chunks SET review_flags_count = review_flags_count + 1 WHERE id IN (",
    );
    let mut separated = builder.separated(", ");
    for chunk_id in chunk_ids {
        separated.push_bind(*chunk_id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}
