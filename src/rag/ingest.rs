// Material ingestion: extract text, chunk it, embed the chunks in batches,
// persist chunk rows and index vectors, then award the upload event.
//
// Failure anywhere leaves nothing queryable: chunk rows commit in one
// transaction, and on error the material's vectors are withdrawn from the
// index before the error propagates.

use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::ai::retry::{with_retry, RetryPolicy};
use crate::ai::{DocumentParser, EmbeddingProvider};
use crate::config::Config;
use crate::database::models::{DocumentChunk, StudyMaterial};
use crate::database::queries;
use crate::error::{CoreError, CoreResult};
use crate::progress::events::ActivityEvent;
use crate::progress::ledger::ProgressLedger;
use crate::rag::chunker::{Chunker, ChunkerConfig};
use crate::rag::vector_index::{VectorIndex, VectorPoint};

pub struct IngestionPipeline {
    pool: SqlitePool,
    parser: Arc<dyn DocumentParser>,
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    ledger: Arc<ProgressLedger>,
    chunker: Chunker,
    batch_size: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub material_id: Uuid,
    pub chunk_count: usize,
}

impl IngestionPipeline {
    pub fn new(
        pool: SqlitePool,
        parser: Arc<dyn DocumentParser>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        ledger: Arc<ProgressLedger>,
        config: &Config,
    ) -> CoreResult<Self> {
        if embeddings.dimensions() != index.dimensions() {
            return Err(CoreError::Configuration(format!(
                "embedding dimension {} does not match index dimension {}",
                embeddings.dimensions(),
                index.dimensions()
            )));
        }
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_size: config.max_chunk_size,
            chunk_overlap: config.chunk_overlap,
        })?;
        Ok(Self {
            pool,
            parser,
            embeddings,
            index,
            ledger,
            chunker,
            batch_size: config.embedding_batch_size.max(1),
            retry: RetryPolicy::default(),
        })
    }

    /// Ingest (or re-ingest) a stored material. Prior chunks and vectors for
    /// the material are discarded first, so running this twice converges on
    /// the latest extraction instead of accumulating duplicates.
    pub async fn ingest_material(&self, material: &StudyMaterial) -> CoreResult<IngestionReport> {
        tracing::info!(material_id = %material.id, "starting ingestion");

        let text = self
            .parser
            .extract_text(&material.file_ref)
            .await
            .map_err(CoreError::from)?;

        let pieces = self.chunker.split(&text);
        if pieces.is_empty() {
            return Err(CoreError::Validation(format!(
                "material {} produced no extractable text",
                material.id
            )));
        }

        let chunk_count = self.persist_chunks(material, &pieces).await?;
        tracing::info!(material_id = %material.id, chunk_count, "ingestion committed");

        self.ledger
            .record(ActivityEvent::MaterialUploaded {
                material_id: material.id,
                user_id: material.uploaded_by,
            })
            .await?;

        Ok(IngestionReport {
            material_id: material.id,
            chunk_count,
        })
    }

    async fn persist_chunks(
        &self,
        material: &StudyMaterial,
        pieces: &[crate::rag::chunker::ChunkPiece],
    ) -> CoreResult<usize> {
        // Batches embed concurrently; join_all keeps results in batch order
        // so vectors stay 1:1 with pieces.
        let batch_results = futures::future::join_all(pieces.chunks(self.batch_size).map(
            |batch| async move {
                let texts: Vec<String> = batch.iter().map(|p| p.content.clone()).collect();
                let vectors = with_retry(&self.retry, || self.embeddings.embed(&texts)).await?;
                if vectors.len() != texts.len() {
                    return Err(CoreError::PermanentProvider(format!(
                        "embedding count mismatch: sent {}, received {}",
                        texts.len(),
                        vectors.len()
                    )));
                }
                Ok(vectors)
            },
        ))
        .await;

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut points = Vec::with_capacity(pieces.len());

        for (batch, result) in pieces.chunks(self.batch_size).zip(batch_results) {
            let vectors = result?;
            for (piece, vector) in batch.iter().zip(vectors) {
                let chunk_id = Uuid::new_v4();
                let vector_id = format!("{}:{}", material.id, piece.index);
                let embedding = serde_json::to_string(&vector).map_err(|err| {
                    CoreError::PermanentProvider(format!(
                        "embedding is not serializable: {err}"
                    ))
                })?;
                chunks.push(DocumentChunk {
                    id: chunk_id,
                    study_material_id: material.id,
                    seq: piece.index as i64,
                    content: piece.content.clone(),
                    overlap_len: piece.overlap_len as i64,
                    vector_id: vector_id.clone(),
                    embedding,
                    embedding_provider: self.embeddings.provider_name().to_string(),
                    review_flags_count: 0,
                    created_at: chrono::Utc::now(),
                });
                points.push(VectorPoint {
                    vector_id,
                    vector,
                    material_id: material.id,
                });
            }
        }

        let mut tx = self.pool.begin().await.map_err(CoreError::Database)?;
        queries::chunks::delete_chunks_for_material(&mut *tx, material.id).await?;
        for chunk in &chunks {
            queries::chunks::insert_chunk(&mut *tx, chunk).await?;
        }

        // The prior vector set is withdrawn only after embedding succeeded,
        // so an embedding failure leaves the previous ingestion untouched.
        // From here on, any failure withdraws the material's vectors so no
        // partially-indexed chunk set stays reachable.
        self.index.remove_material(material.id).await?;
        if let Err(err) = self.index.upsert(points).await {
            self.withdraw_vectors(material.id).await;
            return Err(err);
        }
        if let Err(err) = tx.commit().await {
            self.withdraw_vectors(material.id).await;
            return Err(CoreError::Database(err));
        }

        Ok(chunks.len())
    }

    async fn withdraw_vectors(&self, material_id: Uuid) {
        if let Err(err) = self.index.remove_material(material_id).await {
            tracing::error!(
                material_id = %material_id,
                "failed to withdraw vectors after ingestion error: {}",
                err
            );
        }
    }
}

/// Reload every persisted chunk embedding into the vector index. Called at
/// startup so retrieval survives process restarts. Chunks whose stored
/// embedding cannot be decoded or no longer matches the index dimensions
/// are skipped with a warning rather than failing startup.
pub async fn rebuild_index(pool: &SqlitePool, index: &dyn VectorIndex) -> CoreResult<usize> {
    let chunks = queries::chunks::list_all_chunks(pool).await?;
    let mut points = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        match chunk.embedding_vector() {
            Ok(vector) if vector.len() == index.dimensions() => points.push(VectorPoint {
                vector_id: chunk.vector_id.clone(),
                vector,
                material_id: chunk.study_material_id,
            }),
            Ok(vector) => tracing::warn!(
                chunk_id = %chunk.id,
                stored = vector.len(),
                expected = index.dimensions(),
                "skipping chunk with mismatched embedding dimensions"
            ),
            Err(err) => tracing::warn!(
                chunk_id = %chunk.id,
                "skipping chunk with undecodable embedding: {}",
                err
            ),
        }
    }

    let restored = points.len();
    index.upsert(points).await?;
    tracing::info!(restored, "vector index rebuilt from persisted chunks");
    Ok(restored)
}
