// Question answering over ingested materials: embed the question, pull the
// most similar chunks, compose a grounded prompt, and record the whole
// exchange as a retrieval session so feedback can refer back to it.

use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::ai::retry::{with_retry, RetryPolicy};
use crate::ai::{EmbeddingProvider, LlmProvider, TaskType};
use crate::config::Config;
use crate::database::models::DocumentChunk;
use crate::database::queries;
use crate::error::{CoreError, CoreResult};
use crate::rag::vector_index::VectorIndex;

pub struct RetrievalEngine {
    pool: SqlitePool,
    embeddings: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct RetrievalAnswer {
    pub session_id: Uuid,
    pub answer: String,
    /// Chunks that backed the answer, most similar first. Empty when the
    /// answer was not grounded in course material.
    pub used_chunk_ids: Vec<Uuid>,
    pub grounded: bool,
}

impl RetrievalEngine {
    pub fn new(
        pool: SqlitePool,
        embeddings: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
        config: &Config,
    ) -> CoreResult<Self> {
        if embeddings.dimensions() != index.dimensions() {
            return Err(CoreError::Configuration(format!(
                "embedding dimension {} does not match index dimension {}",
                embeddings.dimensions(),
                index.dimensions()
            )));
        }
        Ok(Self {
            pool,
            embeddings,
            llm,
            index,
            top_k: config.retrieval_top_k,
            retry: RetryPolicy::default(),
        })
    }

    pub async fn answer_query(&self, user_id: Uuid, query: &str) -> CoreResult<RetrievalAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::Validation("query must not be empty".to_string()));
        }

        let query_vec = self.embed_query(query).await?;
        let matches = self.index.query(&query_vec, self.top_k).await?;
        let vector_ids: Vec<String> = matches.into_iter().map(|m| m.vector_id).collect();
        let chunks = self.resolve_chunks(&vector_ids).await?;

        let (task, prompt) = if chunks.is_empty() {
            (TaskType::AnswerWithoutContext, query.to_string())
        } else {
            (TaskType::AnswerWithContext, compose_prompt(query, &chunks))
        };

        let grounded = !chunks.is_empty();
        tracing::debug!(
            user_id = %user_id,
            chunk_count = chunks.len(),
            grounded,
            "answering query"
        );

        let answer = with_retry(&self.retry, || self.llm.generate(task, &prompt)).await?;

        let used_chunk_ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
        let session = queries::sessions::insert_session(
            &self.pool,
            user_id,
            query,
            &answer,
            &used_chunk_ids,
            grounded,
        )
        .await?;

        Ok(RetrievalAnswer {
            session_id: session.id,
            answer,
            used_chunk_ids,
            grounded,
        })
    }

    async fn embed_query(&self, query: &str) -> CoreResult<Vec<f32>> {
        let texts = vec![query.to_string()];
        let mut vectors = with_retry(&self.retry, || self.embeddings.embed(&texts)).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(CoreError::PermanentProvider(
                "embedding provider did not return exactly one vector".to_string(),
            )),
        }
    }

    /// Summarize an ingested material. The source text is reconstructed
    /// from the stored chunks by slicing each chunk's overlap prefix off,
    /// so the model sees the extraction once, without repeats.
    pub async fn summarize_material(&self, material_id: Uuid) -> CoreResult<String> {
        queries::materials::get_material(&self.pool, material_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("material {}", material_id)))?;

        let chunks = queries::chunks::list_chunks_for_material(&self.pool, material_id).await?;
        if chunks.is_empty() {
            return Err(CoreError::Validation(format!(
                "material {} has not been ingested yet",
                material_id
            )));
        }

        let text = reassemble_text(&chunks);
        let prompt = format!(
            "Summarize the following course material for exam revision. \
             Keep key terms, definitions, and relationships.\n\n{}",
            text
        );

        let summary = with_retry(&self.retry, || {
            self.llm.generate(TaskType::Summarize, &prompt)
        })
        .await?;
        tracing::info!(material_id = %material_id, "material summarized");
        Ok(summary)
    }

    /// Resolve index matches to chunk rows, preserving similarity order and
    /// dropping ids the database no longer knows about.
    async fn resolve_chunks(&self, vector_ids: &[String]) -> CoreResult<Vec<DocumentChunk>> {
        let rows = queries::chunks::get_chunks_by_vector_ids(&self.pool, vector_ids).await?;
        let mut ordered = Vec::with_capacity(rows.len());
        for vector_id in vector_ids {
            if let Some(chunk) = rows.iter().find(|c| &c.vector_id == vector_id) {
                ordered.push(chunk.clone());
            }
        }
        Ok(ordered)
    }
}

/// Rebuild the extracted text from a material's chunk rows, ordered by
/// sequence, dropping each chunk's overlap prefix.
fn reassemble_text(chunks: &[DocumentChunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        let overlap = (chunk.overlap_len as usize).min(chunk.content.len());
        text.push_str(&chunk.content[overlap..]);
    }
    text
}

/// Grounded prompt: context blocks first (most similar leading), then the
/// question, with explicit markers so the model treats retrieved text as
/// data rather than instructions.
fn compose_prompt(query: &str, chunks: &[DocumentChunk]) -> String {
    let mut prompt = String::from("CONTEXT (course material excerpts):\n");
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!("--- excerpt {} ---\n{}\n", i + 1, chunk.content));
    }
    prompt.push_str("--- end of context ---\n\nQUESTION:\n");
    prompt.push_str(query);
    prompt
}
