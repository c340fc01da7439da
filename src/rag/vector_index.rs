// Thin contract over a similarity-search index, plus the bundled
// in-process implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// One entry to upsert: the external vector id, the embedding, and the
/// owning material (used to withdraw a failed ingestion).
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub vector_id: String,
    pub vector: Vec<f32>,
    pub material_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub vector_id: String,
    pub score: f32,
}

/// Contract over an external similarity-search service.
///
/// `upsert` is idempotent: re-upserting a vector id replaces the prior
/// entry. `query` returns matches in descending score order and tolerates
/// an empty index by returning an empty list.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn upsert(&self, points: Vec<VectorPoint>) -> CoreResult<()>;

    async fn query(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<VectorMatch>>;

    /// Remove every vector belonging to a material. Used both for
    /// re-ingestion and to roll back a partially-indexed material.
    async fn remove_material(&self, material_id: Uuid) -> CoreResult<()>;
}

/// In-process cosine-similarity index.
pub struct SimpleVectorIndex {
    dimensions: usize,
    entries: RwLock<HashMap<String, IndexEntry>>,
}

struct IndexEntry {
    vector: Vec<f32>,
    material_id: Uuid,
}

impl SimpleVectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> CoreResult<()> {
        if vector.len() != self.dimensions {
            return Err(CoreError::Validation(format!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for SimpleVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> CoreResult<()> {
        for point in &points {
            self.check_dimension(&point.vector)?;
        }
        let mut entries = self.entries.write().await;
        for point in points {
            entries.insert(
                point.vector_id,
                IndexEntry {
                    vector: point.vector,
                    material_id: point.material_id,
                },
            );
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<VectorMatch>> {
        self.check_dimension(vector)?;
        let entries = self.entries.read().await;

        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .map(|(vector_id, entry)| VectorMatch {
                vector_id: vector_id.clone(),
                score: cosine_similarity(vector, &entry.vector),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn remove_material(&self, material_id: Uuid) -> CoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.material_id != material_id);
        Ok(())
    }
}
