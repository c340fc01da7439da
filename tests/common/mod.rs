// Shared fixtures: in-memory database plus deterministic fakes for the AI
// collaborators.
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use examforge::ai::{DocumentParser, EmbeddingProvider, LlmProvider, TaskType};
use examforge::config::Config;
use examforge::database::init_pool;
use examforge::error::ProviderError;

pub const TEST_DIMENSIONS: usize = 8;

pub async fn test_pool() -> SqlitePool {
    init_pool("sqlite::memory:").await.unwrap()
}

pub fn test_config() -> Config {
    Config {
        embedding_dimensions: TEST_DIMENSIONS,
        ..Config::default()
    }
}

/// Embedding fake: the vector for a text is a pure function of the text, so
/// identical texts always match with similarity 1.0. Can be switched to
/// fail, for exercising mid-ingestion error paths.
pub struct FakeEmbedding {
    dimensions: usize,
    failing: std::sync::atomic::AtomicBool,
}

impl FakeEmbedding {
    pub fn new() -> Self {
        Self {
            dimensions: TEST_DIMENSIONS,
            failing: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedding {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ProviderError::Permanent(
                "embedding service unavailable".to_string(),
            ));
        }
        Ok(texts
            .iter()
            .map(|text| {
                (0..self.dimensions)
                    .map(|i| {
                        let mut hasher = DefaultHasher::new();
                        (text, i).hash(&mut hasher);
                        (hasher.finish() % 1000) as f32 / 1000.0
                    })
                    .collect()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &'static str {
        "fake-embedding"
    }
}

/// Generation fake. Queued replies are consumed per task; without a queued
/// reply it echoes the task tag and prompt, which lets tests assert on what
/// the engine actually sent.
pub struct FakeLlm {
    replies: Mutex<HashMap<&'static str, VecDeque<String>>>,
    failing_tasks: Mutex<HashSet<&'static str>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            failing_tasks: Mutex::new(HashSet::new()),
        }
    }

    pub async fn queue_reply(&self, task: TaskType, reply: &str) {
        self.replies
            .lock()
            .await
            .entry(task.as_str())
            .or_default()
            .push_back(reply.to_string());
    }

    pub async fn fail_task(&self, task: TaskType) {
        self.failing_tasks.lock().await.insert(task.as_str());
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, task: TaskType, prompt: &str) -> Result<String, ProviderError> {
        if self.failing_tasks.lock().await.contains(task.as_str()) {
            return Err(ProviderError::Permanent("model unavailable".to_string()));
        }
        if let Some(reply) = self
            .replies
            .lock()
            .await
            .get_mut(task.as_str())
            .and_then(|queue| queue.pop_front())
        {
            return Ok(reply);
        }
        Ok(format!("[{}] {}", task.as_str(), prompt))
    }

    fn provider_name(&self) -> &'static str {
        "fake-llm"
    }
}

/// Parser fake backed by an in-memory file map.
pub struct FakeParser {
    files: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeParser {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub async fn put(&self, file_ref: &str, text: &str) {
        self.files
            .lock()
            .await
            .insert(file_ref.to_string(), text.to_string());
    }

    pub async fn fail(&self, file_ref: &str) {
        self.failing.lock().await.insert(file_ref.to_string());
    }
}

#[async_trait]
impl DocumentParser for FakeParser {
    async fn extract_text(&self, file_ref: &str) -> Result<String, ProviderError> {
        if self.failing.lock().await.contains(file_ref) {
            return Err(ProviderError::Permanent(format!(
                "extraction failed for '{}'",
                file_ref
            )));
        }
        self.files
            .lock()
            .await
            .get(file_ref)
            .cloned()
            .ok_or_else(|| ProviderError::Permanent(format!("unknown file '{}'", file_ref)))
    }
}

/// The full engine wiring most tests need.
pub struct TestApp {
    pub pool: SqlitePool,
    pub llm: Arc<FakeLlm>,
    pub parser: Arc<FakeParser>,
    pub embeddings: Arc<FakeEmbedding>,
    pub ingestion: examforge::rag::ingest::IngestionPipeline,
    pub retrieval: examforge::rag::retrieval::RetrievalEngine,
    pub grading: examforge::exam::grading::GradingEngine,
    pub ledger: Arc<examforge::progress::ledger::ProgressLedger>,
    pub feedback: examforge::progress::flagging::FeedbackService,
}

pub async fn test_app() -> TestApp {
    let config = test_config();
    let pool = test_pool().await;
    let llm = Arc::new(FakeLlm::new());
    let parser = Arc::new(FakeParser::new());
    let embeddings = Arc::new(FakeEmbedding::new());
    let index = Arc::new(examforge::rag::vector_index::SimpleVectorIndex::new(
        TEST_DIMENSIONS,
    ));
    let ledger = Arc::new(examforge::progress::ledger::ProgressLedger::new(
        pool.clone(),
        &config,
    ));

    let ingestion = examforge::rag::ingest::IngestionPipeline::new(
        pool.clone(),
        parser.clone(),
        embeddings.clone(),
        index.clone(),
        ledger.clone(),
        &config,
    )
    .unwrap();
    let retrieval = examforge::rag::retrieval::RetrievalEngine::new(
        pool.clone(),
        embeddings.clone(),
        llm.clone(),
        index,
        &config,
    )
    .unwrap();
    let grading = examforge::exam::grading::GradingEngine::new(
        pool.clone(),
        llm.clone(),
        ledger.clone(),
        &config,
    );
    let feedback = examforge::progress::flagging::FeedbackService::new(pool.clone());

    TestApp {
        pool,
        llm,
        parser,
        embeddings,
        ingestion,
        retrieval,
        grading,
        ledger,
        feedback,
    }
}
