use crate::error::{CoreError, CoreResult};

/// Which external AI vendor backs the embedding and generation calls.
/// Selected once at startup; call sites never branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Google,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(ProviderKind::OpenAi),
            "google" => Some(ProviderKind::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,

    pub provider: ProviderKind,
    pub api_key: String,
    pub llm_model: String,
    pub embedding_model: String,
    /// Dimension of vectors the configured embedding model produces. Must
    /// equal the vector index dimension; checked once at startup.
    pub embedding_dimensions: usize,
    pub embedding_batch_size: usize,
    pub request_timeout_secs: u64,

    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,

    pub points_material_uploaded: i64,
    pub points_exam_completed: i64,
    pub allow_concurrent_attempts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://examforge.db".to_string(),
            bind_address: "127.0.0.1:8686".to_string(),
            provider: ProviderKind::OpenAi,
            api_key: String::new(),
            llm_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            embedding_batch_size: 32,
            request_timeout_secs: 30,
            max_chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_top_k: 5,
            points_material_uploaded: 10,
            points_exam_completed: 25,
            allow_concurrent_attempts: false,
        }
    }
}

impl Config {
    /// Load configuration from `EXAMFORGE_*` environment variables, falling
    /// back to defaults. Returns a configuration error for anything that
    /// would otherwise fail on the first request.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("EXAMFORGE_DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(addr) = std::env::var("EXAMFORGE_BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Ok(provider) = std::env::var("EXAMFORGE_AI_PROVIDER") {
            config.provider = ProviderKind::from_str(&provider).ok_or_else(|| {
                CoreError::Configuration(format!("unknown AI provider '{}'", provider))
            })?;
        }
        if let Ok(key) = std::env::var("EXAMFORGE_AI_API_KEY") {
            config.api_key = key;
        }
        if let Ok(model) = std::env::var("EXAMFORGE_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(model) = std::env::var("EXAMFORGE_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(dims) = std::env::var("EXAMFORGE_EMBEDDING_DIMENSIONS") {
            config.embedding_dimensions = dims.parse().map_err(|_| {
                CoreError::Configuration(format!("invalid embedding dimensions '{}'", dims))
            })?;
        }
        if let Ok(size) = std::env::var("EXAMFORGE_MAX_CHUNK_SIZE") {
            config.max_chunk_size = size
                .parse()
                .map_err(|_| CoreError::Configuration(format!("invalid chunk size '{}'", size)))?;
        }
        if let Ok(overlap) = std::env::var("EXAMFORGE_CHUNK_OVERLAP") {
            config.chunk_overlap = overlap.parse().map_err(|_| {
                CoreError::Configuration(format!("invalid chunk overlap '{}'", overlap))
            })?;
        }
        if let Ok(top_k) = std::env::var("EXAMFORGE_RETRIEVAL_TOP_K") {
            config.retrieval_top_k = top_k
                .parse()
                .map_err(|_| CoreError::Configuration(format!("invalid top_k '{}'", top_k)))?;
        }
        if let Ok(allow) = std::env::var("EXAMFORGE_ALLOW_CONCURRENT_ATTEMPTS") {
            config.allow_concurrent_attempts = allow == "1" || allow.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Fatal-at-startup checks; nothing here is ever reported per request.
    pub fn validate(&self) -> CoreResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(CoreError::Configuration(
                "EXAMFORGE_AI_API_KEY is not set".to_string(),
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(CoreError::Configuration(
                "embedding dimensions must be non-zero".to_string(),
            ));
        }
        if self.max_chunk_size == 0 {
            return Err(CoreError::Configuration(
                "chunk size cannot be zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.max_chunk_size
            || self.max_chunk_size - self.chunk_overlap < 4
        {
            return Err(CoreError::Configuration(
                "chunk size must exceed overlap by at least 4 bytes".to_string(),
            ));
        }
        if self.retrieval_top_k == 0 {
            return Err(CoreError::Configuration(
                "retrieval top_k must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
