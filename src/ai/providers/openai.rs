use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{build_http_client, classify_request_error, classify_status};
use crate::ai::{EmbeddingProvider, LlmProvider, TaskType};
use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    llm_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        llm_model: String,
        embedding_model: String,
        embedding_dimensions: usize,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let client = build_http_client(timeout_secs)?;

        Ok(Self {
            client,
            api_key,
            base_url,
            llm_model,
            embedding_model,
            embedding_dimensions,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, task: TaskType, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.llm_model,
            "messages": [
                { "role": "system", "content": task.system_instruction() },
                { "role": "user", "content": prompt }
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ProviderError::Permanent("completion had no content".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // The embeddings endpoint accepts the batch natively; one request
        // per batch amortizes the round trip.
        let body = json!({
            "model": self.embedding_model,
            "input": texts,
            "encoding_format": "float",
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed embeddings: {}", e)))?;

        if payload.data.len() != texts.len() {
            return Err(ProviderError::Permanent(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }

        // The API reports an index per datum; order by it so the output is
        // 1:1 with the input regardless of response ordering.
        let mut data = payload.data;
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for datum in data {
            if datum.embedding.len() != self.embedding_dimensions {
                return Err(ProviderError::Permanent(format!(
                    "embedding dimension {} does not match configured {}",
                    datum.embedding.len(),
                    self.embedding_dimensions
                )));
            }
            vectors.push(datum.embedding);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
