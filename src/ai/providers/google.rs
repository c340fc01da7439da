use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{build_http_client, classify_request_error, classify_status};
use crate::ai::{EmbeddingProvider, LlmProvider, TaskType};
use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    llm_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GoogleProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        llm_model: String,
        embedding_model: String,
        embedding_dimensions: usize,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());
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
impl LlmProvider for GoogleProvider {
    async fn generate(&self, task: TaskType, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "systemInstruction": {
                "parts": [{ "text": task.system_instruction() }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.llm_model, self.api_key
            ))
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed response: {}", e)))?;

        // Candidates may arrive with multiple parts; join the text parts.
        let text = payload
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::Permanent(
                "empty response from generation call".to_string(),
            ));
        }
        Ok(text.trim().to_string())
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}

#[async_trait]
impl EmbeddingProvider for GoogleProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let response = self
            .client
            .post(format!(
                "{}/models/{}:batchEmbedContents?key={}",
                self.base_url, self.embedding_model, self.api_key
            ))
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed embeddings: {}", e)))?;

        if payload.embeddings.len() != texts.len() {
            return Err(ProviderError::Permanent(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }

        let mut vectors = Vec::with_capacity(payload.embeddings.len());
        for embedding in payload.embeddings {
            if embedding.values.len() != self.embedding_dimensions {
                return Err(ProviderError::Permanent(format!(
                    "embedding dimension {} does not match configured {}",
                    embedding.values.len(),
                    self.embedding_dimensions
                )));
            }
            vectors.push(embedding.values);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}
