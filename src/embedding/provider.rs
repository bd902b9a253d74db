use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::error::ProviderError;
use super::types::Embedding;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Produces an embedding for a piece of text.
pub trait EmbeddingProvider: Send + Sync {
    /// Short label used in logs and health reports.
    fn name(&self) -> &'static str;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding, ProviderError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
}

impl Default for OpenAiEmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: crate::constants::DEFAULT_EMBEDDING_DIM,
            timeout: Duration::from_millis(crate::constants::DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

/// OpenAI `/v1/embeddings` client.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    auth_header: String,
    config: OpenAiEmbedderConfig,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, mut config: OpenAiEmbedderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::new(format!("failed to build HTTP client: {}", e)))?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            http,
            auth_header: format!("Bearer {}", api_key),
            config,
        })
    }

    pub fn config(&self) -> &OpenAiEmbedderConfig {
        &self.config
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.config.base_url)
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": text,
        });

        let response = self
            .http
            .post(self.embeddings_url())
            .header("Authorization", &self.auth_header)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::new(format!(
                        "request timed out after {}ms",
                        self.config.timeout.as_millis()
                    ))
                } else {
                    ProviderError::new(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::with_status(
                error_message(&detail),
                status.as_u16(),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("invalid response body: {}", e)))?;

        let embedding = parse_embedding_response(json, self.config.dimension)?;
        debug!(model = %self.config.model, dim = embedding.dim(), "Generated embedding");
        Ok(embedding)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Extracts `data[0].embedding` and checks its dimension.
pub fn parse_embedding_response(
    json: serde_json::Value,
    expected_dim: usize,
) -> Result<Embedding, ProviderError> {
    let response: EmbeddingResponse = serde_json::from_value(json)
        .map_err(|e| ProviderError::new(format!("failed to parse embedding response: {}", e)))?;

    let values = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ProviderError::new("response contained no embeddings"))?;

    crate::constants::validate_embedding_dim(values.len(), expected_dim)
        .map_err(|e| ProviderError::new(e.to_string()))?;

    Ok(Embedding::new(values))
}

/// Pulls `error.message` out of an OpenAI error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
