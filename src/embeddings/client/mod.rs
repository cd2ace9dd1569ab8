
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::EmbeddingsConfig;
use crate::embeddings::Embedder;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Synchronous client for an OpenAI-compatible embedding endpoint, driven
/// from the pipeline's straight-line sequential code.
#[derive(Debug, Clone)]
pub struct EmbeddingsClient {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    prompt_tokens: u64,
    total_tokens: u64,
}

impl EmbeddingsClient {
    #[inline]
    pub fn new(config: &EmbeddingsConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            base_url: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            agent,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/embeddings",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Request an embedding for one text. Returns the first embedding of the
    /// response; a response carrying no data yields an empty vector, which
    /// callers treat as a failed embedding.
    fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding for text of {} characters", text.len());

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input: vec![text.to_string()],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .agent
            .post(&self.embeddings_url())
            .header("Content-Type", "application/json")
            .header("api-key", self.api_key.as_str())
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Embedding request failed")?;

        let response: EmbeddingsResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if let Some(usage) = &response.usage {
            info!(
                "Embedding token usage: {} prompt, {} total",
                usage.prompt_tokens, usage.total_tokens
            );
        }

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .unwrap_or_default();

        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl Embedder for EmbeddingsClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embedding(text)
    }
}
