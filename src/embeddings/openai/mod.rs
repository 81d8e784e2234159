
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::RagError;
use crate::config::OpenAiConfig;
use crate::embeddings::EmbeddingProvider;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking client for an OpenAI-compatible `/embeddings` endpoint.
///
/// The credential is read at construction but only required once the first
/// embedding call is made, so offline paths (index load, cache hits) work
/// without one.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    batch_size: usize,
    dimension: usize,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
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

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig) -> crate::Result<Self> {
        let api_url = config
            .api_url()
            .map_err(|e| RagError::Config(e.to_string()))?;
        let endpoint = Url::parse(&format!(
            "{}/embeddings",
            api_url.as_str().trim_end_matches('/')
        ))
        .map_err(|e| RagError::Config(format!("Invalid embeddings endpoint: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            batch_size: config.batch_size as usize,
            dimension: config.embedding_dimension as usize,
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn require_api_key(&self) -> crate::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RagError::Config("OPENAI_API_KEY is required for embeddings".to_string())
        })
    }

    fn embed_chunk(&self, api_key: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embeddings request")?;

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Embeddings request to {} failed", self.endpoint))?;

        let response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embeddings response")?;

        if response.data.len() != texts.len() {
            anyhow::bail!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            );
        }

        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);

        for entry in &data {
            if entry.embedding.len() != self.dimension {
                anyhow::bail!(
                    "Provider returned a {}-dimension vector, expected {}",
                    entry.embedding.len(),
                    self.dimension
                );
            }
        }

        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

impl EmbeddingProvider for OpenAiClient {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.require_api_key()?;

        debug!(
            "Embedding {} texts in chunks of {}",
            texts.len(),
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let chunk_vectors = self
                .embed_chunk(api_key, chunk)
                .map_err(|e| RagError::Embedding(format!("{e:#}")))?;
            vectors.extend(chunk_vectors);
        }

        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }
}
