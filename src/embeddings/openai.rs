use super::Embedder;
use crate::config::EmbeddingsConfig;
use crate::error::{Result, WikipathError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest number of inputs the OpenAI API accepts per request
const MAX_BATCH_SIZE: usize = 2048;

/// Request structure for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response structure from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    /// Position of the input this embedding belongs to
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// One failed request, and whether it is worth retrying.
struct RequestFailure {
    error: WikipathError,
    retryable: bool,
}

impl RequestFailure {
    fn fatal(message: String) -> Self {
        Self {
            error: WikipathError::Embedding(message),
            retryable: false,
        }
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
///
/// Sends page titles in batches and retries rate limits (429) and server
/// errors (5xx) with exponential backoff.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    batch_size: usize,
    dimensions: Option<usize>,
    max_retries: usize,
    initial_backoff: Duration,
}

impl OpenAIEmbedder {
    /// Create a new embedder
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the embeddings API
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `api_base` - API root without the `/embeddings` suffix (e.g., "https://api.openai.com/v1")
    ///
    /// # Returns
    ///
    /// An embedder with a batch size of 100, 3 retries and no dimension check,
    /// or an error if the HTTP client cannot be built
    pub fn new(api_key: String, model: String, api_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WikipathError::Embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
            batch_size: 100,
            dimensions: None,
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Build from the `[embeddings]` config section
    ///
    /// # Arguments
    ///
    /// * `api_key` - Value of the variable named by `api_key_env`
    /// * `config` - Embeddings configuration; only the `openai` provider is supported
    pub fn from_config(api_key: String, config: &EmbeddingsConfig) -> Result<Self> {
        if config.provider != "openai" {
            return Err(WikipathError::Config(format!(
                "Unsupported embeddings provider: {}",
                config.provider
            )));
        }
        Ok(Self::new(api_key, config.model.clone(), &config.api_base)?
            .with_batch_size(config.batch_size)
            .with_dimensions(config.dimensions)
            .with_max_retries(config.max_retries))
    }

    /// Maximum number of texts per API request, clamped to 1..=2048
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Reject responses whose vectors are not `dimensions` long
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Number of retries after the first attempt for retryable errors
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before the first retry; doubled after each attempt
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Make a single API request for `texts`
    ///
    /// # Returns
    ///
    /// One embedding per input, in input order
    async fn request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RequestFailure> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts.iter().map(String::as_str).collect(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestFailure {
                error: WikipathError::Embedding(format!("Network error: {}", e)),
                retryable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RequestFailure {
                error: WikipathError::Embedding(format!("Embeddings API error {}: {}", status, body)),
                retryable: status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
            });
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::fatal(format!("Failed to parse response: {}", e)))?;

        if result.data.len() != texts.len() {
            return Err(RequestFailure::fatal(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }
        result.data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> = result.data.into_iter().map(|d| d.embedding).collect();
        if let Some(expected) = self.dimensions {
            if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
                return Err(RequestFailure::fatal(format!(
                    "Unexpected embedding dimension: expected {}, got {}",
                    expected,
                    bad.len()
                )));
            }
        }

        Ok(embeddings)
    }

    /// Request embeddings for `texts`, retrying retryable failures
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = std::time::Instant::now();
        let mut attempt = 0;
        let mut delay = self.initial_backoff;

        loop {
            match self.request(texts).await {
                Ok(embeddings) => {
                    log::debug!(
                        "Embedding {} texts took {:?} (attempt {})",
                        texts.len(),
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(embeddings);
                }
                Err(failure) if failure.retryable && attempt < self.max_retries => {
                    log::warn!(
                        "Retry {}/{} after error: {}",
                        attempt + 1,
                        self.max_retries,
                        failure.error
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_with_retry(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| WikipathError::Embedding("Empty response from embeddings API".to_string()))
    }

    /// Embed `texts` with one request per `batch_size` chunk
    ///
    /// If a whole chunk fails, its texts are retried one by one so a single
    /// rejected input only fails itself.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            match self.request_with_retry(chunk).await {
                Ok(embeddings) => results.extend(embeddings.into_iter().map(Ok)),
                Err(e) if chunk.len() == 1 => results.push(Err(e)),
                Err(e) => {
                    log::warn!("Batch of {} failed ({}), embedding one by one", chunk.len(), e);
                    for text in chunk {
                        results.push(self.embed(text).await);
                    }
                }
            }

            // Rate limiting: small delay between full batches
            if chunk.len() == self.batch_size && results.len() < texts.len() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        results
    }
}
