//! OpenAI-compatible embedding API client with a local token budget.
//!
//! Token counts are measured locally with a HuggingFace tokenizer matched to
//! the embedding model; over-budget text is truncated deterministically
//! (encode, cut at the token boundary, decode) before the call. Provider
//! failures are reported as `None`, never raised; callers treat a missing
//! vector as "skip this chunk".

use std::time::Duration;

use lode_core::{EmbeddingConfig, LodeError};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    max_tokens: usize,
    timeout: Duration,
    tokenizer: Option<Tokenizer>,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a client with the given API key and defaults for everything
    /// else (no tokenizer, so no local truncation).
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_index::embedding::EmbeddingClient;
    ///
    /// let client = EmbeddingClient::new("test-key");
    /// assert_eq!(client.model(), "text-embedding-ada-002");
    /// ```
    pub fn new(api_key: &str) -> Self {
        let defaults = EmbeddingConfig::default();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: defaults.model,
            dimensions: defaults.dimensions,
            max_tokens: defaults.max_tokens,
            timeout: Duration::from_secs(defaults.timeout_secs),
            tokenizer: None,
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the `LODESTONE_API_KEY` env var if no key in config.
    /// Loads the tokenizer from `tokenizer_path` when configured.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Config`] if no API key is available, or
    /// [`LodeError::Embedding`] if the tokenizer file cannot be loaded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lode_core::EmbeddingConfig;
    /// use lode_index::embedding::EmbeddingClient;
    ///
    /// let config = EmbeddingConfig::default();
    /// let client = EmbeddingClient::with_config(&config).unwrap();
    /// ```
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, LodeError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("LODESTONE_API_KEY").ok())
            .ok_or_else(|| {
                LodeError::Config(
                    "embedding API key not found: set embedding.api_key in .lodestone.toml or LODESTONE_API_KEY env var".into(),
                )
            })?;

        let tokenizer = match &config.tokenizer_path {
            Some(path) => Some(Tokenizer::from_file(path).map_err(|e| {
                LodeError::Embedding(format!("failed to load tokenizer from {path}: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            tokenizer,
        })
    }

    /// Attach a tokenizer for local token counting and truncation.
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Override the API base URL (for self-hosted or test endpoints).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Expected vector dimensions for the configured model.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Count tokens in `text` with the attached tokenizer.
    ///
    /// Returns `None` when no tokenizer is attached or encoding fails.
    pub fn count_tokens(&self, text: &str) -> Option<usize> {
        let tokenizer = self.tokenizer.as_ref()?;
        match tokenizer.encode(text, false) {
            Ok(encoding) => Some(encoding.get_ids().len()),
            Err(e) => {
                warn!("token counting failed: {e}");
                None
            }
        }
    }

    /// Truncate `text` to the provider's token budget.
    ///
    /// Encodes, cuts the id sequence at `max_tokens`, and decodes. The
    /// result is identical across repeated calls with the same input. Text
    /// within budget (or with no tokenizer attached) is returned unchanged.
    pub fn truncate_to_budget(&self, text: &str) -> String {
        let Some(tokenizer) = self.tokenizer.as_ref() else {
            return text.to_string();
        };

        let encoding = match tokenizer.encode(text, false) {
            Ok(encoding) => encoding,
            Err(e) => {
                warn!("tokenization failed, sending text untruncated: {e}");
                return text.to_string();
            }
        };

        let ids = encoding.get_ids();
        if ids.len() <= self.max_tokens {
            return text.to_string();
        }

        match tokenizer.decode(&ids[..self.max_tokens], true) {
            Ok(truncated) => truncated,
            Err(e) => {
                warn!("token truncation failed, sending text untruncated: {e}");
                text.to_string()
            }
        }
    }

    /// Embed a single text, truncated to the token budget first.
    ///
    /// Returns `None` on any provider failure (network, quota, timeout,
    /// malformed response). Never returns an error: callers skip the chunk.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let input = self.truncate_to_budget(text);

        let request = EmbedRequest {
            model: self.model.clone(),
            input: vec![input],
        };

        let send = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send();

        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(model = %self.model, "embedding request failed: {e}");
                return None;
            }
            Err(_) => {
                warn!(model = %self.model, timeout_secs = self.timeout.as_secs(), "embedding request timed out");
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            warn!(model = %self.model, %status, "embedding provider returned an error status");
            return None;
        }

        let parsed: EmbedResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse embedding response: {e}");
                return None;
            }
        };

        parsed.data.into_iter().next().map(|item| item.embedding)
    }

    /// Build the JSON request body for an embed call (for testing).
    #[cfg(test)]
    fn build_request(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input: vec![self.truncate_to_budget(text)],
        }
    }
}
