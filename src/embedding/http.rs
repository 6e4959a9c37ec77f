//! OpenAI-compatible `/embeddings` client (OpenAI, LM Studio, Ollama, ...).

use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Remote embedding service speaking the OpenAI embeddings API.
pub struct HttpEmbeddingGateway {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl HttpEmbeddingGateway {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        dimension: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::EmbeddingFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
            dimension,
        })
    }

    /// Build from config, reading the API key from `api_key_env` when set.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(variable) => Some(std::env::var(variable).map_err(|_| {
                Error::InvalidConfiguration(format!(
                    "embedding.api_key_env names {variable}, which is not set"
                ))
            })?),
            None => None,
        };
        Self::new(&config.base_url, &config.model, api_key, config.dimension)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: &texts,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                Error::EmbeddingFailure(format!("request to {} failed: {e}", self.endpoint))
            })?
            .error_for_status()
            .map_err(|e| Error::EmbeddingFailure(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::EmbeddingFailure(format!("invalid embedding response: {e}")))?;

        Ok(into_ordered_vectors(response.data))
    }
}

/// Order by the `index` field when the server supplies one.
fn into_ordered_vectors(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    if data.iter().all(|item| item.index.is_some()) {
        data.sort_by_key(|item| item.index);
    }
    data.into_iter().map(|item| item.embedding).collect()
}
