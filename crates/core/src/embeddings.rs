use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Converts text into a fixed-length vector. Ingestion and query must use
/// the same provider instance so both sides of retrieval share one
/// embedding space.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Embedding provider backed by the Gemini `embedContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "gemini api key is empty".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:embedContent",
                self.endpoint, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "content": { "parts": [ { "text": text } ] },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Backend {
                service: "gemini-embeddings".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parse_embedding(&parsed)
    }
}

/// A malformed component would otherwise corrupt the vector and silently
/// degrade every retrieval against it, so the whole response is rejected.
fn parse_embedding(parsed: &Value) -> Result<Vec<f32>, ProviderError> {
    let values = parsed
        .pointer("/embedding/values")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Backend {
            service: "gemini-embeddings".to_string(),
            details: "response has no embedding values".to_string(),
        })?;

    let mut vector = Vec::with_capacity(values.len());
    for value in values {
        let number = value.as_f64().ok_or_else(|| ProviderError::Backend {
            service: "gemini-embeddings".to_string(),
            details: format!("non-numeric embedding value: {value}"),
        })?;
        vector.push(number as f32);
    }
    Ok(vector)
}
