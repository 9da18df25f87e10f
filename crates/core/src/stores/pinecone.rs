use crate::error::ProviderError;
use crate::models::{ChunkMetadata, EmbeddingRecord, VectorMatch};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Vector index backed by a Pinecone serverless index, addressed by its
/// data-plane host.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    host: String,
    api_key: String,
    client: Client,
}

impl PineconeIndex {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let host = host.into().trim_end_matches('/').to_string();
        Url::parse(&host)?;

        Ok(Self {
            host,
            api_key: api_key.into(),
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Backend {
                service: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        namespace: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), ProviderError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.values,
                    "metadata": {
                        "text": record.metadata.text,
                        "fileId": record.metadata.file_id,
                    },
                })
            })
            .collect::<Vec<_>>();

        self.post(
            "/vectors/upsert",
            json!({ "namespace": namespace, "vectors": vectors }),
        )
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ProviderError> {
        let parsed = self
            .post(
                "/query",
                json!({
                    "namespace": namespace,
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        let hits = parsed
            .pointer("/matches")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            let id = hit
                .pointer("/id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let metadata = hit.pointer("/metadata").and_then(|meta| {
                let text = meta.pointer("/text")?.as_str()?.to_string();
                let file_id = meta.pointer("/fileId")?.as_str()?.to_string();
                Some(ChunkMetadata { text, file_id })
            });

            matches.push(VectorMatch {
                id,
                score,
                metadata,
            });
        }

        Ok(matches)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ProviderError> {
        self.post(
            "/vectors/delete",
            json!({ "namespace": namespace, "deleteAll": true }),
        )
        .await?;

        Ok(())
    }
}
