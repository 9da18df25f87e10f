use crate::error::ProviderError;
use crate::models::{EmbeddingRecord, VectorMatch};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory vector index with cosine ranking. Clones share state, so one
/// instance can back an ingestion pipeline and a query pipeline at once.
/// Not durable; intended for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorIndex {
    namespaces: Arc<Mutex<HashMap<String, Vec<EmbeddingRecord>>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.lock().expect("index lock");
        namespaces.get(namespace).map_or(0, Vec::len)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(
        &self,
        namespace: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), ProviderError> {
        let mut namespaces = self.namespaces.lock().expect("index lock");
        let stored = namespaces.entry(namespace.to_string()).or_default();

        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ProviderError> {
        let namespaces = self.namespaces.lock().expect("index lock");
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored = stored
            .iter()
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(&record.values, vector),
                metadata: Some(record.metadata.clone()),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ProviderError> {
        let mut namespaces = self.namespaces.lock().expect("index lock");
        namespaces.remove(namespace);
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
