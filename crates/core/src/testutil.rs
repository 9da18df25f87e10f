//! Fake collaborators for pipeline tests.

use crate::embeddings::EmbeddingProvider;
use crate::error::{IngestError, ProviderError};
use crate::extractor::{PageText, PdfExtractor};
use crate::fetch::BlobFetcher;
use crate::generation::GenerativeModel;
use crate::models::{EmbeddingRecord, VectorMatch};
use crate::stores::MemoryVectorIndex;
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deterministic char-trigram embedder. Close enough to a real embedding
/// space for retrieval assertions, with optional failure injection.
/// Clones share the call counter.
#[derive(Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    delay: Option<Duration>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: 64,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            delay: None,
        }
    }

    /// Succeeds for the first `calls` embeddings, then fails every call.
    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::new()
        }
    }

    /// Holds each call open for `delay` so concurrent calls overlap and
    /// `max_in_flight` observes real concurrency.
    pub fn paced(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of embed calls that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "test-trigram"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_after, Some(limit) if call >= limit) {
            return Err(ProviderError::Backend {
                service: "test-embedder".to_string(),
                details: "simulated provider failure".to_string(),
            });
        }

        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(live, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut vector = vec![0f32; self.dimensions];
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for ch in window {
                for byte in ch.to_string().bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }

        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vector)
    }
}

/// Serves fixed bytes for any location.
pub struct StaticFetcher(pub Vec<u8>);

#[async_trait]
impl BlobFetcher for StaticFetcher {
    async fn fetch(&self, _location: &str) -> Result<Vec<u8>, IngestError> {
        Ok(self.0.clone())
    }
}

/// Fetcher that always fails, for download-error paths.
pub struct UnreachableFetcher;

#[async_trait]
impl BlobFetcher for UnreachableFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, IngestError> {
        Err(IngestError::Fetch(format!("{location} is unreachable")))
    }
}

/// Returns canned pages, ignoring the bytes.
pub struct StaticExtractor(pub Vec<PageText>);

impl StaticExtractor {
    pub fn pages(texts: &[&str]) -> Self {
        Self(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| PageText {
                    number: (i + 1) as u32,
                    text: (*text).to_string(),
                })
                .collect(),
        )
    }
}

impl PdfExtractor for StaticExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        Ok(self.0.clone())
    }
}

enum ModelScript {
    Reply(String),
    EchoPrompt,
    Fail,
}

/// Generative model stub. Records every prompt it receives; clones share
/// the recording.
#[derive(Clone)]
pub struct ScriptedModel {
    script: Arc<ModelScript>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::with_script(ModelScript::Reply(text.into()))
    }

    pub fn echo() -> Self {
        Self::with_script(ModelScript::EchoPrompt)
    }

    pub fn failing() -> Self {
        Self::with_script(ModelScript::Fail)
    }

    fn with_script(script: ModelScript) -> Self {
        Self {
            script: Arc::new(script),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("prompt lock").last().cloned()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());

        match &*self.script {
            ModelScript::Reply(text) => Ok(text.clone()),
            ModelScript::EchoPrompt => Ok(prompt.to_string()),
            ModelScript::Fail => Err(ProviderError::Backend {
                service: "test-model".to_string(),
                details: "simulated generation failure".to_string(),
            }),
        }
    }
}

/// Memory index wrapper that records upsert batch sizes and can be told
/// to fail specific operations.
#[derive(Clone, Default)]
pub struct RecordingIndex {
    inner: MemoryVectorIndex,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    fail_upsert: bool,
    fail_delete: bool,
    deletes: Arc<AtomicUsize>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upsert() -> Self {
        Self {
            fail_upsert: true,
            ..Self::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().expect("batch lock").clone()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn record_count(&self, namespace: &str) -> usize {
        self.inner.record_count(namespace)
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(
        &self,
        namespace: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), ProviderError> {
        if self.fail_upsert {
            return Err(ProviderError::Backend {
                service: "test-index".to_string(),
                details: "simulated upsert failure".to_string(),
            });
        }
        self.batch_sizes
            .lock()
            .expect("batch lock")
            .push(records.len());
        self.inner.upsert(namespace, records).await
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ProviderError> {
        self.inner.query(namespace, vector, top_k).await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ProviderError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(ProviderError::Backend {
                service: "test-index".to_string(),
                details: "simulated delete failure".to_string(),
            });
        }
        self.inner.delete_namespace(namespace).await
    }
}
