use crate::chunking::{split_text, ChunkingConfig};
use crate::embeddings::EmbeddingProvider;
use crate::error::{ChatError, IngestError};
use crate::extractor::PdfExtractor;
use crate::fetch::BlobFetcher;
use crate::models::{ChunkMetadata, EmbeddingRecord, IngestionOptions, TextChunk, UploadStatus};
use crate::traits::{DocumentStore, MessageStore, VectorIndex};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct IngestionSummary {
    pub pages: usize,
    pub chunks: usize,
}

/// Runs one uploaded document through download, text extraction,
/// chunking, embedding, and indexing, updating its status along the way.
///
/// A failure at any stage marks the document `Failed` and leaves no
/// partial namespace content behind; there is no partial retry, the whole
/// run must be re-triggered to recover.
pub struct IngestionPipeline<F, X, E, V, D> {
    fetcher: F,
    extractor: X,
    embedder: Arc<E>,
    index: V,
    documents: D,
    options: IngestionOptions,
}

impl<F, X, E, V, D> IngestionPipeline<F, X, E, V, D>
where
    F: BlobFetcher,
    X: PdfExtractor,
    E: EmbeddingProvider + 'static,
    V: VectorIndex,
    D: DocumentStore,
{
    pub fn new(
        fetcher: F,
        extractor: X,
        embedder: E,
        index: V,
        documents: D,
        options: IngestionOptions,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            embedder: Arc::new(embedder),
            index,
            documents,
            options,
        }
    }

    pub async fn run(&self, file_id: &str, source: &str) -> Result<IngestionSummary, IngestError> {
        self.documents
            .update_status(file_id, UploadStatus::Processing)
            .await?;
        info!(file_id, source, model = self.embedder.model_name(), "ingestion started");

        match self.process(file_id, source).await {
            Ok(summary) => {
                self.documents
                    .update_status(file_id, UploadStatus::Success)
                    .await?;
                info!(
                    file_id,
                    pages = summary.pages,
                    chunks = summary.chunks,
                    "ingestion succeeded"
                );
                Ok(summary)
            }
            Err(error) => {
                // A namespace reported as failed must not keep partial
                // content; cleanup failure is logged, not fatal.
                if let Err(cleanup) = self.index.delete_namespace(file_id).await {
                    warn!(file_id, error = %cleanup, "namespace cleanup after failure did not complete");
                }
                if let Err(status) = self
                    .documents
                    .update_status(file_id, UploadStatus::Failed)
                    .await
                {
                    warn!(file_id, error = %status, "unable to mark document failed");
                }
                warn!(file_id, error = %error, "ingestion failed");
                Err(error)
            }
        }
    }

    async fn process(&self, file_id: &str, source: &str) -> Result<IngestionSummary, IngestError> {
        let bytes = self.fetcher.fetch(source).await?;
        let pages = self.extractor.extract(&bytes)?;

        let config = ChunkingConfig::from(&self.options);
        let mut chunks: Vec<TextChunk> = Vec::new();
        for page in &pages {
            let base = chunks.len();
            chunks.extend(split_text(&page.text, config)?.into_iter().map(|mut chunk| {
                chunk.index += base;
                chunk
            }));
        }

        // Zero extractable text is an empty but valid document.
        if chunks.is_empty() {
            return Ok(IngestionSummary {
                pages: pages.len(),
                chunks: 0,
            });
        }

        let records = self.embed_chunks(file_id, &chunks).await?;
        for batch in records.chunks(self.options.upsert_batch_size.max(1)) {
            self.index.upsert(file_id, batch).await?;
        }

        Ok(IngestionSummary {
            pages: pages.len(),
            chunks: chunks.len(),
        })
    }

    /// Embeds every chunk concurrently, bounded by `embed_concurrency`
    /// permits. Any single failure fails the whole run: a document is
    /// better marked failed than silently indexed incomplete.
    async fn embed_chunks(
        &self,
        file_id: &str,
        chunks: &[TextChunk],
    ) -> Result<Vec<EmbeddingRecord>, IngestError> {
        let semaphore = Arc::new(Semaphore::new(self.options.embed_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for chunk in chunks {
            let semaphore = Arc::clone(&semaphore);
            let embedder = Arc::clone(&self.embedder);
            let text = chunk.text.clone();
            let ordinal = chunk.index;
            let file_id = file_id.to_string();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|error| IngestError::TaskAborted(error.to_string()))?;
                let values = embedder.embed(&text).await?;
                Ok::<_, IngestError>((
                    ordinal,
                    EmbeddingRecord {
                        id: format!("{file_id}-{ordinal}"),
                        values,
                        metadata: ChunkMetadata { text, file_id },
                    },
                ))
            });
        }

        let mut records = Vec::with_capacity(chunks.len());
        while let Some(joined) = tasks.join_next().await {
            let (ordinal, record) =
                joined.map_err(|error| IngestError::TaskAborted(error.to_string()))??;
            records.push((ordinal, record));
        }

        records.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }
}

/// Removes a document: vector namespace, conversation log, then the
/// document record. Index cleanup is best-effort and never blocks removal
/// from the store of record.
pub async fn delete_document<S, V>(
    store: &S,
    index: &V,
    user_id: &str,
    file_id: &str,
) -> Result<(), ChatError>
where
    S: DocumentStore + MessageStore,
    V: VectorIndex,
{
    if store.document_for_user(file_id, user_id).await?.is_none() {
        return Err(ChatError::NotFound);
    }

    if let Err(error) = index.delete_namespace(file_id).await {
        warn!(file_id, error = %error, "vector namespace cleanup failed; continuing with deletion");
    }

    store.delete_messages(file_id).await?;
    store.delete_document(file_id).await?;
    info!(file_id, "document deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentRecord, MessageRecord};
    use crate::stores::LocalLibrary;
    use crate::testutil::{
        HashEmbedder, RecordingIndex, StaticExtractor, StaticFetcher, UnreachableFetcher,
    };

    async fn seeded_library() -> (LocalLibrary, String) {
        let library = LocalLibrary::in_memory();
        let doc = DocumentRecord::new("notes.pdf", "https://files.test/notes.pdf", "alice");
        let id = doc.id.clone();
        library.insert_document(doc).await.unwrap();
        (library, id)
    }

    fn pipeline<F: BlobFetcher, X: PdfExtractor>(
        fetcher: F,
        extractor: X,
        embedder: HashEmbedder,
        index: RecordingIndex,
        library: LocalLibrary,
    ) -> IngestionPipeline<F, X, HashEmbedder, RecordingIndex, LocalLibrary> {
        IngestionPipeline::new(
            fetcher,
            extractor,
            embedder,
            index,
            library,
            IngestionOptions::default(),
        )
    }

    async fn status_of(library: &LocalLibrary, id: &str) -> UploadStatus {
        library
            .document_for_user(id, "alice")
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn successful_run_indexes_every_chunk_under_the_namespace() {
        let (library, id) = seeded_library().await;
        let index = RecordingIndex::new();
        let pipeline = pipeline(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor::pages(&["The sky is blue.", "Water is wet."]),
            HashEmbedder::new(),
            index.clone(),
            library.clone(),
        );

        let summary = pipeline.run(&id, "https://files.test/notes.pdf").await.unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.chunks, 2);
        assert_eq!(index.record_count(&id), 2);
        assert_eq!(status_of(&library, &id).await, UploadStatus::Success);

        let matches = index.query(&id, &[0.0; 64], 10).await.unwrap();
        for hit in &matches {
            assert_eq!(hit.metadata.as_ref().unwrap().file_id, id);
        }
        assert!(matches.iter().any(|m| m.id == format!("{id}-0")));
        assert!(matches.iter().any(|m| m.id == format!("{id}-1")));
    }

    #[tokio::test]
    async fn empty_document_succeeds_with_zero_embeddings() {
        let (library, id) = seeded_library().await;
        let embedder = HashEmbedder::new();
        let index = RecordingIndex::new();
        let pipeline = pipeline(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor(Vec::new()),
            embedder.clone(),
            index.clone(),
            library.clone(),
        );

        let summary = pipeline.run(&id, "src").await.unwrap();
        assert_eq!(summary.chunks, 0);
        assert_eq!(embedder.call_count(), 0);
        assert_eq!(index.record_count(&id), 0);
        assert_eq!(status_of(&library, &id).await, UploadStatus::Success);
    }

    #[tokio::test]
    async fn download_failure_marks_the_document_failed() {
        let (library, id) = seeded_library().await;
        let pipeline = pipeline(
            UnreachableFetcher,
            StaticExtractor(Vec::new()),
            HashEmbedder::new(),
            RecordingIndex::new(),
            library.clone(),
        );

        let result = pipeline.run(&id, "https://files.test/gone.pdf").await;
        assert!(matches!(result, Err(IngestError::Fetch(_))));
        assert_eq!(status_of(&library, &id).await, UploadStatus::Failed);
    }

    #[tokio::test]
    async fn one_embedding_failure_fails_the_whole_run() {
        let (library, id) = seeded_library().await;
        let index = RecordingIndex::new();
        let pages: Vec<String> = (0..6).map(|i| format!("Page {i} body text.")).collect();
        let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
        let pipeline = pipeline(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor::pages(&page_refs),
            HashEmbedder::failing_after(3),
            index.clone(),
            library.clone(),
        );

        let result = pipeline.run(&id, "src").await;
        assert!(result.is_err());
        assert_eq!(status_of(&library, &id).await, UploadStatus::Failed);
        // No partial namespace content survives a failed run.
        assert_eq!(index.record_count(&id), 0);
        assert!(index.delete_count() > 0);
    }

    #[tokio::test]
    async fn in_flight_embeddings_never_exceed_the_configured_bound() {
        let (library, id) = seeded_library().await;
        let pages: Vec<String> = (0..12).map(|i| format!("Page {i} text.")).collect();
        let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
        // Each embed call is held open so the calls genuinely overlap.
        let embedder = HashEmbedder::paced(std::time::Duration::from_millis(5));
        let pipeline = IngestionPipeline::new(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor::pages(&page_refs),
            embedder.clone(),
            RecordingIndex::new(),
            library,
            IngestionOptions {
                embed_concurrency: 3,
                ..IngestionOptions::default()
            },
        );

        let summary = pipeline.run(&id, "src").await.unwrap();
        assert_eq!(summary.chunks, 12);
        assert_eq!(embedder.call_count(), 12);

        let max = embedder.max_in_flight();
        assert!(max <= 3, "semaphore allowed {max} concurrent embeds");
        assert!(max >= 2, "paced embeds never overlapped");
    }

    #[tokio::test]
    async fn upsert_failure_fails_the_run() {
        let (library, id) = seeded_library().await;
        let index = RecordingIndex::failing_upsert();
        let pipeline = pipeline(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor::pages(&["Some text."]),
            HashEmbedder::new(),
            index,
            library.clone(),
        );

        assert!(pipeline.run(&id, "src").await.is_err());
        assert_eq!(status_of(&library, &id).await, UploadStatus::Failed);
    }

    #[tokio::test]
    async fn records_are_upserted_in_bounded_batches() {
        let (library, id) = seeded_library().await;
        let index = RecordingIndex::new();
        // One long boundary-free page chunks into many pieces.
        let page = "a".repeat(210_000);
        let pipeline = pipeline(
            StaticFetcher(b"%PDF".to_vec()),
            StaticExtractor::pages(&[page.as_str()]),
            HashEmbedder::new(),
            index.clone(),
            library,
        );

        let summary = pipeline.run(&id, "src").await.unwrap();
        assert!(summary.chunks > 100);

        let batches = index.batch_sizes();
        assert!(batches.len() > 1);
        assert!(batches.iter().all(|size| *size <= 100));
        assert_eq!(batches.iter().sum::<usize>(), summary.chunks);
    }

    #[tokio::test]
    async fn delete_document_cascades_even_when_index_cleanup_fails() {
        let (library, id) = seeded_library().await;
        library
            .append_message(MessageRecord::user(&id, "alice", "what is this?"))
            .await
            .unwrap();
        let index = RecordingIndex::failing_delete();

        delete_document(&library, &index, "alice", &id).await.unwrap();

        assert!(library
            .document_for_user(&id, "alice")
            .await
            .unwrap()
            .is_none());
        assert!(library
            .recent_messages(&id, "alice", 10)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(index.delete_count(), 1);
    }

    #[tokio::test]
    async fn delete_document_rejects_other_users() {
        let (library, id) = seeded_library().await;
        let index = RecordingIndex::new();
        let result = delete_document(&library, &index, "mallory", &id).await;
        assert!(matches!(result, Err(ChatError::NotFound)));
        assert_eq!(index.delete_count(), 0);
    }
}
