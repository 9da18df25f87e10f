use crate::error::{ProviderError, StoreError};
use crate::models::{DocumentRecord, EmbeddingRecord, MessageRecord, UploadStatus, VectorMatch};
use async_trait::async_trait;

/// Vector storage partitioned by document namespace. The namespace is the
/// sole isolation mechanism between documents: every record lives under
/// the namespace equal to its owning document id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        namespace: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), ProviderError>;

    /// Top-K nearest records by the provider's similarity metric, best
    /// first. Zero matches is a valid empty result.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ProviderError>;

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ProviderError>;
}

/// Document records: the pipeline reads id/source and writes status; the
/// rest is owned by whatever sits behind this trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError>;

    /// Lookup scoped to the requesting user; returns None when the id does
    /// not exist or belongs to someone else.
    async fn document_for_user(
        &self,
        file_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError>;

    async fn list_documents(&self, user_id: &str) -> Result<Vec<DocumentRecord>, StoreError>;

    async fn update_status(&self, file_id: &str, status: UploadStatus) -> Result<(), StoreError>;

    async fn delete_document(&self, file_id: &str) -> Result<(), StoreError>;
}

/// Append-only conversation log keyed by document id.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError>;

    /// Newest messages first, at most `limit`.
    async fn recent_messages(
        &self,
        file_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError>;

    async fn delete_messages(&self, file_id: &str) -> Result<(), StoreError>;
}
