pub mod chat;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod flashcards;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod stores;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use chat::{ChatPipeline, NO_CONTEXT_PLACEHOLDER};
pub use chunking::{split_text, ChunkingConfig};
pub use embeddings::{EmbeddingProvider, GeminiEmbedder, DEFAULT_EMBEDDING_MODEL};
pub use error::{ChatError, IngestError, ProviderError, StoreError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use fetch::{BlobFetcher, SourceFetcher};
pub use flashcards::FlashcardGenerator;
pub use generation::{GeminiGenerator, GenerativeModel, DEFAULT_GENERATION_MODEL};
pub use ingest::{delete_document, IngestionPipeline, IngestionSummary};
pub use models::{
    ChatOptions, ChunkMetadata, DocumentRecord, EmbeddingRecord, Flashcard, FlashcardDifficulty,
    FlashcardOptions, IngestionOptions, MessageRecord, TextChunk, UploadStatus, VectorMatch,
};
pub use stores::{LocalLibrary, MemoryVectorIndex, PineconeIndex};
pub use traits::{DocumentStore, MessageStore, VectorIndex};
