use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing status of an uploaded document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// One uploaded file. The ingestion pipeline reads `id` and `source`
/// and writes `status`; everything else belongs to the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    /// Retrievable location of the raw file (URL or local path).
    pub source: String,
    pub user_id: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            source: source.into(),
            user_id: user_id.into(),
            status: UploadStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// A contiguous span of document text. Ephemeral: produced and consumed
/// within one ingestion run. `start` is the char offset into the page
/// text the chunk was cut from, so overlap can be reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub index: usize,
    pub start: usize,
    pub text: String,
}

/// Payload stored alongside each vector. `text` is required to rebuild
/// context at query time; `file_id` must always equal the namespace the
/// record lives under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub text: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

/// One (vector, metadata) pair as submitted to the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One retrieval hit, ordered by descending provider-defined similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

/// One turn in a document's conversation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub file_id: String,
    pub user_id: String,
    pub text: String,
    pub is_user_message: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn user(file_id: &str, user_id: &str, text: impl Into<String>) -> Self {
        Self::build(file_id, user_id, text, true)
    }

    pub fn system(file_id: &str, user_id: &str, text: impl Into<String>) -> Self {
        Self::build(file_id, user_id, text, false)
    }

    fn build(file_id: &str, user_id: &str, text: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_id: file_id.to_string(),
            user_id: user_id.to_string(),
            text: text.into(),
            is_user_message: is_user,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlashcardDifficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for FlashcardDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
    /// Upper bound on in-flight embedding calls.
    pub embed_concurrency: usize,
    /// Vector index providers cap batch sizes; upserts are split accordingly.
    pub upsert_batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1_000,
            overlap_chars: 200,
            embed_concurrency: 8,
            upsert_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub top_k: usize,
    pub max_message_chars: usize,
    pub history_limit: usize,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_message_chars: 2_000,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlashcardOptions {
    /// Exact number of cards to request; the prompt asks for 10-15 when unset.
    pub count: Option<usize>,
    pub difficulty: Option<FlashcardDifficulty>,
    pub sample_top_k: Option<usize>,
    pub context_budget_chars: Option<usize>,
}

impl FlashcardOptions {
    pub fn sample_top_k(&self) -> usize {
        self.sample_top_k.unwrap_or(100)
    }

    pub fn context_budget_chars(&self) -> usize {
        self.context_budget_chars.unwrap_or(10_000)
    }
}
