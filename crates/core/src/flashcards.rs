use crate::embeddings::EmbeddingProvider;
use crate::error::ChatError;
use crate::generation::GenerativeModel;
use crate::models::{Flashcard, FlashcardOptions};
use crate::traits::{DocumentStore, VectorIndex};
use tracing::info;

/// Probe text whose embedding stands in for "no particular question":
/// the namespace query just needs some vector to pull a broad sample.
const SAMPLE_PROBE: &str = "sample";

/// Generates study flashcards from a document's indexed content. Unlike
/// the chat pipeline this does not target a question: it pulls a large
/// unranked sample of the document's chunks and asks the model for
/// structured question/answer pairs.
pub struct FlashcardGenerator<E, V, G, S> {
    embedder: E,
    index: V,
    model: G,
    store: S,
    options: FlashcardOptions,
}

impl<E, V, G, S> FlashcardGenerator<E, V, G, S>
where
    E: EmbeddingProvider,
    V: VectorIndex,
    G: GenerativeModel,
    S: DocumentStore,
{
    pub fn new(embedder: E, index: V, model: G, store: S, options: FlashcardOptions) -> Self {
        Self {
            embedder,
            index,
            model,
            store,
            options,
        }
    }

    pub async fn generate(
        &self,
        user_id: &str,
        file_id: &str,
    ) -> Result<Vec<Flashcard>, ChatError> {
        self.store
            .document_for_user(file_id, user_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        let probe = self.embedder.embed(SAMPLE_PROBE).await?;
        let matches = self
            .index
            .query(file_id, &probe, self.options.sample_top_k())
            .await?;
        info!(file_id, matches = matches.len(), "sampled chunks for flashcards");

        let mut content = matches
            .iter()
            .filter_map(|hit| hit.metadata.as_ref())
            .map(|meta| meta.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        // Model input is bounded; trailing content is dropped, which may
        // bias cards toward the document's earlier sections.
        let budget = self.options.context_budget_chars();
        if content.chars().count() > budget {
            content = content.chars().take(budget).collect();
        }

        let prompt = build_flashcard_prompt(&content, &self.options);
        let raw = self.model.generate(&prompt).await?;
        let cards = parse_flashcards(&raw)?;
        info!(file_id, cards = cards.len(), "flashcards generated");
        Ok(cards)
    }
}

fn build_flashcard_prompt(content: &str, options: &FlashcardOptions) -> String {
    let count = options
        .count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "10-15".to_string());
    let difficulty = options
        .difficulty
        .map(|level| format!("- Target {level} difficulty\n"))
        .unwrap_or_default();

    format!(
        "You are a helpful tutor creating study flashcards from document content.\n\n\
Generate {count} high-quality flashcards from the following content. Each flashcard should:\n\
- Have a clear, concise question on the front\n\
- Have a detailed, accurate answer on the back\n\
- Focus on key concepts, definitions, and important facts\n\
- Be suitable for exam preparation\n\
{difficulty}\n\
Return ONLY a JSON array in this exact format:\n\
[\n  {{\n    \"front\": \"What is X?\",\n    \"back\": \"X is...\"\n  }},\n  \
{{\n    \"front\": \"Explain Y\",\n    \"back\": \"Y refers to...\"\n  }}\n]\n\n\
CONTENT:\n{content}\n\nJSON FLASHCARDS:"
    )
}

/// Models wrap JSON in markdown fences more often than not; strip the
/// fencing, then parse. A response that still does not parse is a
/// generation error, never an empty set.
fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, ChatError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim())
        .map_err(|error| ChatError::MalformedModelOutput(error.to_string()))
}
