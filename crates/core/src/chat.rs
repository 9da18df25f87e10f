use crate::embeddings::EmbeddingProvider;
use crate::error::ChatError;
use crate::generation::GenerativeModel;
use crate::models::{ChatOptions, MessageRecord, VectorMatch};
use crate::traits::{DocumentStore, MessageStore, VectorIndex};
use tracing::info;

/// Placeholder supplied to the model when retrieval finds nothing.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant content found.";

/// Answers a question about one document: embed the question, retrieve
/// the top-K chunks from the document's namespace, and ask the model to
/// answer strictly from that context.
///
/// The question is persisted before any model call and the answer only
/// after generation succeeds, so the conversation log never shows an
/// answer without its question, and a failed generation leaves the
/// question saved with no blank answer.
pub struct ChatPipeline<E, V, G, S> {
    embedder: E,
    index: V,
    model: G,
    store: S,
    options: ChatOptions,
}

impl<E, V, G, S> ChatPipeline<E, V, G, S>
where
    E: EmbeddingProvider,
    V: VectorIndex,
    G: GenerativeModel,
    S: DocumentStore + MessageStore,
{
    pub fn new(embedder: E, index: V, model: G, store: S, options: ChatOptions) -> Self {
        Self {
            embedder,
            index,
            model,
            store,
            options,
        }
    }

    pub async fn answer(
        &self,
        user_id: &str,
        file_id: &str,
        question: &str,
    ) -> Result<String, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidArgument("message is empty".to_string()));
        }
        if question.chars().count() > self.options.max_message_chars {
            return Err(ChatError::InvalidArgument(format!(
                "message exceeds {} characters",
                self.options.max_message_chars
            )));
        }

        self.store
            .document_for_user(file_id, user_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        self.store
            .append_message(MessageRecord::user(file_id, user_id, question))
            .await?;

        let query_vector = self.embedder.embed(question).await?;
        let matches = self
            .index
            .query(file_id, &query_vector, self.options.top_k)
            .await?;
        info!(file_id, matches = matches.len(), "retrieved context chunks");

        let context = assemble_context(&matches);
        let prompt = build_answer_prompt(
            context.as_deref().unwrap_or(NO_CONTEXT_PLACEHOLDER),
            question,
        );

        // Generation failure surfaces to the caller; no system message is
        // written for it.
        let reply = self.model.generate(&prompt).await?;

        self.store
            .append_message(MessageRecord::system(file_id, user_id, reply.clone()))
            .await?;
        Ok(reply)
    }

    /// The document's conversation, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        file_id: &str,
    ) -> Result<Vec<MessageRecord>, ChatError> {
        self.store
            .document_for_user(file_id, user_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        Ok(self
            .store
            .recent_messages(file_id, user_id, self.options.history_limit)
            .await?)
    }
}

/// Context block from retrieval hits: stored chunk texts in descending
/// relevance order, each labeled with its rank. None when no hit carries
/// usable text.
fn assemble_context(matches: &[VectorMatch]) -> Option<String> {
    let blocks = matches
        .iter()
        .filter_map(|hit| hit.metadata.as_ref())
        .filter(|meta| !meta.text.trim().is_empty())
        .enumerate()
        .map(|(rank, meta)| format!("[Chunk {}]:\n{}", rank + 1, meta.text))
        .collect::<Vec<_>>();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n---\n\n"))
    }
}

// The instruction to answer only from the excerpts, and to say so when
// the answer is not there, is the only defense against fabricated
// answers. Keep it intact when editing.
fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful AI assistant analyzing a PDF document. Use the following excerpts \
from the document to answer the user's question accurately and concisely.\n\n\
If the information is not in the provided context, say \"I couldn't find that information in the document.\"\n\n\
DOCUMENT EXCERPTS:\n{context}\n\n\
USER QUESTION: {question}\n\n\
ANSWER:"
    )
}
