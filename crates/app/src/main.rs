use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_chat_core::{
    delete_document, ChatOptions, ChatPipeline, DocumentRecord, DocumentStore, FlashcardDifficulty,
    FlashcardGenerator, FlashcardOptions, GeminiEmbedder, GeminiGenerator, IngestionOptions,
    IngestionPipeline, LocalLibrary, LopdfExtractor, PineconeIndex, SourceFetcher,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Identity owning the documents; threaded into every operation.
    #[arg(long, default_value = "local")]
    user: String,

    /// Library state file (documents and conversation log).
    #[arg(long, default_value = "pdf-chat-library.json")]
    library: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// Gemini API base URL
    #[arg(long, default_value = "https://generativelanguage.googleapis.com")]
    gemini_endpoint: String,

    /// Generation model
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    generation_model: String,

    /// Embedding model; must stay the same between upload and ask.
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Pinecone index data-plane host, e.g. https://my-index-abc123.svc.us-east-1-aws.pinecone.io
    #[arg(long, env = "PINECONE_HOST")]
    pinecone_host: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: String,
}

#[derive(Subcommand)]
enum Command {
    /// Register a PDF and ingest it into the vector index.
    Upload {
        /// PDF location: an http(s) URL or a local path.
        #[arg(long)]
        source: String,
        /// Display name; defaults to the last path segment of the source.
        #[arg(long)]
        name: Option<String>,
    },
    /// Ask a question about an uploaded document.
    Ask {
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        question: String,
    },
    /// Print a document's conversation log.
    Messages {
        #[arg(long)]
        file_id: String,
    },
    /// Generate study flashcards from a document.
    Flashcards {
        #[arg(long)]
        file_id: String,
        /// Exact number of cards; the model targets 10-15 when omitted.
        #[arg(long)]
        count: Option<usize>,
        /// easy, medium, or hard
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// List the user's documents.
    List,
    /// Delete a document, its messages, and its vector namespace.
    Delete {
        #[arg(long)]
        file_id: String,
    },
}

fn parse_difficulty(raw: &str) -> anyhow::Result<FlashcardDifficulty> {
    match raw.to_ascii_lowercase().as_str() {
        "easy" => Ok(FlashcardDifficulty::Easy),
        "medium" => Ok(FlashcardDifficulty::Medium),
        "hard" => Ok(FlashcardDifficulty::Hard),
        other => anyhow::bail!("unknown difficulty {other:?}; use easy, medium, or hard"),
    }
}

fn display_name(source: &str, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        source
            .rsplit(['/', '\\'])
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(source)
            .to_string()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let library = LocalLibrary::open(&cli.library)
        .with_context(|| format!("opening library {}", cli.library))?;
    let embedder = GeminiEmbedder::new(
        &cli.gemini_endpoint,
        &cli.embedding_model,
        &cli.gemini_api_key,
    )?;
    let model = GeminiGenerator::new(
        &cli.gemini_endpoint,
        &cli.generation_model,
        &cli.gemini_api_key,
    )?;
    let index = PineconeIndex::new(&cli.pinecone_host, &cli.pinecone_api_key)?;

    info!(
        version = app_version,
        generation_model = model.model_name(),
        embedding_model = %cli.embedding_model,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    match cli.command {
        Command::Upload { source, name } => {
            let document =
                DocumentRecord::new(display_name(&source, name), source.as_str(), cli.user.as_str());
            let file_id = document.id.clone();
            library.insert_document(document).await?;

            let pipeline = IngestionPipeline::new(
                SourceFetcher::new()?,
                LopdfExtractor,
                embedder,
                index,
                library,
                IngestionOptions::default(),
            );

            let summary = pipeline
                .run(&file_id, &source)
                .await
                .with_context(|| format!("ingesting {source}"))?;
            println!(
                "{} chunks indexed from {} page(s); file id: {file_id}",
                summary.chunks, summary.pages
            );
        }
        Command::Ask { file_id, question } => {
            let chat = ChatPipeline::new(embedder, index, model, library, ChatOptions::default());
            let answer = chat.answer(&cli.user, &file_id, &question).await?;
            println!("{answer}");
        }
        Command::Messages { file_id } => {
            let chat = ChatPipeline::new(embedder, index, model, library, ChatOptions::default());
            let history = chat.history(&cli.user, &file_id).await?;
            // Stored newest first; print chronologically.
            for message in history.iter().rev() {
                let author = if message.is_user_message { "you" } else { "assistant" };
                println!(
                    "[{}] {author}: {}",
                    message.created_at.to_rfc3339(),
                    message.text
                );
            }
        }
        Command::Flashcards {
            file_id,
            count,
            difficulty,
        } => {
            let options = FlashcardOptions {
                count,
                difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                ..FlashcardOptions::default()
            };
            let generator = FlashcardGenerator::new(embedder, index, model, library, options);
            let cards = generator.generate(&cli.user, &file_id).await?;
            for (number, card) in cards.iter().enumerate() {
                println!("{}. Q: {}", number + 1, card.front);
                println!("   A: {}", card.back);
            }
        }
        Command::List => {
            for document in library.list_documents(&cli.user).await? {
                println!(
                    "{}  {:?}  {}  uploaded {}",
                    document.id,
                    document.status,
                    document.name,
                    document.created_at.to_rfc3339()
                );
            }
        }
        Command::Delete { file_id } => {
            delete_document(&library, &index, &cli.user, &file_id).await?;
            println!("deleted {file_id}");
        }
    }

    Ok(())
}
