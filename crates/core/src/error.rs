use thiserror::Error;

/// Failures talking to a remote provider (embedding model, generative
/// model, or vector index).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {service}: {details}")]
    Backend { service: String, details: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

/// Failures in the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown document: {0}")]
    UnknownDocument(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("download failed: {0}")]
    Fetch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding task aborted: {0}")]
    TaskAborted(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("document not found")]
    NotFound,

    #[error("invalid request: {0}")]
    InvalidArgument(String),

    #[error("model output was not parseable: {0}")]
    MalformedModelOutput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
