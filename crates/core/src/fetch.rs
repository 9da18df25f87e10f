use crate::error::IngestError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

/// Retrieves the raw bytes of an uploaded document from its source
/// location.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, IngestError>;
}

/// Fetches `http(s)` URLs over the network; any other location string is
/// treated as a local filesystem path.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new() -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobFetcher for SourceFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, IngestError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self.client.get(location).send().await?;
            if !response.status().is_success() {
                return Err(IngestError::Fetch(format!(
                    "{} returned {}",
                    location,
                    response.status()
                )));
            }
            return Ok(response.bytes().await?.to_vec());
        }

        let bytes = tokio::fs::read(Path::new(location)).await?;
        Ok(bytes)
    }
}
