use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::constants::HTTP_USER_AGENT;
use crate::error::{EtlError, Result};
use crate::types::RawDocument;

/// Source of the raw markup the pipeline extracts from.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<RawDocument>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<RawDocument> {
        info!("HTTP GET request to: {}", source);
        let response = self
            .client
            .get(source)
            .header("User-Agent", HTTP_USER_AGENT)
            .send()
            .await
            .map_err(|e| EtlError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EtlError::Fetch(format!(
                "GET {} failed with status: {}",
                source,
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| EtlError::Fetch(format!("reading body of {}: {}", source, e)))?;
        info!("HTTP response: size={} bytes", text.len());
        Ok(RawDocument::new(text))
    }
}

/// Reads markup from disk. Accepts plain paths and `file://` URLs.
#[derive(Default)]
pub struct FileFetcher;

#[async_trait]
impl DocumentFetcher for FileFetcher {
    async fn fetch(&self, source: &str) -> Result<RawDocument> {
        let path = PathBuf::from(source.strip_prefix("file://").unwrap_or(source));
        info!("Reading document from {}", path.display());
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EtlError::Fetch(format!("{}: {}", path.display(), e)))?;
        Ok(RawDocument::new(text))
    }
}

/// HTTP(S) URLs go over the network; anything else is read from disk.
pub fn fetcher_for(source: &str) -> Box<dyn DocumentFetcher> {
    if source.starts_with("http://") || source.starts_with("https://") {
        Box::new(HttpFetcher::new())
    } else {
        Box::new(FileFetcher)
    }
}
