//! Index fetching for chart repositories

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::config::Repository;
use crate::version::error::FetchError;
use crate::version::index::IndexDocument;

/// Trait for retrieving raw index documents
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait IndexFetcher: Send + Sync {
    /// Fetches the raw bytes of the index document at `url`
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - The response body of a successful request
    /// * `Err(FetchError)` - On transport failure or a non-success status
    async fn fetch_index(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher implementation backed by an HTTP client
pub struct HttpIndexFetcher {
    client: reqwest::Client,
}

impl HttpIndexFetcher {
    /// Creates a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("chart-version-monitor")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl IndexFetcher for HttpIndexFetcher {
    async fn fetch_index(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Chart repository returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// Fetch a repository's index and reduce it to the watched charts
pub async fn fetch_repository(
    fetcher: &dyn IndexFetcher,
    repository: &Repository,
) -> Result<IndexDocument, FetchError> {
    let body = fetcher.fetch_index(&repository.url).await?;
    IndexDocument::decode(&repository.url, &body, &repository.charts)
}
