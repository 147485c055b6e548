//! Network client interface for catalog fetch and archive download.
//!
//! The engine consumes the catalog and archive bytes through the
//! [`CatalogClient`] trait; transport details stay behind it. The trait
//! is dyn-compatible via boxed futures so install flows can hold
//! `Arc<dyn CatalogClient>` and tests can substitute an in-memory
//! client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pack::{parse_catalog, PackManifest};

/// Default timeout for catalog and archive requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors raised by the network client.
///
/// All of them are retryable and none mutates installed state.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to fetch the catalog document.
    #[error("failed to fetch catalog from {url}: {reason}")]
    CatalogFetchFailed { url: String, reason: String },

    /// The catalog document did not parse or validate.
    #[error("failed to parse catalog from {url}: {reason}")]
    CatalogParseFailed { url: String, reason: String },

    /// Failed to download a pack archive.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The manifest carries no archive location to download from.
    #[error("manifest for {0} has no archive URL")]
    MissingArchiveUrl(String),

    /// The operation was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Catalog and archive access.
pub trait CatalogClient: Send + Sync {
    /// Fetch and parse the remote catalog.
    fn fetch_catalog(&self) -> BoxFuture<'_, Result<Vec<PackManifest>, ClientError>>;

    /// Download a pack archive into memory.
    ///
    /// Must return [`ClientError::Cancelled`] promptly once the token
    /// fires and must not leave partial state behind.
    fn download<'a>(
        &'a self,
        manifest: &'a PackManifest,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<Bytes, ClientError>>;
}

/// HTTP implementation of [`CatalogClient`].
pub struct HttpCatalogClient {
    client: reqwest::Client,
    catalog_url: String,
}

impl HttpCatalogClient {
    /// Create a client for a catalog URL with the default timeout.
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self::with_timeout(catalog_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(catalog_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            client,
            catalog_url: catalog_url.into(),
        }
    }

    /// The configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }
}

impl CatalogClient for HttpCatalogClient {
    fn fetch_catalog(&self) -> BoxFuture<'_, Result<Vec<PackManifest>, ClientError>> {
        Box::pin(async move {
            let url = self.catalog_url.clone();
            debug!(url = %url, "fetching catalog");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ClientError::CatalogFetchFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            let body = response
                .text()
                .await
                .map_err(|e| ClientError::CatalogFetchFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            parse_catalog(&body).map_err(|e| ClientError::CatalogParseFailed {
                url,
                reason: e.to_string(),
            })
        })
    }

    fn download<'a>(
        &'a self,
        manifest: &'a PackManifest,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<Bytes, ClientError>> {
        Box::pin(async move {
            let url = manifest
                .archive_url
                .clone()
                .ok_or_else(|| ClientError::MissingArchiveUrl(manifest.pack_id.clone()))?;
            debug!(pack_id = %manifest.pack_id, url = %url, "downloading pack archive");

            let request = async {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| ClientError::DownloadFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                response
                    .bytes()
                    .await
                    .map_err(|e| ClientError::DownloadFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    })
            };

            tokio::select! {
                _ = cancel.cancelled() => Err(ClientError::Cancelled),
                result = request => result,
            }
        })
    }
}
