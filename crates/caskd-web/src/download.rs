//! Blob download delegate.
//!
//! Constructed per request by the dispatcher and handed only the storage
//! and cache handles. An optional trailing path segment becomes the
//! recommended download name, if it looks sane.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use regex::Regex;

use caskd_core::{BlobFetcher, BlobRef, FetchError, HttpResponse};

use crate::static_files;

/// Serves raw blob bytes as an attachment.
pub struct DownloadHandler {
    fetcher: Arc<dyn BlobFetcher>,
    cache: Option<Arc<dyn BlobFetcher>>,
}

impl DownloadHandler {
    /// Creates a delegate over the given storage and optional cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn BlobFetcher>, cache: Option<Arc<dyn BlobFetcher>>) -> Self {
        Self { fetcher, cache }
    }

    /// Serves the blob, optionally naming the attachment `filename`.
    pub async fn serve(&self, blob: &BlobRef, filename: Option<&str>) -> HttpResponse {
        let fetched = match self.fetch(blob).await {
            Ok(fetched) => fetched,
            Err(FetchError::NotFound) => return static_files::not_found_response(),
            Err(FetchError::Other(err)) => {
                tracing::error!(blob = %blob, error = %err, "download fetch failed");
                return static_files::plain_text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error\n",
                );
            }
        };

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, fetched.len().to_string());
        if let Some(name) = filename.filter(|n| sane_filename(n)) {
            builder = builder.header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            );
        }
        builder
            .body(Full::new(fetched))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }

    async fn fetch(&self, blob: &BlobRef) -> Result<Bytes, FetchError> {
        if let Some(cache) = &self.cache {
            if let Ok((content, _)) = cache.fetch(blob).await {
                return Ok(content);
            }
        }
        self.fetcher.fetch(blob).await.map(|(content, _)| content)
    }
}

/// A download name is sane when it is a single short path segment of
/// ordinary filename characters, not starting with a dot.
fn sane_filename(name: &str) -> bool {
    let pattern = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-_.]{0,127}$").expect("filename pattern");
    pattern.is_match(name)
}
