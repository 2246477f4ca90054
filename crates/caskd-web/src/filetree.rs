//! File-tree delegate.
//!
//! Serves the directory schema blob named in the request; the tree page
//! renders it client-side. The schema's structure is the storage layer's
//! business, not this one's.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;

use caskd_core::{BlobFetcher, BlobRef, FetchError, HttpResponse};

use crate::static_files;

/// Serves one directory schema blob as JSON.
pub struct FileTreeHandler {
    fetcher: Arc<dyn BlobFetcher>,
    file: BlobRef,
}

impl FileTreeHandler {
    /// Creates a delegate for the given directory blob.
    #[must_use]
    pub fn new(fetcher: Arc<dyn BlobFetcher>, file: BlobRef) -> Self {
        Self { fetcher, file }
    }

    /// Serves the schema blob.
    pub async fn serve(&self) -> HttpResponse {
        match self.fetcher.fetch(&self.file).await {
            Ok((content, _)) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, content.len().to_string())
                .body(Full::new(content))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
            Err(FetchError::NotFound) => static_files::not_found_response(),
            Err(FetchError::Other(err)) => {
                tracing::error!(blob = %self.file, error = %err, "file tree fetch failed");
                static_files::plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Server error\n")
            }
        }
    }
}
