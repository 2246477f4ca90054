//! Thumbnail delegate.
//!
//! Constructed per request with the storage handle, optional scaled-image
//! cache, the external scaler collaborator, and the resolved width/height
//! bounds. Scaling itself happens elsewhere; this layer only sequences
//! cache lookup, fetch, scale, and cache fill.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;

use caskd_core::{
    BlobFetcher, BlobRef, FetchError, HttpResponse, ImageScaler, ScaledImage, ScaledImageCache,
};

use crate::static_files;

/// Serves a scaled rendition of an image blob.
pub struct ThumbnailHandler {
    fetcher: Arc<dyn BlobFetcher>,
    cache: Option<Arc<dyn ScaledImageCache>>,
    scaler: Arc<dyn ImageScaler>,
    max_width: u32,
    max_height: u32,
}

impl ThumbnailHandler {
    /// Creates a delegate with resolved bounds.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn BlobFetcher>,
        cache: Option<Arc<dyn ScaledImageCache>>,
        scaler: Arc<dyn ImageScaler>,
        max_width: u32,
        max_height: u32,
    ) -> Self {
        Self {
            fetcher,
            cache,
            scaler,
            max_width,
            max_height,
        }
    }

    /// Serves the thumbnail for `blob`.
    pub async fn serve(&self, blob: &BlobRef) -> HttpResponse {
        if let Some(cache) = &self.cache {
            if let Some(image) = cache.get(blob, self.max_width, self.max_height).await {
                return image_response(&image);
            }
        }

        let source = match self.fetcher.fetch(blob).await {
            Ok((content, _)) => content,
            Err(FetchError::NotFound) => return static_files::not_found_response(),
            Err(FetchError::Other(err)) => {
                tracing::error!(blob = %blob, error = %err, "thumbnail source fetch failed");
                return server_error();
            }
        };

        let image = match self
            .scaler
            .scale(source, self.max_width, self.max_height)
            .await
        {
            Ok(image) => image,
            Err(err) => {
                tracing::error!(blob = %blob, error = %err, "image scaling failed");
                return server_error();
            }
        };

        if let Some(cache) = &self.cache {
            cache
                .put(blob, self.max_width, self.max_height, image.clone())
                .await;
        }
        image_response(&image)
    }
}

fn image_response(image: &ScaledImage) -> HttpResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.mime_type.clone())
        .header(header::CONTENT_LENGTH, image.content.len().to_string())
        .body(Full::new(image.content.clone()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn server_error() -> HttpResponse {
    static_files::plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Server error\n")
}
