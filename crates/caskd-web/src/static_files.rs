//! Serving named static resources.
//!
//! The front-end treats its static assets as an opaque open-by-name
//! capability ([`StaticSource`]): open failure means 404, success means
//! content plus modification time. This module adds the HTTP dressing:
//! content type by extension, `Last-Modified`, and `If-Modified-Since`
//! handling.

use bytes::Bytes;
use http::{header, HeaderMap, Response, StatusCode};
use http_body_util::Full;

use caskd_core::{HttpResponse, StaticFile, StaticSource};

/// Serves `name` from `source`, or a 404 when it cannot be opened.
pub fn serve(source: &dyn StaticSource, name: &str, headers: &HeaderMap) -> HttpResponse {
    let file = match source.open(name) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(file = name, error = %err, "failed to open static file");
            return not_found_response();
        }
    };
    serve_file(name, &file, headers)
}

/// Builds the response for an already-opened file.
pub fn serve_file(name: &str, file: &StaticFile, headers: &HeaderMap) -> HttpResponse {
    if let (Some(modified), Some(since)) = (file.modified, if_modified_since(headers)) {
        // HTTP dates have second precision; compare truncated.
        let modified_secs = modified
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let since_secs = since
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if modified_secs <= since_secs {
            return Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .body(Full::new(Bytes::new()))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
        }
    }

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(name))
        .header(header::CONTENT_LENGTH, file.content.len().to_string());
    if let Some(modified) = file.modified {
        builder = builder.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }
    builder
        .body(Full::new(file.content.clone()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// A plain 404 with the standard body.
#[must_use]
pub fn not_found_response() -> HttpResponse {
    plain_text(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// A short plain-text response, used for all error bodies.
#[must_use]
pub fn plain_text(status: StatusCode, body: &str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn if_modified_since(headers: &HeaderMap) -> Option<std::time::SystemTime> {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
}

/// Content type by file extension.
///
/// Only the types the front-end actually serves; everything else is an
/// opaque octet stream.
#[must_use]
pub fn content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    match ext {
        "html" => "text/html; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
