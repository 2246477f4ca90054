//! The web front-end dispatcher.
//!
//! [`WebHandler`] owns one classification pass per request and hands each
//! intent to its strategy: discovery and static pages are answered in
//! place, the blob-addressed verbs construct a narrowly scoped delegate,
//! and Closure assets go through the strategy resolved at startup.
//!
//! Every response carries `Vary: Accept`, because discovery classification
//! depends on that header.
//!
//! Requests never mutate handler state; the only process-wide values (the
//! resolved asset strategy and the static source) are fixed at startup and
//! read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::request::Parts;
use http::StatusCode;

use caskd_core::{
    BlobFetcher, BlobRef, ConfigError, HttpResponse, ImageScaler, ScaledImageCache, ServerRoot,
    SignerDiscovery, StaticSource, UploadHelper, WebError, MAX_IMAGE_SIZE,
};

use crate::classify::{Classifier, Intent, DISCOVERY_CONTENT_TYPE};
use crate::closure::ClosureAssets;
use crate::deps;
use crate::discovery::{DiscoveryContribution, PublishRoot};
use crate::download::DownloadHandler;
use crate::filetree::FileTreeHandler;
use crate::request::RequestView;
use crate::static_files;
use crate::thumbnail::ThumbnailHandler;

/// The web front-end of the store.
///
/// Built once at startup via [`WebHandler::builder`] and shared across
/// requests behind an `Arc`.
pub struct WebHandler {
    prefix: String,
    json_sign_root: String,
    publish_roots: BTreeMap<String, PublishRoot>,
    root: Arc<dyn ServerRoot>,
    signer: Option<Arc<dyn SignerDiscovery>>,
    cache: Option<Arc<dyn BlobFetcher>>,
    scaled_cache: Option<Arc<dyn ScaledImageCache>>,
    scaler: Option<Arc<dyn ImageScaler>>,
    upload_helper: Option<Arc<dyn UploadHelper>>,
    ui_files: Arc<dyn StaticSource>,
    closure: Option<ClosureAssets>,
    classifier: Classifier,
}

impl std::fmt::Debug for WebHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebHandler")
            .field("prefix", &self.prefix)
            .field("json_sign_root", &self.json_sign_root)
            .field("publish_roots", &self.publish_roots)
            .finish_non_exhaustive()
    }
}

impl WebHandler {
    /// Starts building a handler.
    #[must_use]
    pub fn builder() -> WebHandlerBuilder {
        WebHandlerBuilder::new()
    }

    /// The mount prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handles one request.
    pub async fn serve(&self, parts: &Parts, body: Bytes) -> HttpResponse {
        let view = RequestView::new(&self.prefix, parts);
        let intent = self.classifier.classify(&view);
        tracing::debug!(method = %view.method(), suffix = view.suffix(), intent = ?intent, "dispatch");

        let mut resp = match intent {
            Intent::Discovery => self.serve_discovery().await,
            Intent::UploadHelper => self.serve_upload_helper(parts, body).await,
            Intent::Download => self.serve_download(&view).await,
            Intent::Thumbnail => self.serve_thumbnail(&view).await,
            Intent::FileTree => self.serve_tree(&view).await,
            Intent::ClosureAsset => self.serve_closure(&view, parts),
            Intent::Static { file } => self.serve_static(&file, parts),
            Intent::NotFound => error_response(&WebError::not_found("Illegal URL.")),
        };
        resp.headers_mut()
            .insert(header::VARY, HeaderValue::from_static("Accept"));
        resp
    }

    async fn serve_discovery(&self) -> HttpResponse {
        let mut map = self.root.discovery_base();
        let contribution = DiscoveryContribution {
            prefix: &self.prefix,
            json_sign_root: &self.json_sign_root,
            publish_roots: &self.publish_roots,
            root: self.root.as_ref(),
            signer: self.signer.as_deref(),
        };
        if let Err(err) = contribution.populate(&mut map).await {
            tracing::error!(error = %err, "discovery descriptor assembly failed");
            return error_response(&WebError::internal_with_source("Server error", err));
        }

        let body = serde_json::to_vec(&serde_json::Value::Object(map)).unwrap_or_default();
        http::Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, DISCOVERY_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, body.len().to_string())
            .body(http_body_util::Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| http::Response::new(http_body_util::Full::new(Bytes::new())))
    }

    async fn serve_upload_helper(&self, parts: &Parts, body: Bytes) -> HttpResponse {
        match &self.upload_helper {
            Some(helper) => helper.serve(parts, body).await,
            None => error_response(&WebError::internal("No upload helper configured")),
        }
    }

    async fn serve_download(&self, view: &RequestView) -> HttpResponse {
        let Some(storage) = self.root.storage() else {
            return no_blob_root();
        };
        let (ref_str, rest) = verb_ref(view.suffix(), "download/");
        let Some(blob) = BlobRef::parse(ref_str) else {
            return invalid_blobref();
        };
        DownloadHandler::new(storage, self.cache.clone())
            .serve(&blob, rest)
            .await
    }

    async fn serve_thumbnail(&self, view: &RequestView) -> HttpResponse {
        let Some(storage) = self.root.storage() else {
            return no_blob_root();
        };
        let (ref_str, _) = verb_ref(view.suffix(), "thumbnail/");
        let Some(blob) = BlobRef::parse(ref_str) else {
            return invalid_blobref();
        };
        let Some(scaler) = self.scaler.clone() else {
            tracing::error!("thumbnail requested but no image scaler is configured");
            return error_response(&WebError::internal("Server error"));
        };

        let width = bound(view.query_value("mw"));
        let height = bound(view.query_value("mh"));
        ThumbnailHandler::new(storage, self.scaled_cache.clone(), scaler, width, height)
            .serve(&blob)
            .await
    }

    async fn serve_tree(&self, view: &RequestView) -> HttpResponse {
        let Some(storage) = self.root.storage() else {
            return no_blob_root();
        };
        let (ref_str, _) = verb_ref(view.suffix(), "tree/");
        let Some(blob) = BlobRef::parse(ref_str) else {
            return invalid_blobref();
        };
        FileTreeHandler::new(storage, blob).serve().await
    }

    fn serve_closure(&self, view: &RequestView, parts: &Parts) -> HttpResponse {
        let Some(closure) = &self.closure else {
            tracing::warn!(suffix = view.suffix(), "closure handler not resolved");
            return static_files::not_found_response();
        };
        match self.classifier.closure_suffix(view.suffix()) {
            Some(asset_path) => closure.serve(asset_path, &parts.headers),
            None => static_files::not_found_response(),
        }
    }

    fn serve_static(&self, file: &str, parts: &Parts) -> HttpResponse {
        if file == "deps.js" {
            return self.serve_deps_js();
        }
        static_files::serve(self.ui_files.as_ref(), file, &parts.headers)
    }

    /// `deps.js` is never a literal file: it is generated from the scripts
    /// the static source currently holds.
    fn serve_deps_js(&self) -> HttpResponse {
        match deps::gen_deps(self.ui_files.as_ref()) {
            Ok(manifest) => {
                let body = format!("// auto-generated by caskd\n{manifest}");
                http::Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/javascript; charset=utf-8")
                    .header(header::CONTENT_LENGTH, body.len().to_string())
                    .body(http_body_util::Full::new(Bytes::from(body)))
                    .unwrap_or_else(|_| {
                        http::Response::new(http_body_util::Full::new(Bytes::new()))
                    })
            }
            Err(err) => {
                tracing::error!(error = %err, "deps.js generation failed");
                error_response(&WebError::internal_with_source("Server error", err))
            }
        }
    }
}

/// Splits `<verb>/<blobref>[/<suffix>]`, returning the reference string and
/// the optional suffix after it.
fn verb_ref<'a>(suffix: &'a str, verb: &str) -> (&'a str, Option<&'a str>) {
    let rest = suffix.strip_prefix(verb).unwrap_or("");
    match rest.split_once('/') {
        Some((ref_str, tail)) => (ref_str, Some(tail)),
        None => (rest, None),
    }
}

/// Thumbnail bound from a query value: absent, unparseable, or zero all
/// mean the system-wide maximum.
fn bound(value: Option<&str>) -> u32 {
    match value.and_then(|v| v.parse::<u32>().ok()) {
        None | Some(0) => MAX_IMAGE_SIZE,
        Some(n) => n,
    }
}

/// Converts a request-level error to its response; the only place a
/// [`WebError`] crosses the HTTP boundary.
fn error_response(err: &WebError) -> HttpResponse {
    static_files::plain_text(err.status_code(), &format!("{err}\n"))
}

fn no_blob_root() -> HttpResponse {
    error_response(&WebError::storage_unavailable("No BlobRoot configured"))
}

fn invalid_blobref() -> HttpResponse {
    error_response(&WebError::invalid_ref("Invalid blobref"))
}

/// Builder for [`WebHandler`].
///
/// The root collaborator and a static source are required; everything else
/// is optional and tolerated as absent at serve time.
#[derive(Default)]
pub struct WebHandlerBuilder {
    prefix: Option<String>,
    json_sign_root: String,
    publish_roots: BTreeMap<String, PublishRoot>,
    root: Option<Arc<dyn ServerRoot>>,
    signer: Option<Arc<dyn SignerDiscovery>>,
    cache: Option<Arc<dyn BlobFetcher>>,
    scaled_cache: Option<Arc<dyn ScaledImageCache>>,
    scaler: Option<Arc<dyn ImageScaler>>,
    upload_helper: Option<Arc<dyn UploadHelper>>,
    ui_files: Option<Arc<dyn StaticSource>>,
    closure: Option<ClosureAssets>,
}

impl WebHandlerBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mount prefix (must start and end with `/`).
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the JSON signing helper root.
    #[must_use]
    pub fn json_sign_root(mut self, root: impl Into<String>) -> Self {
        self.json_sign_root = root.into();
        self
    }

    /// Adds a publish root.
    #[must_use]
    pub fn publish_root(mut self, prefix: impl Into<String>, name: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.publish_roots.insert(
            prefix.clone(),
            PublishRoot {
                name: name.into(),
                prefix,
            },
        );
        self
    }

    /// Sets the required root collaborator.
    #[must_use]
    pub fn root(mut self, root: Arc<dyn ServerRoot>) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the signing collaborator.
    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn SignerDiscovery>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sets the blob cache.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn BlobFetcher>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the scaled-image cache.
    #[must_use]
    pub fn scaled_cache(mut self, cache: Arc<dyn ScaledImageCache>) -> Self {
        self.scaled_cache = Some(cache);
        self
    }

    /// Sets the image scaler.
    #[must_use]
    pub fn scaler(mut self, scaler: Arc<dyn ImageScaler>) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Sets the upload-helper collaborator.
    #[must_use]
    pub fn upload_helper(mut self, helper: Arc<dyn UploadHelper>) -> Self {
        self.upload_helper = Some(helper);
        self
    }

    /// Sets the UI static source.
    #[must_use]
    pub fn ui_files(mut self, files: Arc<dyn StaticSource>) -> Self {
        self.ui_files = Some(files);
        self
    }

    /// Sets the resolved Closure asset strategy.
    #[must_use]
    pub fn closure(mut self, closure: ClosureAssets) -> Self {
        self.closure = Some(closure);
        self
    }

    /// Builds the handler, validating required collaborators.
    pub fn build(self) -> Result<WebHandler, ConfigError> {
        let prefix = self.prefix.unwrap_or_else(|| "/web/".to_string());
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "mount prefix {prefix:?} must start and end with '/'"
            )));
        }
        let root = self.root.ok_or(ConfigError::MissingRootHandler)?;
        let ui_files = self.ui_files.ok_or_else(|| {
            ConfigError::MissingUiFiles(
                "configure a source root or build with embedded resources".to_string(),
            )
        })?;
        Ok(WebHandler {
            prefix,
            json_sign_root: self.json_sign_root,
            publish_roots: self.publish_roots,
            root,
            signer: self.signer,
            cache: self.cache,
            scaled_cache: self.scaled_cache,
            scaler: self.scaler,
            upload_helper: self.upload_helper,
            ui_files,
            closure: self.closure,
            classifier: Classifier::new(),
        })
    }
}
