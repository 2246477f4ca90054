//! Collaborator seams.
//!
//! The web front-end consumes the rest of the server through the narrow
//! traits in this module: blob storage is a fetch-by-reference capability,
//! search is a single lookup used to enrich discovery output, signing
//! contributes one sub-map to the discovery descriptor, and static assets
//! are an open-by-name capability returning content plus modification time.
//!
//! All trait objects are `Send + Sync`; implementations are expected to be
//! internally safe for concurrent use. Optional collaborators are carried as
//! `Option<Arc<dyn ...>>` and their absence must be tolerated by callers.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;
use http_body_util::Full;
use thiserror::Error;

use crate::blobref::BlobRef;

/// Type alias for the HTTP response body used throughout caskd.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response used throughout caskd.
pub type HttpResponse = Response<ResponseBody>;

/// Error returned by [`BlobFetcher::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The store has no blob with that reference.
    #[error("blob not found")]
    NotFound,

    /// The store failed for some other reason.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fetch-by-reference capability of the blob storage collaborator.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Fetches a blob's bytes and size by content reference.
    async fn fetch(&self, blob: &BlobRef) -> Result<(Bytes, u64), FetchError>;
}

/// A scaled image produced by the image collaborator.
#[derive(Debug, Clone)]
pub struct ScaledImage {
    /// Encoded image bytes.
    pub content: Bytes,
    /// MIME type of the encoded bytes.
    pub mime_type: String,
}

/// Cache for scaled images, keyed by source blob and requested bounds.
///
/// Used to avoid recomputing derived resources; absence must be tolerated.
#[async_trait]
pub trait ScaledImageCache: Send + Sync {
    /// Returns the cached scaled image, if present.
    async fn get(&self, blob: &BlobRef, max_width: u32, max_height: u32) -> Option<ScaledImage>;

    /// Stores a scaled image. Failures are the implementation's problem.
    async fn put(&self, blob: &BlobRef, max_width: u32, max_height: u32, image: ScaledImage);
}

/// Image transformation collaborator. Scaling internals live elsewhere.
#[async_trait]
pub trait ImageScaler: Send + Sync {
    /// Scales `source` down to fit within the given bounds.
    async fn scale(
        &self,
        source: Bytes,
        max_width: u32,
        max_height: u32,
    ) -> Result<ScaledImage, anyhow::Error>;
}

/// Error returned by [`SearchIndex`] lookups.
///
/// Callers in this crate's consumers treat any lookup failure as "no result";
/// the error text exists for debug logging only.
#[derive(Debug, Error)]
#[error("search lookup failed: {0}")]
pub struct SearchError(pub String);

/// The single search capability the front-end uses: resolving the permanode
/// a signer has claimed to carry a given attribute value.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns the permanode signed by `signer` whose `attr` equals `value`.
    async fn permanode_of_signer_attr_value(
        &self,
        signer: &BlobRef,
        attr: &str,
        value: &str,
    ) -> Result<BlobRef, SearchError>;
}

/// Signing collaborator's contribution to the discovery descriptor.
pub trait SignerDiscovery: Send + Sync {
    /// Returns the `signing` sub-map for the given sign-handler root path.
    fn discovery_map(&self, sign_root: &str) -> serde_json::Value;
}

/// Upload-helper collaborator; handles `camli.mode=uploadhelper` POSTs.
#[async_trait]
pub trait UploadHelper: Send + Sync {
    /// Serves an upload-helper request.
    async fn serve(&self, parts: &http::request::Parts, body: Bytes) -> HttpResponse;
}

/// The root handler the front-end is mounted under.
///
/// Supplies the storage and search handles and the server-wide base of the
/// discovery descriptor. Storage absence is a valid, checked state.
pub trait ServerRoot: Send + Sync {
    /// The blob storage handle, if configured.
    fn storage(&self) -> Option<Arc<dyn BlobFetcher>>;

    /// The search handle, if configured.
    fn search(&self) -> Option<Arc<dyn SearchIndex>>;

    /// The owner reference used for signed-attribute search lookups.
    fn owner(&self) -> Option<BlobRef>;

    /// Server-wide discovery keys, before the front-end adds its own.
    fn discovery_base(&self) -> serde_json::Map<String, serde_json::Value>;
}

/// A static resource: content plus modification time.
#[derive(Debug, Clone)]
pub struct StaticFile {
    /// File contents.
    pub content: Bytes,
    /// Modification time, when the source knows one.
    pub modified: Option<SystemTime>,
}

/// Open-by-name static resource collaborator.
///
/// Backed either by resources embedded in the binary or by a directory on
/// disk; the front-end does not care which.
pub trait StaticSource: Send + Sync {
    /// Opens a resource by slash-separated relative name.
    fn open(&self, name: &str) -> std::io::Result<StaticFile>;

    /// Lists all resource names, for dependency-manifest generation.
    fn names(&self) -> Vec<String>;
}

/// In-memory [`StaticSource`], standing in for embedded resources and used
/// heavily in tests.
#[derive(Debug, Clone, Default)]
pub struct MemSource {
    files: HashMap<String, Bytes>,
    modified: Option<SystemTime>,
}

impl MemSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named resource.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }

    /// Sets the modification time reported for every resource.
    #[must_use]
    pub fn modified(mut self, when: SystemTime) -> Self {
        self.modified = Some(when);
        self
    }

    /// Returns `true` if the source holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl StaticSource for MemSource {
    fn open(&self, name: &str) -> std::io::Result<StaticFile> {
        self.files
            .get(name)
            .map(|content| StaticFile {
                content: content.clone(),
                modified: self.modified,
            })
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Directory-backed [`StaticSource`].
///
/// Rejects names with parent-directory components so a request can never
/// escape the root.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> std::io::Result<PathBuf> {
        let rel = Path::new(name.trim_start_matches('/'));
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        format!("illegal path component in {name:?}"),
                    ));
                }
            }
        }
        Ok(self.root.join(rel))
    }

    fn collect_names(dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let rel = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            let path = entry.path();
            if path.is_dir() {
                Self::collect_names(&path, &rel, out);
            } else {
                out.push(rel);
            }
        }
    }
}

impl StaticSource for DirSource {
    fn open(&self, name: &str) -> std::io::Result<StaticFile> {
        let path = self.resolve(name)?;
        let content = std::fs::read(&path)?;
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Ok(StaticFile {
            content: Bytes::from(content),
            modified,
        })
    }

    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        Self::collect_names(&self.root, "", &mut names);
        names.sort();
        names
    }
}
