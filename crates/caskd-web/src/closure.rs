//! Closure library asset resolution and serving.
//!
//! The served UI needs Google's Closure JavaScript library. Where those
//! files come from is decided once, at startup, by an ordered fallback
//! chain:
//!
//! 1. a development override directory from the environment, for live
//!    editing without rebuilding;
//! 2. with no configured root hint: the archive embedded in the binary,
//!    falling back to redirects against the upstream library when the
//!    archive is absent (a known limitation: that path fails offline);
//! 3. an `http(s)` root hint: redirects against that base;
//! 4. any other hint: a source checkout on disk, which must contain the
//!    library at its expected location.
//!
//! The decision is a pure function ([`choose_strategy`]); filesystem
//! validation and per-request serving live in [`ClosureAssets`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderMap, Response, StatusCode};
use http_body_util::Full;

use caskd_core::{ConfigError, DirSource, HttpResponse, StaticSource};

use crate::static_files;

/// Upstream base URL used when no local copy of the library is available.
pub const CLOSURE_BASE_URL: &str = "https://closure-library.googlecode.com/git";

/// Where a source checkout keeps the library, relative to its root.
const CHECKOUT_LIB_DIR: &str = "third_party/closure/lib/closure";

/// Marker file proving a directory really is the library root.
const MARKER_FILE: &str = "goog/base.js";

/// How Closure assets are served for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStrategy {
    /// Serve from the archive embedded in the binary.
    Embedded,
    /// Redirect each asset request against a base URL.
    Redirect(String),
    /// Serve from a source checkout on disk (the hint as configured).
    Disk(PathBuf),
    /// Serve from the development override directory.
    DevOverride(PathBuf),
}

/// Picks the serving strategy. Pure: same inputs, same outcome.
///
/// `embedded_available` says whether an embedded archive was compiled in;
/// it only matters when no hint is configured.
///
/// # Example
///
/// ```rust
/// use caskd_web::closure::{choose_strategy, AssetStrategy};
///
/// assert_eq!(
///     choose_strategy(None, Some("https://example.org/closure"), false),
///     AssetStrategy::Redirect("https://example.org/closure".to_string()),
/// );
/// ```
#[must_use]
pub fn choose_strategy(
    dev_dir: Option<&str>,
    hint: Option<&str>,
    embedded_available: bool,
) -> AssetStrategy {
    if let Some(dir) = dev_dir.filter(|d| !d.is_empty()) {
        return AssetStrategy::DevOverride(PathBuf::from(dir));
    }
    match hint.filter(|h| !h.is_empty()) {
        None => {
            if embedded_available {
                AssetStrategy::Embedded
            } else {
                AssetStrategy::Redirect(CLOSURE_BASE_URL.to_string())
            }
        }
        Some(h) if h.starts_with("http") => AssetStrategy::Redirect(h.to_string()),
        Some(h) => AssetStrategy::Disk(PathBuf::from(h)),
    }
}

/// The resolved asset-serving strategy, validated and ready to serve.
///
/// Built once at startup and treated as read-only afterwards.
pub struct ClosureAssets {
    strategy: AssetStrategy,
    /// Source for Embedded/Disk/DevOverride; `None` for Redirect.
    source: Option<Arc<dyn StaticSource>>,
}

impl std::fmt::Debug for ClosureAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureAssets")
            .field("strategy", &self.strategy)
            .field("source", &self.source.as_ref().map(|_| "..."))
            .finish()
    }
}

impl ClosureAssets {
    /// Resolves and validates the strategy for the given configuration.
    ///
    /// `embedded` is the compiled-in archive, when the build carries one.
    /// Disk hints are verified to be directories containing
    /// `third_party/closure/lib/closure/goog/base.js`; anything else is a
    /// fatal [`ConfigError`] naming the expected layout.
    pub fn resolve(
        dev_dir: Option<&str>,
        hint: Option<&str>,
        embedded: Option<Arc<dyn StaticSource>>,
    ) -> Result<Self, ConfigError> {
        let strategy = choose_strategy(dev_dir, hint, embedded.is_some());
        let source: Option<Arc<dyn StaticSource>> = match &strategy {
            AssetStrategy::DevOverride(dir) => {
                tracing::info!(dir = %dir.display(), "serving Closure from dev override directory");
                Some(Arc::new(DirSource::new(dir)))
            }
            AssetStrategy::Embedded => {
                tracing::info!("serving Closure from embedded resources");
                embedded
            }
            AssetStrategy::Redirect(base) => {
                tracing::info!(base = %base, "serving Closure via redirects");
                None
            }
            AssetStrategy::Disk(root) => {
                let lib_dir = validate_checkout(root)?;
                tracing::info!(dir = %lib_dir.display(), "serving Closure from disk");
                Some(Arc::new(DirSource::new(lib_dir)))
            }
        };
        Ok(Self { strategy, source })
    }

    /// The strategy in force.
    #[must_use]
    pub fn strategy(&self) -> &AssetStrategy {
        &self.strategy
    }

    /// Serves one asset, addressed relative to the library root.
    pub fn serve(&self, asset_path: &str, headers: &HeaderMap) -> HttpResponse {
        match (&self.strategy, &self.source) {
            (AssetStrategy::Redirect(base), _) => redirect_response(base, asset_path),
            (_, Some(source)) => static_files::serve(source.as_ref(), asset_path, headers),
            // Unreachable after resolve(), but total anyway.
            (_, None) => static_files::not_found_response(),
        }
    }
}

fn validate_checkout(root: &Path) -> Result<PathBuf, ConfigError> {
    let meta = std::fs::metadata(root).map_err(|e| ConfigError::InvalidAssetRoot {
        root: root.display().to_string(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(ConfigError::InvalidAssetRoot {
            root: root.display().to_string(),
            reason: "not a directory".to_string(),
        });
    }
    let lib_dir = root.join(CHECKOUT_LIB_DIR);
    if !lib_dir.join(MARKER_FILE).is_file() {
        return Err(ConfigError::InvalidAssetRoot {
            root: root.display().to_string(),
            reason: format!("directory doesn't contain {CHECKOUT_LIB_DIR}/{MARKER_FILE}; wrong directory?"),
        });
    }
    Ok(lib_dir)
}

fn redirect_response(base: &str, asset_path: &str) -> HttpResponse {
    let location = format!("{}/{}", base.trim_end_matches('/'), clean_path(asset_path));
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, location)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Lexically cleans a relative path: drops empty and `.` segments and
/// resolves `..` without ever escaping the root.
fn clean_path(p: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in p.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use caskd_core::MemSource;

    fn embedded() -> Arc<dyn StaticSource> {
        Arc::new(MemSource::new().file("goog/base.js", "var goog = {};"))
    }

    #[test]
    fn test_dev_override_wins() {
        let s = choose_strategy(Some("/src/closure"), Some("https://example.org"), true);
        assert_eq!(s, AssetStrategy::DevOverride(PathBuf::from("/src/closure")));
    }

    #[test]
    fn test_no_hint_prefers_embedded() {
        assert_eq!(choose_strategy(None, None, true), AssetStrategy::Embedded);
    }

    #[test]
    fn test_no_hint_no_archive_redirects_upstream() {
        assert_eq!(
            choose_strategy(None, None, false),
            AssetStrategy::Redirect(CLOSURE_BASE_URL.to_string())
        );
    }

    #[test]
    fn test_http_hint_redirects() {
        assert_eq!(
            choose_strategy(None, Some("https://example.org/closure"), false),
            AssetStrategy::Redirect("https://example.org/closure".to_string())
        );
        assert_eq!(
            choose_strategy(None, Some("http://example.org/closure"), true),
            AssetStrategy::Redirect("http://example.org/closure".to_string())
        );
    }

    #[test]
    fn test_other_hint_is_disk() {
        assert_eq!(
            choose_strategy(None, Some("/srv/src"), true),
            AssetStrategy::Disk(PathBuf::from("/srv/src"))
        );
    }

    #[test]
    fn test_empty_strings_are_absent() {
        assert_eq!(choose_strategy(Some(""), Some(""), true), AssetStrategy::Embedded);
    }

    #[test]
    fn test_choice_is_pure() {
        let a = choose_strategy(None, Some("/srv/src"), false);
        let b = choose_strategy(None, Some("/srv/src"), false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_redirect_serves_307() {
        let assets = ClosureAssets::resolve(None, Some("https://example.org/closure"), None).unwrap();
        assert_eq!(
            assets.strategy(),
            &AssetStrategy::Redirect("https://example.org/closure".to_string())
        );

        let resp = assets.serve("goog/base.js", &HeaderMap::new());
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.org/closure/goog/base.js"
        );
    }

    #[test]
    fn test_redirect_cleans_dotdot() {
        let assets = ClosureAssets::resolve(None, Some("https://example.org/c"), None).unwrap();
        let resp = assets.serve("a/../../b.js", &HeaderMap::new());
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.org/c/b.js"
        );
    }

    #[test]
    fn test_resolve_embedded_serves_file() {
        let assets = ClosureAssets::resolve(None, None, Some(embedded())).unwrap();
        assert_eq!(assets.strategy(), &AssetStrategy::Embedded);

        let resp = assets.serve("goog/base.js", &HeaderMap::new());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_resolve_disk_requires_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let err =
            ClosureAssets::resolve(None, Some(dir.path().to_str().unwrap()), None).unwrap_err();
        assert!(err.to_string().contains("goog/base.js"));
    }

    #[test]
    fn test_resolve_disk_with_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let lib = dir.path().join(CHECKOUT_LIB_DIR).join("goog");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("base.js"), "var goog = {};").unwrap();

        let assets =
            ClosureAssets::resolve(None, Some(dir.path().to_str().unwrap()), None).unwrap();
        let resp = assets.serve("goog/base.js", &HeaderMap::new());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_resolve_missing_dir_is_config_error() {
        let err = ClosureAssets::resolve(None, Some("/no/such/dir"), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAssetRoot { .. }));
    }

    #[test]
    fn test_dev_override_serves_without_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("base.js"), "var goog = {};").unwrap();

        let assets =
            ClosureAssets::resolve(Some(dir.path().to_str().unwrap()), None, None).unwrap();
        assert!(matches!(assets.strategy(), AssetStrategy::DevOverride(_)));
        let resp = assets.serve("base.js", &HeaderMap::new());
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
