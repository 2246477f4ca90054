//! Request classification.
//!
//! Every inbound request maps to exactly one [`Intent`]; the match order
//! below is load-bearing and mirrors the dispatch contract:
//!
//! 1. Discovery (GET + discovery Accept header, or `camli.mode=config`)
//! 2. Upload helper (POST + `camli.mode=uploadhelper`)
//! 3. `download/…`
//! 4. `thumbnail/…`
//! 5. `tree/…`
//! 6. GET `closure/…`
//! 7. Static page (allow-listed file name, or a `p`/`b`/`d` reference
//!    parameter, or the handler base)
//! 8. Not found
//!
//! Classification is a pure function of the request view; it performs no
//! I/O and consults no mutable state.

use http::Method;
use regex::Regex;

use caskd_core::BlobRef;

use crate::request::RequestView;

/// The `Accept` header value that asks for the discovery descriptor.
pub const DISCOVERY_CONTENT_TYPE: &str = "text/x-camli-configuration";

/// The handling strategy chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Serve the capability-discovery descriptor.
    Discovery,
    /// Forward to the upload-helper collaborator.
    UploadHelper,
    /// Serve blob bytes for download.
    Download,
    /// Serve a scaled image.
    Thumbnail,
    /// Serve a directory tree.
    FileTree,
    /// Serve a Closure library asset.
    ClosureAsset,
    /// Serve a named static page or file.
    Static {
        /// Resolved file name (e.g. `index.html`).
        file: String,
    },
    /// Nothing matched; respond 404.
    NotFound,
}

/// Classifier with its patterns compiled once.
///
/// Held by the dispatcher for the process lifetime; building one is cheap
/// enough for tests to create them freely.
///
/// # Example
///
/// ```rust
/// use http::{Method, Request};
/// use caskd_web::classify::{Classifier, Intent};
/// use caskd_web::request::RequestView;
///
/// let (parts, ()) = Request::builder()
///     .method(Method::GET)
///     .uri("/web/?camli.mode=config")
///     .body(())
///     .unwrap()
///     .into_parts();
/// let view = RequestView::new("/web/", &parts);
///
/// assert_eq!(Classifier::new().classify(&view), Intent::Discovery);
/// ```
#[derive(Debug)]
pub struct Classifier {
    static_file: Regex,
    closure_asset: Regex,
}

impl Classifier {
    /// Compiles the classification patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            static_file: Regex::new(r"^([a-zA-Z0-9\-_]+\.(html|js|css|png|jpg|gif))$")
                .expect("static file pattern"),
            closure_asset: Regex::new(r"^closure/(([^/]+)(/.*)?)$").expect("closure pattern"),
        }
    }

    /// Classifies one request. Total: always returns exactly one intent.
    #[must_use]
    pub fn classify(&self, req: &RequestView) -> Intent {
        if wants_discovery(req) {
            return Intent::Discovery;
        }
        if req.method() == Method::POST && req.camli_mode() == "uploadhelper" {
            return Intent::UploadHelper;
        }
        if req.suffix().starts_with("download/") {
            return Intent::Download;
        }
        if req.suffix().starts_with("thumbnail/") {
            return Intent::Thumbnail;
        }
        if req.suffix().starts_with("tree/") {
            return Intent::FileTree;
        }
        if req.method() == Method::GET && self.closure_asset.is_match(req.suffix()) {
            return Intent::ClosureAsset;
        }
        self.classify_static(req)
    }

    /// Strips the `closure/` routing prefix, returning the asset path.
    #[must_use]
    pub fn closure_suffix<'a>(&self, suffix: &'a str) -> Option<&'a str> {
        self.closure_asset
            .captures(suffix)
            .and_then(|m| m.get(1))
            .map(|m| m.as_str())
    }

    fn classify_static(&self, req: &RequestView) -> Intent {
        if let Some(m) = self.static_file.captures(req.suffix()) {
            return Intent::Static {
                file: m[1].to_string(),
            };
        }
        let file = if wants_ref_page(req, "p") {
            "permanode.html"
        } else if wants_ref_page(req, "b") {
            "blobinfo.html"
        } else if wants_ref_page(req, "d") {
            "filetree.html"
        } else if req.at_base() {
            "index.html"
        } else {
            return Intent::NotFound;
        };
        Intent::Static {
            file: file.to_string(),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn wants_discovery(req: &RequestView) -> bool {
    req.method() == Method::GET
        && (req.accept() == Some(DISCOVERY_CONTENT_TYPE) || req.camli_mode() == "config")
}

fn wants_ref_page(req: &RequestView, param: &str) -> bool {
    req.method() == Method::GET
        && req
            .query_value(param)
            .is_some_and(BlobRef::valid_ref_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::request::Parts;

    const REF: &str = "sha1-0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";

    fn view(method: Method, uri: &str, accept: Option<&str>) -> RequestView {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(a) = accept {
            builder = builder.header(http::header::ACCEPT, a);
        }
        let parts: Parts = builder.body(()).unwrap().into_parts().0;
        RequestView::new("/web/", &parts)
    }

    fn classify(method: Method, uri: &str, accept: Option<&str>) -> Intent {
        Classifier::new().classify(&view(method, uri, accept))
    }

    #[test]
    fn test_discovery_by_accept_header() {
        assert_eq!(
            classify(Method::GET, "/web/", Some(DISCOVERY_CONTENT_TYPE)),
            Intent::Discovery
        );
    }

    #[test]
    fn test_discovery_by_accept_wins_regardless_of_path() {
        assert_eq!(
            classify(
                Method::GET,
                "/web/download/whatever",
                Some(DISCOVERY_CONTENT_TYPE)
            ),
            Intent::Discovery
        );
    }

    #[test]
    fn test_discovery_by_camli_mode() {
        assert_eq!(
            classify(Method::GET, "/web/?camli.mode=config", None),
            Intent::Discovery
        );
    }

    #[test]
    fn test_discovery_requires_get() {
        assert_ne!(
            classify(Method::POST, "/web/?camli.mode=config", None),
            Intent::Discovery
        );
    }

    #[test]
    fn test_upload_helper() {
        assert_eq!(
            classify(Method::POST, "/web/?camli.mode=uploadhelper", None),
            Intent::UploadHelper
        );
        // GET with the same mode is not an upload.
        assert_ne!(
            classify(Method::GET, "/web/?camli.mode=uploadhelper", None),
            Intent::UploadHelper
        );
    }

    #[test]
    fn test_path_verbs() {
        assert_eq!(
            classify(Method::GET, &format!("/web/download/{REF}"), None),
            Intent::Download
        );
        assert_eq!(
            classify(Method::GET, &format!("/web/thumbnail/{REF}"), None),
            Intent::Thumbnail
        );
        assert_eq!(
            classify(Method::GET, &format!("/web/tree/{REF}"), None),
            Intent::FileTree
        );
    }

    #[test]
    fn test_closure_asset() {
        assert_eq!(
            classify(Method::GET, "/web/closure/goog/base.js", None),
            Intent::ClosureAsset
        );
    }

    #[test]
    fn test_closure_requires_get() {
        assert_eq!(
            classify(Method::POST, "/web/closure/goog/base.js", None),
            Intent::NotFound
        );
    }

    #[test]
    fn test_closure_beats_static_query_params() {
        // Precedence: a closure path with a valid `p` parameter is still a
        // closure asset, never the permanode page.
        assert_eq!(
            classify(Method::GET, &format!("/web/closure/x.js?p={REF}"), None),
            Intent::ClosureAsset
        );
    }

    #[test]
    fn test_static_allow_list() {
        for name in ["index.html", "app.js", "style.css", "a.png", "b.jpg", "c.gif"] {
            assert_eq!(
                classify(Method::GET, &format!("/web/{name}"), None),
                Intent::Static {
                    file: name.to_string()
                },
                "{name} should be servable"
            );
        }
        assert_eq!(
            classify(Method::GET, "/web/evil.exe", None),
            Intent::NotFound
        );
        assert_eq!(
            classify(Method::GET, "/web/sub/dir.html", None),
            Intent::NotFound
        );
    }

    #[test]
    fn test_ref_page_params() {
        assert_eq!(
            classify(Method::GET, &format!("/web/?p={REF}"), None),
            Intent::Static {
                file: "permanode.html".to_string()
            }
        );
        assert_eq!(
            classify(Method::GET, &format!("/web/?b={REF}"), None),
            Intent::Static {
                file: "blobinfo.html".to_string()
            }
        );
        assert_eq!(
            classify(Method::GET, &format!("/web/?d={REF}"), None),
            Intent::Static {
                file: "filetree.html".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_ref_param_is_not_a_page() {
        assert_eq!(
            classify(Method::GET, "/web/?p=not-a-valid-ref", None),
            Intent::Static {
                file: "index.html".to_string()
            }
        );
    }

    #[test]
    fn test_base_serves_index() {
        assert_eq!(
            classify(Method::GET, "/web/", None),
            Intent::Static {
                file: "index.html".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_is_not_found() {
        assert_eq!(
            classify(Method::GET, "/web/no/such/route", None),
            Intent::NotFound
        );
    }

    #[test]
    fn test_classification_is_total_and_deterministic() {
        let c = Classifier::new();
        let v = view(Method::GET, "/web/?camli.mode=config", None);
        assert_eq!(c.classify(&v), c.classify(&v));
    }

    #[test]
    fn test_closure_suffix_extraction() {
        let c = Classifier::new();
        assert_eq!(
            c.closure_suffix("closure/goog/base.js"),
            Some("goog/base.js")
        );
        assert_eq!(c.closure_suffix("closure/"), None);
        assert_eq!(c.closure_suffix("elsewhere/x.js"), None);
    }
}
