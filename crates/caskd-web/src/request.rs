//! Request view: the slice of an HTTP request that classification needs.
//!
//! The front-end is mounted under a prefix (e.g. `/web/`); every route it
//! understands is expressed against the *suffix*, the part of the path after
//! that prefix. [`RequestView`] computes the suffix once, parses the query
//! string once, and exposes exactly the accessors the classifier and
//! dispatcher consume, keeping both of them pure functions over it.

use http::request::Parts;
use http::Method;
use url::form_urlencoded;

/// Immutable, pre-parsed view of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestView {
    method: Method,
    suffix: String,
    at_base: bool,
    query: Vec<(String, String)>,
    accept: Option<String>,
}

impl RequestView {
    /// Builds a view of `parts` for a handler mounted at `prefix`.
    ///
    /// `prefix` must start and end with `/` (the mount invariant, checked by
    /// the registry at startup, not here).
    #[must_use]
    pub fn new(prefix: &str, parts: &Parts) -> Self {
        let path = parts.uri.path();
        let suffix = path
            .strip_prefix(prefix)
            .unwrap_or_else(|| path.trim_start_matches('/'))
            .to_string();
        let at_base = path == prefix || format!("{path}/") == prefix;

        let query = parts
            .uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        let accept = parts
            .headers
            .get(http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        Self {
            method: parts.method.clone(),
            suffix,
            at_base,
            query,
            accept,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path relative to the handler's mount prefix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `true` when the request path is exactly the mount prefix.
    #[must_use]
    pub fn at_base(&self) -> bool {
        self.at_base
    }

    /// The raw `Accept` header value, if any.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// First value of the named query parameter, if present.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the `camli.mode` parameter, or `""` when absent.
    #[must_use]
    pub fn camli_mode(&self) -> &str {
        self.query_value("camli.mode").unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(method: Method, uri: &str, accept: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(a) = accept {
            builder = builder.header(http::header::ACCEPT, a);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_suffix_strips_mount_prefix() {
        let v = RequestView::new("/web/", &parts(Method::GET, "/web/download/x", None));
        assert_eq!(v.suffix(), "download/x");
        assert!(!v.at_base());
    }

    #[test]
    fn test_at_base_with_and_without_trailing_slash() {
        let v = RequestView::new("/web/", &parts(Method::GET, "/web/", None));
        assert!(v.at_base());
        assert_eq!(v.suffix(), "");

        let v = RequestView::new("/web/", &parts(Method::GET, "/web", None));
        assert!(v.at_base());
    }

    #[test]
    fn test_foreign_path_falls_back_to_trimmed() {
        let v = RequestView::new("/web/", &parts(Method::GET, "/other/thing", None));
        assert_eq!(v.suffix(), "other/thing");
    }

    #[test]
    fn test_query_parsing_and_camli_mode() {
        let v = RequestView::new(
            "/web/",
            &parts(Method::GET, "/web/?camli.mode=config&p=abc", None),
        );
        assert_eq!(v.camli_mode(), "config");
        assert_eq!(v.query_value("p"), Some("abc"));
        assert_eq!(v.query_value("missing"), None);
    }

    #[test]
    fn test_query_decoding() {
        let v = RequestView::new("/web/", &parts(Method::GET, "/web/?p=a%20b", None));
        assert_eq!(v.query_value("p"), Some("a b"));
    }

    #[test]
    fn test_accept_header_exposed() {
        let v = RequestView::new(
            "/web/",
            &parts(Method::GET, "/web/", Some("text/x-camli-configuration")),
        );
        assert_eq!(v.accept(), Some("text/x-camli-configuration"));
    }
}
