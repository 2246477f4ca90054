//! Server and front-end configuration.
//!
//! Two configuration surfaces:
//!
//! - [`WebConfig`]: the web front-end's section of the server's JSON
//!   configuration file, deserialized with serde.
//! - [`ServerConfig`]: process-level HTTP settings, built with the builder
//!   pattern.
//!
//! # Example
//!
//! ```rust
//! use caskd_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("0.0.0.0:3179")
//!     .shutdown_timeout(Duration::from_secs(30))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "0.0.0.0:3179");
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3179";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// The web front-end's configuration section.
///
/// Field names match the JSON configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebConfig {
    /// Path or URL of the JSON signing helper.
    #[serde(default)]
    pub json_sign_root: String,

    /// Publish roots: mount prefix to display name.
    #[serde(default)]
    pub publish_roots: BTreeMap<String, String>,

    /// Prefix of the blob cache used for derived resources.
    #[serde(default)]
    pub cache: Option<String>,

    /// Scaled-image cache flavor (`"lrucache"` is the only supported one).
    #[serde(default)]
    pub scaled_image: Option<String>,

    /// Path to the source checkout serving UI and Closure files. When
    /// absent, both must be embedded in the binary.
    #[serde(default)]
    pub source_root: Option<String>,
}

/// Process-level HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses and returns the HTTP address as a `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets how long shutdown waits for in-flight requests.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:8080")
            .shutdown_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.http_addr(), "127.0.0.1:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_socket_addr_invalid() {
        let config = ServerConfig::builder().http_addr("nonsense").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_web_config_from_json() {
        let cfg: WebConfig = serde_json::from_str(
            r#"{
                "jsonSignRoot": "/sighelper/",
                "publishRoots": {"/pics/": "pics"},
                "cache": "/cache/",
                "scaledImage": "lrucache",
                "sourceRoot": "/srv/cask/src"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.json_sign_root, "/sighelper/");
        assert_eq!(cfg.publish_roots["/pics/"], "pics");
        assert_eq!(cfg.cache.as_deref(), Some("/cache/"));
        assert_eq!(cfg.scaled_image.as_deref(), Some("lrucache"));
        assert_eq!(cfg.source_root.as_deref(), Some("/srv/cask/src"));
    }

    #[test]
    fn test_web_config_all_optional() {
        let cfg: WebConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.json_sign_root.is_empty());
        assert!(cfg.publish_roots.is_empty());
        assert!(cfg.source_root.is_none());
    }

    #[test]
    fn test_web_config_rejects_unknown_keys() {
        assert!(serde_json::from_str::<WebConfig>(r#"{"bogus": 1}"#).is_err());
    }
}
