//! Handler registry.
//!
//! Maps configuration type names (`"web"`, `"root"`, ...) to constructor
//! functions, and mounted prefixes to live handlers. Built explicitly at
//! startup and passed by reference from then on; there is no package-level
//! registration state, so initialization order is deterministic and the
//! registry is testable in isolation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::request::Parts;
use thiserror::Error;

use caskd_core::{ConfigError, HttpResponse};
use caskd_web::WebHandler;

/// A request handler mounted at a prefix.
#[async_trait]
pub trait MountedHandler: Send + Sync + std::fmt::Debug {
    /// Handles one request whose path starts with the mount prefix.
    async fn serve(&self, parts: &Parts, body: Bytes) -> HttpResponse;
}

#[async_trait]
impl MountedHandler for WebHandler {
    async fn serve(&self, parts: &Parts, body: Bytes) -> HttpResponse {
        WebHandler::serve(self, parts, body).await
    }
}

/// Constructor: builds a handler from its mount prefix and its section of
/// the configuration file.
pub type Constructor =
    Arc<dyn Fn(&str, &serde_json::Value) -> Result<Arc<dyn MountedHandler>, ConfigError> + Send + Sync>;

/// A live mount: prefix, handler type, handler.
#[derive(Clone)]
pub struct Mount {
    prefix: String,
    type_name: String,
    handler: Arc<dyn MountedHandler>,
}

impl Mount {
    /// The mount prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The handler type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn MountedHandler> {
        self.handler.clone()
    }
}

/// Errors from registration and construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A constructor for this type name already exists.
    #[error("handler type {type_name:?} already registered")]
    DuplicateType {
        /// The colliding type name.
        type_name: String,
    },

    /// No constructor is registered for this type name.
    #[error("no constructor registered for handler type {type_name:?}")]
    UnknownType {
        /// The unknown type name.
        type_name: String,
    },

    /// Two handlers cannot share a prefix.
    #[error("prefix {prefix:?} already has a handler mounted")]
    DuplicatePrefix {
        /// The colliding prefix.
        prefix: String,
    },

    /// Prefixes must be absolute and directory-like.
    #[error("mount prefix {prefix:?} must start and end with '/'")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },

    /// The constructor itself rejected the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The registry of handler constructors and mounts.
#[derive(Default)]
pub struct HandlerRegistry {
    constructors: BTreeMap<String, Constructor>,
    mounts: Vec<Mount>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under a type name.
    pub fn register_constructor(
        &mut self,
        type_name: impl Into<String>,
        constructor: Constructor,
    ) -> Result<(), RegistryError> {
        let type_name = type_name.into();
        if self.constructors.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType { type_name });
        }
        self.constructors.insert(type_name, constructor);
        Ok(())
    }

    /// Constructs a handler of `type_name` from `config` and mounts it.
    pub fn construct(
        &mut self,
        type_name: &str,
        prefix: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn MountedHandler>, RegistryError> {
        let constructor = self
            .constructors
            .get(type_name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType {
                type_name: type_name.to_string(),
            })?;
        let handler = constructor(prefix, config)?;
        self.mount(type_name, prefix, handler.clone())?;
        Ok(handler)
    }

    /// Mounts an already-built handler at a prefix.
    pub fn mount(
        &mut self,
        type_name: impl Into<String>,
        prefix: impl Into<String>,
        handler: Arc<dyn MountedHandler>,
    ) -> Result<(), RegistryError> {
        let prefix = prefix.into();
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(RegistryError::InvalidPrefix { prefix });
        }
        if self.mounts.iter().any(|m| m.prefix == prefix) {
            return Err(RegistryError::DuplicatePrefix { prefix });
        }
        self.mounts.push(Mount {
            prefix,
            type_name: type_name.into(),
            handler,
        });
        Ok(())
    }

    /// Returns the mount whose prefix is the longest match for `path`.
    ///
    /// A path matches a mount when it equals the prefix (modulo trailing
    /// slash) or extends it.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Mount> {
        self.mounts
            .iter()
            .filter(|m| {
                path.starts_with(&m.prefix) || format!("{path}/") == m.prefix
            })
            .max_by_key(|m| m.prefix.len())
    }

    /// Returns the first mount of the given type, in mount order.
    #[must_use]
    pub fn find_by_type(&self, type_name: &str) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.type_name == type_name)
    }

    /// Number of mounted handlers.
    #[must_use]
    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }
}
