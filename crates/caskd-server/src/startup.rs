//! Front-end startup wiring.
//!
//! Turns a [`WebConfig`] section, the environment overrides, and the
//! collaborators supplied by the rest of the server into a mounted
//! [`WebHandler`]. Every failure here is a fatal [`ConfigError`]; nothing
//! in this module runs after startup.

use std::path::Path;
use std::sync::Arc;

use caskd_core::{
    BlobFetcher, ConfigError, DirSource, ImageScaler, ScaledImageCache, ServerRoot,
    SignerDiscovery, StaticSource, UploadHelper,
};
use caskd_web::{ClosureAssets, WebHandler};

use crate::config::WebConfig;
use crate::registry::{HandlerRegistry, MountedHandler, RegistryError};

/// Where a source checkout keeps the UI files, relative to its root.
const UI_DIR_IN_CHECKOUT: &str = "server/caskd/ui";

/// Environment overrides, read once at startup.
///
/// Both take precedence over the corresponding configuration values.
/// Injectable so tests never touch the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Override for the source checkout root.
    pub dev_root: Option<String>,
    /// Override for the Closure library directory.
    pub dev_closure_dir: Option<String>,
}

impl Environment {
    /// Variable overriding the source checkout root.
    pub const DEV_ROOT_VAR: &'static str = "CASKD_DEV_ROOT";

    /// Variable overriding the Closure library directory.
    pub const DEV_CLOSURE_DIR_VAR: &'static str = "CASKD_DEV_CLOSURE_DIR";

    /// Reads the overrides from the process environment.
    #[must_use]
    pub fn from_os() -> Self {
        let read = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());
        Self {
            dev_root: read(Self::DEV_ROOT_VAR),
            dev_closure_dir: read(Self::DEV_CLOSURE_DIR_VAR),
        }
    }
}

/// Collaborators handed in by the rest of the server.
///
/// Only `root` is required; absence of the rest is tolerated per route.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// The root handler. Required.
    pub root: Option<Arc<dyn ServerRoot>>,
    /// Signing collaborator for the discovery descriptor.
    pub signer: Option<Arc<dyn SignerDiscovery>>,
    /// Blob cache for derived resources.
    pub cache: Option<Arc<dyn BlobFetcher>>,
    /// Scaled-image cache.
    pub scaled_cache: Option<Arc<dyn ScaledImageCache>>,
    /// Image scaling collaborator.
    pub scaler: Option<Arc<dyn ImageScaler>>,
    /// Upload-helper responder.
    pub upload_helper: Option<Arc<dyn UploadHelper>>,
    /// UI files embedded in the binary, when the build carries them.
    pub embedded_ui: Option<Arc<dyn StaticSource>>,
    /// Closure archive embedded in the binary, when the build carries one.
    pub embedded_closure: Option<Arc<dyn StaticSource>>,
}

/// Builds the web front-end from configuration.
pub fn build_web_handler(
    prefix: &str,
    config: &WebConfig,
    env: &Environment,
    collab: Collaborators,
) -> Result<WebHandler, ConfigError> {
    let root = collab.root.ok_or(ConfigError::MissingRootHandler)?;

    // The dev root wins over the configured checkout.
    let source_root = env.dev_root.clone().or_else(|| config.source_root.clone());

    // A checkout path provides the UI files; a URL hint only affects the
    // Closure strategy, so the embedded UI is still required then.
    let ui_files: Arc<dyn StaticSource> = match source_root
        .as_deref()
        .filter(|s| !s.starts_with("http"))
    {
        Some(checkout) => {
            let ui_dir = Path::new(checkout).join(UI_DIR_IN_CHECKOUT);
            if !ui_dir.is_dir() {
                return Err(ConfigError::MissingUiFiles(format!(
                    "{} is not a directory",
                    ui_dir.display()
                )));
            }
            tracing::info!(dir = %ui_dir.display(), "serving UI files from disk");
            Arc::new(DirSource::new(ui_dir))
        }
        None => collab.embedded_ui.ok_or_else(|| {
            ConfigError::MissingUiFiles(
                "no sourceRoot configured and no embedded resources built in".to_string(),
            )
        })?,
    };

    if config.cache.is_some() {
        match config.scaled_image.as_deref() {
            Some("lrucache") => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported scaledImage type {other:?}"
                )));
            }
        }
    }

    let closure = ClosureAssets::resolve(
        env.dev_closure_dir.as_deref(),
        source_root.as_deref(),
        collab.embedded_closure,
    )?;

    let mut builder = WebHandler::builder()
        .prefix(prefix)
        .root(root)
        .ui_files(ui_files)
        .closure(closure)
        .json_sign_root(&config.json_sign_root);
    for (root_prefix, name) in &config.publish_roots {
        if name.is_empty() {
            return Err(ConfigError::InvalidPublishRoot {
                prefix: root_prefix.clone(),
                reason: "empty display name".to_string(),
            });
        }
        builder = builder.publish_root(root_prefix, name);
    }
    if let Some(signer) = collab.signer {
        builder = builder.signer(signer);
    }
    if let Some(cache) = collab.cache {
        builder = builder.cache(cache);
    }
    if let Some(scaled_cache) = collab.scaled_cache {
        builder = builder.scaled_cache(scaled_cache);
    }
    if let Some(scaler) = collab.scaler {
        builder = builder.scaler(scaler);
    }
    if let Some(upload_helper) = collab.upload_helper {
        builder = builder.upload_helper(upload_helper);
    }
    builder.build()
}

/// Registers the `"web"` handler constructor in the registry.
pub fn register_web_handler(
    registry: &mut HandlerRegistry,
    env: Environment,
    collab: Collaborators,
) -> Result<(), RegistryError> {
    registry.register_constructor(
        "web",
        Arc::new(move |prefix, value| {
            let config: WebConfig = serde_json::from_value(value.clone())
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let handler = build_web_handler(prefix, &config, &env, collab.clone())?;
            Ok(Arc::new(handler) as Arc<dyn MountedHandler>)
        }),
    )
}
