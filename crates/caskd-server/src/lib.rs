//! # caskd-server
//!
//! Process-level plumbing for the caskd content-addressable storage
//! server's web front-end:
//!
//! - [`WebConfig`] / [`ServerConfig`]: configuration surfaces
//! - [`HandlerRegistry`]: explicit startup-built mapping from configuration
//!   type names to handler constructors and from prefixes to live handlers
//! - [`Server`]: the hyper accept loop with graceful shutdown
//! - [`startup`]: wiring a `WebConfig` plus collaborators into a mounted
//!   front-end, honoring the development environment overrides
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use caskd_server::{
//!     register_web_handler, Collaborators, Environment, HandlerRegistry, Server, ServerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     caskd_server::init_logging(&caskd_server::LogConfig::default())?;
//!
//!     let mut registry = HandlerRegistry::new();
//!     register_web_handler(&mut registry, Environment::from_os(), collaborators())?;
//!     registry.construct("web", "/web/", &load_config()?)?;
//!
//!     Server::new(ServerConfig::default(), Arc::new(registry)).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/caskd-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod logging;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod startup;

pub use config::{ServerConfig, ServerConfigBuilder, WebConfig};
pub use logging::{init_logging, LogConfig};
pub use registry::{Constructor, HandlerRegistry, Mount, MountedHandler, RegistryError};
pub use server::{Server, ServerError};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use startup::{build_web_handler, register_web_handler, Collaborators, Environment};
