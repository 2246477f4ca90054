//! # caskd-web
//!
//! The presentation front-end of the caskd content-addressable storage
//! server. One [`WebHandler`] per mount:
//!
//! - classifies each inbound request into exactly one [`classify::Intent`],
//!   in a fixed precedence order;
//! - assembles the discovery descriptor clients use to learn the server's
//!   capabilities and resource locations;
//! - resolves the Closure JavaScript support library through an ordered
//!   fallback chain, once, at startup;
//! - dispatches blob download, thumbnail, and file-tree requests to
//!   narrowly scoped delegates over the storage collaborators.
//!
//! Blob storage, search, image scaling, and signing are consumed behind the
//! trait seams in `caskd-core`; nothing in this crate interprets blob
//! contents.

#![doc(html_root_url = "https://docs.rs/caskd-web/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod closure;
pub mod deps;
pub mod discovery;
pub mod download;
pub mod filetree;
pub mod handler;
pub mod request;
pub mod static_files;
pub mod thumbnail;

pub use classify::{Classifier, Intent, DISCOVERY_CONTENT_TYPE};
pub use closure::{choose_strategy, AssetStrategy, ClosureAssets, CLOSURE_BASE_URL};
pub use discovery::{DiscoveryContribution, DiscoveryError, PublishRoot};
pub use handler::{WebHandler, WebHandlerBuilder};
pub use request::RequestView;
