//! # caskd-core
//!
//! Shared foundation for the caskd content-addressable storage server:
//!
//! - [`BlobRef`]: validated content references (`<digest>-<hexdigest>`)
//! - [`WebError`] / [`ConfigError`]: the request-level and startup error types
//! - Collaborator traits ([`BlobFetcher`], [`SearchIndex`], [`StaticSource`], ...)
//!   that the web front-end consumes without knowing the implementations
//!
//! The front-end in `caskd-web` never interprets blob contents or talks to a
//! concrete store; everything it needs from the rest of the server crosses
//! one of the trait seams defined here.

#![doc(html_root_url = "https://docs.rs/caskd-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod blobref;
pub mod collab;
pub mod error;

pub use blobref::{BlobRef, SizedBlobRef};
pub use collab::{
    BlobFetcher, DirSource, FetchError, HttpResponse, ImageScaler, MemSource, ResponseBody,
    ScaledImage, ScaledImageCache, SearchError, SearchIndex, ServerRoot, SignerDiscovery,
    StaticFile, StaticSource, UploadHelper,
};
pub use error::{ConfigError, WebError, WebResult};

/// Largest dimension, in pixels, a thumbnail request may ask for.
///
/// Requests with absent or zero `mw`/`mh` bounds are clamped to this value.
pub const MAX_IMAGE_SIZE: u32 = 2000;
