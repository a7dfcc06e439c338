//! HTTP(S) accessors for the bundle subsystem: a [`Loader`](bundle_core::Loader)
//! that fetches bundle archives listed in a JSON index, and an
//! [`Uploader`](bundle_core::Uploader) that posts packed archives to an
//! upload endpoint. Register both with [`register`] before resolving
//! remotes that carry `http`/`https` accessor configs.

pub use crate::error::ClientError;
pub use crate::index::{HttpIndex, IndexEntry};
pub use crate::loader::{HttpLoader, HttpLoaderFactory};
pub use crate::options::HttpAccessorOptions;
pub use crate::uploader::{HttpUploader, HttpUploaderFactory};

mod error;
mod hash;
mod index;
mod loader;
mod options;
mod uploader;

/// Registers the HTTP loader and uploader factories in bundle-core's
/// process-wide registries. Call once at startup before fetching or
/// deploying against remotes with `http`/`https` accessor configs.
pub fn register() {
    bundle_core::register_loader_factory(Box::new(HttpLoaderFactory));
    bundle_core::register_uploader_factory(Box::new(HttpUploaderFactory));
}
