//! The bundle subsystem's core: descriptors, manifests, the installer that
//! turns a descriptor into an on-disk bundle, the read-only aggregate store
//! composed over a bundle and its dependencies, and (built out alongside)
//! the bundle reader, fetcher, deployer and cache that operate on bundle
//! directories once installed.

pub use crate::aggregate::{AggregateStore, DependencyLeg, VisitKey};
pub use crate::bundle::Bundle;
pub use crate::cache::{Cache, CacheEntry};
pub use crate::deployer::Deployer;
pub use crate::descriptor::{
    file_exists, DependencyDescriptor, Descriptor, FilesDescriptor, IncludeRule, PatternRule,
};
pub use crate::error::BundleError;
pub use crate::fetcher::Fetcher;
pub use crate::imports::{transitive_imports, CONTEXT_IMPORTS_PREDICATE};
pub use crate::installer::{fmt_bundle_ctx_id, InstallSource, Installer};
pub use crate::manifest::{Manifest, ManifestDependency, BUNDLE_MANIFEST_VERSION};
pub use crate::remote::{
    register_loader_factory, register_uploader_factory, retrieve_remotes, AccessorConfig, Loader,
    LoaderFactory, Remote, Uploader, UploaderFactory,
};

mod aggregate;
mod bundle;
mod cache;
mod deployer;
mod descriptor;
mod error;
mod fetcher;
mod imports;
mod installer;
mod manifest;
mod remote;
