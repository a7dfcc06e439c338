use std::path::Path;

use tracing::debug;

use crate::error::BundleError;
use crate::remote::Remote;

/// Validates a bundle (directory or archive) and uploads it to every
/// remote that accepts it.
pub struct Deployer;

impl Deployer {
    pub fn new() -> Self {
        Self
    }

    pub fn deploy(&self, bundle_path: &Path, remotes: &[Remote]) -> Result<(), BundleError> {
        let fields = bundle_archive::read_manifest_fields(bundle_path)?;
        debug!(
            id = fields.id.as_deref().unwrap_or_default(),
            version = fields.version,
            "deploying bundle"
        );

        if remotes.is_empty() {
            return Err(BundleError::NoRemoteAvailable);
        }

        let uploaders: Vec<_> = remotes
            .iter()
            .flat_map(Remote::generate_uploaders)
            .filter(|uploader| uploader.can_upload(bundle_path))
            .collect();

        if uploaders.is_empty() {
            return Err(BundleError::NoAcceptableUploaders(bundle_path.to_path_buf()));
        }

        for uploader in &uploaders {
            uploader.upload(bundle_path)?;
        }
        Ok(())
    }
}

impl Default for Deployer {
    fn default() -> Self {
        Self::new()
    }
}
