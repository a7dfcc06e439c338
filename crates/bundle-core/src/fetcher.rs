use std::path::{Path, PathBuf};

use bundle_fs::fmt_bundle_directory;
use fs_err as fs;
use tracing::warn;

use crate::bundle::Bundle;
use crate::error::BundleError;
use crate::remote::Remote;

/// Fetches a bundle from whichever remote has it, then recurses into its
/// declared dependencies that are not already present locally.
pub struct Fetcher<'a> {
    bundles_root: &'a Path,
}

impl<'a> Fetcher<'a> {
    pub fn new(bundles_root: &'a Path) -> Self {
        Self { bundles_root }
    }

    pub fn fetch(&self, remotes: &[Remote], id: &str, version: Option<u32>) -> Result<PathBuf, BundleError> {
        if remotes.is_empty() {
            return Err(BundleError::NoRemoteAvailable);
        }

        let candidates: Vec<Box<dyn crate::remote::Loader>> = remotes
            .iter()
            .flat_map(Remote::generate_loaders)
            .filter(|loader| loader.can_load(id, version))
            .collect();

        if candidates.is_empty() {
            return Err(BundleError::NoBundleLoader {
                id: id.to_owned(),
                version,
            });
        }

        let resolved_version = match version {
            Some(v) => v,
            None => candidates
                .iter()
                .flat_map(|loader| loader.bundle_versions(id))
                .max()
                .ok_or_else(|| BundleError::NoBundleLoader {
                    id: id.to_owned(),
                    version: None,
                })?,
        };

        let target = fmt_bundle_directory(self.bundles_root, id, Some(resolved_version));
        fs::create_dir_all(&target)?;
        if directory_has_entries(&target)? {
            return Err(BundleError::FetchTargetIsNotEmpty(target));
        }

        let mut loaded = false;
        for loader in &candidates {
            match loader.load(id, resolved_version, &target) {
                Ok(()) => {
                    loaded = true;
                    break;
                }
                Err(error) => {
                    warn!(%error, id, resolved_version, "loader failed, trying next");
                    let _ = fs::remove_dir_all(&target);
                    fs::create_dir_all(&target)?;
                }
            }
        }
        if !loaded {
            return Err(BundleError::NoBundleLoader {
                id: id.to_owned(),
                version: Some(resolved_version),
            });
        }

        let bundle = Bundle::resolve(self.bundles_root, remotes, id, Some(resolved_version))?;
        for dep in &bundle.manifest().dependencies {
            if Bundle::resolve(self.bundles_root, &[], &dep.id, dep.version).is_err() {
                self.fetch(remotes, &dep.id, dep.version)?;
            }
        }

        Ok(target)
    }
}

fn directory_has_entries(path: &Path) -> std::io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_some())
}
