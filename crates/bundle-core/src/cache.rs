use std::path::PathBuf;

use fs_err as fs;
use percent_encoding::percent_decode_str;
use tracing::warn;

use crate::error::BundleError;
use crate::manifest::Manifest;

/// One bundle version directory found by [`Cache::list`], cross-checked
/// against its own manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: String,
    pub version: u32,
    pub directory: PathBuf,
}

/// Enumerates the locally installed bundles under a bundles directory.
pub struct Cache {
    bundles_directory: PathBuf,
}

impl Cache {
    pub fn new(bundles_directory: impl Into<PathBuf>) -> Self {
        Self {
            bundles_directory: bundles_directory.into(),
        }
    }

    /// Scans `<bundles_directory>/*/*/manifest`, returning one entry per
    /// version directory whose directory name (url-unquoted) and parsed
    /// integer version agree with its own manifest's `id` and `version`.
    /// Mismatches are logged and skipped rather than failing the whole
    /// scan. Entries are sorted by id, then by version descending.
    pub fn list(&self) -> Result<Vec<CacheEntry>, BundleError> {
        let mut entries = Vec::new();

        let Ok(id_dirs) = fs::read_dir(&self.bundles_directory) else {
            return Ok(entries);
        };

        for id_dir in id_dirs.filter_map(Result::ok) {
            let id_path = id_dir.path();
            if !id_path.is_dir() {
                continue;
            }
            let Ok(decoded_id) = percent_decode_str(&id_dir.file_name().to_string_lossy()).decode_utf8() else {
                continue;
            };

            let Ok(version_dirs) = fs::read_dir(&id_path) else {
                continue;
            };

            for version_dir in version_dirs.filter_map(Result::ok) {
                let version_path = version_dir.path();
                if !version_path.is_dir() {
                    continue;
                }

                let manifest_path = version_path.join("manifest");
                let Ok(bytes) = fs::read(&manifest_path) else {
                    continue;
                };
                let manifest = match Manifest::from_json(&manifest_path.display().to_string(), &bytes) {
                    Ok(manifest) => manifest,
                    Err(error) => {
                        warn!(directory = %version_path.display(), %error, "skipping bundle with an invalid manifest");
                        continue;
                    }
                };

                let dir_version: Option<u32> = version_dir.file_name().to_string_lossy().parse().ok();
                if manifest.id != decoded_id || dir_version != Some(manifest.version) {
                    warn!(
                        directory = %version_path.display(),
                        manifest_id = manifest.id,
                        manifest_version = manifest.version,
                        "bundle directory does not match its own manifest, skipping"
                    );
                    continue;
                }

                entries.push(CacheEntry {
                    id: manifest.id,
                    version: manifest.version,
                    directory: version_path,
                });
            }
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id).then(b.version.cmp(&a.version)));
        Ok(entries)
    }
}
