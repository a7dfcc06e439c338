use std::fs::File as StdFile;
use std::io::Read;
use std::path::{Path, PathBuf};

use bundle_fs::fmt_bundle_directory;
use fs_err as fs;
use tracing::debug;
use xz2::read::XzDecoder;

use crate::error::ArchiveError;
use crate::manifest::{validate_manifest, ArchiveManifestFields};
use crate::safe::{parent_components, resolves_within};

/// Unpacks an archive file (a bundle's `tar.xz`) into a bundle directory.
pub struct Unarchiver {
    bundles_directory: Option<PathBuf>,
}

impl Unarchiver {
    /// Creates an unarchiver. When `bundles_directory` is set, a
    /// `target_directory` that disagrees with the manifest's derived
    /// directory is rejected with [`ArchiveError::TargetDirectoryMismatch`].
    pub fn new(bundles_directory: Option<PathBuf>) -> Self {
        Self { bundles_directory }
    }

    /// Unpacks `input_path` into `target_directory`, returning the
    /// directory actually used.
    pub fn unpack(
        &self,
        input_path: &Path,
        target_directory: Option<&Path>,
    ) -> Result<PathBuf, ArchiveError> {
        if self.bundles_directory.is_none() && target_directory.is_none() {
            return Err(ArchiveError::NoTargetDirectory);
        }

        let file = StdFile::open(input_path).map_err(|_| ArchiveError::NotABundlePath {
            path: input_path.display().to_string(),
            reason: "file not found".to_owned(),
        })?;
        let decoder = XzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);

        let manifest_fields = read_manifest(&mut archive, input_path)?;
        let expected = self.bundles_directory.as_deref().map(|root| {
            fmt_bundle_directory(
                root,
                manifest_fields.id.as_deref().unwrap_or_default(),
                manifest_fields.version,
            )
        });

        let target = match (target_directory, &expected) {
            (Some(target), Some(expected)) if target != expected => {
                return Err(ArchiveError::TargetDirectoryMismatch {
                    target: target.to_path_buf(),
                    expected: expected.clone(),
                })
            }
            (Some(target), _) => target.to_path_buf(),
            (None, Some(expected)) => expected.clone(),
            (None, None) => return Err(ArchiveError::NoTargetDirectory),
        };

        if directory_has_entries(&target) {
            return Err(ArchiveError::TargetIsNotEmpty(target));
        }

        debug!(input = %input_path.display(), target = %target.display(), "extracting archive");

        // Re-open: the manifest read above consumed the single-pass tar
        // stream to validate it before committing to extraction.
        let file = StdFile::open(input_path)?;
        let decoder = XzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        if let Err(error) = extract_checked(&mut archive, &target) {
            let _ = fs::remove_dir_all(&target);
            return Err(error);
        }

        Ok(target)
    }
}

fn directory_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

pub(crate) fn read_manifest<R: Read>(
    archive: &mut tar::Archive<R>,
    input_path: &Path,
) -> Result<ArchiveManifestFields, ArchiveError> {
    let path_label = input_path.display().to_string();
    let mut found = None;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_path_buf();
        if name == Path::new("manifest") || name == Path::new("./manifest") {
            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            found = Some(contents);
            break;
        }
    }
    let contents = found.ok_or_else(|| ArchiveError::NotABundlePath {
        path: path_label.clone(),
        reason: "archive has no manifest".to_owned(),
    })?;
    let fields: ArchiveManifestFields =
        serde_json::from_str(&contents).map_err(|_| ArchiveError::NotABundlePath {
            path: path_label.clone(),
            reason: "archive manifest is not valid JSON".to_owned(),
        })?;
    validate_manifest(&path_label, &fields)?;
    Ok(fields)
}

fn extract_checked<R: Read>(archive: &mut tar::Archive<R>, target: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(target)?;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = entry.path()?.to_path_buf();

        if !resolves_within(&[], &relative) {
            return Err(ArchiveError::UnsafePath {
                member: relative.display().to_string(),
                reason: format!("path is outside of base path \"{}\"", target.display()),
            });
        }

        if let Some(link_name) = entry.link_name()? {
            let base = parent_components(&relative);
            if !resolves_within(&base, &link_name) {
                return Err(ArchiveError::UnsafePath {
                    member: relative.display().to_string(),
                    reason: format!(
                        "link points to \"{}\", outside of base path \"{}\"",
                        link_name.display(),
                        target.display()
                    ),
                });
            }
        }

        let destination = target.join(&relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&destination)?;
    }
    Ok(())
}
