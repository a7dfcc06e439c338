use std::path::{Path, PathBuf};

use bundle_fs::is_indexed_db_path;
use fs_err as fs;
use tracing::debug;
use walkdir::WalkDir;
use xz2::write::XzEncoder;

use crate::error::ArchiveError;

/// Packs an installed bundle directory into an `xz`-compressed tar archive.
pub struct Archiver {
    target_directory: PathBuf,
}

impl Archiver {
    /// Creates an archiver that writes archives under `target_directory`.
    pub fn new(target_directory: impl Into<PathBuf>) -> Self {
        Self {
            target_directory: target_directory.into(),
        }
    }

    /// Packs `bundle_directory` into `<target_directory>/<target_file_name>`
    /// (default `bundle.tar.xz`), excluding the regenerable indexed
    /// database. Returns the archive's path.
    pub fn pack(
        &self,
        bundle_directory: &Path,
        target_file_name: Option<&str>,
    ) -> Result<PathBuf, ArchiveError> {
        let target_file_name = target_file_name.unwrap_or("bundle.tar.xz");
        let target_path = self.target_directory.join(target_file_name);

        let file = fs::File::create(&target_path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::ArchiveTargetPathDoesNotExist(target_path.clone())
            } else {
                ArchiveError::Io(source)
            }
        })?;

        let encoder = XzEncoder::new(file, 6);
        let mut builder = tar::Builder::new(encoder);

        for entry in WalkDir::new(bundle_directory) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(bundle_directory)
                .expect("walkdir entries are rooted at bundle_directory")
                .to_path_buf();
            if is_indexed_db_path(&relative) {
                continue;
            }
            debug!(path = %relative.display(), "adding archive member");
            builder.append_path_with_name(entry.path(), &relative)?;
        }

        builder.into_inner()?.finish()?;
        Ok(target_path)
    }
}
