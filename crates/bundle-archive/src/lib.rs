//! Packing and unpacking of bundle archives: `xz`-compressed tar files
//! whose entries are walked through a path-traversal-safe extraction
//! filter before anything touches disk.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub use crate::error::ArchiveError;
pub use crate::manifest::{validate_manifest, ArchiveManifestFields, BUNDLE_MANIFEST_VERSION};
pub use crate::pack::Archiver;
pub use crate::unpack::Unarchiver;

mod error;
mod manifest;
mod pack;
mod safe;
mod unpack;

/// A bundle archive path, plus the temporary directory backing it, when
/// one was created. Produced by [`ensure_archive`]; holding this value
/// keeps any such temporary directory alive until the caller is done with
/// the archive.
pub struct EnsuredArchive {
    path: PathBuf,
    _temp_dir: Option<TempDir>,
}

impl EnsuredArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Produces an archive path from `bundle_path`, whether it already is an
/// archive file or is a bundle directory that needs packing first.
pub fn ensure_archive(bundle_path: &Path) -> Result<EnsuredArchive, ArchiveError> {
    if bundle_path.is_dir() {
        let temp_dir = TempDir::new()?;
        let archive_path = Archiver::new(temp_dir.path()).pack(bundle_path, Some("bundle.tar.xz"))?;
        return Ok(EnsuredArchive {
            path: archive_path,
            _temp_dir: Some(temp_dir),
        });
    }

    if !looks_like_xz_tar(bundle_path)? {
        return Err(ArchiveError::NotABundlePath {
            path: bundle_path.display().to_string(),
            reason: "expected a directory or a tar file".to_owned(),
        });
    }

    Ok(EnsuredArchive {
        path: bundle_path.to_path_buf(),
        _temp_dir: None,
    })
}

/// Reads and validates a bundle's manifest fields from either a bundle
/// directory or an archive file, without extracting the archive. Used by
/// the deployer to reject a malformed bundle before uploading it.
pub fn read_manifest_fields(path: &Path) -> Result<ArchiveManifestFields, ArchiveError> {
    if path.is_dir() {
        let path_label = path.display().to_string();
        let manifest_path = path.join("manifest");
        let contents = fs_err::read_to_string(&manifest_path).map_err(|_| ArchiveError::NotABundlePath {
            path: path_label.clone(),
            reason: "directory has no manifest".to_owned(),
        })?;
        let fields: ArchiveManifestFields = serde_json::from_str(&contents).map_err(|_| ArchiveError::NotABundlePath {
            path: path_label.clone(),
            reason: "manifest is not valid JSON".to_owned(),
        })?;
        validate_manifest(&path_label, &fields)?;
        return Ok(fields);
    }

    let file = fs_err::File::open(path).map_err(|_| ArchiveError::NotABundlePath {
        path: path.display().to_string(),
        reason: "file not found".to_owned(),
    })?;
    let decoder = xz2::read::XzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    unpack::read_manifest(&mut archive, path)
}

fn looks_like_xz_tar(path: &Path) -> Result<bool, ArchiveError> {
    use std::io::Read;
    let mut file = fs_err::File::open(path)?;
    let mut magic = [0u8; 6];
    if file.read_exact(&mut magic).is_err() {
        return Ok(false);
    }
    Ok(magic == [0xFD, b'7', b'z', b'X', b'Z', 0x00])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    fn write_manifest(dir: &Path, id: &str, version: u32) {
        std::fs::write(
            dir.join("manifest"),
            format!(r#"{{"manifest_version":1,"id":"{id}","version":{version},"dependencies":[]}}"#),
        )
        .unwrap();
    }

    #[test]
    fn pack_then_unpack_round_trips() {
        let bundle_dir = tempdir().unwrap();
        write_manifest(bundle_dir.path(), "example/bundle", 1);
        std::fs::create_dir_all(bundle_dir.path().join("graphs")).unwrap();
        std::fs::write(bundle_dir.path().join("graphs/index"), b"").unwrap();
        std::fs::write(bundle_dir.path().join("owm.db"), b"regenerable").unwrap();

        let archive_dir = tempdir().unwrap();
        let archive_path = Archiver::new(archive_dir.path())
            .pack(bundle_dir.path(), None)
            .unwrap();
        assert!(archive_path.exists());

        let unpack_target = tempdir().unwrap();
        std::fs::remove_dir(unpack_target.path()).unwrap();

        let unarchiver = Unarchiver::new(None);
        let result = unarchiver
            .unpack(&archive_path, Some(unpack_target.path()))
            .unwrap();

        assert_eq!(result, unpack_target.path());
        assert!(result.join("manifest").exists());
        assert!(result.join("graphs/index").exists());
        assert!(!result.join("owm.db").exists());
    }

    #[test]
    fn unpack_rejects_path_traversal() {
        let archive_dir = tempdir().unwrap();
        let archive_path = archive_dir.path().join("evil.tar.xz");
        {
            let file = fs_err::File::create(&archive_path).unwrap();
            let encoder = xz2::write::XzEncoder::new(file, 6);
            let mut builder = tar::Builder::new(encoder);

            let mut manifest_header = tar::Header::new_gnu();
            let manifest_bytes =
                br#"{"manifest_version":1,"id":"evil/bundle","version":1,"dependencies":[]}"#;
            manifest_header.set_path("manifest").unwrap();
            manifest_header.set_size(manifest_bytes.len() as u64);
            manifest_header.set_cksum();
            builder
                .append(&manifest_header, &manifest_bytes[..])
                .unwrap();

            let mut evil_header = tar::Header::new_gnu();
            evil_header.set_path("../escaped").unwrap();
            evil_header.set_size(4);
            evil_header.set_cksum();
            builder.append(&evil_header, &b"evil"[..]).unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        let unpack_target = tempdir().unwrap();
        std::fs::remove_dir(unpack_target.path()).unwrap();

        let unarchiver = Unarchiver::new(None);
        let err = unarchiver
            .unpack(&archive_path, Some(unpack_target.path()))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::UnsafePath { .. }));
        assert!(!unpack_target.path().exists());
    }

    #[test]
    fn ensure_archive_packs_a_directory() {
        let bundle_dir = tempdir().unwrap();
        write_manifest(bundle_dir.path(), "example/bundle", 1);

        let ensured = ensure_archive(bundle_dir.path()).unwrap();
        assert!(ensured.path().exists());
        assert!(looks_like_xz_tar(ensured.path()).unwrap());
    }
}
