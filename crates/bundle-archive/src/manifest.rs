use serde::Deserialize;

use crate::error::ArchiveError;

/// The fields of a bundle manifest this crate needs to derive and validate
/// a target directory. The full manifest model lives with the installer;
/// this crate only reads a raw JSON document, same as the original
/// implementation's `validate_manifest` operating on a plain dict.
#[derive(Debug, Deserialize)]
pub struct ArchiveManifestFields {
    pub manifest_version: Option<u32>,
    pub id: Option<String>,
    pub version: Option<u32>,
}

pub const BUNDLE_MANIFEST_VERSION: u32 = 1;

/// Validates the bare manifest fields needed to locate a bundle directory,
/// mirroring `validate_manifest`'s checks.
pub fn validate_manifest(path: &str, fields: &ArchiveManifestFields) -> Result<(), ArchiveError> {
    let not_a_bundle = |reason: &str| ArchiveError::NotABundlePath {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };

    let manifest_version = fields
        .manifest_version
        .ok_or_else(|| not_a_bundle("the bundle manifest has no manifest version"))?;

    if manifest_version == 0 || manifest_version > BUNDLE_MANIFEST_VERSION {
        return Err(not_a_bundle("the bundle manifest has an invalid manifest version"));
    }

    if fields.version.unwrap_or(0) == 0 {
        return Err(not_a_bundle("the bundle manifest has no bundle version"));
    }

    if fields.id.as_deref().unwrap_or("").is_empty() {
        return Err(not_a_bundle("the bundle manifest has no bundle id"));
    }

    Ok(())
}
