use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// Current manifest schema version written by the installer and accepted
/// by the deployer and fetcher.
pub const BUNDLE_MANIFEST_VERSION: u32 = 1;

/// A single dependency edge recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDependency {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

/// The JSON document written at `<bundle directory>/manifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: u32,
    pub id: String,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imports_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_registry_context_id: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
}

impl Manifest {
    /// Validates the manifest fields per the on-disk format's rules:
    /// `manifest_version` must be present and in `[1, BUNDLE_MANIFEST_VERSION]`,
    /// and both `id` and `version` must be present.
    pub fn validate(&self, path: &str) -> Result<(), BundleError> {
        let not_a_bundle = |reason: &str| BundleError::NotABundlePath {
            path: path.to_owned(),
            reason: reason.to_owned(),
        };

        if self.manifest_version == 0 || self.manifest_version > BUNDLE_MANIFEST_VERSION {
            return Err(not_a_bundle("the bundle manifest has an invalid manifest version"));
        }
        if self.version == 0 {
            return Err(not_a_bundle("the bundle manifest has no bundle version"));
        }
        if self.id.is_empty() {
            return Err(not_a_bundle("the bundle manifest has no bundle id"));
        }
        Ok(())
    }

    /// Parses a manifest from its JSON bytes, then validates it.
    pub fn from_json(path: &str, bytes: &[u8]) -> Result<Self, BundleError> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    /// Serializes the manifest to its canonical compact JSON form.
    pub fn to_json(&self) -> Result<Vec<u8>, BundleError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let manifest = Manifest {
            manifest_version: 1,
            id: "example/bundle".to_owned(),
            version: 3,
            default_context_id: Some("http://example.org/default".to_owned()),
            imports_context_id: None,
            class_registry_context_id: None,
            dependencies: vec![ManifestDependency {
                id: "example/dep".to_owned(),
                version: Some(1),
                excludes: vec!["http://example.org/excluded".to_owned()],
            }],
        };

        let bytes = manifest.to_json().unwrap();
        let parsed = Manifest::from_json("manifest", &bytes).unwrap();
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn rejects_missing_version() {
        let bytes = br#"{"manifest_version":1,"id":"x","dependencies":[]}"#;
        let err = Manifest::from_json("manifest", bytes).unwrap_err();
        assert!(matches!(err, BundleError::NotABundlePath { .. }) || matches!(err, BundleError::Json(_)));
    }

    #[test]
    fn rejects_excessive_manifest_version() {
        let bytes = br#"{"manifest_version":2,"id":"x","version":1,"dependencies":[]}"#;
        let err = Manifest::from_json("manifest", bytes).unwrap_err();
        assert!(matches!(err, BundleError::NotABundlePath { .. }));
    }
}
