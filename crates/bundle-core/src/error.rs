use std::path::PathBuf;

use bundle_archive::ArchiveError;
use thiserror::Error;

/// The error kinds surfaced at the bundle subsystem's boundary.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("{path}: {reason}")]
    NotABundlePath { path: String, reason: String },

    #[error("bundle {id} not found{}", version.map(|v| format!(" at version {v}")).unwrap_or_default())]
    BundleNotFound { id: String, version: Option<u32>, reason: String },

    #[error("installation failed: uncovered imports {uris:?}")]
    UncoveredImports { uris: Vec<String> },

    #[error("file {0} declared by the descriptor does not exist")]
    DescribedFileNotFound(PathBuf),

    #[error("target directory {0} is not empty")]
    TargetIsNotEmpty(PathBuf),

    #[error("fetch target directory {0} is not empty")]
    FetchTargetIsNotEmpty(PathBuf),

    #[error("no loader could load bundle {id} (version {version:?})")]
    NoBundleLoader { id: String, version: Option<u32> },

    #[error("no uploader accepted bundle at {0}")]
    NoAcceptableUploaders(PathBuf),

    #[error("no remote available")]
    NoRemoteAvailable,

    #[error("failed to load bundle: {0}")]
    LoadFailed(String),

    #[error("failed to upload bundle: {0}")]
    UploadFailed(String),

    #[error("operation is not supported on a read-only aggregate store")]
    UnsupportedAggregateOperation,

    #[error("object is not a descriptor")]
    NotADescriptor,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Lock(#[from] bundle_fs::LockError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid descriptor YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid file glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}
