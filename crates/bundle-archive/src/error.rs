use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while packing or unpacking a bundle archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{path}: {reason}")]
    NotABundlePath { path: String, reason: String },

    #[error(
        "target directory \"{target}\" does not match expected directory \"{expected}\" \
         for the bundle manifest"
    )]
    TargetDirectoryMismatch { target: PathBuf, expected: PathBuf },

    #[error("disallowed archive member \"{member}\": {reason}")]
    UnsafePath { member: String, reason: String },

    #[error("archive target path does not exist: {0}")]
    ArchiveTargetPathDoesNotExist(PathBuf),

    #[error("neither a bundles_directory nor a target_directory was provided")]
    NoTargetDirectory,

    #[error("target directory {0} is not empty")]
    TargetIsNotEmpty(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}
