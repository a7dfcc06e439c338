use thiserror::Error;

/// Errors internal to the HTTP loader/uploader, converted into
/// `bundle_core::BundleError::LoadFailed`/`UploadFailed` at the
/// `Loader`/`Uploader` trait boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bundle {0} is not in the index")]
    BundleNotInIndex(String),

    #[error("no entry for {id} at version {version}")]
    VersionNotInIndex { id: String, version: u32 },

    #[error("no valid URL for {id} at version {version}")]
    NoValidUrl { id: String, version: u32 },

    #[error("no hash info for {id} at version {version}")]
    NoHashInfo { id: String, version: u32 },

    #[error("no supported hash algorithm for {id} at version {version}")]
    NoSupportedHash { id: String, version: u32 },

    #[error("{algorithm} hash mismatch for {id} at version {version}")]
    HashMismatch { id: String, version: u32, algorithm: String },

    #[error("upload to {url} was rejected after {attempts} attempts")]
    UploadExhausted { url: String, attempts: u32 },

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Archive(#[from] bundle_archive::ArchiveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
