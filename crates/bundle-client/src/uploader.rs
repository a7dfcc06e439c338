use std::path::Path;

use bundle_archive::ensure_archive;
use bundle_core::{AccessorConfig, BundleError, Uploader, UploaderFactory};
use fs_err as fs;

use crate::error::ClientError;
use crate::options::{is_http_accessor, parse_options, HttpAccessorOptions};

const ARCHIVE_MIME_TYPE: &str = "application/x-gtar";

/// Uploads a packed bundle archive over HTTP(S) POST, matching the original
/// implementation's `HTTPBundleUploader`.
pub struct HttpUploader {
    options: HttpAccessorOptions,
    client: reqwest::blocking::Client,
}

impl HttpUploader {
    pub fn new(options: HttpAccessorOptions) -> Self {
        Self {
            options,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn upload_inner(&self, bundle_path: &Path) -> Result<(), ClientError> {
        let ensured = ensure_archive(bundle_path)?;
        let bytes = fs::read(ensured.path())?;
        let max_attempts = self.options.max_retries + 1;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(&self.options.url)
                .header("Content-Type", ARCHIVE_MIME_TYPE)
                .body(bytes.clone())
                .send()?;

            if response.status().is_success() {
                return Ok(());
            }
            if attempt >= max_attempts {
                return Err(ClientError::UploadExhausted {
                    url: self.options.url.clone(),
                    attempts: attempt,
                });
            }
            tracing::warn!(
                url = %self.options.url,
                attempt,
                remaining = max_attempts - attempt,
                status = %response.status(),
                "bundle upload rejected, retrying",
            );
        }
    }
}

impl Uploader for HttpUploader {
    fn can_upload(&self, _bundle_path: &Path) -> bool {
        true
    }

    fn upload(&self, bundle_path: &Path) -> Result<(), BundleError> {
        self.upload_inner(bundle_path)
            .map_err(|err| BundleError::UploadFailed(err.to_string()))
    }
}

pub struct HttpUploaderFactory;

impl UploaderFactory for HttpUploaderFactory {
    fn can_upload_to(&self, config: &AccessorConfig) -> bool {
        is_http_accessor(config)
    }

    fn build(&self, config: &AccessorConfig) -> Box<dyn Uploader> {
        let options = parse_options(config).expect("can_upload_to already validated the options");
        Box::new(HttpUploader::new(options))
    }
}
