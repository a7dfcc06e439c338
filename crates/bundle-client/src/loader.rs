use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

use bundle_archive::Unarchiver;
use bundle_core::{AccessorConfig, BundleError, Loader, LoaderFactory};
use fs_err as fs;

use crate::error::ClientError;
use crate::hash::{choose_algorithm, new_hasher};
use crate::index::{integer_versions, url_is_http, HttpIndex};
use crate::options::{is_http_accessor, parse_options, HttpAccessorOptions};

/// Loads bundles from an HTTP(S) index file, matching the original
/// implementation's `HTTPBundleLoader`: the index maps bundle id to version
/// to `{url, hashes}`, and a downloaded archive is verified against one of
/// those hashes before being unpacked.
pub struct HttpLoader {
    options: HttpAccessorOptions,
    client: reqwest::blocking::Client,
    index: Mutex<Option<HttpIndex>>,
}

impl HttpLoader {
    pub fn new(options: HttpAccessorOptions) -> Self {
        Self {
            options,
            client: reqwest::blocking::Client::new(),
            index: Mutex::new(None),
        }
    }

    fn with_index<T>(&self, f: impl FnOnce(&HttpIndex) -> Result<T, ClientError>) -> Result<T, ClientError> {
        let mut guard = self.index.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_none() {
            let response = self.client.get(&self.options.url).send()?;
            let index: HttpIndex = response.json()?;
            *guard = Some(index);
        }
        f(guard.as_ref().expect("index populated above"))
    }

    fn load_inner(&self, id: &str, version: u32, target_directory: &Path) -> Result<(), ClientError> {
        let (url, algorithm, expected_hash) = self.with_index(|index| {
            let binfo = index.get(id).ok_or_else(|| ClientError::BundleNotInIndex(id.to_owned()))?;
            let entry = binfo.get(&version.to_string()).ok_or_else(|| ClientError::VersionNotInIndex {
                id: id.to_owned(),
                version,
            })?;
            if !url_is_http(&entry.url) {
                return Err(ClientError::NoValidUrl { id: id.to_owned(), version });
            }
            if entry.hashes.is_empty() {
                return Err(ClientError::NoHashInfo { id: id.to_owned(), version });
            }
            let algorithm = choose_algorithm(&self.options.hash_preference, &entry.hashes)
                .ok_or_else(|| ClientError::NoSupportedHash { id: id.to_owned(), version })?
                .to_owned();
            let expected_hash = entry.hashes[&algorithm].clone();
            Ok((entry.url.clone(), algorithm, expected_hash))
        })?;

        let mut response = self.client.get(&url).send()?;
        let mut hasher = new_hasher(&algorithm);

        let downloaded_path = match &self.options.cache_dir {
            Some(cache_dir) => {
                fs::create_dir_all(cache_dir)?;
                let path = cache_dir.join(percent_encoding::utf8_percent_encode(id, percent_encoding::NON_ALPHANUMERIC).to_string());
                let mut file = fs::File::create(&path)?;
                copy_hashing(&mut response, &mut file, &mut *hasher)?;
                path
            }
            None => {
                let mut temp_file = tempfile::NamedTempFile::new()?;
                copy_hashing(&mut response, temp_file.as_file_mut(), &mut *hasher)?;
                temp_file.into_temp_path().keep().map_err(|err| err.error)?
            }
        };

        let digest = hex::encode(hasher.finalize_reset());
        if digest != expected_hash {
            let _ = fs::remove_file(&downloaded_path);
            return Err(ClientError::HashMismatch { id: id.to_owned(), version, algorithm });
        }

        Unarchiver::new(None).unpack(&downloaded_path, Some(target_directory))?;
        if self.options.cache_dir.is_none() {
            let _ = fs::remove_file(&downloaded_path);
        }
        Ok(())
    }
}

fn copy_hashing(source: &mut impl Read, dest: &mut impl Write, hasher: &mut dyn digest::DynDigest) -> std::io::Result<()> {
    let mut buffer = [0_u8; 8192];
    loop {
        let read = source.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        dest.write_all(&buffer[..read])?;
    }
    Ok(())
}

impl Loader for HttpLoader {
    fn can_load(&self, id: &str, version: Option<u32>) -> bool {
        self.with_index(|index| {
            let Some(binfo) = index.get(id) else {
                return Ok(false);
            };
            match version {
                Some(version) => Ok(binfo.get(&version.to_string()).is_some_and(|entry| url_is_http(&entry.url))),
                None => Ok(binfo.values().any(|entry| url_is_http(&entry.url))),
            }
        })
        .unwrap_or(false)
    }

    fn bundle_versions(&self, id: &str) -> Vec<u32> {
        self.with_index(|index| Ok(index.get(id).map(|binfo| integer_versions(binfo, id)).unwrap_or_default()))
            .unwrap_or_default()
    }

    fn load(&self, id: &str, version: u32, target_directory: &Path) -> Result<(), BundleError> {
        self.load_inner(id, version, target_directory)
            .map_err(|err| BundleError::LoadFailed(err.to_string()))
    }
}

pub struct HttpLoaderFactory;

impl LoaderFactory for HttpLoaderFactory {
    fn can_load_from(&self, config: &AccessorConfig) -> bool {
        is_http_accessor(config)
    }

    fn build(&self, config: &AccessorConfig) -> Box<dyn Loader> {
        let options = parse_options(config).expect("can_load_from already validated the options");
        Box::new(HttpLoader::new(options))
    }
}

#[cfg(test)]
mod tests {
    use bundle_archive::Archiver;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn choose_algorithm_prefers_listed_order() {
        let mut available = std::collections::BTreeMap::new();
        available.insert("sha256".to_owned(), "a".to_owned());
        available.insert("sha224".to_owned(), "b".to_owned());
        let preference = vec!["sha224".to_owned(), "sha256".to_owned()];
        assert_eq!(choose_algorithm(&preference, &available), Some("sha224"));
    }

    #[test]
    fn choose_algorithm_falls_back_to_any_supported() {
        let mut available = std::collections::BTreeMap::new();
        available.insert("md5".to_owned(), "a".to_owned());
        available.insert("sha1".to_owned(), "b".to_owned());
        let preference = vec!["sha224".to_owned()];
        assert_eq!(choose_algorithm(&preference, &available), Some("sha1"));
    }

    fn packed_bundle_bytes(id: &str, version: u32) -> Vec<u8> {
        let source_dir = tempdir().unwrap();
        fs::write(
            source_dir.path().join("manifest"),
            serde_json::to_vec(&json!({"manifest_version": 1, "id": (id), "version": version})).unwrap(),
        )
        .unwrap();
        let archive_dir = tempdir().unwrap();
        let archive_path = Archiver::new(archive_dir.path()).pack(source_dir.path(), Some("bundle.tar.xz")).unwrap();
        fs::read(&archive_path).unwrap()
    }

    async fn serve_index_and_archive(id: &str, version: u32, archive_bytes: Vec<u8>, served_hash: &str) -> MockServer {
        let server = MockServer::start().await;
        let body = json!({
            (id): { (version.to_string()): { "url": format!("{}/bundle.tar.xz", server.uri()), "hashes": { "sha224": served_hash } } }
        });
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bundle.tar.xz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes))
            .mount(&server)
            .await;
        server
    }

    fn sha224_hex(bytes: &[u8]) -> String {
        let mut hasher = new_hasher("sha224");
        hasher.update(bytes);
        hex::encode(hasher.finalize_reset())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loads_and_unpacks_a_bundle_whose_hash_matches() {
        let archive_bytes = packed_bundle_bytes("bundle", 1);
        let digest = sha224_hex(&archive_bytes);
        let server = serve_index_and_archive("bundle", 1, archive_bytes, &digest).await;
        let index_url = format!("{}/index.json", server.uri());

        let target = tempdir().unwrap();
        let target_path = target.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let loader = HttpLoader::new(HttpAccessorOptions {
                url: index_url,
                cache_dir: None,
                hash_preference: vec!["sha224".to_owned()],
                max_retries: 0,
            });
            loader.load_inner("bundle", 1, &target_path).unwrap();
            assert!(target_path.join("manifest").exists());
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejects_an_archive_whose_hash_does_not_match_the_index() {
        let archive_bytes = packed_bundle_bytes("bundle", 1);
        let server = serve_index_and_archive("bundle", 1, archive_bytes, "0000000000000000000000000000000000000000000000000000000000").await;
        let index_url = format!("{}/index.json", server.uri());

        let target = tempdir().unwrap();
        let target_path = target.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let loader = HttpLoader::new(HttpAccessorOptions {
                url: index_url,
                cache_dir: None,
                hash_preference: vec!["sha224".to_owned()],
                max_retries: 0,
            });
            let err = loader.load_inner("bundle", 1, &target_path).unwrap_err();
            assert!(matches!(err, ClientError::HashMismatch { .. }));
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bundle_versions_lists_every_integer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bundle": {
                    "1": { "url": "http://example.invalid/v1.tar.xz", "hashes": { "sha224": "a" } },
                    "3": { "url": "http://example.invalid/v3.tar.xz", "hashes": { "sha224": "b" } },
                    "latest": { "url": "http://example.invalid/bad.tar.xz", "hashes": {} }
                }
            })))
            .mount(&server)
            .await;
        let index_url = format!("{}/index.json", server.uri());

        tokio::task::spawn_blocking(move || {
            let loader = HttpLoader::new(HttpAccessorOptions {
                url: index_url,
                cache_dir: None,
                hash_preference: vec!["sha224".to_owned()],
                max_retries: 0,
            });
            let mut versions = loader.bundle_versions("bundle");
            versions.sort_unstable();
            assert_eq!(versions, vec![1, 3]);
        })
        .await
        .unwrap();
    }
}
