use std::collections::BTreeMap;

use serde::Deserialize;

/// One version's entry in an HTTP bundle index: where to download the
/// archive and the hex digests it's expected to match.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    pub url: String,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// The JSON document an [`crate::HttpLoader`] fetches: bundle id -> version
/// string -> entry. Versions that don't parse as integers are ignored with
/// a warning rather than failing the whole lookup.
pub type HttpIndex = BTreeMap<String, BTreeMap<String, IndexEntry>>;

pub fn integer_versions(entries: &BTreeMap<String, IndexEntry>, bundle_id: &str) -> Vec<u32> {
    let mut versions = Vec::new();
    for key in entries.keys() {
        match key.parse::<u32>() {
            Ok(version) => versions.push(version),
            Err(_) => tracing::warn!(bundle_id, version_key = key, "non-integer version key in bundle index"),
        }
    }
    versions
}

pub fn url_is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
