use std::path::PathBuf;

use bundle_core::AccessorConfig;
use serde::Deserialize;

/// Fields recognized inside an `http`/`https` [`AccessorConfig`]'s options
/// mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpAccessorOptions {
    pub url: String,
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_hash_preference")]
    pub hash_preference: Vec<String>,
    /// Upload retries after the first attempt. Zero means a single POST,
    /// no retry.
    #[serde(default)]
    pub max_retries: u32,
}

fn default_hash_preference() -> Vec<String> {
    vec!["sha224".to_owned()]
}

pub fn parse_options(config: &AccessorConfig) -> Option<HttpAccessorOptions> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(config.options.clone())).ok()
}

pub fn is_http_accessor(config: &AccessorConfig) -> bool {
    (config.accessor_type == "http" || config.accessor_type == "https")
        && parse_options(config).is_some_and(|options| crate::index::url_is_http(&options.url))
}
