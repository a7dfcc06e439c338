use std::path::Path;
use std::sync::{Mutex, OnceLock};

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// Configuration for one way of reaching a [`Remote`] (e.g. an HTTP index
/// URL). The `accessor_type` tag selects which registered loader/uploader
/// factory interprets `options`; this crate has no built-in accessor types
/// of its own; `bundle-client` registers the HTTP ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessorConfig {
    #[serde(rename = "type")]
    pub accessor_type: String,
    #[serde(flatten)]
    pub options: serde_yaml::Mapping,
}

/// Loads a specific bundle version from wherever a [`Remote`] makes it
/// available.
pub trait Loader: Send + Sync {
    fn can_load(&self, id: &str, version: Option<u32>) -> bool;

    /// Every version of `id` this loader can see, used to resolve "latest"
    /// when a fetch does not pin a version.
    fn bundle_versions(&self, id: &str) -> Vec<u32>;

    fn load(&self, id: &str, version: u32, target_directory: &Path) -> Result<(), BundleError>;
}

/// Uploads a packed bundle archive to wherever a [`Remote`] accepts them.
pub trait Uploader: Send + Sync {
    fn can_upload(&self, bundle_path: &Path) -> bool;

    fn upload(&self, bundle_path: &Path) -> Result<(), BundleError>;
}

/// Constructs [`Loader`]s from an [`AccessorConfig`] this factory
/// recognizes.
pub trait LoaderFactory: Send + Sync {
    fn can_load_from(&self, config: &AccessorConfig) -> bool;
    fn build(&self, config: &AccessorConfig) -> Box<dyn Loader>;
}

/// Constructs [`Uploader`]s from an [`AccessorConfig`] this factory
/// recognizes.
pub trait UploaderFactory: Send + Sync {
    fn can_upload_to(&self, config: &AccessorConfig) -> bool;
    fn build(&self, config: &AccessorConfig) -> Box<dyn Uploader>;
}

static LOADER_FACTORIES: OnceLock<Mutex<Vec<Box<dyn LoaderFactory>>>> = OnceLock::new();
static UPLOADER_FACTORIES: OnceLock<Mutex<Vec<Box<dyn UploaderFactory>>>> = OnceLock::new();

/// Registers a loader factory in the process-wide registry consulted by
/// every [`Remote::generate_loaders`] call. Bundle-client registers its
/// HTTP factory here at startup.
pub fn register_loader_factory(factory: Box<dyn LoaderFactory>) {
    LOADER_FACTORIES
        .get_or_init(|| Mutex::new(Vec::new()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(factory);
}

/// Registers an uploader factory in the process-wide registry consulted by
/// every [`Remote::generate_uploaders`] call.
pub fn register_uploader_factory(factory: Box<dyn UploaderFactory>) {
    UPLOADER_FACTORIES
        .get_or_init(|| Mutex::new(Vec::new()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(factory);
}

/// A named source/sink for bundles, described by one or more
/// [`AccessorConfig`]s. Persisted as a `.remote` YAML file in a remotes
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    #[serde(default)]
    pub accessor_configs: Vec<AccessorConfig>,
}

impl Remote {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessor_configs: Vec::new(),
        }
    }

    /// Every loader any registered factory can build from this remote's
    /// accessor configs.
    pub fn generate_loaders(&self) -> Vec<Box<dyn Loader>> {
        let factories = LOADER_FACTORIES.get_or_init(|| Mutex::new(Vec::new()));
        let factories = factories.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.accessor_configs
            .iter()
            .flat_map(|config| {
                factories
                    .iter()
                    .filter(|factory| factory.can_load_from(config))
                    .map(|factory| factory.build(config))
            })
            .collect()
    }

    /// Every uploader any registered factory can build from this remote's
    /// accessor configs.
    pub fn generate_uploaders(&self) -> Vec<Box<dyn Uploader>> {
        let factories = UPLOADER_FACTORIES.get_or_init(|| Mutex::new(Vec::new()));
        let factories = factories.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.accessor_configs
            .iter()
            .flat_map(|config| {
                factories
                    .iter()
                    .filter(|factory| factory.can_upload_to(config))
                    .map(|factory| factory.build(config))
            })
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<(), BundleError> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, BundleError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Scans `remotes_dir` for `*.remote` files, parsing each into a [`Remote`],
/// sorted by name.
pub fn retrieve_remotes(remotes_dir: &Path) -> Result<Vec<Remote>, BundleError> {
    let mut remotes = Vec::new();
    if !remotes_dir.is_dir() {
        return Ok(remotes);
    }
    for entry in fs::read_dir(remotes_dir)?.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("remote") {
            remotes.push(Remote::read(&path)?);
        }
    }
    remotes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(remotes)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn writes_and_reads_back_a_remote() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("example.remote");

        let mut mapping = serde_yaml::Mapping::new();
        mapping.insert(
            serde_yaml::Value::String("url".to_owned()),
            serde_yaml::Value::String("http://example.org/bundles".to_owned()),
        );
        let mut remote = Remote::new("example");
        remote.accessor_configs.push(AccessorConfig {
            accessor_type: "http".to_owned(),
            options: mapping,
        });
        remote.write(&path).unwrap();

        let read_back = Remote::read(&path).unwrap();
        assert_eq!(read_back.name, "example");
        assert_eq!(read_back.accessor_configs.len(), 1);
        assert_eq!(read_back.accessor_configs[0].accessor_type, "http");
    }

    #[test]
    fn retrieve_remotes_finds_only_dot_remote_files() {
        let dir = tempdir().unwrap();
        Remote::new("a").write(&dir.path().join("a.remote")).unwrap();
        Remote::new("b").write(&dir.path().join("b.remote")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let remotes = retrieve_remotes(dir.path()).unwrap();
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].name, "a");
        assert_eq!(remotes[1].name, "b");
    }
}
