use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use bundle_fs::fmt_bundle_directory;
use bundle_rdf::{ContextId, Graph, MemoryGraph, Triple};
use fs_err as fs;

use crate::aggregate::{AggregateStore, DependencyLeg, VisitKey};
use crate::error::BundleError;
use crate::fetcher::Fetcher;
use crate::manifest::Manifest;
use crate::remote::Remote;

/// A resolved, on-disk bundle: its directory and parsed manifest. Reading
/// its RDF data and composing it with its dependencies happens on demand
/// via [`Bundle::load_graph`] and [`Bundle::aggregate`].
pub struct Bundle {
    directory: PathBuf,
    manifest: Manifest,
}

impl Bundle {
    /// Resolves a bundle directory under `bundles_root` by id, at an exact
    /// `version` or (when `None`) the highest integer version subdirectory
    /// present. If no local version exists, attempts a fetch through
    /// `remotes` before failing with [`BundleError::BundleNotFound`].
    pub fn resolve(bundles_root: &Path, remotes: &[Remote], id: &str, version: Option<u32>) -> Result<Self, BundleError> {
        if let Some(bundle) = Self::resolve_local(bundles_root, id, version) {
            return Ok(bundle);
        }

        let fetcher = Fetcher::new(bundles_root);
        fetcher.fetch(remotes, id, version).map_err(|_| BundleError::BundleNotFound {
            id: id.to_owned(),
            version,
            reason: "no local version found and no remote could provide it".to_owned(),
        })?;

        Self::resolve_local(bundles_root, id, version).ok_or_else(|| BundleError::BundleNotFound {
            id: id.to_owned(),
            version,
            reason: "fetch succeeded but left no resolvable bundle directory".to_owned(),
        })
    }

    fn resolve_local(bundles_root: &Path, id: &str, version: Option<u32>) -> Option<Self> {
        let directory = match version {
            Some(v) => fmt_bundle_directory(bundles_root, id, Some(v)),
            None => Self::resolve_latest(bundles_root, id).ok()?,
        };

        let manifest_path = directory.join(bundle_fs::BUNDLE_MANIFEST_FILE_NAME);
        let bytes = fs::read(&manifest_path).ok()?;
        let manifest = Manifest::from_json(&manifest_path.display().to_string(), &bytes).ok()?;
        Some(Self { directory, manifest })
    }

    fn resolve_latest(bundles_root: &Path, id: &str) -> Result<PathBuf, BundleError> {
        let id_dir = fmt_bundle_directory(bundles_root, id, None);
        let mut best: Option<u32> = None;
        if let Ok(entries) = fs::read_dir(&id_dir) {
            for entry in entries.filter_map(Result::ok) {
                if let Some(v) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
                    if best.map_or(true, |current| v > current) {
                        best = Some(v);
                    }
                }
            }
        }
        let version = best.ok_or_else(|| BundleError::BundleNotFound {
            id: id.to_owned(),
            version: None,
            reason: "no versions of this bundle were found locally".to_owned(),
        })?;
        Ok(fmt_bundle_directory(bundles_root, id, Some(version)))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn version(&self) -> u32 {
        self.manifest.version
    }

    /// Loads this bundle's own contexts (not its dependencies') by reading
    /// `graphs/index` and decoding each referenced N-Triples file,
    /// reversing [`bundle_rdf::canonicalize`].
    pub fn load_graph(&self) -> Result<MemoryGraph, BundleError> {
        let index = self.read_graphs_index()?;

        let mut graph = MemoryGraph::new();
        let mut decoded: BTreeMap<String, Vec<Triple>> = BTreeMap::new();
        for (context_uri, filename) in index {
            let triples = match decoded.get(&filename) {
                Some(triples) => triples.clone(),
                None => {
                    let bytes = fs::read(self.directory.join("graphs").join(&filename))?;
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    let triples = bundle_rdf::parse_ntriples(&text).map_err(|error| BundleError::NotABundlePath {
                        path: self.directory.display().to_string(),
                        reason: error.to_string(),
                    })?;
                    decoded.insert(filename.clone(), triples.clone());
                    triples
                }
            };
            let ctx = ContextId::new(context_uri);
            graph
                .add_n(&ctx, &triples)
                .expect("MemoryGraph::add_n never rejects a write");
        }
        Ok(graph)
    }

    /// The context URIs this bundle declares, used by a dependent
    /// installer to compute import-closure coverage without reading the
    /// full graph data back.
    pub fn declared_contexts(&self) -> Result<Vec<String>, BundleError> {
        Ok(self.read_graphs_index()?.into_keys().collect())
    }

    fn read_graphs_index(&self) -> Result<BTreeMap<String, String>, BundleError> {
        let bytes = fs::read(self.directory.join("graphs/index"))?;
        decode_line_entries(&bytes, &self.directory)
    }

    /// Recursively resolves this bundle's declared dependencies and
    /// composes an [`AggregateStore`] over this bundle's own graph and
    /// theirs, pruning `(id, version, accumulated excludes)` legs already
    /// visited so that a dependency DAG with shared ancestors is only
    /// loaded once per distinct view.
    pub fn aggregate(&self, bundles_root: &Path, remotes: &[Remote]) -> Result<AggregateStore, BundleError> {
        let mut visited = HashSet::new();
        self.aggregate_visited(bundles_root, remotes, &mut visited, &[])
    }

    fn aggregate_visited(
        &self,
        bundles_root: &Path,
        remotes: &[Remote],
        visited: &mut HashSet<VisitKey>,
        inherited_excludes: &[String],
    ) -> Result<AggregateStore, BundleError> {
        let primary: Box<dyn Graph> = Box::new(self.load_graph()?);
        let mut dependencies = Vec::new();

        for dep in &self.manifest.dependencies {
            let mut excludes: Vec<String> = inherited_excludes.to_vec();
            excludes.extend(dep.excludes.iter().cloned());

            let key = VisitKey::new(dep.id.clone(), dep.version, excludes.clone());
            if !visited.insert(key) {
                continue;
            }

            let dep_bundle = Bundle::resolve(bundles_root, remotes, &dep.id, dep.version)?;
            let dep_store = dep_bundle.aggregate_visited(bundles_root, remotes, visited, &excludes)?;
            dependencies.push(DependencyLeg {
                id: dep.id.clone(),
                version: dep.version,
                excludes: excludes.into_iter().collect(),
                store: Box::new(dep_store),
            });
        }

        Ok(AggregateStore::new(primary, dependencies))
    }
}

/// Decodes `<key>\0<value>\n` lines, the format `graphs/index` uses to map
/// a context URI to its canonicalized N-Triples filename.
fn decode_line_entries(bytes: &[u8], directory: &Path) -> Result<BTreeMap<String, String>, BundleError> {
    let malformed = |reason: &str| BundleError::NotABundlePath {
        path: directory.display().to_string(),
        reason: reason.to_owned(),
    };

    let mut entries = BTreeMap::new();
    for line in bytes.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let nul = line.iter().position(|&b| b == 0).ok_or_else(|| malformed("graphs/index line missing NUL separator"))?;
        let key = std::str::from_utf8(&line[..nul]).map_err(|_| malformed("graphs/index key is not valid UTF-8"))?;
        let value = std::str::from_utf8(&line[nul + 1..]).map_err(|_| malformed("graphs/index value is not valid UTF-8"))?;
        entries.insert(key.to_owned(), value.to_owned());
    }
    Ok(entries)
}
