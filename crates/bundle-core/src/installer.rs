use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use bundle_fs::{fmt_bundle_directory, BlockHasher, LockFile};
use bundle_rdf::{canonicalize, ContextId, Graph};
use fs_err as fs;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::Sha224;
use walkdir::WalkDir;

use crate::descriptor::{file_exists, Descriptor};
use crate::error::BundleError;
use crate::imports::transitive_imports;
use crate::manifest::{Manifest, ManifestDependency, BUNDLE_MANIFEST_VERSION};

/// Synthesizes the bundle-scoped imports context URI recorded in a
/// manifest's `imports_context_id`, distinct from the source graph's own
/// imports context.
pub fn fmt_bundle_ctx_id(id: &str) -> String {
    format!(
        "http://openworm.org/data/generated_imports_ctx?bundle_id={}",
        utf8_percent_encode(id, NON_ALPHANUMERIC)
    )
}

/// The source data an install reads from: the conjunctive graph holding the
/// project's contexts, its imports context (if import-closure coverage
/// should be checked), the directory auxiliary files are resolved against,
/// and a callback resolving a declared dependency to the context URIs it
/// already covers (so this bundle does not need to cover them itself).
pub struct InstallSource<'a> {
    pub graph: &'a dyn Graph,
    pub imports_context_id: Option<ContextId>,
    pub source_directory: Option<&'a Path>,
    pub dependency_contexts: &'a dyn Fn(&str, Option<u32>) -> Result<Vec<String>, BundleError>,
}

/// Builds a bundle directory from a [`Descriptor`] and an [`InstallSource`],
/// following the same staged, lock-guarded procedure as the original
/// implementation's `Installer.install`.
pub struct Installer {
    bundles_directory: PathBuf,
}

impl Installer {
    pub fn new(bundles_directory: impl Into<PathBuf>) -> Self {
        Self {
            bundles_directory: bundles_directory.into(),
        }
    }

    pub fn install(&self, descriptor: &Descriptor, source: &InstallSource<'_>) -> Result<PathBuf, BundleError> {
        let staging = fmt_bundle_directory(&self.bundles_directory, &descriptor.id, Some(descriptor.version));
        fs::create_dir_all(&staging)?;
        if directory_has_entries(&staging)? {
            return Err(BundleError::TargetIsNotEmpty(staging));
        }

        let owner_id = format!("installer-{}", std::process::id());
        let lock = LockFile::acquire(staging.join(".lock"), &owner_id)?;

        let graphs_dir = staging.join("graphs");
        let files_dir = staging.join("files");
        fs::create_dir_all(&graphs_dir)?;
        fs::create_dir_all(&files_dir)?;

        match self.populate(&staging, &graphs_dir, &files_dir, descriptor, source) {
            Ok(()) => {
                lock.release();
                Ok(staging)
            }
            Err(error) => {
                let _ = fs::remove_dir_all(&graphs_dir);
                let _ = fs::remove_dir_all(&files_dir);
                Err(error)
            }
        }
    }

    fn populate(
        &self,
        staging: &Path,
        graphs_dir: &Path,
        files_dir: &Path,
        descriptor: &Descriptor,
        source: &InstallSource<'_>,
    ) -> Result<(), BundleError> {
        self.select_files(files_dir, descriptor, source.source_directory)?;

        let selected = self.select_contexts(graphs_dir, descriptor, source.graph)?;
        self.check_import_coverage(descriptor, source, &selected)?;

        let manifest = Manifest {
            manifest_version: BUNDLE_MANIFEST_VERSION,
            id: descriptor.id.clone(),
            version: descriptor.version,
            default_context_id: None,
            imports_context_id: Some(fmt_bundle_ctx_id(&descriptor.id)),
            class_registry_context_id: None,
            dependencies: descriptor
                .dependencies
                .iter()
                .map(|dep| ManifestDependency {
                    id: dep.id.clone(),
                    version: dep.version,
                    excludes: dep.excludes.clone(),
                })
                .collect(),
        };
        fs::write(staging.join("manifest"), manifest.to_json()?)?;

        self.build_indexed_database(staging, source.graph, &selected)?;
        Ok(())
    }

    fn select_files(
        &self,
        files_dir: &Path,
        descriptor: &Descriptor,
        source_directory: Option<&Path>,
    ) -> Result<(), BundleError> {
        let Some(files) = &descriptor.files else {
            return Ok(());
        };
        let Some(source_directory) = source_directory else {
            return Ok(());
        };

        let mut relative_paths = HashSet::new();
        for include in &files.includes {
            if !file_exists(source_directory, include) {
                return Err(BundleError::DescribedFileNotFound(source_directory.join(include)));
            }
            relative_paths.insert(include.clone());
        }

        for pattern in &files.patterns {
            let compiled = glob::Pattern::new(pattern)?;
            for entry in WalkDir::new(source_directory).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(source_directory).unwrap_or(entry.path());
                let relative = relative.to_string_lossy().replace('\\', "/");
                if compiled.matches(&relative) {
                    relative_paths.insert(relative);
                }
            }
        }

        let mut hashes = BTreeMap::new();
        for relative in relative_paths {
            let source_path = source_directory.join(&relative);
            let digest = BlockHasher::<Sha224>::hash_file(&source_path)?;
            hashes.insert(relative.clone(), digest.to_vec());

            let destination = files_dir.join(&relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source_path, &destination)?;
        }

        fs::write(files_dir.join("hashes"), encode_digest_lines(&hashes))?;
        Ok(())
    }

    fn select_contexts(
        &self,
        graphs_dir: &Path,
        descriptor: &Descriptor,
        graph: &dyn Graph,
    ) -> Result<Vec<String>, BundleError> {
        let mut selected = Vec::new();
        let mut index = BTreeMap::new();
        let mut hashes = BTreeMap::new();
        let mut written_hashes = HashSet::new();

        for ctx in graph.contexts() {
            if !descriptor.selects_context(ctx.as_str()) {
                continue;
            }

            let Some(context_graph) = graph.context(&ctx) else {
                continue;
            };
            let bytes = canonicalize(context_graph);
            let digest = BlockHasher::<Sha224>::with_block_size(bundle_fs::DEFAULT_BLOCK_SIZE)
                .hash_reader(Cursor::new(&bytes))?;
            let hex_hash = hex::encode(&digest);

            if written_hashes.insert(hex_hash.clone()) {
                fs::write(graphs_dir.join(format!("{hex_hash}.nt")), &bytes)?;
            }
            index.insert(ctx.as_str().to_owned(), format!("{hex_hash}.nt"));
            hashes.insert(ctx.as_str().to_owned(), digest.to_vec());
            selected.push(ctx.as_str().to_owned());
        }

        fs::write(graphs_dir.join("index"), encode_line_entries(&index))?;
        fs::write(graphs_dir.join("hashes"), encode_digest_lines(&hashes))?;
        Ok(selected)
    }

    fn check_import_coverage(
        &self,
        descriptor: &Descriptor,
        source: &InstallSource<'_>,
        selected: &[String],
    ) -> Result<(), BundleError> {
        let Some(imports_ctx) = &source.imports_context_id else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        let mut imported = HashSet::new();
        for uri in selected {
            imported.extend(transitive_imports(source.graph, imports_ctx, uri, &mut seen));
        }

        let selected_set: HashSet<&str> = selected.iter().map(String::as_str).collect();
        let mut uncovered: HashSet<String> = imported
            .into_iter()
            .filter(|uri| !selected_set.contains(uri.as_str()))
            .collect();

        for empty in descriptor.empties() {
            uncovered.remove(empty);
        }

        for dep in &descriptor.dependencies {
            for covered in (source.dependency_contexts)(&dep.id, dep.version)? {
                uncovered.remove(&covered);
            }
        }

        if uncovered.is_empty() {
            Ok(())
        } else {
            let mut uris: Vec<String> = uncovered.into_iter().collect();
            uris.sort();
            Err(BundleError::UncoveredImports { uris })
        }
    }

    fn build_indexed_database(
        &self,
        staging: &Path,
        graph: &dyn Graph,
        selected: &[String],
    ) -> Result<(), BundleError> {
        let tmp = staging.join("owm.db.tmp");
        fs::create_dir_all(&tmp)?;

        let mut counts = BTreeMap::new();
        for uri in selected {
            let ctx = ContextId::new(uri.clone());
            counts.insert(uri.clone(), graph.len_context(&ctx));
        }
        fs::write(tmp.join("index.json"), serde_json::to_vec(&counts)?)?;

        let db_path = staging.join(bundle_fs::BUNDLE_INDEXED_DB_NAME);
        if db_path.exists() {
            fs::remove_dir_all(&db_path)?;
        }
        fs::rename(&tmp, &db_path)?;
        Ok(())
    }
}

fn directory_has_entries(path: &Path) -> std::io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_some())
}

/// Encodes `<key>\0<digest-size-byte><digest-bytes>\n` lines, the binary
/// format shared by `files/hashes` and `graphs/hashes`.
fn encode_digest_lines(entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, digest) in entries {
        out.extend_from_slice(key.as_bytes());
        out.push(0);
        out.push(u8::try_from(digest.len()).expect("digests never exceed 255 bytes"));
        out.extend_from_slice(digest);
        out.push(b'\n');
    }
    out
}

/// Encodes `<key>\0<value>\n` lines, the format `graphs/index` uses to map
/// a context URI to the canonicalized N-Triples file holding its triples.
fn encode_line_entries(entries: &BTreeMap<String, String>) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in entries {
        out.extend_from_slice(key.as_bytes());
        out.push(0);
        out.extend_from_slice(value.as_bytes());
        out.push(b'\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use bundle_rdf::{MemoryGraph, Term, Triple};
    use tempfile::tempdir;

    use super::*;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple {
            subject: Term::iri(s),
            predicate: Term::iri(p),
            object: Term::iri(o),
        }
    }

    fn no_dependency_contexts(_: &str, _: Option<u32>) -> Result<Vec<String>, BundleError> {
        Ok(Vec::new())
    }

    #[test]
    fn installs_selected_contexts_and_writes_manifest() {
        let mut graph = MemoryGraph::new();
        let selected_ctx = ContextId::new("http://example.org/included");
        let skipped_ctx = ContextId::new("http://example.org/skipped");
        graph
            .add(&selected_ctx, triple("http://ex/s", "http://ex/p", "http://ex/o"))
            .unwrap();
        graph
            .add(&skipped_ctx, triple("http://ex/s2", "http://ex/p", "http://ex/o2"))
            .unwrap();

        let descriptor = Descriptor::load(
            "id: example/bundle\nversion: 1\nincludes:\n  - http://example.org/included\n",
        )
        .unwrap();

        let bundles_root = tempdir().unwrap();
        let installer = Installer::new(bundles_root.path());
        let source = InstallSource {
            graph: &graph,
            imports_context_id: None,
            source_directory: None,
            dependency_contexts: &no_dependency_contexts,
        };

        let bundle_dir = installer.install(&descriptor, &source).unwrap();
        assert!(bundle_dir.join("manifest").exists());
        assert!(bundle_dir.join("graphs/index").exists());
        assert!(bundle_dir.join("owm.db/index.json").exists());

        let manifest_bytes = fs::read(bundle_dir.join("manifest")).unwrap();
        let manifest = Manifest::from_json("manifest", &manifest_bytes).unwrap();
        assert_eq!(manifest.id, "example/bundle");
        assert_eq!(manifest.version, 1);

        let index_bytes = fs::read(bundle_dir.join("graphs/index")).unwrap();
        let index_text = String::from_utf8(index_bytes).unwrap();
        assert_eq!(index_text.matches('\n').count(), 1);
        assert!(index_text.starts_with("http://example.org/included\0"));
        assert!(index_text.trim_end().ends_with(".nt"));

        let hashes_bytes = fs::read(bundle_dir.join("graphs/hashes")).unwrap();
        assert!(hashes_bytes.starts_with(b"http://example.org/included\0"));

        let files_hashes = bundle_dir.join("files/hashes");
        assert!(!files_hashes.exists());
    }

    #[test]
    fn rejects_uncovered_imports() {
        let mut graph = MemoryGraph::new();
        let included_ctx = ContextId::new("http://example.org/included");
        let imports_ctx = ContextId::new("http://example.org/imports");
        graph
            .add(&included_ctx, triple("http://ex/s", "http://ex/p", "http://ex/o"))
            .unwrap();
        graph
            .add(
                &imports_ctx,
                triple(
                    "http://example.org/included",
                    crate::imports::CONTEXT_IMPORTS_PREDICATE,
                    "http://example.org/not-included",
                ),
            )
            .unwrap();

        let descriptor = Descriptor::load(
            "id: example/bundle\nversion: 1\nincludes:\n  - http://example.org/included\n",
        )
        .unwrap();

        let bundles_root = tempdir().unwrap();
        let installer = Installer::new(bundles_root.path());
        let source = InstallSource {
            graph: &graph,
            imports_context_id: Some(imports_ctx),
            source_directory: None,
            dependency_contexts: &no_dependency_contexts,
        };

        let err = installer.install(&descriptor, &source).unwrap_err();
        assert!(matches!(err, BundleError::UncoveredImports { .. }));
        assert!(!bundles_root.path().join("example%2Fbundle/1/graphs").exists());
    }

    #[test]
    fn dependency_coverage_clears_uncovered_import() {
        let mut graph = MemoryGraph::new();
        let included_ctx = ContextId::new("http://example.org/included");
        let imports_ctx = ContextId::new("http://example.org/imports");
        graph
            .add(&included_ctx, triple("http://ex/s", "http://ex/p", "http://ex/o"))
            .unwrap();
        graph
            .add(
                &imports_ctx,
                triple(
                    "http://example.org/included",
                    crate::imports::CONTEXT_IMPORTS_PREDICATE,
                    "http://example.org/covered-by-dep",
                ),
            )
            .unwrap();

        let descriptor = Descriptor::load(
            "id: example/bundle\nversion: 1\nincludes:\n  - http://example.org/included\ndependencies:\n  - other/dep\n",
        )
        .unwrap();

        let bundles_root = tempdir().unwrap();
        let installer = Installer::new(bundles_root.path());
        let dependency_contexts = |id: &str, _version: Option<u32>| -> Result<Vec<String>, BundleError> {
            assert_eq!(id, "other/dep");
            Ok(vec!["http://example.org/covered-by-dep".to_owned()])
        };
        let source = InstallSource {
            graph: &graph,
            imports_context_id: Some(imports_ctx),
            source_directory: None,
            dependency_contexts: &dependency_contexts,
        };

        installer.install(&descriptor, &source).unwrap();
    }
}
