use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::BundleError;

/// A rule matching an exact context URI, optionally permitting it to be
/// empty and still counted as covered for import-closure purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRule {
    pub uri: String,
    pub empty: bool,
}

/// A compiled pattern matched against context URIs. `rgx:`-prefixed
/// entries are used as regexes verbatim; anything else is a glob
/// translated to a regex via `* -> .*`, `? -> .?`, `[! -> [^`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub source: String,
    regex: Regex,
}

impl PatternRule {
    pub fn parse(source: &str) -> Result<Self, BundleError> {
        let pattern = if let Some(rest) = source.strip_prefix("rgx:") {
            rest.to_owned()
        } else {
            translate_glob(source)
        };
        let regex = Regex::new(&pattern).map_err(|_| BundleError::NotADescriptor)?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// Matches the whole URI against the pattern, not merely a substring.
    pub fn is_match(&self, uri: &str) -> bool {
        self.regex
            .find(uri)
            .is_some_and(|m| m.start() == 0)
    }
}

fn translate_glob(pattern: &str) -> String {
    pattern.replace('*', ".*").replace('?', ".?").replace("[!", "[^")
}

/// Auxiliary file selection: exact relative paths plus glob patterns,
/// both resolved against the installer's source directory.
#[derive(Debug, Clone, Default)]
pub struct FilesDescriptor {
    pub includes: Vec<String>,
    pub patterns: Vec<String>,
}

/// A single declared dependency: another bundle this one builds on, with
/// an optional pinned version and a list of contexts excluded from the
/// composed read view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub id: String,
    pub version: Option<u32>,
    pub excludes: Vec<String>,
}

/// The parsed YAML input to the installer: what contexts and files a
/// bundle should contain, and what it depends on.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub description: Option<String>,
    pub includes: Vec<IncludeRule>,
    pub patterns: Vec<PatternRule>,
    pub files: Option<FilesDescriptor>,
    pub dependencies: Vec<DependencyDescriptor>,
}

impl Descriptor {
    /// Parses a descriptor from a YAML document; fails with
    /// [`BundleError::NotADescriptor`] if the document's root is not a
    /// mapping.
    pub fn load(source: &str) -> Result<Self, BundleError> {
        let value: Value = serde_yaml::from_str(source)?;
        let Value::Mapping(mapping) = value else {
            return Err(BundleError::NotADescriptor);
        };
        Self::from_mapping(&mapping)
    }

    fn from_mapping(mapping: &serde_yaml::Mapping) -> Result<Self, BundleError> {
        let get = |key: &str| mapping.get(Value::String(key.to_owned()));

        let id = get("id")
            .and_then(Value::as_str)
            .ok_or(BundleError::NotADescriptor)?
            .to_owned();
        let name = get("name").and_then(Value::as_str).unwrap_or(&id).to_owned();
        let version = get("version").and_then(Value::as_u64).unwrap_or(1) as u32;
        let description = get("description").and_then(Value::as_str).map(str::to_owned);

        let mut includes = Vec::new();
        if let Some(Value::Sequence(seq)) = get("includes") {
            for entry in seq {
                includes.push(parse_include(entry)?);
            }
        }

        let mut patterns = Vec::new();
        if let Some(Value::Sequence(seq)) = get("patterns") {
            for entry in seq {
                let s = entry.as_str().ok_or(BundleError::NotADescriptor)?;
                patterns.push(PatternRule::parse(s)?);
            }
        }

        let files = get("files").and_then(parse_files);

        let mut dependencies = Vec::new();
        let mut seen = std::collections::HashSet::new();
        if let Some(Value::Sequence(seq)) = get("dependencies") {
            for entry in seq {
                let dep = parse_dependency(entry)?;
                let key = (dep.id.clone(), dep.version);
                if seen.insert(key) {
                    dependencies.push(dep);
                }
            }
        }

        Ok(Self {
            id,
            name,
            version,
            description,
            includes,
            patterns,
            files,
            dependencies,
        })
    }

    /// Contexts declared `empty: true` in `includes`, still counted as
    /// covered for import-closure purposes even with no triples.
    pub fn empties(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().filter(|i| i.empty).map(|i| i.uri.as_str())
    }

    /// Whether `uri` is selected by an exact include or a pattern.
    pub fn selects_context(&self, uri: &str) -> bool {
        self.includes.iter().any(|i| i.uri == uri) || self.patterns.iter().any(|p| p.is_match(uri))
    }
}

fn parse_include(value: &Value) -> Result<IncludeRule, BundleError> {
    match value {
        Value::String(s) => Ok(IncludeRule {
            uri: s.trim().to_owned(),
            empty: false,
        }),
        Value::Mapping(m) => {
            let mut iter = m.iter();
            let (key, options) = iter.next().ok_or(BundleError::NotADescriptor)?;
            if iter.next().is_some() {
                return Err(BundleError::NotADescriptor);
            }
            let uri = key.as_str().ok_or(BundleError::NotADescriptor)?.trim().to_owned();
            let empty = options
                .as_mapping()
                .and_then(|m| m.get(Value::String("empty".to_owned())))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(IncludeRule { uri, empty })
        }
        _ => Err(BundleError::NotADescriptor),
    }
}

fn parse_files(value: &Value) -> Option<FilesDescriptor> {
    let mapping = value.as_mapping()?;
    let strings = |key: &str| -> Vec<String> {
        mapping
            .get(Value::String(key.to_owned()))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
            .unwrap_or_default()
    };
    Some(FilesDescriptor {
        includes: strings("includes"),
        patterns: strings("patterns"),
    })
}

fn parse_dependency(value: &Value) -> Result<DependencyDescriptor, BundleError> {
    match value {
        Value::String(s) => Ok(DependencyDescriptor {
            id: s.clone(),
            version: None,
            excludes: Vec::new(),
        }),
        Value::Sequence(seq) => {
            let id = seq
                .first()
                .and_then(Value::as_str)
                .ok_or(BundleError::NotADescriptor)?
                .to_owned();
            let version = seq.get(1).and_then(Value::as_u64).map(|v| v as u32);
            let excludes = seq
                .get(2)
                .and_then(Value::as_sequence)
                .map(|s| s.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
                .unwrap_or_default();
            Ok(DependencyDescriptor { id, version, excludes })
        }
        Value::Mapping(m) => {
            #[derive(Deserialize)]
            struct Raw {
                id: String,
                version: Option<u32>,
                #[serde(default)]
                excludes: Vec<String>,
            }
            let raw: Raw = serde_yaml::from_value(Value::Mapping(m.clone()))?;
            Ok(DependencyDescriptor {
                id: raw.id,
                version: raw.version,
                excludes: raw.excludes,
            })
        }
        _ => Err(BundleError::NotADescriptor),
    }
}

/// Returns true if `relative` (relative to `directory`) exists, for the
/// explicit `includes` entries of a [`FilesDescriptor`].
pub fn file_exists(directory: &Path, relative: &str) -> bool {
    directory.join(relative).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_descriptor() {
        let descriptor = Descriptor::load("id: example/bundle\n").unwrap();
        assert_eq!(descriptor.id, "example/bundle");
        assert_eq!(descriptor.version, 1);
        assert_eq!(descriptor.name, "example/bundle");
    }

    #[test]
    fn parses_includes_with_empty_flag() {
        let yaml = r"
id: example/bundle
includes:
  - http://example.org/ctx1
  - http://example.org/ctx2:
      empty: true
";
        let descriptor = Descriptor::load(yaml).unwrap();
        assert_eq!(descriptor.includes.len(), 2);
        assert!(!descriptor.includes[0].empty);
        assert!(descriptor.includes[1].empty);
        assert_eq!(descriptor.empties().collect::<Vec<_>>(), vec!["http://example.org/ctx2"]);
    }

    #[test]
    fn translates_glob_pattern() {
        let pattern = PatternRule::parse("http://example.org/*").unwrap();
        assert!(pattern.is_match("http://example.org/anything"));
        assert!(!pattern.is_match("http://other.org/anything"));
    }

    #[test]
    fn uses_regex_pattern_verbatim_with_prefix() {
        let pattern = PatternRule::parse("rgx:http://example\\.org/ctx[0-9]+").unwrap();
        assert!(pattern.is_match("http://example.org/ctx42"));
        assert!(!pattern.is_match("http://example.org/ctxA"));
    }

    #[test]
    fn dependencies_accept_string_tuple_and_map_forms_deduplicated() {
        let yaml = r#"
id: example/bundle
dependencies:
  - plain/dep
  - [tuple/dep, 2]
  - id: map/dep
    version: 3
    excludes: [http://example.org/excluded]
  - plain/dep
"#;
        let descriptor = Descriptor::load(yaml).unwrap();
        assert_eq!(descriptor.dependencies.len(), 3);
        assert_eq!(descriptor.dependencies[0].id, "plain/dep");
        assert_eq!(descriptor.dependencies[1].version, Some(2));
        assert_eq!(descriptor.dependencies[2].excludes, vec!["http://example.org/excluded"]);
    }
}
