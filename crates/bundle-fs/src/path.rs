use std::env;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that are not safe to use verbatim in a filesystem path
/// segment derived from a bundle id.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'|')
    .add(b' ');

/// Formats the on-disk directory for a bundle `id` at an optional
/// `version` beneath `bundles_root`.
///
/// With `version` omitted, the returned path is just `<bundles_root>/<id>`
/// and the caller is expected to resolve the concrete version directory
/// themselves (see `Bundle::resolve`'s latest-version scan).
pub fn fmt_bundle_directory(bundles_root: &Path, id: &str, version: Option<u32>) -> PathBuf {
    let encoded = utf8_percent_encode(id, PATH_SEGMENT).to_string();
    let mut dir = bundles_root.join(encoded);
    if let Some(version) = version {
        dir.push(version.to_string());
    }
    dir
}

/// Expands a leading `~` to the current user's home directory and any
/// `$NAME`/`${NAME}` environment variable references in `path`.
///
/// Unset variables are left untouched rather than erroring, since a
/// configuration value referencing an unset variable is a configuration
/// problem to surface later, not a reason to fail path expansion itself.
pub fn expand_path(path: &str) -> PathBuf {
    let path = expand_env(path);
    if let Some(rest) = path.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Some(home) = env::var_os("HOME") {
                return PathBuf::from(home).join(rest.trim_start_matches('/'));
            }
        }
    }
    PathBuf::from(path)
}

fn expand_env(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if braced {
                if next == '}' {
                    chars.next();
                    break;
                }
            } else if !(next.is_ascii_alphanumeric() || next == '_') {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            out.push('$');
            if braced {
                out.push('{');
                out.push('}');
            }
            continue;
        }
        match env::var(&name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                out.push('$');
                if braced {
                    out.push('{');
                    out.push_str(&name);
                    out.push('}');
                } else {
                    out.push_str(&name);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_unsafe_characters() {
        let dir = fmt_bundle_directory(Path::new("/bundles"), "http://example.org/a b", Some(1));
        assert_eq!(
            dir,
            Path::new("/bundles/http%3A%2F%2Fexample.org%2Fa%20b/1")
        );
    }

    #[test]
    fn no_version_returns_id_directory() {
        let dir = fmt_bundle_directory(Path::new("/bundles"), "plain-id", None);
        assert_eq!(dir, Path::new("/bundles/plain-id"));
    }

    #[test]
    fn expands_env_and_tilde() {
        env::set_var("BUNDLE_FS_TEST_VAR", "value");
        assert_eq!(expand_path("$BUNDLE_FS_TEST_VAR/x"), PathBuf::from("value/x"));
        assert_eq!(
            expand_path("${BUNDLE_FS_TEST_VAR}/y"),
            PathBuf::from("value/y")
        );
        env::remove_var("BUNDLE_FS_TEST_VAR");
    }

    #[test]
    fn leaves_unset_variable_untouched() {
        env::remove_var("BUNDLE_FS_UNSET_VAR");
        assert_eq!(
            expand_path("$BUNDLE_FS_UNSET_VAR/z"),
            PathBuf::from("$BUNDLE_FS_UNSET_VAR/z")
        );
    }
}
