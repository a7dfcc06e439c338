//! Filesystem helpers shared by the bundle crates: path layout, streaming
//! hashing, advisory locking and configured-directory expansion.

use std::path::Path;

pub use crate::hash::BlockHasher;
pub use crate::lock::{LockError, LockFile};
pub use crate::path::{expand_path, fmt_bundle_directory};

mod hash;
mod lock;
mod path;

/// Default streaming block size used when hashing files and context data.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Name of the manifest file at the root of a bundle directory.
pub const BUNDLE_MANIFEST_FILE_NAME: &str = "manifest";

/// Name of the indexed database directory within a bundle directory,
/// excluded from archives because it is regenerable from the manifest and
/// graph data.
pub const BUNDLE_INDEXED_DB_NAME: &str = "owm.db";

/// Returns `true` if `path` (relative to a bundle directory) is part of
/// the regenerable indexed database and should be excluded from archives.
///
/// Matches on the first path component so that both sibling files like
/// `owm.db-wal` and files nested under an `owm.db/` directory are
/// excluded.
pub fn is_indexed_db_path(path: &Path) -> bool {
    path.components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .is_some_and(|name| name.starts_with(BUNDLE_INDEXED_DB_NAME))
}
