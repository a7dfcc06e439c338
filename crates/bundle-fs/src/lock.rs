use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use fs_err as fs;
use thiserror::Error;
use tracing::debug;

/// Errors raised while acquiring or holding a [`LockFile`].
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file {path} is already held")]
    AlreadyLocked { path: PathBuf },
    #[error("failed to access lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An RAII exclusive lock on a path, keyed by an opaque `owner_id` written
/// into the lock file so a stale lock can be traced back to whichever
/// installer created it.
///
/// The underlying advisory lock is released automatically when the guard is
/// dropped, including when unwinding through a `?`-propagated error. The
/// on-disk lock file itself is a separate concern: dropping the guard never
/// deletes it, since a caller that fails partway through an install needs
/// the lock file to remain as evidence of the staging root. Call
/// [`LockFile::release`] to remove it once an operation has actually
/// succeeded.
pub struct LockFile {
    path: PathBuf,
    file: fs::File,
}

impl LockFile {
    /// Acquires an exclusive, non-blocking lock on `path`, recording
    /// `owner_id` as the lock's contents.
    ///
    /// Returns [`LockError::AlreadyLocked`] if another owner currently
    /// holds the lock rather than blocking, since bundle installs are not
    /// expected to queue behind one another.
    pub fn acquire(path: impl Into<PathBuf>, owner_id: &str) -> Result<Self, LockError> {
        let path = path.into();
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        file.file().try_lock_exclusive().map_err(|_| LockError::AlreadyLocked {
            path: path.clone(),
        })?;

        file.file().set_len(0).map_err(|source| LockError::Io {
            path: path.clone(),
            source,
        })?;
        {
            use std::io::Write;
            let mut handle = file.file();
            handle
                .write_all(owner_id.as_bytes())
                .map_err(|source| LockError::Io {
                    path: path.clone(),
                    source,
                })?;
        }

        debug!(path = %path.display(), owner_id, "acquired bundle lock");
        Ok(Self { path, file })
    }

    /// The path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the guard and deletes the on-disk lock file, releasing the
    /// advisory lock first. Callers call this only once whatever the lock
    /// was guarding has completed successfully; on failure the lock file is
    /// left in place alongside the staging root it protected.
    pub fn release(self) {
        if let Err(error) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), %error, "failed to remove bundle lock file");
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(error) = self.file.file().unlock() {
            debug!(path = %self.path.display(), %error, "failed to release bundle lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_the_guard_unlocks_but_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        {
            let _lock = LockFile::acquire(&path, "installer-a").unwrap();
            assert!(path.exists());
        }
        assert!(path.exists());
        // the advisory lock was released on drop, so a fresh acquire succeeds
        let _lock = LockFile::acquire(&path, "installer-b").unwrap();
    }

    #[test]
    fn release_removes_the_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        let lock = LockFile::acquire(&path, "installer-a").unwrap();
        assert!(path.exists());
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn second_acquisition_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        let _lock = LockFile::acquire(&path, "installer-a").unwrap();
        let err = LockFile::acquire(&path, "installer-b").unwrap_err();
        assert!(matches!(err, LockError::AlreadyLocked { .. }));
    }
}
