use std::io::{self, Read};

use digest::Digest;
use fs_err as fs;

use crate::DEFAULT_BLOCK_SIZE;

/// Streams a [`Read`] through a [`Digest`] in fixed-size blocks rather
/// than reading the whole input into memory.
pub struct BlockHasher<D: Digest> {
    digest: D,
    block_size: usize,
}

impl<D: Digest> BlockHasher<D> {
    /// Creates a hasher with the given streaming block size.
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            digest: D::new(),
            block_size,
        }
    }

    /// Hashes `reader` to completion and returns the finalized digest.
    pub fn hash_reader(mut self, mut reader: impl Read) -> io::Result<digest::Output<D>> {
        let mut buf = vec![0u8; self.block_size];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.digest.update(&buf[..n]);
        }
        Ok(self.digest.finalize())
    }

    /// Hashes the file at `path`, opening it with [`fs_err`] for contextual
    /// error messages.
    pub fn hash_file(path: &std::path::Path) -> io::Result<digest::Output<D>> {
        let file = fs::File::open(path)?;
        Self::with_block_size(DEFAULT_BLOCK_SIZE).hash_reader(file)
    }
}

impl<D: Digest> Default for BlockHasher<D> {
    fn default() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }
}
