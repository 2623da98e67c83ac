//! File operations the orchestrator consumes.
//!
//! The orchestrator only touches the file system through [`FileOps`] for
//! its bookkeeping (backups, staging copies, renames, sidecar digests), so
//! tests can swap in an implementation that fails at a chosen step. The
//! archive itself is streamed by the formats crate.

use crate::error::{PatchError, PatchResult};
use asarkit_crypto::ContentHash;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// File system operations used while patching
pub trait FileOps {
    /// Read a whole file into memory
    fn read_whole_file(&self, path: &Path) -> PatchResult<Vec<u8>>;

    /// Create or truncate `path` and write `data` to it
    fn write_whole_file(&self, path: &Path, data: &[u8]) -> PatchResult<()>;

    /// Copy `from` to `to`, returning the number of bytes copied
    fn copy_file(&self, from: &Path, to: &Path) -> PatchResult<u64>;

    /// Streaming SHA-256 of a file's contents
    fn compute_file_digest(&self, path: &Path) -> PatchResult<ContentHash>;

    /// Whether `path` exists
    fn exists(&self, path: &Path) -> bool;

    /// Move `from` over `to`, replacing it
    fn rename(&self, from: &Path, to: &Path) -> PatchResult<()>;

    /// Delete a file
    fn remove(&self, path: &Path) -> PatchResult<()>;
}

/// [`FileOps`] backed by the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileOps for LocalFs {
    fn read_whole_file(&self, path: &Path) -> PatchResult<Vec<u8>> {
        fs::read(path).map_err(|e| PatchError::file_op("read", path, e))
    }

    fn write_whole_file(&self, path: &Path, data: &[u8]) -> PatchResult<()> {
        let mut file = File::create(path).map_err(|e| PatchError::file_op("create", path, e))?;
        file.write_all(data)
            .and_then(|()| file.sync_all())
            .map_err(|e| PatchError::file_op("write", path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> PatchResult<u64> {
        fs::copy(from, to).map_err(|e| PatchError::file_op("copy", from, e))
    }

    fn compute_file_digest(&self, path: &Path) -> PatchResult<ContentHash> {
        Ok(asarkit_crypto::digest_file(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> PatchResult<()> {
        fs::rename(from, to).map_err(|e| PatchError::file_op("rename", from, e))
    }

    fn remove(&self, path: &Path) -> PatchResult<()> {
        fs::remove_file(path).map_err(|e| PatchError::file_op("remove", path, e))
    }
}
