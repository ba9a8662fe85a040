//! Byte stores that matte jobs read sources from and write results to.
//!
//! The engine never touches the filesystem directly; it goes through a
//! [`RasterStore`], so jobs can run against [`MemoryStore`] in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};

/// Readable and writable storage addressed by path.
pub trait RasterStore: Sync {
    /// Read the full contents stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if nothing can be read at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Store `bytes` at `path`, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if `path` cannot be written.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl RasterStore for FsStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = std::fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read source");
        Ok(bytes)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let write_err = |source| Error::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        std::fs::write(path, bytes).map_err(write_err)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote destination");
        Ok(())
    }
}

/// An in-memory store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `bytes` at `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.lock().insert(path.into(), bytes);
    }

    /// Copy of the bytes at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().get(path).cloned()
    }

    /// Whether anything is stored at `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        // A panic while holding the lock cannot leave a half-written map entry.
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RasterStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.get(path).ok_or_else(|| Error::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such entry"),
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.insert(path, bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_bytes() {
        let store = MemoryStore::new();
        store.write(Path::new("a/b.png"), &[1, 2, 3]).unwrap();
        assert!(store.contains(Path::new("a/b.png")));
        assert_eq!(store.read(Path::new("a/b.png")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn memory_store_missing_entry_is_a_read_error() {
        let store = MemoryStore::new();
        let err = store.read(Path::new("nope.png")).unwrap_err();
        assert!(err.is_decode_failure());
        assert!(err.to_string().contains("nope.png"));
    }

    #[test]
    fn fs_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.bin");
        FsStore.write(&path, b"abc").unwrap();
        assert_eq!(FsStore.read(&path).unwrap(), b"abc");
    }

    #[test]
    fn fs_store_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsStore.read(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
