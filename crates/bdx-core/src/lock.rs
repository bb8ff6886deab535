//! Per-collection leases.
//!
//! The indexer itself takes no locks. Callers that may run branch
//! operations concurrently acquire a [`CollectionLease`] first. A lease is an
//! exclusive OS file lock on `<dir>/<collection>.lock`, so it serializes
//! separate `bdx` processes sharing a store as well as threads of one
//! process. A second acquisition fails with [`BdxError::CollectionBusy`]
//! until the first lease is dropped.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::trace;

use bdx_db::validate_collection_name;

use crate::errors::BdxError;

const LOCK_SUFFIX: &str = ".lock";

/// Lock files for the collections of one store.
#[derive(Debug, Clone)]
pub struct CollectionLocks {
    dir: PathBuf,
}

impl CollectionLocks {
    /// Keep lock files in `dir` (created on first use).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}{}", collection, LOCK_SUFFIX))
    }

    fn open(&self, collection: &str) -> Result<File, BdxError> {
        validate_collection_name(collection)?;
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path(collection))?;
        Ok(file)
    }

    /// Lease `collection`, failing if any process already holds it.
    pub fn try_acquire(&self, collection: &str) -> Result<CollectionLease, BdxError> {
        let file = self.open(collection)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                trace!("Leased collection '{}'", collection);
                Ok(CollectionLease {
                    file,
                    collection: collection.to_string(),
                })
            }
            Err(e) if is_contended(&e) => Err(BdxError::CollectionBusy {
                collection: collection.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `collection` is currently leased by anyone.
    pub fn is_held(&self, collection: &str) -> bool {
        if !self.lock_path(collection).exists() {
            return false;
        }
        let Ok(file) = self.open(collection) else {
            return false;
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = file.unlock();
                false
            }
            Err(e) => is_contended(&e),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Exclusive claim on a collection, released on drop.
#[derive(Debug)]
pub struct CollectionLease {
    file: File,
    collection: String,
}

impl CollectionLease {
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Drop for CollectionLease {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        trace!("Released collection '{}'", self.collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lease_is_rejected_until_drop() {
        let temp = TempDir::new().unwrap();
        let locks = CollectionLocks::new(temp.path());
        let lease = locks.try_acquire("repo").unwrap();
        assert_eq!(lease.collection(), "repo");
        assert!(locks.is_held("repo"));
        assert!(temp.path().join("repo.lock").exists());

        let err = locks.try_acquire("repo").unwrap_err();
        assert!(matches!(err, BdxError::CollectionBusy { .. }));

        drop(lease);
        assert!(!locks.is_held("repo"));
        assert!(locks.try_acquire("repo").is_ok());
    }

    #[test]
    fn test_independent_registries_on_same_dir_contend() {
        let temp = TempDir::new().unwrap();
        let first = CollectionLocks::new(temp.path());
        let second = CollectionLocks::new(temp.path());

        let lease = first.try_acquire("repo").unwrap();
        assert!(matches!(
            second.try_acquire("repo"),
            Err(BdxError::CollectionBusy { .. })
        ));
        assert!(second.is_held("repo"));
        let _other = second.try_acquire("other").unwrap();

        drop(lease);
        assert!(second.try_acquire("repo").is_ok());
    }

    #[test]
    fn test_contention_across_threads() {
        let temp = TempDir::new().unwrap();
        let locks = CollectionLocks::new(temp.path());
        let lease = locks.try_acquire("repo").unwrap();
        let other = CollectionLocks::new(temp.path());
        let busy = std::thread::spawn(move || other.try_acquire("repo").is_err())
            .join()
            .unwrap();
        assert!(busy);
        drop(lease);
    }

    #[test]
    fn test_collection_name_cannot_escape_lock_dir() {
        let temp = TempDir::new().unwrap();
        let locks = CollectionLocks::new(temp.path().join("locks"));
        assert!(matches!(
            locks.try_acquire("../repo"),
            Err(BdxError::Store(_))
        ));
        assert!(!locks.is_held("../repo"));
    }
}
