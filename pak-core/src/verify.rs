//! Out-of-band hash bookkeeping for extracted files. The catalog uses it to
//! decide which packaged files are stale; the cleaner uses it to tell our
//! files apart from the user's.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{PakError, Result};
use crate::hash::Digest;

/// Opaque per-file hash storage keyed by absolute output path.
pub trait FileVerifier {
    fn read_hash(&self, path: &Path) -> Option<Digest>;
    fn write_hash(&mut self, path: &Path, hash: Digest);
    /// Drop a recorded hash, if present.
    fn forget(&mut self, path: &Path) {
        let _ = path;
    }
    /// Persist pending writes. A no-op for purely in-memory stores.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// CBOR sidecar file holding the hashes of every file we extracted under a
/// given root. Loaded eagerly, written back on flush.
pub struct HashStore {
    store_path: PathBuf,
    hashes: HashMap<PathBuf, Digest>,
    dirty: bool,
}

impl HashStore {
    pub const STORE_FILE: &'static str = ".pak-hashes";

    /// Open (or start) the store for `root`. A missing sidecar is an empty
    /// store, not an error.
    pub fn open(root: &Path) -> Result<HashStore> {
        let store_path = root.join(Self::STORE_FILE);
        let hashes = if store_path.exists() {
            let reader = BufReader::new(File::open(&store_path)?);
            ciborium::from_reader(reader)
                .map_err(|e| PakError::Format(format!("corrupt hash store: {e}")))?
        } else {
            HashMap::new()
        };

        tracing::debug!(store = %store_path.display(), entries = hashes.len(), "opened hash store");
        Ok(HashStore {
            store_path,
            hashes,
            dirty: false,
        })
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl FileVerifier for HashStore {
    fn read_hash(&self, path: &Path) -> Option<Digest> {
        self.hashes.get(path).copied()
    }

    fn write_hash(&mut self, path: &Path, hash: Digest) {
        self.hashes.insert(path.to_path_buf(), hash);
        self.dirty = true;
    }

    fn forget(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.store_path)?);
        ciborium::into_writer(&self.hashes, writer)
            .map_err(|e| PakError::Format(format!("cannot serialize hash store: {e}")))?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_survives_a_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sub/a.txt");
        let hash = Digest::of_bytes(b"payload");

        let mut store = HashStore::open(dir.path()).unwrap();
        assert_eq!(store.read_hash(&file), None);
        store.write_hash(&file, hash);
        store.flush().unwrap();

        let store = HashStore::open(dir.path()).unwrap();
        assert_eq!(store.read_hash(&file), Some(hash));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn forget_removes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");

        let mut store = HashStore::open(dir.path()).unwrap();
        store.write_hash(&file, Digest::of_bytes(b"x"));
        store.forget(&file);
        store.flush().unwrap();

        let store = HashStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }
}
