//! Removes extracted files from an output tree. Only files the verifier
//! knows about are touched; anything the user put there stays.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::Result;
use crate::extract::progress::CancelFlag;
use crate::verify::{FileVerifier, HashStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files_scanned: u64,
    pub files_deleted: u64,
    pub bytes_freed: u64,
}

pub struct Cleaner<'a, V: FileVerifier> {
    verifier: &'a mut V,
    cancel: CancelFlag,
}

impl<'a, V: FileVerifier> Cleaner<'a, V> {
    pub fn new(verifier: &'a mut V, cancel: CancelFlag) -> Self {
        Self { verifier, cancel }
    }

    /// Walk `root` depth-first, deleting every file with a recorded hash and
    /// pruning directories that end up empty. Cancellable per file.
    pub fn clean<F>(&mut self, root: &Path, mut on_scanned: F) -> Result<CleanReport>
    where
        F: FnMut(&Path),
    {
        let mut report = CleanReport::default();

        for entry in WalkDir::new(root).contents_first(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();

            if entry.file_type().is_file() {
                self.cancel.check()?;
                if path.file_name().is_some_and(|n| n == HashStore::STORE_FILE) {
                    continue;
                }
                report.files_scanned += 1;
                if self.verifier.read_hash(path).is_some() {
                    let size = entry.metadata().map_err(std::io::Error::from)?.len();
                    std::fs::remove_file(path)?;
                    self.verifier.forget(path);
                    report.files_deleted += 1;
                    report.bytes_freed += size;
                    tracing::trace!(path = %path.display(), "deleted extracted file");
                }
                on_scanned(path);
            } else if entry.file_type().is_dir()
                && path != root
                && std::fs::read_dir(path)?.next().is_none()
            {
                std::fs::remove_dir(path)?;
            }
        }

        self.verifier.flush()?;
        tracing::info!(
            scanned = report.files_scanned,
            deleted = report.files_deleted,
            freed = report.bytes_freed,
            "clean finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Digest;
    use std::path::PathBuf;

    fn touch(path: &PathBuf, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn only_recorded_files_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let ours = dir.path().join("sub/ours.bin");
        let theirs = dir.path().join("sub/theirs.txt");
        touch(&ours, b"12345");
        touch(&theirs, b"user data");

        let mut store = HashStore::open(dir.path()).unwrap();
        store.write_hash(&ours, Digest::of_bytes(b"12345"));

        let mut cleaner = Cleaner::new(&mut store, CancelFlag::new());
        let report = cleaner.clean(dir.path(), |_| {}).unwrap();

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.bytes_freed, 5);
        assert!(!ours.exists());
        assert!(theirs.exists());
        assert_eq!(store.read_hash(&ours), None);
    }

    #[test]
    fn emptied_directories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let ours = dir.path().join("a/b/ours.bin");
        touch(&ours, b"x");

        let mut store = HashStore::open(dir.path()).unwrap();
        store.write_hash(&ours, Digest::of_bytes(b"x"));

        let mut cleaner = Cleaner::new(&mut store, CancelFlag::new());
        cleaner.clean(dir.path(), |_| {}).unwrap();

        assert!(!dir.path().join("a").exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn clean_honors_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("f.bin"), b"x");
        let mut store = HashStore::open(dir.path()).unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut cleaner = Cleaner::new(&mut store, cancel);
        let err = cleaner.clean(dir.path(), |_| {}).unwrap_err();
        assert!(matches!(err, crate::error::PakError::Cancelled));
    }
}
