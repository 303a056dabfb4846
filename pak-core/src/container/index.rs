use crate::hash::Digest;
use std::path::{Path, PathBuf};

/// One independently-compressed chunk of an entry's payload. Offsets are
/// relative to the owning entry's data offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressedBlock {
    pub start: u64,
    pub end: u64,
}

impl CompressedBlock {
    /// Zero when the bounds are inverted; the parser rejects such blocks
    /// before they reach the extractor.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// One packaged file's metadata record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PakEntry {
    /// Path relative to the mount point, forward-slash form.
    pub path: PathBuf,
    /// Absolute byte offset of the entry's raw data in the container.
    pub offset: u64,
    pub compressed_size: u64,
    /// Decompressed size.
    pub size: u64,
    pub compressed: bool,
    pub hash: Digest,
    /// Non-empty iff `compressed`; contiguous, in on-disk order.
    pub blocks: Vec<CompressedBlock>,
    /// Always false in supported containers; a set flag is rejected at parse.
    pub encrypted: bool,
    /// Compression window; 0 when uncompressed. Normally 64 KiB, or the
    /// whole file when smaller.
    pub block_size: u32,
}

impl PakEntry {
    /// Bytes this entry occupies in the container file.
    pub fn footprint(&self) -> u64 {
        if self.compressed {
            self.size
        } else {
            self.compressed_size
        }
    }
}

/// Table of contents of one container. Entry order is on-disk order and is
/// not guaranteed sorted; it is authoritative for extraction and selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PakIndex {
    /// Normalized path prefix all entry paths resolve against.
    pub mount_point: PathBuf,
    pub entries: Vec<PakEntry>,
}

impl PakIndex {
    pub fn resolve(&self, entry: &PakEntry) -> PathBuf {
        crate::util::paths::normalize(&self.mount_point.join(&entry.path))
    }

    pub fn total_entries_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

impl PakEntry {
    pub fn uncompressed(path: &Path, offset: u64, size: u64, hash: Digest) -> PakEntry {
        PakEntry {
            path: path.to_path_buf(),
            offset,
            compressed_size: size,
            size,
            compressed: false,
            hash,
            blocks: Vec::new(),
            encrypted: false,
            block_size: 0,
        }
    }
}
