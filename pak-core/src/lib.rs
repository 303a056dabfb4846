#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod cursor;
    pub mod hash_forward;
    pub mod hex;
    pub mod paths;
}

pub mod hash;

pub mod container {
    pub mod codec;
    pub mod footer;
    pub mod index;
    pub mod pakfile;
}

pub mod extract {
    pub mod extractor;
    pub mod progress;
    pub mod stats;
}

pub mod catalog;
pub mod cleaner;
pub mod space;
pub mod unpack;
pub mod verify;

// Re-exports: stable API surface
pub use catalog::{Catalog, PakPick, ScanTask, Selection, spawn_missing_scan};
pub use cleaner::{CleanReport, Cleaner};
pub use container::index::{CompressedBlock, PakEntry, PakIndex};
pub use container::pakfile::PakFile;
pub use error::{PakError, Result};
pub use extract::extractor::Extractor;
pub use extract::progress::{CancelFlag, ExtractEvent, ProgressSink};
pub use extract::stats::{ExtractionStats, StatsSnapshot};
pub use hash::Digest;
pub use space::{DiskProbe, SpaceProbe};
pub use unpack::{Outcome, UnpackEvent, UnpackTask, Unpacker, spawn_unpack};
pub use verify::{FileVerifier, HashStore};
