//! Cancellation flag and progress event plumbing shared by extraction and
//! catalog scans.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PakError, Result};
use crate::hash::Digest;

/// Cooperative abort signal. Cloned across the thread boundary; the worker
/// polls it at file and block granularity, never preemptively.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Bail out with `Cancelled` if the flag has been raised.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PakError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Events reported while streaming one container. A file-extracted event is
/// always followed by its bytes-extracted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractEvent {
    FileExtracted {
        /// Path relative to the output root (mount point included).
        relative_path: PathBuf,
        /// Where the file landed on disk.
        output: PathBuf,
        /// Declared content hash from the index.
        hash: Digest,
    },
    BytesExtracted(u64),
    ContainerExtracted {
        pak: PathBuf,
    },
}

/// Consumer of extraction events. Any `FnMut(ExtractEvent)` qualifies.
pub trait ProgressSink {
    fn on_event(&mut self, event: ExtractEvent);
}

impl<F: FnMut(ExtractEvent)> ProgressSink for F {
    fn on_event(&mut self, event: ExtractEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let seen = flag.clone();
        assert!(seen.check().is_ok());
        flag.cancel();
        assert!(seen.is_cancelled());
        assert!(matches!(seen.check(), Err(PakError::Cancelled)));
    }
}
