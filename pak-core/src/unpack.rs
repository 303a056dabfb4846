//! Drives the extractor across a whole selection: free-space preflight,
//! per-container and run-level stats, verifier bookkeeping, and a single
//! Finished or Aborted outcome.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::catalog::{Catalog, Selection};
use crate::error::{PakError, Result};
use crate::extract::extractor::Extractor;
use crate::extract::progress::{CancelFlag, ExtractEvent};
use crate::extract::stats::{ExtractionStats, StatsSnapshot};
use crate::space::SpaceProbe;
use crate::verify::FileVerifier;

/// Headroom demanded on top of the selection's total bytes before a run is
/// allowed to start.
pub const SPACE_MARGIN: u64 = 64 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Finished { elapsed: Duration },
    Aborted,
}

/// Run-level progress notifications. Snapshots are taken at event time; the
/// consumer never observes the live counters.
#[derive(Clone, Debug)]
pub enum UnpackEvent {
    Begin {
        total_paks: usize,
        total: StatsSnapshot,
    },
    PakBegin {
        pak: PathBuf,
        current_pak: usize,
    },
    FileExtracted {
        total: StatsSnapshot,
        pak: StatsSnapshot,
    },
    BytesExtracted {
        total: StatsSnapshot,
        pak: StatsSnapshot,
    },
    PakFinished {
        pak: PathBuf,
        elapsed: Duration,
    },
}

pub struct Unpacker<'a, V: FileVerifier, P: SpaceProbe> {
    catalog: &'a Catalog,
    verifier: &'a mut V,
    probe: &'a P,
    cancel: CancelFlag,
}

impl<'a, V: FileVerifier, P: SpaceProbe> Unpacker<'a, V, P> {
    pub fn new(
        catalog: &'a Catalog,
        verifier: &'a mut V,
        probe: &'a P,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            catalog,
            verifier,
            probe,
            cancel,
        }
    }

    /// Extract `selection` under `output_root`. Fails before writing any
    /// byte when free space cannot hold the selection plus the margin.
    pub fn unpack<F>(
        &mut self,
        selection: &Selection,
        output_root: &Path,
        mut on_event: F,
    ) -> Result<Outcome>
    where
        F: FnMut(UnpackEvent),
    {
        let required = selection.total_bytes + SPACE_MARGIN;
        std::fs::create_dir_all(output_root)?;
        let free = self.probe.free_bytes(output_root)?;
        if free < required {
            return Err(PakError::InsufficientSpace { required });
        }

        tracing::info!(
            files = selection.total_files,
            bytes = selection.total_bytes,
            free,
            "starting extraction run"
        );

        let mut total_stats = ExtractionStats::default();
        let mut pak_stats = ExtractionStats::default();
        total_stats.start(selection.total_files, selection.total_bytes);
        on_event(UnpackEvent::Begin {
            total_paks: selection.picks.len(),
            total: total_stats.snapshot(),
        });

        let mut extractor = Extractor::new(self.cancel.clone());

        for (n, pick) in selection.picks.iter().enumerate() {
            let pak = self.catalog.pak(pick.pak);
            pak_stats.start(pick.paths.len() as u64, pick.bytes);
            on_event(UnpackEvent::PakBegin {
                pak: pak.path().to_path_buf(),
                current_pak: n + 1,
            });

            let result = extractor.extract(pak, &pick.paths, output_root, &mut |event| {
                match event {
                    ExtractEvent::FileExtracted { output, hash, .. } => {
                        total_stats.add_file();
                        pak_stats.add_file();
                        self.verifier.write_hash(&output, hash);
                        on_event(UnpackEvent::FileExtracted {
                            total: total_stats.snapshot(),
                            pak: pak_stats.snapshot(),
                        });
                    }
                    ExtractEvent::BytesExtracted(bytes) => {
                        total_stats.add_bytes(bytes);
                        pak_stats.add_bytes(bytes);
                        on_event(UnpackEvent::BytesExtracted {
                            total: total_stats.snapshot(),
                            pak: pak_stats.snapshot(),
                        });
                    }
                    ExtractEvent::ContainerExtracted { .. } => {}
                }
            });

            match result {
                Ok(()) => {}
                Err(PakError::Cancelled) => {
                    pak_stats.stop();
                    total_stats.stop();
                    self.verifier.flush()?;
                    tracing::info!("extraction run aborted");
                    return Ok(Outcome::Aborted);
                }
                Err(e) => {
                    self.verifier.flush()?;
                    return Err(e);
                }
            }
            self.verifier.flush()?;
            pak_stats.stop();
            on_event(UnpackEvent::PakFinished {
                pak: pak.path().to_path_buf(),
                elapsed: pak_stats.elapsed(),
            });
        }

        self.verifier.flush()?;
        total_stats.stop();
        let elapsed = total_stats.elapsed();
        tracing::info!(?elapsed, "extraction run finished");
        Ok(Outcome::Finished { elapsed })
    }
}

/// Handle to a background extraction run.
pub struct UnpackTask {
    pub cancel: CancelFlag,
    pub handle: JoinHandle<Result<Outcome>>,
}

/// Run an extraction on its own thread. The returned flag is the only state
/// shared with the caller; everything else moves into the worker.
pub fn spawn_unpack<V, P, F>(
    catalog: Catalog,
    selection: Selection,
    mut verifier: V,
    probe: P,
    output_root: PathBuf,
    mut on_event: F,
) -> UnpackTask
where
    V: FileVerifier + Send + 'static,
    P: SpaceProbe + Send + 'static,
    F: FnMut(UnpackEvent) + Send + 'static,
{
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let handle = std::thread::spawn(move || {
        let mut unpacker = Unpacker::new(&catalog, &mut verifier, &probe, worker_cancel);
        unpacker.unpack(&selection, &output_root, &mut on_event)
    });
    UnpackTask { cancel, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::codec;
    use crate::container::footer::PakFooter;
    use crate::container::index::{PakEntry, PakIndex};
    use crate::hash::Digest;
    use crate::util::cursor::PakWriter;
    use crate::verify::HashStore;
    use std::io::Write as _;

    struct FixedProbe(u64);

    impl SpaceProbe for FixedProbe {
        fn free_bytes(&self, _path: &Path) -> Result<u64> {
            Ok(self.0)
        }
    }

    fn build_pak(dir: &Path, name: &str, files: &[(&str, &[u8])]) {
        let mut entries = Vec::new();
        let mut offset = 0u64;
        let mut w = PakWriter::open(&dir.join(name)).unwrap();
        for (file, data) in files {
            w.write_all(data).unwrap();
            entries.push(PakEntry::uncompressed(
                Path::new(file),
                offset,
                data.len() as u64,
                Digest::of_bytes(data),
            ));
            offset += data.len() as u64;
        }
        let index = PakIndex {
            mount_point: PathBuf::from("mnt"),
            entries,
        };
        let mut footer = PakFooter {
            version: 8,
            index_offset: offset,
            index_size: 0,
            index_hash: Digest::default(),
        };
        codec::write_tail(&mut w, &index, &mut footer).unwrap();
    }

    fn two_pak_catalog(dir: &Path) -> Catalog {
        build_pak(dir, "chunk0.pak", &[("a.bin", b"alpha"), ("b.bin", b"bravo")]);
        build_pak(dir, "chunk1.pak", &[("c.bin", b"charlie")]);
        Catalog::open(dir, Path::new("")).unwrap()
    }

    #[test]
    fn full_run_extracts_and_records_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = two_pak_catalog(dir.path());
        let out_root = dir.path().join("out");
        let mut store = HashStore::open(&out_root).unwrap();
        let probe = FixedProbe(u64::MAX);

        let selection = catalog.select_all();
        let mut events = Vec::new();
        let mut unpacker = Unpacker::new(&catalog, &mut store, &probe, CancelFlag::new());
        let outcome = unpacker
            .unpack(&selection, &out_root, |e| events.push(e))
            .unwrap();

        assert!(matches!(outcome, Outcome::Finished { .. }));
        assert_eq!(
            std::fs::read(out_root.join("mnt/c.bin")).unwrap(),
            b"charlie"
        );
        assert_eq!(
            store.read_hash(&out_root.join("mnt/a.bin")),
            Some(Digest::of_bytes(b"alpha"))
        );

        // after a full verified run nothing is missing or unverified
        let stale = catalog
            .select_missing_and_unverified(&store, &out_root, &CancelFlag::new(), |_| {})
            .unwrap();
        assert!(stale.is_empty());

        assert!(matches!(events[0], UnpackEvent::Begin { total_paks: 2, .. }));
        let finishes = events
            .iter()
            .filter(|e| matches!(e, UnpackEvent::PakFinished { .. }))
            .count();
        assert_eq!(finishes, 2);
        match events.last().unwrap() {
            UnpackEvent::PakFinished { .. } => {}
            other => panic!("expected final pak-finished event, got {other:?}"),
        }
    }

    #[test]
    fn insufficient_space_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = two_pak_catalog(dir.path());
        let out_root = dir.path().join("out");
        let mut store = HashStore::open(&out_root).unwrap();
        let probe = FixedProbe(10);

        let selection = catalog.select_all();
        let mut unpacker = Unpacker::new(&catalog, &mut store, &probe, CancelFlag::new());
        let err = unpacker.unpack(&selection, &out_root, |_| {}).unwrap_err();

        match err {
            PakError::InsufficientSpace { required } => {
                assert_eq!(required, selection.total_bytes + SPACE_MARGIN);
            }
            other => panic!("expected space error, got {other:?}"),
        }
        assert!(!out_root.join("mnt").exists());
    }

    #[test]
    fn cancellation_yields_a_single_aborted_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = two_pak_catalog(dir.path());
        let out_root = dir.path().join("out");
        let mut store = HashStore::open(&out_root).unwrap();
        let probe = FixedProbe(u64::MAX);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let selection = catalog.select_all();
        let mut unpacker = Unpacker::new(&catalog, &mut store, &probe, cancel);
        let outcome = unpacker.unpack(&selection, &out_root, |_| {}).unwrap();
        assert_eq!(outcome, Outcome::Aborted);
    }

    #[test]
    fn background_task_reports_through_its_handle() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = two_pak_catalog(dir.path());
        let out_root = dir.path().join("out");
        let store = HashStore::open(&out_root).unwrap();

        let selection = catalog.select_all();
        let task = spawn_unpack(
            catalog,
            selection,
            store,
            FixedProbe(u64::MAX),
            out_root.clone(),
            |_| {},
        );
        let outcome = task.handle.join().unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Finished { .. }));
        assert_eq!(std::fs::read(out_root.join("mnt/a.bin")).unwrap(), b"alpha");
    }
}
