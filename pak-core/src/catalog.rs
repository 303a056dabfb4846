//! Aggregates every container in a directory behind one path index and
//! computes deterministic selections over them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::container::pakfile::PakFile;
use crate::error::{PakError, Result};
use crate::extract::progress::CancelFlag;
use crate::verify::FileVerifier;

/// The paths chosen out of one container, in that container's natural
/// entry order.
#[derive(Clone, Debug)]
pub struct PakPick {
    /// Position of the owning container in the catalog.
    pub pak: usize,
    pub paths: Vec<PathBuf>,
    pub bytes: u64,
}

/// A set of files to extract, grouped per container. Containers appear in
/// catalog order (numeric suffix ascending).
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub picks: Vec<PakPick>,
    pub total_files: u64,
    pub total_bytes: u64,
}

impl Selection {
    pub fn push(&mut self, pick: PakPick) {
        self.total_files += pick.paths.len() as u64;
        self.total_bytes += pick.bytes;
        self.picks.push(pick);
    }

    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}

pub struct Catalog {
    paks: Vec<PakFile>,
    /// Resolved path -> owning container position. Rebuilt whenever the
    /// container list changes; last writer wins on collisions.
    lookup: HashMap<PathBuf, usize>,
}

impl Catalog {
    /// Load every `.pak` file in `paks_dir`, ordered by the numeric run in
    /// the filename (name as tie-breaker), and index their paths.
    pub fn open(paks_dir: &Path, mount_root: &Path) -> Result<Catalog> {
        let mut found: Vec<(u64, String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(paks_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "pak") {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            found.push((ordinal(&name).unwrap_or(u64::MAX), name, path));
        }
        found.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let mut paks = Vec::with_capacity(found.len());
        for (_, _, path) in found {
            paks.push(PakFile::load(&path, mount_root)?);
        }

        tracing::info!(dir = %paks_dir.display(), paks = paks.len(), "opened catalog");

        let mut catalog = Catalog {
            paks,
            lookup: HashMap::new(),
        };
        catalog.rebuild_index();
        Ok(catalog)
    }

    fn rebuild_index(&mut self) {
        self.lookup.clear();
        for (i, pak) in self.paks.iter().enumerate() {
            for path in pak.file_paths() {
                self.lookup.insert(path, i);
            }
        }
    }

    pub fn paks(&self) -> &[PakFile] {
        &self.paks
    }

    pub fn pak(&self, i: usize) -> &PakFile {
        &self.paks[i]
    }

    pub fn pak_for(&self, resolved: &Path) -> Option<&PakFile> {
        self.lookup.get(resolved).map(|&i| &self.paks[i])
    }

    pub fn packed_file_count(&self) -> usize {
        self.lookup.len()
    }

    /// Every file of every container.
    pub fn select_all(&self) -> Selection {
        let mut selection = Selection::default();
        for (i, pak) in self.paks.iter().enumerate() {
            selection.push(self.pick(i, pak.file_paths().collect()));
        }
        selection
    }

    /// Files whose extracted copy under `output_root` is absent, has no
    /// recorded hash, or was recorded with a different hash. Scans the
    /// filesystem once per packaged file; cancellable per entry.
    pub fn select_missing_and_unverified<V, F>(
        &self,
        verifier: &V,
        output_root: &Path,
        cancel: &CancelFlag,
        mut on_scanned: F,
    ) -> Result<Selection>
    where
        V: FileVerifier,
        F: FnMut(u64),
    {
        let mut selection = Selection::default();
        let mut scanned = 0u64;

        for (i, pak) in self.paks.iter().enumerate() {
            let mut paths = Vec::new();
            for resolved in pak.file_paths() {
                cancel.check()?;

                // same normalization the extractor applies when it writes,
                // so hash-store keys line up for `..`-prefixed mount points
                let target = crate::util::paths::normalize(&output_root.join(&resolved));
                let declared = pak.file_hash(&resolved);
                let stale = !target.exists()
                    || match verifier.read_hash(&target) {
                        Some(stored) => declared != Some(stored),
                        None => true,
                    };
                if stale {
                    paths.push(resolved);
                }

                scanned += 1;
                on_scanned(scanned);
            }
            if !paths.is_empty() {
                selection.push(self.pick(i, paths));
            }
        }

        tracing::debug!(
            scanned,
            selected = selection.total_files,
            "missing/unverified scan finished"
        );
        Ok(selection)
    }

    /// An explicit list of resolved paths. Every unknown path is reported
    /// at once; the result is grouped per container in catalog order, with
    /// paths in each container's natural entry order.
    pub fn select_files(&self, requested: &[PathBuf]) -> Result<Selection> {
        let mut unknown = Vec::new();
        let mut by_pak: HashMap<usize, HashSet<&PathBuf>> = HashMap::new();
        for path in requested {
            match self.lookup.get(path) {
                Some(&i) => {
                    by_pak.entry(i).or_default().insert(path);
                }
                None => unknown.push(path.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(PakError::UnknownPaths(unknown));
        }

        let mut selection = Selection::default();
        for (i, pak) in self.paks.iter().enumerate() {
            let Some(wanted) = by_pak.get(&i) else {
                continue;
            };
            let paths: Vec<_> = pak
                .file_paths()
                .filter(|p| wanted.contains(p))
                .collect();
            selection.push(self.pick(i, paths));
        }
        Ok(selection)
    }

    fn pick(&self, pak: usize, paths: Vec<PathBuf>) -> PakPick {
        let bytes = paths
            .iter()
            .filter_map(|p| self.paks[pak].file_size(p))
            .sum();
        PakPick { pak, paths, bytes }
    }
}

/// Handle to a background missing/unverified scan.
pub struct ScanTask {
    pub cancel: CancelFlag,
    pub handle: std::thread::JoinHandle<Result<Selection>>,
}

/// Run the missing/unverified scan on its own thread; it touches the
/// filesystem once per packaged file, so callers usually want it off the
/// interactive path.
pub fn spawn_missing_scan<V, F>(
    catalog: std::sync::Arc<Catalog>,
    verifier: std::sync::Arc<V>,
    output_root: PathBuf,
    on_scanned: F,
) -> ScanTask
where
    V: FileVerifier + Send + Sync + 'static,
    F: FnMut(u64) + Send + 'static,
{
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let handle = std::thread::spawn(move || {
        catalog.select_missing_and_unverified(&*verifier, &output_root, &worker_cancel, on_scanned)
    });
    ScanTask { cancel, handle }
}

/// First run of decimal digits in a container filename; decides catalog
/// order.
fn ordinal(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &name[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
