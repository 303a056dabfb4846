//! One loaded container: the backing file, its parsed footer and index,
//! and the mutations that keep them self-consistent.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use sha1::{Digest as _, Sha1};

use crate::container::codec;
use crate::container::footer::{INDEX_FOOTER_GAP, PakFooter};
use crate::container::index::{PakEntry, PakIndex};
use crate::error::{PakError, Result};
use crate::hash::Digest;
use crate::util::cursor::{PakReader, PakWriter};
use crate::util::hash_forward::HashingForward;

pub struct PakFile {
    path: PathBuf,
    footer: PakFooter,
    index: PakIndex,
    /// Resolved path -> position in `index.entries`. Pure cache, rebuilt
    /// after every mutation that touches entry identity.
    lookup: HashMap<PathBuf, usize>,
}

impl PakFile {
    /// Parse footer and index from `path`, resolving the embedded mount
    /// point against `mount_root`.
    pub fn load(path: &Path, mount_root: &Path) -> Result<PakFile> {
        let mut r = PakReader::open(path)?;
        let footer = codec::read_footer(&mut r)?;
        let index = codec::read_index(&mut r, footer.index_offset, mount_root)?;

        tracing::debug!(
            pak = %path.display(),
            version = footer.version,
            entries = index.entries.len(),
            "loaded container"
        );

        let mut pak = PakFile {
            path: path.to_path_buf(),
            footer,
            index,
            lookup: HashMap::new(),
        };
        pak.rebuild_lookup();
        Ok(pak)
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .index
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (self.index.resolve(e), i))
            .collect();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn footer(&self) -> &PakFooter {
        &self.footer
    }

    pub fn index(&self) -> &PakIndex {
        &self.index
    }

    pub fn entry(&self, resolved: &Path) -> Option<&PakEntry> {
        self.lookup.get(resolved).map(|&i| &self.index.entries[i])
    }

    /// Resolved paths of every entry, in on-disk index order.
    pub fn file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.index.entries.iter().map(|e| self.index.resolve(e))
    }

    pub fn file_size(&self, resolved: &Path) -> Option<u64> {
        self.entry(resolved).map(|e| e.size)
    }

    pub fn file_hash(&self, resolved: &Path) -> Option<Digest> {
        self.entry(resolved).map(|e| e.hash)
    }

    /// Entry positions for the given resolved paths; every offender is
    /// collected before failing.
    fn require(&self, resolved: &[PathBuf]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(resolved.len());
        let mut unknown = Vec::new();
        for path in resolved {
            match self.lookup.get(path) {
                Some(&i) => found.push(i),
                None => unknown.push(path.clone()),
            }
        }
        if unknown.is_empty() {
            Ok(found)
        } else {
            Err(PakError::UnknownPaths(unknown))
        }
    }

    /// Drop entries from the index without touching their data bytes. The
    /// dead bytes stay in the file until something overwrites them.
    pub fn soft_delete(&mut self, resolved: &[PathBuf]) -> Result<()> {
        let mut doomed = self.require(resolved)?;
        doomed.sort_unstable();
        for i in doomed.into_iter().rev() {
            let gone = self.index.entries.remove(i);
            tracing::debug!(path = %gone.path.display(), "soft-deleted entry");
        }
        self.rebuild_lookup();
        Ok(())
    }

    /// Append `suffix` to each matching entry's stored path.
    pub fn rename_with_suffix(&mut self, resolved: &[PathBuf], suffix: &str) -> Result<()> {
        for i in self.require(resolved)? {
            let entry = &mut self.index.entries[i];
            let mut renamed = entry.path.clone().into_os_string();
            renamed.push(suffix);
            entry.path = renamed.into();
        }
        self.rebuild_lookup();
        Ok(())
    }

    /// Overwrite an entry's bytes in place with the contents of `input`.
    /// The on-disk footprint never changes, so the replacement cannot be
    /// larger than the entry it displaces.
    pub fn replace_file(&mut self, resolved: &Path, input: &Path) -> Result<()> {
        let i = self.require(&[resolved.to_path_buf()])?[0];
        let entry = &self.index.entries[i];

        if entry.compressed {
            return Err(PakError::Format(format!(
                "cannot replace compressed entry {}",
                resolved.display()
            )));
        }
        let input_len = std::fs::metadata(input)?.len();
        if input_len > entry.size {
            return Err(PakError::Format(format!(
                "replacement for {} cannot grow in place ({} > {} bytes)",
                resolved.display(),
                input_len,
                entry.size
            )));
        }

        let offset = entry.offset;
        let mut w = PakWriter::open(&self.path)?;
        w.seek(offset)?;
        let (hash, written) = stream_file(&mut w, input)?;

        let entry = &mut self.index.entries[i];
        entry.size = written;
        entry.compressed_size = written;
        entry.hash = hash;

        tracing::debug!(path = %resolved.display(), bytes = written, "replaced entry in place");
        Ok(())
    }

    /// Write `input` after the last entry's footprint and add an
    /// uncompressed entry for it under `target`, which must fall inside the
    /// mount point. The recorded index offset moves past the new data.
    pub fn append_file(&mut self, input: &Path, target: &Path) -> Result<()> {
        let relative = target
            .strip_prefix(&self.index.mount_point)
            .map_err(|_| {
                PakError::Format(format!(
                    "target path {} is outside mount point {}",
                    target.display(),
                    self.index.mount_point.display()
                ))
            })?
            .to_path_buf();

        let offset = match self.index.entries.last() {
            Some(last) => last.offset + last.footprint(),
            None => 0,
        };

        let mut w = PakWriter::open(&self.path)?;
        w.seek(offset)?;
        let (hash, written) = stream_file(&mut w, input)?;

        self.index
            .entries
            .push(PakEntry::uncompressed(&relative, offset, written, hash));
        self.footer.index_offset = offset + written + INDEX_FOOTER_GAP;
        self.rebuild_lookup();

        tracing::debug!(
            path = %target.display(),
            offset,
            bytes = written,
            "appended entry"
        );
        Ok(())
    }

    /// Re-serialize the index at its recorded offset, then the gap and
    /// footer, truncating whatever the file held past that point.
    pub fn save(&mut self) -> Result<()> {
        let mut w = PakWriter::open(&self.path)?;
        codec::write_tail(&mut w, &self.index, &mut self.footer)?;
        Ok(())
    }
}

/// Stream a whole file to the writer at its current position, returning the
/// content digest and byte count.
fn stream_file(w: &mut PakWriter, input: &Path) -> Result<(Digest, u64)> {
    let mut src = BufReader::new(File::open(input)?);
    let mut hasher = Sha1::new();
    let mut fwd = HashingForward::new(&mut *w, &mut hasher);
    std::io::copy(&mut src, &mut fwd)?;
    let written = fwd.counted;
    Ok((Digest(hasher.finalize().into()), written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::footer::FOOTER_SIZE;
    use std::io::Write as _;

    fn build_pak(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let pak_path = dir.join("fixture.pak");
        let mut entries = Vec::new();
        let mut offset = 0u64;
        {
            let mut w = PakWriter::open(&pak_path).unwrap();
            for (name, data) in files {
                w.write_all(data).unwrap();
                entries.push(PakEntry::uncompressed(
                    Path::new(name),
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
        pak_path
    }

    fn write_input(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, data).unwrap();
        p
    }

    #[test]
    fn load_resolves_entries_under_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        let pak = build_pak(dir.path(), &[("a.txt", b"alpha"), ("sub/b.txt", b"bravo")]);

        let pak = PakFile::load(&pak, Path::new("")).unwrap();
        assert_eq!(pak.file_paths().count(), 2);
        let entry = pak.entry(Path::new("mnt/sub/b.txt")).unwrap();
        assert_eq!(entry.offset, 5);
        assert_eq!(entry.size, 5);
        assert!(pak.entry(Path::new("sub/b.txt")).is_none());
    }

    #[test]
    fn soft_delete_drops_index_entry_but_keeps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha"), ("b.txt", b"bravo")]);
        let len_before = std::fs::metadata(&path).unwrap().len();

        let mut pak = PakFile::load(&path, Path::new("")).unwrap();
        pak.soft_delete(&[PathBuf::from("mnt/a.txt")]).unwrap();
        pak.save().unwrap();

        let pak = PakFile::load(&path, Path::new("")).unwrap();
        assert!(pak.entry(Path::new("mnt/a.txt")).is_none());
        assert!(pak.entry(Path::new("mnt/b.txt")).is_some());
        // data region untouched, only the tail shrank
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..5], b"alpha");
        assert!(std::fs::metadata(&path).unwrap().len() < len_before);
    }

    #[test]
    fn rename_appends_suffix_to_stored_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha")]);

        let mut pak = PakFile::load(&path, Path::new("")).unwrap();
        pak.rename_with_suffix(&[PathBuf::from("mnt/a.txt")], ".bak")
            .unwrap();
        assert!(pak.entry(Path::new("mnt/a.txt")).is_none());
        let entry = pak.entry(Path::new("mnt/a.txt.bak")).unwrap();
        assert_eq!(entry.path, PathBuf::from("a.txt.bak"));
    }

    #[test]
    fn replace_overwrites_in_place_without_growing_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha"), ("b.txt", b"bravo")]);
        let len_before = std::fs::metadata(&path).unwrap().len();
        let input = write_input(dir.path(), "new.bin", b"xyz");

        let mut pak = PakFile::load(&path, Path::new("")).unwrap();
        pak.replace_file(Path::new("mnt/a.txt"), &input).unwrap();

        let entry = pak.entry(Path::new("mnt/a.txt")).unwrap();
        assert_eq!(entry.size, 3);
        assert_eq!(entry.hash, Digest::of_bytes(b"xyz"));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..5], b"xyzha");
    }

    #[test]
    fn replace_rejects_growth_and_compressed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha")]);
        let big = write_input(dir.path(), "big.bin", b"much too big");

        let mut pak = PakFile::load(&path, Path::new("")).unwrap();
        match pak.replace_file(Path::new("mnt/a.txt"), &big) {
            Err(PakError::Format(msg)) => assert!(msg.contains("grow")),
            other => panic!("expected format error, got {other:?}"),
        }

        pak.index.entries[0].compressed = true;
        let small = write_input(dir.path(), "small.bin", b"ok");
        match pak.replace_file(Path::new("mnt/a.txt"), &small) {
            Err(PakError::Format(msg)) => assert!(msg.contains("compressed")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn append_places_entry_after_last_footprint_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha")]);
        let input = write_input(dir.path(), "extra.bin", b"appended data");

        let mut pak = PakFile::load(&path, Path::new("")).unwrap();
        pak.append_file(&input, Path::new("mnt/extra.bin")).unwrap();

        let entry = pak.entry(Path::new("mnt/extra.bin")).unwrap();
        assert_eq!(entry.offset, 5);
        assert_eq!(entry.size, 13);
        assert_eq!(entry.path, PathBuf::from("extra.bin"));
        assert_eq!(pak.footer.index_offset, 5 + 13 + INDEX_FOOTER_GAP);

        let entries_before = pak.index.entries.clone();
        pak.save().unwrap();

        let reloaded = PakFile::load(&path, Path::new("")).unwrap();
        assert_eq!(reloaded.index.entries, entries_before);
        assert_eq!(reloaded.footer.index_offset, pak.footer.index_offset);

        // footer still anchored after the rewrite
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(
            len,
            pak.footer.index_offset + pak.footer.index_size + INDEX_FOOTER_GAP + FOOTER_SIZE
        );
    }

    #[test]
    fn mutations_on_unknown_paths_report_all_offenders() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_pak(dir.path(), &[("a.txt", b"alpha")]);
        let mut pak = PakFile::load(&path, Path::new("")).unwrap();

        let err = pak
            .soft_delete(&[PathBuf::from("mnt/no1"), PathBuf::from("mnt/no2")])
            .unwrap_err();
        match err {
            PakError::UnknownPaths(paths) => assert_eq!(paths.len(), 2),
            other => panic!("expected unknown paths, got {other:?}"),
        }
    }
}
