//! Streams entry bytes out of a container, inflating block-compressed
//! entries one block at a time.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;

use crate::container::index::PakEntry;
use crate::container::pakfile::PakFile;
use crate::error::{PakError, Result};
use crate::extract::progress::{CancelFlag, ExtractEvent, ProgressSink};
use crate::util::cursor::PakReader;

const COPY_BUF_SIZE: usize = 8 * 1024;
/// Largest compressed block the format is known to produce. A block above
/// this is a fatal format error, not a resize.
pub const ZLIB_BUF_SIZE: usize = 64 * 1024;

pub struct Extractor {
    cancel: CancelFlag,
    copy_buf: Vec<u8>,
    zlib_buf: Vec<u8>,
}

impl Extractor {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            copy_buf: vec![0u8; COPY_BUF_SIZE],
            zlib_buf: vec![0u8; ZLIB_BUF_SIZE],
        }
    }

    /// Extract `included` (resolved paths, caller order) from `pak` under
    /// `output_root`. Stops at the first cancellation poll after the flag is
    /// raised; the file in flight at that moment is not guaranteed complete.
    pub fn extract<S: ProgressSink>(
        &mut self,
        pak: &PakFile,
        included: &[PathBuf],
        output_root: &Path,
        sink: &mut S,
    ) -> Result<()> {
        let mut r = PakReader::open(pak.path())?;

        for path in included {
            self.cancel.check()?;

            let entry = pak
                .entry(path)
                .ok_or_else(|| PakError::UnknownPaths(vec![path.clone()]))?;
            self.extract_single(entry, pak, &mut r, output_root, sink)?;
        }

        sink.on_event(ExtractEvent::ContainerExtracted {
            pak: pak.path().to_path_buf(),
        });
        Ok(())
    }

    fn extract_single<S: ProgressSink>(
        &mut self,
        entry: &PakEntry,
        pak: &PakFile,
        r: &mut PakReader,
        output_root: &Path,
        sink: &mut S,
    ) -> Result<()> {
        // reject oversized blocks before the output file exists
        for block in &entry.blocks {
            if block.len() > ZLIB_BUF_SIZE as u64 {
                return Err(PakError::Format(format!(
                    "chunk too big in entry {} ({} bytes)",
                    entry.path.display(),
                    block.len()
                )));
            }
        }

        let relative = pak.index().resolve(entry);
        let output = crate::util::paths::normalize(&output_root.join(&relative));
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&output)?;
        if entry.blocks.is_empty() {
            r.seek(entry.offset as i64)?;
            self.copy_raw(r, entry.size, &mut out)?;
        } else {
            self.inflate_blocks(entry, r, &mut out)?;
        }
        drop(out);

        tracing::trace!(path = %relative.display(), bytes = entry.size, "extracted entry");
        sink.on_event(ExtractEvent::FileExtracted {
            relative_path: relative,
            output,
            hash: entry.hash,
        });
        sink.on_event(ExtractEvent::BytesExtracted(entry.size));
        Ok(())
    }

    fn copy_raw(&mut self, r: &mut PakReader, len: u64, out: &mut File) -> Result<()> {
        let mut remaining = len;
        while remaining > 0 {
            self.cancel.check()?;
            let n = remaining.min(COPY_BUF_SIZE as u64) as usize;
            r.read_into(&mut self.copy_buf[..n])?;
            out.write_all(&self.copy_buf[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Blocks are separately framed zlib streams. Each one gets its own
    /// inflate pass; concatenating them first would corrupt the output.
    fn inflate_blocks(&mut self, entry: &PakEntry, r: &mut PakReader, out: &mut File) -> Result<()> {
        for block in &entry.blocks {
            self.cancel.check()?;

            let len = block.len() as usize;
            r.seek((entry.offset + block.start) as i64)?;
            r.read_into(&mut self.zlib_buf[..len])?;

            let mut decoder = ZlibDecoder::new(&self.zlib_buf[..len]);
            loop {
                let n = decoder.read(&mut self.copy_buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&self.copy_buf[..n])?;
            }
        }
        Ok(())
    }
}
