//! Byte-level codec for the footer and table of contents. Pure data
//! transform: no mutation policy, no extraction logic.

use std::path::Path;

use crate::container::footer::{COMPRESSOR_TAG, FOOTER_SIZE, INDEX_FOOTER_GAP, PAK_MAGIC, PakFooter};
use crate::container::index::{CompressedBlock, PakEntry, PakIndex};
use crate::error::{PakError, Result};
use crate::hash::Digest;
use crate::util::cursor::{PakReader, PakWriter};
use crate::util::paths::{normalize, to_pak_path};

/// Read the footer from its fixed offset before EOF. Fails with a format
/// error when the magic does not match.
pub fn read_footer(r: &mut PakReader) -> Result<PakFooter> {
    r.eof()?;
    r.seek(-(FOOTER_SIZE as i64))?;

    if r.read_u32()? != PAK_MAGIC {
        return Err(PakError::Format("unrecognized container format".into()));
    }

    Ok(PakFooter {
        version: r.read_u32()?,
        index_offset: r.read_u64()?,
        index_size: r.read_u64()?,
        index_hash: r.read_digest()?,
    })
}

/// Parse the table of contents at `index_offset`, resolving the recorded
/// mount point against `mount_root`.
pub fn read_index(r: &mut PakReader, index_offset: u64, mount_root: &Path) -> Result<PakIndex> {
    r.seek(index_offset as i64)?;

    let mount = r.read_string()?;
    let mount_point = normalize(&mount_root.join(mount));

    let entry_count = r.read_u32()?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        entries.push(read_entry(r)?);
    }

    tracing::debug!(
        mount = %mount_point.display(),
        entries = entries.len(),
        "parsed container index"
    );

    Ok(PakIndex {
        mount_point,
        entries,
    })
}

fn read_entry(r: &mut PakReader) -> Result<PakEntry> {
    let path = r.read_string()?;
    let offset = r.read_u64()?;
    let compressed_size = r.read_u64()?;
    let size = r.read_u64()?;
    let compressed = read_compression_flag(r)?;
    let hash = r.read_digest()?;

    let blocks = if compressed {
        read_blocks(r)?
    } else {
        Vec::new()
    };

    let encrypted = r.read_u8()? != 0;
    if encrypted {
        return Err(PakError::Format("unsupported encryption".into()));
    }

    let block_size = r.read_u32()?;

    Ok(PakEntry {
        path: path.into(),
        offset,
        compressed_size,
        size,
        compressed,
        hash,
        blocks,
        encrypted,
        block_size,
    })
}

fn read_compression_flag(r: &mut PakReader) -> Result<bool> {
    match r.read_u32()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PakError::Format(format!(
            "unsupported compression type: {other}"
        ))),
    }
}

fn read_blocks(r: &mut PakReader) -> Result<Vec<CompressedBlock>> {
    let count = r.read_u32()?;
    let mut blocks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = r.read_u64()?;
        let end = r.read_u64()?;
        if end < start {
            return Err(PakError::Format(format!(
                "inverted compression block bounds: {start}..{end}"
            )));
        }
        blocks.push(CompressedBlock { start, end });
    }
    Ok(blocks)
}

/// Serialize an index to the exact on-disk layout, returning the bytes and
/// their SHA-1 digest. The mount point is written with a trailing slash.
pub fn serialize_index(index: &PakIndex) -> (Vec<u8>, Digest) {
    let mut buf = Vec::new();

    let mount = to_pak_path(&index.mount_point) + "/";
    put_string(&mut buf, &mount);
    put_u32(&mut buf, index.entries.len() as u32);

    for entry in &index.entries {
        put_string(&mut buf, &to_pak_path(&entry.path));
        put_u64(&mut buf, entry.offset);
        put_u64(&mut buf, entry.compressed_size);
        put_u64(&mut buf, entry.size);
        put_u32(&mut buf, entry.compressed as u32);
        buf.extend_from_slice(entry.hash.as_bytes());

        if entry.compressed {
            put_u32(&mut buf, entry.blocks.len() as u32);
            for block in &entry.blocks {
                put_u64(&mut buf, block.start);
                put_u64(&mut buf, block.end);
            }
        }

        buf.push(entry.encrypted as u8);
        put_u32(&mut buf, entry.block_size);
    }

    let digest = Digest::of_bytes(&buf);
    (buf, digest)
}

/// Write the footer region at the current position: the whole `FOOTER_SIZE`
/// tail is zero-filled first, then the fields land at its start, so EOF ends
/// up exactly `FOOTER_SIZE` bytes past where the magic begins.
pub fn write_footer(w: &mut PakWriter, footer: &PakFooter) -> Result<()> {
    let start = w.position();
    w.truncate()?;
    w.write_zeros(FOOTER_SIZE)?;
    w.seek(start)?;

    w.write_u32(PAK_MAGIC)?;
    w.write_u32(footer.version)?;
    w.write_u64(footer.index_offset)?;
    w.write_u64(footer.index_size)?;
    w.write_digest(&footer.index_hash)?;
    w.write_u8(0)?;
    std::io::Write::write_all(w, COMPRESSOR_TAG)?;

    Ok(())
}

/// Write the serialized index at its recorded offset (truncating whatever
/// followed), the fixed gap, then the footer. Returns the index digest and
/// size actually written.
pub fn write_tail(w: &mut PakWriter, index: &PakIndex, footer: &mut PakFooter) -> Result<()> {
    let (bytes, digest) = serialize_index(index);
    footer.index_size = bytes.len() as u64;
    footer.index_hash = digest;

    w.seek(footer.index_offset)?;
    w.truncate()?;
    std::io::Write::write_all(w, &bytes)?;
    w.write_zeros(INDEX_FOOTER_GAP)?;
    write_footer(w, footer)?;

    tracing::debug!(
        index_offset = footer.index_offset,
        index_size = footer.index_size,
        "rewrote index and footer"
    );

    Ok(())
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    put_u32(buf, s.len() as u32 + 1);
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}
