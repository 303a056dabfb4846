use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{PakError, Result};
use crate::hash::{DIGEST_LEN, Digest};

/// Buffered random-access reader over a container file.
///
/// All multi-byte integers are little-endian regardless of host order.
/// Seeking past either end clamps instead of failing; a negative position
/// is an offset from the current position (used for footer access from EOF).
/// Short reads are I/O errors.
pub struct PakReader {
    file: BufReader<File>,
    pos: u64,
    len: u64,
}

impl PakReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: BufReader::with_capacity(16 * 1024, file),
            pos: 0,
            len,
        })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Non-negative positions clamp to `[0, len]`; negative positions move
    /// relative to the current position, clamped at 0.
    pub fn seek(&mut self, pos: i64) -> Result<()> {
        let target = if pos >= 0 {
            (pos as u64).min(self.len)
        } else {
            self.pos.saturating_sub(pos.unsigned_abs())
        };
        self.file.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(())
    }

    /// Seek to end of file.
    pub fn eof(&mut self) -> Result<()> {
        self.seek(self.len as i64)
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.file.seek_relative(n as i64)?;
        self.pos += n;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.file.read_u8()?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.file.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let v = self.file.read_u64::<LittleEndian>()?;
        self.pos += 8;
        Ok(v)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.file.read_exact(&mut buf)?;
        self.pos += n as u64;
        Ok(buf)
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub fn read_digest(&mut self) -> Result<Digest> {
        let mut d = [0u8; DIGEST_LEN];
        self.read_into(&mut d)?;
        Ok(Digest(d))
    }

    /// Read `n` bytes as UTF-8. String fields are written back byte for
    /// byte, so any other encoding would break the recorded length prefix.
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_exact(n)?;
        String::from_utf8(bytes)
            .map_err(|e| PakError::Format(format!("malformed string field: {e}")))
    }

    /// Length-prefixed string: a 4-byte length that counts the trailing NUL,
    /// followed by the content bytes and the terminator.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        if len == 0 {
            return Err(PakError::Format("zero-length string field".into()));
        }
        let s = self.read_fixed_string(len as usize - 1)?;
        self.skip(1)?; // null terminator
        Ok(s)
    }
}

/// Positioned writer used by container mutation and save.
pub struct PakWriter {
    file: File,
    pos: u64,
}

impl PakWriter {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file, pos: 0 })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Truncate the file at the current position.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(self.pos)?;
        Ok(())
    }

    pub fn write_zeros(&mut self, n: u64) -> Result<()> {
        let zeros = [0u8; 4096];
        let mut left = n;
        while left > 0 {
            let take = (zeros.len() as u64).min(left) as usize;
            self.write_all(&zeros[..take])?;
            left -= take as u64;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        WriteBytesExt::write_u8(self, v)?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, v)?;
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        WriteBytesExt::write_u64::<LittleEndian>(self, v)?;
        Ok(())
    }

    pub fn write_digest(&mut self, d: &Digest) -> Result<()> {
        self.write_all(d.as_bytes())?;
        Ok(())
    }

    pub fn write_ascii(&mut self, s: &str) -> Result<()> {
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Decode a hex string and write the raw bytes.
    pub fn write_hex(&mut self, hex_str: &str) -> Result<()> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PakError::Format(format!("invalid hex: {e}")))?;
        self.write_all(&bytes)?;
        Ok(())
    }
}

impl Write for PakWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.file.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}
