use sha1::{Digest as _, Sha1};
use std::io::{Result, Write};

/// Write adapter that feeds every byte through a SHA-1 hasher on its way
/// to the inner writer, counting bytes as it goes.
pub struct HashingForward<'a, W: Write> {
    inner: W,
    hasher: &'a mut Sha1,
    pub counted: u64,
}

impl<'a, W: Write> HashingForward<'a, W> {
    pub fn new(inner: W, hasher: &'a mut Sha1) -> Self {
        Self {
            inner,
            hasher,
            counted: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<'a, W: Write> Write for HashingForward<'a, W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.counted += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Digest;

    #[test]
    fn hashes_what_it_forwards() {
        let mut hasher = Sha1::new();
        let mut sink = Vec::new();
        {
            let mut fwd = HashingForward::new(&mut sink, &mut hasher);
            fwd.write_all(b"hello ").unwrap();
            fwd.write_all(b"world").unwrap();
            assert_eq!(fwd.counted, 11);
        }
        assert_eq!(sink, b"hello world");
        let got = Digest(hasher.finalize().into());
        assert_eq!(got, Digest::of_bytes(b"hello world"));
    }
}
