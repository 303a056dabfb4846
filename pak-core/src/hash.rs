use crate::error::{PakError, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest as _, Sha1};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

pub const DIGEST_LEN: usize = 20;

/// SHA-1 digest as stored in the container index (20 raw bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Hash everything a reader yields, returning digest and byte count.
    pub fn of_reader<R: Read>(r: &mut R) -> Result<(Digest, u64)> {
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 8 * 1024];
        let mut total = 0u64;
        loop {
            let n = r.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            total += n as u64;
        }
        Ok((Digest(hasher.finalize().into()), total))
    }

    pub fn of_bytes(bytes: &[u8]) -> Digest {
        Digest(Sha1::digest(bytes).into())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = PakError;

    fn from_str(s: &str) -> Result<Digest> {
        crate::util::hex::parse_hex_array::<DIGEST_LEN>(s).map(Digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_input() {
        let (d, n) = Digest::of_reader(&mut &[][..]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(d.to_string(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn digest_hex_round_trip() {
        let d = Digest::of_bytes(b"abc");
        assert_eq!(d.to_string(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(d.to_string().parse::<Digest>().unwrap(), d);
    }
}
