use crate::hash::Digest;

/// Marker identifying the container format.
pub const PAK_MAGIC: u32 = 0x5a6f_12e1;

/// The footer occupies the last `FOOTER_SIZE` bytes of the file: the fields
/// below, one zero byte, the compressor tag, then zero padding. Readers seek
/// straight to `EOF - FOOTER_SIZE`; there is no scanning.
pub const FOOTER_SIZE: u64 = 205;

/// Zero bytes between the end of the serialized index and the footer region.
/// The same constant separates the last entry's data from the index when an
/// append advances the recorded index offset.
pub const INDEX_FOOTER_GAP: u64 = 17;

/// Name of the only block compression scheme the format carries.
pub const COMPRESSOR_TAG: &[u8] = b"Zlib";

/// Entry point of a container file, anchored at a fixed distance from EOF.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PakFooter {
    pub version: u32,
    /// Absolute byte offset of the serialized index.
    pub index_offset: u64,
    /// Byte length of the serialized index.
    pub index_size: u64,
    /// SHA-1 of the serialized index bytes.
    pub index_hash: Digest,
}
