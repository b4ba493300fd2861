//! Chunk header codec.
//!
//! Every chunk starts with a fixed 8-byte header encoding the payload size
//! and the free flag; the payload follows immediately. All header/payload
//! offset arithmetic is confined to this module: the rest of the crate works
//! in terms of [`ChunkId`], a newtype over the header's byte offset within
//! the segment.

/// Payload alignment unit. Every payload size is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Fixed size of a chunk header, itself one alignment unit.
pub const HEADER_SIZE: usize = 8;

// Payload sizes are multiples of ALIGNMENT, leaving the low three bits of
// the encoded size word spare; bit 0 carries the free flag.
const FREE_BIT: u64 = 1;

/// Identity of a chunk: the byte offset of its header within the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(usize);

impl ChunkId {
    /// Wraps a header offset.
    pub(crate) fn new(header_offset: usize) -> Self {
        Self(header_offset)
    }

    /// Recovers the chunk identity from a caller-visible payload offset.
    pub(crate) fn for_payload(payload_offset: usize) -> Self {
        debug_assert!(payload_offset >= HEADER_SIZE);
        Self(payload_offset - HEADER_SIZE)
    }

    /// Byte offset of this chunk's header.
    pub(crate) fn offset(self) -> usize {
        self.0
    }

    /// Byte offset of this chunk's payload (never zero, so callers can use
    /// `0` as the null value).
    pub(crate) fn payload(self) -> usize {
        self.0 + HEADER_SIZE
    }

    /// Identity of the chunk physically following this one, given this
    /// chunk's payload size.
    pub(crate) fn next(self, payload_size: usize) -> Self {
        Self(self.0 + HEADER_SIZE + payload_size)
    }
}

/// Decoded chunk header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    /// Bytes available to the caller, a multiple of [`ALIGNMENT`].
    pub payload_size: usize,
    /// Whether the chunk is on a free list.
    pub is_free: bool,
}

/// Reads the header stored at `id`.
pub(crate) fn read_header(bytes: &[u8], id: ChunkId) -> Header {
    let mut word = [0u8; HEADER_SIZE];
    word.copy_from_slice(&bytes[id.0..id.0 + HEADER_SIZE]);
    let word = u64::from_le_bytes(word);
    Header {
        payload_size: (word & !FREE_BIT) as usize,
        is_free: word & FREE_BIT != 0,
    }
}

/// Writes `header` at `id`.
pub(crate) fn write_header(bytes: &mut [u8], id: ChunkId, header: Header) {
    debug_assert_eq!(header.payload_size % ALIGNMENT, 0);
    let word = header.payload_size as u64 | if header.is_free { FREE_BIT } else { 0 };
    bytes[id.0..id.0 + HEADER_SIZE].copy_from_slice(&word.to_le_bytes());
}

/// Rounds `size` up to the nearest multiple of `mult` (a power of two).
pub(crate) fn round_up(size: usize, mult: usize) -> usize {
    debug_assert!(mult.is_power_of_two());
    (size + mult - 1) & !(mult - 1)
}
