//! Structural heap validator.
//!
//! Diagnostic checker for the bucket structure and the chunk tiling of the
//! segment. A violation means a programming error somewhere in the
//! allocator (or a caller writing outside its payload); tests assert on the
//! result, production code does not call this on hot paths.

use thiserror::Error;

use super::allocator::Heap;
use super::chunk::{self, ChunkId, HEADER_SIZE};
use super::segment::SegmentProvider;
use super::size_class::{NUM_CLASSES, class_of};

/// A structural invariant violation found by [`Heap::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapCorruption {
    /// A bucket head carries a back-link.
    #[error("bucket {class}: head chunk at {offset:#x} has a back-link")]
    HeadHasBackLink { class: usize, offset: usize },
    /// A listed chunk is not marked free in its header.
    #[error("bucket {class}: chunk at {offset:#x} is listed but not marked free")]
    ListedChunkNotFree { class: usize, offset: usize },
    /// A listed chunk's payload size maps to a different bucket.
    #[error(
        "bucket {class}: chunk at {offset:#x} with payload size {payload_size} belongs in bucket {expected}"
    )]
    WrongBucket {
        class: usize,
        offset: usize,
        payload_size: usize,
        expected: usize,
    },
    /// Forward and back links of neighboring list nodes disagree.
    #[error("chunk at {offset:#x}: forward link to {next:#x} does not link back")]
    BrokenBackLink { offset: usize, next: usize },
    /// Walking the segment chunk by chunk does not tile it exactly.
    #[error("chunk tiling broken at offset {offset:#x} (segment size {segment_size})")]
    TilingBroken { offset: usize, segment_size: usize },
    /// A chunk marked free in the segment is on no bucket's list.
    #[error("free chunk at {offset:#x} is not on any free list")]
    FreeChunkNotListed { offset: usize },
    /// A chunk marked allocated in the segment sits on a free list.
    #[error("allocated chunk at {offset:#x} is on a free list")]
    AllocatedChunkListed { offset: usize },
    /// The free lists hold more chunks than the segment contains.
    #[error("free lists hold {listed} chunks but the segment contains {in_segment}")]
    StrayListEntry { listed: usize, in_segment: usize },
}

impl<S: SegmentProvider> Heap<S> {
    /// Checks every structural invariant of the bucket array and segment.
    ///
    /// Returns the first violation found. Intended for tests and debugging;
    /// a violation is unrecoverable because continuing risks corrupting
    /// unrelated live allocations.
    pub fn validate(&self) -> Result<(), HeapCorruption> {
        self.validate_buckets()?;
        self.validate_tiling()
    }

    fn validate_buckets(&self) -> Result<(), HeapCorruption> {
        let bytes = self.segment.bytes();
        for class in 0..NUM_CLASSES {
            if let Some(head) = self.free_lists.first(class)
                && self.free_lists.prev_of(head).is_some()
            {
                return Err(HeapCorruption::HeadHasBackLink {
                    class,
                    offset: head.offset(),
                });
            }
            let mut cur = self.free_lists.first(class);
            while let Some(id) = cur {
                let header = chunk::read_header(bytes, id);
                if !header.is_free {
                    return Err(HeapCorruption::ListedChunkNotFree {
                        class,
                        offset: id.offset(),
                    });
                }
                let expected = class_of(header.payload_size);
                if expected != class {
                    return Err(HeapCorruption::WrongBucket {
                        class,
                        offset: id.offset(),
                        payload_size: header.payload_size,
                        expected,
                    });
                }
                let next = self.free_lists.next_of(id);
                if let Some(next) = next
                    && self.free_lists.prev_of(next) != Some(id)
                {
                    return Err(HeapCorruption::BrokenBackLink {
                        offset: id.offset(),
                        next: next.offset(),
                    });
                }
                cur = next;
            }
        }
        Ok(())
    }

    /// Walks the segment by `header + payload` strides: chunks must cover it
    /// with no gaps or overlaps, and the free flag of each chunk must agree
    /// with list membership.
    fn validate_tiling(&self) -> Result<(), HeapCorruption> {
        let bytes = self.segment.bytes();
        let segment_size = bytes.len();
        let mut offset = 0;
        let mut free_in_segment = 0;
        while offset < segment_size {
            if offset + HEADER_SIZE > segment_size {
                return Err(HeapCorruption::TilingBroken {
                    offset,
                    segment_size,
                });
            }
            let id = ChunkId::new(offset);
            let header = chunk::read_header(bytes, id);
            let Some(end) = (offset + HEADER_SIZE).checked_add(header.payload_size) else {
                return Err(HeapCorruption::TilingBroken {
                    offset,
                    segment_size,
                });
            };
            if header.payload_size == 0 || end > segment_size {
                return Err(HeapCorruption::TilingBroken {
                    offset,
                    segment_size,
                });
            }
            if header.is_free {
                if !self.free_lists.contains(id) {
                    return Err(HeapCorruption::FreeChunkNotListed { offset });
                }
                free_in_segment += 1;
            } else if self.free_lists.contains(id) {
                return Err(HeapCorruption::AllocatedChunkListed { offset });
            }
            offset = end;
        }
        let listed = self.free_lists.len();
        if listed != free_in_segment {
            return Err(HeapCorruption::StrayListEntry {
                listed,
                in_segment: free_in_segment,
            });
        }
        Ok(())
    }
}
