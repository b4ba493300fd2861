//! The heap: allocation, deallocation, and resize engines.
//!
//! [`Heap`] owns the bucket array, the free-list side table, and the segment
//! handle; there is no process-wide state, so independent heaps coexist
//! freely. All operations are synchronous, never block, and do bounded work.
//!
//! Callers hold payload offsets (`usize`, never 0) between a successful
//! [`Heap::allocate`] and the matching [`Heap::release`]; the heap does not
//! touch a lent payload's bytes.

use serde::{Deserialize, Serialize};

use super::chunk::{self, ALIGNMENT, ChunkId, HEADER_SIZE, Header, round_up};
use super::free_list::FreeLists;
use super::segment::{PAGE_SIZE, PageSegment, SegmentProvider};
use super::size_class::{MAX_REQUEST, NUM_CLASSES, class_of};

/// Extra pages pulled on every segment extension, amortizing future growth.
const EXTRA_PAGES: usize = 3;

/// Smallest payload worth splitting: the remainder must itself be a valid
/// chunk (header plus at least one alignment unit of payload).
const SMALLEST_SPLITTABLE: usize = 32;

/// Growth headroom multiplier for resize, anticipating repeated regrowth of
/// the same buffer.
const RESIZE_HEADROOM: usize = 3;

/// Operation counters and live-allocation accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Releases of non-null payloads.
    pub releases: u64,
    /// Resizes that had to move the payload.
    pub resizes: u64,
    /// Chunks split during allocation.
    pub splits: u64,
    /// Chunks absorbed by forward coalescing.
    pub chunks_coalesced: u64,
    /// Successful segment extensions.
    pub extensions: u64,
    /// Segment extensions the provider refused.
    pub extension_failures: u64,
    /// Requests rejected as zero-sized or over the size ceiling.
    pub rejected_requests: u64,
    /// Currently lent-out chunks.
    pub live_chunks: usize,
    /// Payload capacity currently lent out, in bytes.
    pub live_bytes: usize,
}

/// One free chunk as seen in a bucket snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeChunkSnapshot {
    /// Caller-visible payload offset.
    pub payload_offset: usize,
    /// Payload capacity in bytes.
    pub payload_size: usize,
}

/// Contents of one size-class bucket, in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    /// Size-class index.
    pub class: usize,
    /// Listed chunks, head first.
    pub chunks: Vec<FreeChunkSnapshot>,
}

/// A segregated-fit heap over a page-extensible segment.
pub struct Heap<S: SegmentProvider = PageSegment> {
    pub(crate) segment: S,
    pub(crate) free_lists: FreeLists,
    stats: HeapStats,
}

impl Default for Heap<PageSegment> {
    fn default() -> Self {
        Self::new(PageSegment::new())
    }
}

impl<S: SegmentProvider> Heap<S> {
    /// Creates a heap over `segment`, starting empty.
    pub fn new(segment: S) -> Self {
        let mut heap = Self {
            segment,
            free_lists: FreeLists::new(),
            stats: HeapStats::default(),
        };
        heap.init();
        heap
    }

    /// Resets the heap to its initial empty state: the segment returns to
    /// zero size and every bucket is cleared.
    ///
    /// Idempotent; safe to call mid-program to start a fresh heap. All
    /// previously lent payload offsets are invalidated.
    pub fn init(&mut self) {
        self.segment.reset();
        self.free_lists.clear();
        self.stats = HeapStats::default();
    }

    /// Allocates a chunk with at least `size` payload bytes, returning its
    /// payload offset.
    ///
    /// Returns `None` for zero-sized requests, requests above
    /// [`MAX_REQUEST`], and segment exhaustion.
    pub fn allocate(&mut self, size: usize) -> Option<usize> {
        if size == 0 || size > MAX_REQUEST {
            self.stats.rejected_requests += 1;
            return None;
        }

        // First fit within a class, classes scanned ascending. A larger
        // chunk earlier in a list wins over a closer fit later in it.
        let id = match self.find_fit(size) {
            Some((id, class)) => {
                self.free_lists.remove(id, class);
                id
            }
            None => self.extend_for(size)?,
        };

        let mut payload_size = chunk::read_header(self.segment.bytes(), id).payload_size;

        // Split when the request uses at most half the chunk and the chunk
        // is big enough that the remainder still forms a valid free chunk.
        if size * 2 <= payload_size && payload_size >= SMALLEST_SPLITTABLE {
            let kept = round_up(size, ALIGNMENT);
            let remainder = payload_size - kept - HEADER_SIZE;
            let rest = id.next(kept);
            chunk::write_header(
                self.segment.bytes_mut(),
                rest,
                Header {
                    payload_size: remainder,
                    is_free: true,
                },
            );
            self.free_lists.insert(rest, class_of(remainder));
            payload_size = kept;
            self.stats.splits += 1;
        }

        chunk::write_header(
            self.segment.bytes_mut(),
            id,
            Header {
                payload_size,
                is_free: false,
            },
        );
        self.stats.allocations += 1;
        self.stats.live_chunks += 1;
        self.stats.live_bytes += payload_size;
        Some(id.payload())
    }

    /// Releases the chunk lent out at payload offset `ptr`.
    ///
    /// No-op when `ptr` is 0. The freed chunk absorbs every free chunk that
    /// physically follows it, then joins the bucket matching its final size.
    /// Releasing an offset that was not returned by this heap, or releasing
    /// one twice, is outside the contract.
    pub fn release(&mut self, ptr: usize) {
        if ptr == 0 {
            return;
        }
        let id = ChunkId::for_payload(ptr);
        let mut payload_size = chunk::read_header(self.segment.bytes(), id).payload_size;
        self.stats.releases += 1;
        self.stats.live_chunks = self.stats.live_chunks.saturating_sub(1);
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(payload_size);

        // Forward coalescing: fold in free neighbors until the following
        // chunk is allocated or the segment ends.
        let mut next = id.next(payload_size);
        while next.offset() < self.segment.size() {
            let neighbor = chunk::read_header(self.segment.bytes(), next);
            if !neighbor.is_free {
                break;
            }
            self.free_lists.remove(next, class_of(neighbor.payload_size));
            payload_size += neighbor.payload_size + HEADER_SIZE;
            self.stats.chunks_coalesced += 1;
            next = id.next(payload_size);
        }

        chunk::write_header(
            self.segment.bytes_mut(),
            id,
            Header {
                payload_size,
                is_free: true,
            },
        );
        self.free_lists.insert(id, class_of(payload_size));
    }

    /// Grows (never shrinks) the allocation at `ptr` to hold at least
    /// `new_size` bytes.
    ///
    /// When the chunk already satisfies `new_size`, the same offset comes
    /// back unchanged. Otherwise a fresh chunk with growth headroom is
    /// allocated, the old payload is copied, and the old chunk is released.
    ///
    /// On failure (`new_size` over [`MAX_REQUEST`] or segment exhaustion)
    /// returns `None` and leaves the original chunk untouched and still
    /// owned by the caller.
    pub fn resize(&mut self, ptr: usize, new_size: usize) -> Option<usize> {
        let id = ChunkId::for_payload(ptr);
        let old_size = chunk::read_header(self.segment.bytes(), id).payload_size;
        if new_size <= old_size {
            return Some(ptr);
        }
        if new_size > MAX_REQUEST {
            self.stats.rejected_requests += 1;
            return None;
        }
        let request = (new_size * RESIZE_HEADROOM).min(MAX_REQUEST);
        let new_ptr = self.allocate(request)?;
        self.segment
            .bytes_mut()
            .copy_within(ptr..ptr + old_size, new_ptr);
        self.release(ptr);
        self.stats.resizes += 1;
        Some(new_ptr)
    }

    /// Payload capacity of the chunk lent out at `ptr`.
    pub fn payload_size(&self, ptr: usize) -> usize {
        chunk::read_header(self.segment.bytes(), ChunkId::for_payload(ptr)).payload_size
    }

    /// The payload bytes lent out at `ptr`.
    pub fn payload(&self, ptr: usize) -> &[u8] {
        let size = self.payload_size(ptr);
        &self.segment.bytes()[ptr..ptr + size]
    }

    /// The payload bytes lent out at `ptr`, mutably.
    pub fn payload_mut(&mut self, ptr: usize) -> &mut [u8] {
        let size = self.payload_size(ptr);
        &mut self.segment.bytes_mut()[ptr..ptr + size]
    }

    /// Current operation counters.
    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    /// Current segment size in bytes.
    pub fn segment_size(&self) -> usize {
        self.segment.size()
    }

    /// Total payload bytes sitting on free lists.
    pub fn free_bytes(&self) -> usize {
        let mut total = 0;
        for class in 0..NUM_CLASSES {
            let mut cur = self.free_lists.first(class);
            while let Some(id) = cur {
                total += chunk::read_header(self.segment.bytes(), id).payload_size;
                cur = self.free_lists.next_of(id);
            }
        }
        total
    }

    /// Number of chunks sitting on free lists.
    pub fn free_chunk_count(&self) -> usize {
        self.free_lists.len()
    }

    /// Structured snapshot of every bucket's contents, head first.
    pub fn free_list_snapshot(&self) -> Vec<BucketSnapshot> {
        (0..NUM_CLASSES)
            .map(|class| {
                let mut chunks = Vec::new();
                let mut cur = self.free_lists.first(class);
                while let Some(id) = cur {
                    chunks.push(FreeChunkSnapshot {
                        payload_offset: id.payload(),
                        payload_size: chunk::read_header(self.segment.bytes(), id).payload_size,
                    });
                    cur = self.free_lists.next_of(id);
                }
                BucketSnapshot { class, chunks }
            })
            .collect()
    }

    /// Scans buckets ascending from the request's own class and returns the
    /// first listed chunk whose payload fits, with the bucket it sits in.
    fn find_fit(&self, size: usize) -> Option<(ChunkId, usize)> {
        for class in class_of(size)..NUM_CLASSES {
            let mut cur = self.free_lists.first(class);
            while let Some(id) = cur {
                if chunk::read_header(self.segment.bytes(), id).payload_size >= size {
                    return Some((id, class));
                }
                cur = self.free_lists.next_of(id);
            }
        }
        None
    }

    /// Pulls enough pages for `size` plus [`EXTRA_PAGES`] and shapes the new
    /// region into a single chunk used as this call's candidate.
    fn extend_for(&mut self, size: usize) -> Option<ChunkId> {
        let pages = (size + HEADER_SIZE).div_ceil(PAGE_SIZE) + EXTRA_PAGES;
        let Some(offset) = self.segment.extend(pages) else {
            self.stats.extension_failures += 1;
            return None;
        };
        self.stats.extensions += 1;
        let id = ChunkId::new(offset);
        chunk::write_header(
            self.segment.bytes_mut(),
            id,
            Header {
                payload_size: pages * PAGE_SIZE - HEADER_SIZE,
                is_free: false,
            },
        );
        Some(id)
    }
}
