//! Heap segment provider.
//!
//! The allocator never talks to the operating system; it consumes a
//! [`SegmentProvider`] that owns one contiguous byte region and can grow it
//! by whole pages. Offsets into the segment are stable across extension.

/// Fixed page size for segment extension, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// One contiguous, page-extensible memory region.
///
/// The allocator is the only caller; nothing else extends or resets the
/// segment concurrently.
pub trait SegmentProvider {
    /// Releases any existing region and returns the segment to zero size.
    fn reset(&mut self);

    /// Current segment size in bytes (always a whole number of pages).
    fn size(&self) -> usize;

    /// Grows the segment by `pages` pages, returning the byte offset of the
    /// newly available region, or `None` if the provider cannot grow.
    fn extend(&mut self, pages: usize) -> Option<usize>;

    /// The segment's bytes.
    fn bytes(&self) -> &[u8];

    /// The segment's bytes, mutably.
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// In-memory segment backed by a growable byte buffer.
///
/// An optional page cap turns the provider into a fixed-budget segment,
/// which is how tests exercise the out-of-memory path.
#[derive(Debug, Default)]
pub struct PageSegment {
    bytes: Vec<u8>,
    page_limit: Option<usize>,
}

impl PageSegment {
    /// Creates an empty, unbounded segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty segment that refuses to grow past `pages` pages.
    pub fn with_page_limit(pages: usize) -> Self {
        Self {
            bytes: Vec::new(),
            page_limit: Some(pages),
        }
    }

    /// Number of pages currently mapped.
    pub fn pages(&self) -> usize {
        self.bytes.len() / PAGE_SIZE
    }
}

impl SegmentProvider for PageSegment {
    fn reset(&mut self) {
        self.bytes.clear();
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn extend(&mut self, pages: usize) -> Option<usize> {
        if pages == 0 {
            return None;
        }
        if let Some(limit) = self.page_limit
            && self.pages() + pages > limit
        {
            return None;
        }
        let offset = self.bytes.len();
        self.bytes.resize(offset + pages * PAGE_SIZE, 0);
        Some(offset)
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
