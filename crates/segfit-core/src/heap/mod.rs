//! Segregated-fit heap management.
//!
//! The heap is a single contiguous segment tiled by chunks, each an 8-byte
//! header followed by its payload. Free chunks are tracked in per-size-class
//! doubly linked lists:
//! - Size classes are power-of-two payload ranges from 8 bytes to 2^30.
//! - Allocation scans classes ascending and takes the first fitting chunk,
//!   splitting off the excess when it is worth keeping.
//! - Deallocation folds in free chunks that physically follow the freed one.

pub mod allocator;
pub mod chunk;
pub mod free_list;
pub mod segment;
pub mod size_class;
pub mod validate;

pub use allocator::{BucketSnapshot, FreeChunkSnapshot, Heap, HeapStats};
pub use chunk::{ALIGNMENT, HEADER_SIZE};
pub use segment::{PAGE_SIZE, PageSegment, SegmentProvider};
pub use size_class::{MAX_REQUEST, NUM_CLASSES, class_of};
pub use validate::HeapCorruption;
