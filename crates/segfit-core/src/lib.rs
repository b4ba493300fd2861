//! # segfit-core
//!
//! A segregated-fit dynamic memory allocator managing a single growable
//! heap segment. Free space is organized into doubly linked lists indexed
//! by power-of-two size classes; allocation is first-fit within a class
//! with chunk splitting, and deallocation coalesces forward with adjacent
//! free chunks.
//!
//! The allocator is written entirely in safe Rust: the heap segment is a
//! page-granular byte buffer supplied by a [`heap::SegmentProvider`], chunk
//! identity is a byte offset rather than a raw pointer, and free-list links
//! live in a side table instead of overlapping payload bytes. No `unsafe`
//! code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod heap;
pub mod sync;

pub use heap::{
    BucketSnapshot, FreeChunkSnapshot, Heap, HeapCorruption, HeapStats, PageSegment,
    SegmentProvider,
};
pub use sync::SharedHeap;
