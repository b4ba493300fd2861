//! Integration test: heap structural properties.
//!
//! Exercises the allocator through its public API only: round-trip
//! restoration, live-payload disjointness, bucket class membership,
//! coalescing, split arithmetic, boundary rejection, and resize growth.
//!
//! Run: cargo test -p segfit-core --test heap_properties_test

use segfit_core::heap::{HEADER_SIZE, MAX_REQUEST, NUM_CLASSES};
use segfit_core::{Heap, PageSegment};

/// Lower bound of size class `k`.
fn class_floor(class: usize) -> usize {
    1 << (class + 3)
}

fn assert_live_payloads_disjoint(heap: &Heap, live: &[usize]) {
    let mut ranges: Vec<(usize, usize)> = live
        .iter()
        .map(|&ptr| (ptr, ptr + heap.payload_size(ptr)))
        .collect();
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        assert!(
            pair[0].1 + HEADER_SIZE <= pair[1].0,
            "payload ranges {:#x}..{:#x} and {:#x}..{:#x} overlap or lack a header gap",
            pair[0].0,
            pair[0].1,
            pair[1].0,
            pair[1].1
        );
    }
}

// ---------------------------------------------------------------------------
// Round-trip: allocate then release restores the free structure
// ---------------------------------------------------------------------------

#[test]
fn allocate_release_round_trip_restores_free_structure() {
    let mut heap = Heap::default();
    // Settle the heap into a baseline with one big free chunk.
    let warmup = heap.allocate(100).expect("warmup");
    heap.release(warmup);

    for &n in &[1usize, 7, 8, 16, 100, 1000, 4000] {
        let free_bytes = heap.free_bytes();
        let free_chunks = heap.free_chunk_count();
        let ptr = heap.allocate(n).expect("allocation");
        heap.release(ptr);
        assert_eq!(heap.free_bytes(), free_bytes, "n = {n}");
        assert_eq!(heap.free_chunk_count(), free_chunks, "n = {n}");
        heap.validate().expect("heap structure");
    }
}

// ---------------------------------------------------------------------------
// Random trace: disjointness, class invariant, validator cleanliness
// ---------------------------------------------------------------------------

#[test]
fn random_trace_preserves_all_invariants() {
    fn lcg(state: &mut u64) -> u64 {
        *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *state
    }

    let mut heap = Heap::default();
    let mut live: Vec<usize> = Vec::new();
    let mut rng = 0xA5A5_5A5A_DEAD_BEEF_u64;

    for step in 0..2000 {
        let r = lcg(&mut rng);
        match r % 3 {
            0 => {
                let size = ((r >> 8) as usize % 8192).max(1);
                if let Some(ptr) = heap.allocate(size) {
                    live.push(ptr);
                }
            }
            1 if !live.is_empty() => {
                let idx = (r as usize) % live.len();
                let ptr = live.swap_remove(idx);
                heap.release(ptr);
            }
            2 if !live.is_empty() => {
                let idx = (r as usize) % live.len();
                let new_size = (((r >> 16) as usize) % 16384).max(1);
                if let Some(new_ptr) = heap.resize(live[idx], new_size) {
                    live[idx] = new_ptr;
                }
            }
            _ => {}
        }

        if step % 50 == 0 {
            heap.validate().expect("heap structure");
            assert_live_payloads_disjoint(&heap, &live);
        }
    }

    heap.validate().expect("heap structure");
    assert_live_payloads_disjoint(&heap, &live);
    assert_eq!(heap.stats().live_chunks, live.len());

    // Class invariant: every listed chunk maps back to its bucket; the top
    // bucket is unbounded above because coalescing can outgrow any request.
    for bucket in heap.free_list_snapshot() {
        for chunk in bucket.chunks {
            assert!(chunk.payload_size >= class_floor(bucket.class));
            if bucket.class < NUM_CLASSES - 1 {
                assert!(chunk.payload_size < class_floor(bucket.class + 1));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

#[test]
fn freeing_upper_then_lower_merges_adjacent_chunks() {
    let mut heap = Heap::default();
    let a = heap.allocate(100).expect("allocation");
    let b = heap.allocate(100).expect("allocation");
    let _barrier = heap.allocate(8).expect("allocation");
    let (pa, pb) = (heap.payload_size(a), heap.payload_size(b));

    heap.release(b);
    heap.release(a);

    let merged = pa + pb + HEADER_SIZE;
    let found = heap
        .free_list_snapshot()
        .into_iter()
        .flat_map(|bucket| bucket.chunks)
        .any(|c| c.payload_offset == a && c.payload_size == merged);
    assert!(found, "expected one merged chunk of {merged} bytes at {a:#x}");
    heap.validate().expect("heap structure");
}

#[test]
fn freeing_lower_then_upper_leaves_two_chunks_forward_only() {
    let mut heap = Heap::default();
    let a = heap.allocate(100).expect("allocation");
    let b = heap.allocate(100).expect("allocation");
    let _barrier = heap.allocate(8).expect("allocation");
    let (pa, pb) = (heap.payload_size(a), heap.payload_size(b));

    // Deallocation only looks at the chunk that follows the freed one, so
    // this order cannot merge: when `b` is freed its neighbor is the
    // barrier, and `a` was freed while `b` was still allocated.
    heap.release(a);
    heap.release(b);

    let sizes: Vec<usize> = heap
        .free_list_snapshot()
        .into_iter()
        .flat_map(|bucket| bucket.chunks)
        .filter(|c| c.payload_offset == a || c.payload_offset == b)
        .map(|c| c.payload_size)
        .collect();
    assert_eq!(sizes.len(), 2, "both chunks stay separate");
    assert!(sizes.contains(&pa));
    assert!(sizes.contains(&pb));
    heap.validate().expect("heap structure");

    // Taking both chunks back and freeing upper-then-lower does merge.
    let first = heap.allocate(pb).expect("allocation");
    let second = heap.allocate(pa).expect("allocation");
    assert_eq!((first, second), (b, a), "list order is most recently freed");
    heap.release(first);
    heap.release(second);
    let merged = heap
        .free_list_snapshot()
        .into_iter()
        .flat_map(|bucket| bucket.chunks)
        .any(|c| c.payload_offset == a && c.payload_size == pa + pb + HEADER_SIZE);
    assert!(merged);
}

// ---------------------------------------------------------------------------
// Split arithmetic (allocate 10 from a 1000-byte chunk)
// ---------------------------------------------------------------------------

#[test]
fn split_of_thousand_byte_chunk_is_exact() {
    let mut heap = Heap::default();
    let big = heap.allocate(1000).expect("allocation");
    assert_eq!(heap.payload_size(big), 1000);
    let _barrier = heap.allocate(8).expect("allocation");
    heap.release(big);

    let ptr = heap.allocate(10).expect("allocation");
    assert_eq!(ptr, big, "the 1000-byte chunk is the lowest fitting class");
    assert_eq!(heap.payload_size(ptr), 16, "10 rounds up to 16");

    let remainder = 1000 - 16 - HEADER_SIZE;
    let snapshot = heap.free_list_snapshot();
    // 976 lies in [512, 1024), class 6.
    let bucket = snapshot.iter().find(|b| b.class == 6).expect("bucket 6");
    assert!(
        bucket
            .chunks
            .iter()
            .any(|c| c.payload_size == remainder),
        "remainder of {remainder} bytes must sit in class 6"
    );
    heap.validate().expect("heap structure");
}

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

#[test]
fn zero_and_oversized_requests_reject_without_mutation() {
    let mut heap = Heap::default();
    let ptr = heap.allocate(128).expect("allocation");
    let free_bytes = heap.free_bytes();
    let free_chunks = heap.free_chunk_count();
    let segment = heap.segment_size();

    assert_eq!(heap.allocate(0), None);
    assert_eq!(heap.allocate(MAX_REQUEST + 1), None);

    assert_eq!(heap.free_bytes(), free_bytes);
    assert_eq!(heap.free_chunk_count(), free_chunks);
    assert_eq!(heap.segment_size(), segment);
    assert_eq!(heap.payload_size(ptr), 128);
    assert_eq!(heap.stats().rejected_requests, 2);
    heap.validate().expect("heap structure");
}

// ---------------------------------------------------------------------------
// Resize growth
// ---------------------------------------------------------------------------

#[test]
fn resize_growth_copies_bytes_and_frees_the_old_chunk() {
    let mut heap = Heap::default();
    let ptr = heap.allocate(200).expect("allocation");
    let old_size = heap.payload_size(ptr);
    for (i, byte) in heap.payload_mut(ptr).iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }

    let new_ptr = heap.resize(ptr, 5000).expect("resize");
    assert_ne!(new_ptr, ptr, "growth past capacity must move");
    assert!(heap.payload_size(new_ptr) >= 5000);
    for (i, &byte) in heap.payload(new_ptr)[..old_size].iter().enumerate() {
        assert_eq!(byte, (i % 251) as u8, "byte {i} lost in the move");
    }

    // The old address is free again: a fresh allocation may reuse it.
    let reuse = heap.allocate(old_size).expect("allocation");
    assert_eq!(reuse, ptr);
    heap.validate().expect("heap structure");
}

#[test]
fn resize_failure_keeps_the_original_alive() {
    let mut heap = Heap::new(PageSegment::with_page_limit(4));
    let ptr = heap.allocate(256).expect("allocation");
    heap.payload_mut(ptr).fill(0xE7);

    assert_eq!(heap.resize(ptr, 15000), None, "segment cannot grow");
    assert!(heap.payload(ptr).iter().all(|&b| b == 0xE7));
    heap.validate().expect("heap structure");
    heap.release(ptr);
    heap.validate().expect("heap structure");
}
