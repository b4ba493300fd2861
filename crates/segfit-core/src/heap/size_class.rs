//! Power-of-two size classes.
//!
//! Class `k` covers payload sizes in `[2^(k+3), 2^(k+4))`: class 0 holds the
//! smallest chunks (8..16 bytes) and class 27 reaches the largest request
//! the allocator accepts (2^30 bytes). The class index is the position of
//! the highest set bit of the size, one bit-scan.

/// Number of size-class buckets (one per power of two from 2^3 to 2^30).
pub const NUM_CLASSES: usize = 28;

/// Smallest payload a chunk can carry (also the alignment unit).
pub const MIN_PAYLOAD: usize = 8;

/// Largest request the allocator accepts, in bytes.
pub const MAX_REQUEST: usize = 1 << 30;

/// Computes the bucket index for `size`.
///
/// Returns the unique `k` with `2^(k+3) <= size < 2^(k+4)`. Sizes below
/// [`MIN_PAYLOAD`] clamp to class 0 (requests that small are rounded up to
/// one alignment unit anyway), and sizes at or above `2^31` clamp into the
/// top class, which coalescing can produce even though requests that large
/// are rejected upstream.
///
/// `size == 0` is invalid input; callers must reject zero-byte requests
/// before indexing.
pub fn class_of(size: usize) -> usize {
    debug_assert!(size > 0, "zero-size class lookup");
    let size = size.max(MIN_PAYLOAD);
    let log2 = (usize::BITS - 1 - size.leading_zeros()) as usize;
    (log2 - 3).min(NUM_CLASSES - 1)
}

/// Smallest payload size belonging to `class`.
pub fn class_floor(class: usize) -> usize {
    debug_assert!(class < NUM_CLASSES);
    1 << (class + 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_boundaries() {
        assert_eq!(class_of(8), 0);
        assert_eq!(class_of(15), 0);
        assert_eq!(class_of(16), 1);
        assert_eq!(class_of(31), 1);
        assert_eq!(class_of(32), 2);
        assert_eq!(class_of(MAX_REQUEST - 1), 26);
        assert_eq!(class_of(MAX_REQUEST), NUM_CLASSES - 1);
    }

    #[test]
    fn test_tiny_sizes_clamp_to_class_zero() {
        for size in 1..MIN_PAYLOAD {
            assert_eq!(class_of(size), 0);
        }
    }

    #[test]
    fn test_oversized_free_chunks_clamp_to_top_class() {
        // Coalescing can build payloads past the request ceiling.
        assert_eq!(class_of((1 << 31) - 8), NUM_CLASSES - 1);
        assert_eq!(class_of(1 << 31), NUM_CLASSES - 1);
        assert_eq!(class_of(usize::MAX), NUM_CLASSES - 1);
    }

    #[test]
    fn test_class_floor_roundtrip() {
        for class in 0..NUM_CLASSES {
            let floor = class_floor(class);
            assert_eq!(class_of(floor), class);
            assert_eq!(class_of(floor + floor - 1), class);
        }
    }
}
