//! Script replay against a fresh heap.
//!
//! The runner executes a trace while acting as a hostile caller: every
//! allocation's payload is filled with a slot-derived byte pattern and
//! verified before the slot is resized or freed, live payload ranges are
//! checked for overlap after every operation, and the structural validator
//! runs periodically. Any discrepancy aborts the replay with an error
//! naming the operation index.

use std::collections::HashMap;

use segfit_core::{Heap, HeapCorruption};
use thiserror::Error;

use crate::report::ReplayReport;
use crate::script::{Script, ScriptOp};

/// A replay failure at a specific operation.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("op {index}: slot {slot} already holds a live allocation")]
    SlotBusy { index: usize, slot: usize },
    #[error("op {index}: slot {slot} holds no live allocation")]
    SlotEmpty { index: usize, slot: usize },
    #[error("op {index}: payloads at {a:#x} and {b:#x} overlap")]
    Overlap { index: usize, a: usize, b: usize },
    #[error("op {index}: payload for slot {slot} changed while lent out")]
    PayloadClobbered { index: usize, slot: usize },
    #[error("op {index}: heap corruption: {source}")]
    Corruption {
        index: usize,
        #[source]
        source: HeapCorruption,
    },
}

/// Byte pattern for a slot's payload; distinct per slot so cross-slot
/// clobbering shows up too.
fn fill_byte(slot: usize) -> u8 {
    (slot as u8).wrapping_mul(37).wrapping_add(11)
}

/// Replays `script` against a fresh default heap.
///
/// `validate_every` runs the structural validator after every N operations;
/// 0 validates only at the end. Declined allocations and resizes are
/// recorded, not errors.
pub fn replay(script: &Script, validate_every: usize) -> Result<ReplayReport, ReplayError> {
    let mut heap = Heap::default();
    // slot -> payload offset
    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut denied = 0usize;

    for (index, &op) in script.ops.iter().enumerate() {
        match op {
            ScriptOp::Alloc { slot, size } => {
                if slots.contains_key(&slot) {
                    return Err(ReplayError::SlotBusy { index, slot });
                }
                match heap.allocate(size) {
                    Some(ptr) => {
                        heap.payload_mut(ptr).fill(fill_byte(slot));
                        slots.insert(slot, ptr);
                    }
                    None => denied += 1,
                }
            }
            ScriptOp::Resize { slot, size } => {
                let Some(&ptr) = slots.get(&slot) else {
                    return Err(ReplayError::SlotEmpty { index, slot });
                };
                let old_size = heap.payload_size(ptr);
                check_pattern(&heap, ptr, old_size, slot, index)?;
                match heap.resize(ptr, size) {
                    Some(new_ptr) => {
                        // Growth copies the old payload; shrink requests
                        // keep the chunk whole. Either way the original
                        // bytes must survive.
                        check_pattern(&heap, new_ptr, old_size, slot, index)?;
                        heap.payload_mut(new_ptr).fill(fill_byte(slot));
                        slots.insert(slot, new_ptr);
                    }
                    None => denied += 1,
                }
            }
            ScriptOp::Free { slot } => {
                let Some(ptr) = slots.remove(&slot) else {
                    return Err(ReplayError::SlotEmpty { index, slot });
                };
                let size = heap.payload_size(ptr);
                check_pattern(&heap, ptr, size, slot, index)?;
                heap.release(ptr);
            }
        }

        check_overlap(&heap, &slots, index)?;
        if validate_every > 0 && (index + 1) % validate_every == 0 {
            heap.validate()
                .map_err(|source| ReplayError::Corruption { index, source })?;
        }
    }

    let last = script.ops.len().saturating_sub(1);
    heap.validate()
        .map_err(|source| ReplayError::Corruption { index: last, source })?;

    let buckets = heap
        .free_list_snapshot()
        .into_iter()
        .filter(|bucket| !bucket.chunks.is_empty())
        .collect();
    Ok(ReplayReport {
        version: "1".to_string(),
        script_ops: script.ops.len(),
        executed: script.ops.len(),
        denied_requests: denied,
        live_at_end: slots.len(),
        stats: heap.stats(),
        segment_size: heap.segment_size(),
        free_bytes: heap.free_bytes(),
        free_chunks: heap.free_chunk_count(),
        buckets,
    })
}

fn check_pattern(
    heap: &Heap,
    ptr: usize,
    len: usize,
    slot: usize,
    index: usize,
) -> Result<(), ReplayError> {
    let expected = fill_byte(slot);
    if heap.payload(ptr)[..len].iter().all(|&b| b == expected) {
        Ok(())
    } else {
        Err(ReplayError::PayloadClobbered { index, slot })
    }
}

fn check_overlap(
    heap: &Heap,
    slots: &HashMap<usize, usize>,
    index: usize,
) -> Result<(), ReplayError> {
    let mut ranges: Vec<(usize, usize)> = slots
        .values()
        .map(|&ptr| (ptr, ptr + heap.payload_size(ptr)))
        .collect();
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(ReplayError::Overlap {
                index,
                a: pair[0].0,
                b: pair[1].0,
            });
        }
    }
    Ok(())
}
