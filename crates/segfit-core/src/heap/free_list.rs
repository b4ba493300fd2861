//! Free-list registry.
//!
//! One doubly linked list of free chunks per size class. The `{next, prev}`
//! links live in a side table keyed by [`ChunkId`] rather than inside the
//! chunk's payload bytes, so free-list metadata never aliases caller data.
//! Insert and remove are O(1) given the chunk's class; no searching happens
//! here.

use std::collections::HashMap;

use super::chunk::ChunkId;
use super::size_class::NUM_CLASSES;

/// Links of one free chunk. Present in the side table iff the chunk is on
/// exactly one bucket's list.
#[derive(Debug, Clone, Copy)]
struct FreeNode {
    next: Option<ChunkId>,
    prev: Option<ChunkId>,
}

/// The bucket array plus the link side table.
#[derive(Debug)]
pub(crate) struct FreeLists {
    /// Head of each size class's list.
    heads: [Option<ChunkId>; NUM_CLASSES],
    /// Link records for every listed chunk.
    nodes: HashMap<ChunkId, FreeNode>,
}

impl FreeLists {
    pub fn new() -> Self {
        Self {
            heads: [None; NUM_CLASSES],
            nodes: HashMap::new(),
        }
    }

    /// Empties every bucket.
    pub fn clear(&mut self) {
        self.heads = [None; NUM_CLASSES];
        self.nodes.clear();
    }

    /// Pushes `id` to the front of bucket `class`.
    pub fn insert(&mut self, id: ChunkId, class: usize) {
        debug_assert!(!self.nodes.contains_key(&id), "chunk already listed");
        let old_head = self.heads[class];
        if let Some(head) = old_head
            && let Some(node) = self.nodes.get_mut(&head)
        {
            node.prev = Some(id);
        }
        self.nodes.insert(
            id,
            FreeNode {
                next: old_head,
                prev: None,
            },
        );
        self.heads[class] = Some(id);
    }

    /// Detaches `id` from bucket `class`, wherever it sits in the list.
    ///
    /// The class must be the one `id` was inserted under (derived from the
    /// chunk's own payload size).
    pub fn remove(&mut self, id: ChunkId, class: usize) {
        let Some(node) = self.nodes.remove(&id) else {
            debug_assert!(false, "removing unlisted chunk");
            return;
        };
        match node.prev {
            // Head element: the bucket head advances.
            None => self.heads[class] = node.next,
            Some(prev) => {
                if let Some(p) = self.nodes.get_mut(&prev) {
                    p.next = node.next;
                }
            }
        }
        if let Some(next) = node.next
            && let Some(n) = self.nodes.get_mut(&next)
        {
            n.prev = node.prev;
        }
    }

    /// Head of bucket `class`.
    pub fn first(&self, class: usize) -> Option<ChunkId> {
        self.heads[class]
    }

    /// Forward link of a listed chunk.
    pub fn next_of(&self, id: ChunkId) -> Option<ChunkId> {
        self.nodes.get(&id).and_then(|n| n.next)
    }

    /// Back link of a listed chunk.
    pub fn prev_of(&self, id: ChunkId) -> Option<ChunkId> {
        self.nodes.get(&id).and_then(|n| n.prev)
    }

    /// Whether `id` is on any bucket's list.
    pub fn contains(&self, id: ChunkId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total number of listed chunks across all buckets.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for FreeLists {
    fn default() -> Self {
        Self::new()
    }
}
