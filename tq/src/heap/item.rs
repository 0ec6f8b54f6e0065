//! Item types stored in the time heap

use std::cmp::Ordering;
use std::time::Instant;

/// One queued item
///
/// `heap_index` is the item's current position in the heap array. The heap
/// rewrites it on every swap so removal by key can start from the right
/// position without searching.
#[derive(Debug, Clone)]
pub(crate) struct QueueItem<K, V> {
    pub key: K,
    pub value: V,
    pub deadline: Instant,
    pub heap_index: usize,
    pub seq: u64,
}

impl<K, V> QueueItem<K, V> {
    /// Heap order: earlier deadline first, then earlier insertion
    pub fn order(&self, other: &Self) -> Ordering {
        self.deadline.cmp(&other.deadline).then(self.seq.cmp(&other.seq))
    }
}

/// Read-only view of a pending item, as returned by
/// [`TimeHeap::pending`](crate::TimeHeap::pending)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry<'a, K, V> {
    pub key: &'a K,
    pub value: &'a V,
    pub deadline: Instant,
}
