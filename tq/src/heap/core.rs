//! Time heap implementation

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::clock::{Clock, Sleep};
use crate::error::QueueError;

use super::item::{PendingEntry, QueueItem};

/// Keyed queue ordered by deadline
///
/// Items live in an arena of slots. `heap` holds slot ids arranged as a binary
/// min-heap on `(deadline, insertion sequence)`, and `index` maps each key to
/// its slot. Every item records its own heap position, so `add`, `remove` and
/// each pop from `ready` are O(log n).
///
/// Items with equal deadlines are released in insertion order.
#[derive(Debug)]
pub struct TimeHeap<K, V> {
    clock: Arc<dyn Clock>,
    slots: Vec<Option<QueueItem<K, V>>>,
    free: Vec<usize>,
    heap: Vec<usize>,
    index: HashMap<K, usize>,
    next_seq: u64,
}

impl<K, V> TimeHeap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty heap; `clock` backs the wait handles returned by [`next`](Self::next)
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slots: Vec::new(),
            free: Vec::new(),
            heap: Vec::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Deadline of the earliest item, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.first().map(|&slot| self.item(slot).deadline)
    }

    /// Deadline of the item queued under `key`, if any
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.index.get(key).map(|&slot| self.item(slot).deadline)
    }

    /// Wait handle that resolves once the earliest deadline is reached
    ///
    /// Returns `None` when the heap is empty. The handle reflects the root at
    /// the time of the call; call again after adding or removing items.
    pub fn next(&self) -> Option<Sleep> {
        let deadline = self.next_deadline()?;
        let wait = deadline.saturating_duration_since(self.clock.now());
        debug!(?wait, len = self.len(), "TimeHeap::next: waiting for earliest deadline");
        Some(self.clock.sleep(wait))
    }

    /// Pop every item whose deadline is at or before `now`
    ///
    /// Values come back in non-decreasing deadline order. Items not yet due
    /// are left in place.
    pub fn ready(&mut self, now: Instant) -> Vec<V> {
        let mut ready = Vec::new();
        while let Some(deadline) = self.next_deadline() {
            if deadline > now {
                break;
            }
            let item = self.remove_at(0);
            self.index.remove(&item.key);
            ready.push(item.value);
        }
        debug!(count = ready.len(), remaining = self.len(), "TimeHeap::ready: popped due items");
        ready
    }

    /// Queue `value` under `key` to become ready at `deadline`
    ///
    /// Fails with [`QueueError::DuplicateKey`] if `key` is already queued; the
    /// heap is left unchanged in that case.
    pub fn add(&mut self, key: K, value: V, deadline: Instant) -> Result<(), QueueError>
    where
        K: fmt::Debug,
    {
        if self.index.contains_key(&key) {
            warn!(?key, "TimeHeap::add: duplicate key rejected");
            return Err(QueueError::duplicate_key(&key));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let pos = self.heap.len();
        let item = QueueItem {
            key: key.clone(),
            value,
            deadline,
            heap_index: pos,
            seq,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(item);
                slot
            }
            None => {
                self.slots.push(Some(item));
                self.slots.len() - 1
            }
        };

        debug!(?key, slot, "TimeHeap::add: queued");
        self.heap.push(slot);
        self.index.insert(key, slot);
        self.sift_up(pos);
        Ok(())
    }

    /// Remove the item queued under `key` and return its value
    ///
    /// Absent keys are a no-op: a cancellation may race an item that was
    /// already returned by [`ready`](Self::ready).
    pub fn remove(&mut self, key: &K) -> Option<V>
    where
        K: fmt::Debug,
    {
        let Some(slot) = self.index.remove(key) else {
            debug!(?key, "TimeHeap::remove: key not queued");
            return None;
        };
        let pos = self.item(slot).heap_index;
        debug!(?key, slot, pos, "TimeHeap::remove: removing");
        Some(self.remove_at(pos).value)
    }

    /// Pending items in the order they would become ready
    ///
    /// Walks the whole heap; meant for reporting rather than the hot path.
    pub fn pending(&self) -> Vec<PendingEntry<'_, K, V>> {
        let mut items: Vec<&QueueItem<K, V>> = self.heap.iter().map(|&slot| self.item(slot)).collect();
        items.sort_by(|a, b| a.order(b));
        items
            .into_iter()
            .map(|item| PendingEntry {
                key: &item.key,
                value: &item.value,
                deadline: item.deadline,
            })
            .collect()
    }

    /// Detach the item at heap position `pos`, keeping the heap ordered
    ///
    /// The index entry is left to the caller.
    fn remove_at(&mut self, pos: usize) -> QueueItem<K, V> {
        let slot = self.heap.swap_remove(pos);
        if pos < self.heap.len() {
            // The former last leaf now sits at `pos`; it may belong above or below
            let moved = self.heap[pos];
            self.item_mut(moved).heap_index = pos;
            self.sift_down(pos);
            self.sift_up(pos);
        }

        self.free.push(slot);
        match self.slots[slot].take() {
            Some(item) => item,
            None => unreachable!("heap slot {slot} has no item"),
        }
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.precedes(pos, parent) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < len && self.precedes(left, smallest) {
                smallest = left;
            }
            if right < len && self.precedes(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }

            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        let (slot_a, slot_b) = (self.heap[a], self.heap[b]);
        self.item_mut(slot_a).heap_index = a;
        self.item_mut(slot_b).heap_index = b;
    }

    fn precedes(&self, a: usize, b: usize) -> bool {
        self.item(self.heap[a]).order(self.item(self.heap[b])).is_lt()
    }

    fn item(&self, slot: usize) -> &QueueItem<K, V> {
        match &self.slots[slot] {
            Some(item) => item,
            None => unreachable!("heap slot {slot} has no item"),
        }
    }

    fn item_mut(&mut self, slot: usize) -> &mut QueueItem<K, V> {
        match &mut self.slots[slot] {
            Some(item) => item,
            None => unreachable!("heap slot {slot} has no item"),
        }
    }

    /// Panics if the heap order, recorded positions or key index disagree
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.index.len(), self.heap.len(), "index and heap sizes differ");
        for (pos, &slot) in self.heap.iter().enumerate() {
            let item = self.item(slot);
            assert_eq!(item.heap_index, pos, "stale heap_index for slot {slot}");
            assert_eq!(self.index.get(&item.key), Some(&slot), "index does not point at slot {slot}");
            if pos > 0 {
                let parent = self.item(self.heap[(pos - 1) / 2]);
                assert!(parent.deadline <= item.deadline, "heap order violated at {pos}");
            }
        }
        let occupied = self.slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(occupied, self.heap.len(), "orphaned slots");
        assert_eq!(occupied + self.free.len(), self.slots.len(), "free list out of sync");
    }
}
