//! Keyed time heap
//!
//! A binary min-heap on deadline paired with a key index, giving O(log n)
//! insertion, removal by key and popping of due items.

mod core;
mod item;

pub use self::core::TimeHeap;
pub use item::PendingEntry;
