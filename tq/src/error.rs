//! Queue error types

use thiserror::Error;

/// Errors returned by [`TimeHeap`](crate::TimeHeap) and [`Schedule`](crate::Schedule)
///
/// A duplicate key is a caller contract violation: callers are expected to
/// guarantee key uniqueness up front. Removing an absent key is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Duplicate key {key}: an item with this key is already queued")]
    DuplicateKey { key: String },
}

impl QueueError {
    pub(crate) fn duplicate_key(key: &impl std::fmt::Debug) -> Self {
        QueueError::DuplicateKey {
            key: format!("{:?}", key),
        }
    }

    /// Check if this is a duplicate key error
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, QueueError::DuplicateKey { .. })
    }
}
