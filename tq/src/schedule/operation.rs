//! Operation trait for schedule entries

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

/// A keyed unit of work that can be placed on a [`Schedule`](super::Schedule)
///
/// The key identifies the operation while it is queued. The delay is read
/// once per [`Schedule::add`](super::Schedule::add) and added to the clock's
/// current time; it need not be constant. An operation that retries with
/// backoff embeds an [`ExponentialBackoff`](super::ExponentialBackoff) and
/// forwards `delay` to it.
pub trait Operation {
    type Key: Eq + Hash + Clone + Debug;

    /// Key uniquely identifying this operation
    fn key(&self) -> Self::Key;

    /// Delay from now until the operation becomes ready
    fn delay(&mut self) -> Duration;
}

impl<O: Operation + ?Sized> Operation for Box<O> {
    type Key = O::Key;

    fn key(&self) -> Self::Key {
        (**self).key()
    }

    fn delay(&mut self) -> Duration {
        (**self).delay()
    }
}
