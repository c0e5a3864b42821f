//! Subscriber types for the reactive system.
//!
//! A Subscriber is anything a [`Dep`](super::Dep) can notify. Watchers are
//! the only subscribers the crate creates itself, but the trait is public so
//! callers can attach their own listeners to a dependency.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// IDs are handed out in creation order. The scheduler relies on that: a
/// watcher created earlier always has a smaller ID and therefore runs first
/// within a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listener that reacts when one of its dependencies changes.
pub trait Subscriber {
    /// Stable identity of this subscriber.
    fn subscriber_id(&self) -> SubscriberId;

    /// Called by [`Dep::notify`](super::Dep::notify).
    fn update(self: Rc<Self>);
}
