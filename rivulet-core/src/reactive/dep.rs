//! Dependency Implementation
//!
//! A Dep is the publisher side of one observable slot: every reactive
//! property owns one, and every observed container owns one more for
//! mutations that cannot be intercepted per element.
//!
//! # How Deps Work
//!
//! 1. When a slot is read while a watcher is evaluating, the slot's Dep asks
//!    that watcher to record it (`depend`). The watcher, not the Dep, decides
//!    whether a new subscription is needed.
//!
//! 2. When the slot is written, the Dep notifies every subscriber.
//!
//! Subscribers are held weakly. A watcher dropped without teardown simply
//! disappears from the list on the next notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config;

/// Counter for generating unique dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a [`Dep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<(SubscriberId, Weak<dyn Subscriber>)>>,
}

/// A publisher of change notifications.
///
/// Cloning a `Dep` yields another handle to the same publisher.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    /// Create a new dep with a fresh ID.
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            subs: RefCell::new(Vec::new()),
        }))
    }

    /// Get the dep's unique ID.
    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Append a subscriber.
    ///
    /// No uniqueness check happens here; watchers guard against double
    /// subscription through their own dependency-id sets.
    pub fn add_sub<S>(&self, sub: &Rc<S>)
    where
        S: Subscriber + 'static,
    {
        let weak: Weak<S> = Rc::downgrade(sub);
        let weak: Weak<dyn Subscriber> = weak;
        self.0
            .subs
            .borrow_mut()
            .push((sub.subscriber_id(), weak));
    }

    /// Remove the first subscription held by `id`.
    pub fn remove_sub(&self, id: SubscriberId) {
        let mut subs = self.0.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|(sub_id, _)| *sub_id == id) {
            subs.remove(pos);
        }
    }

    /// Register this dep with the active watcher, if there is one.
    pub fn depend(&self) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Notify every subscriber that the slot changed.
    pub fn notify(&self) {
        // Stabilize the list first: subscribers added or removed while
        // notifying must not affect this pass.
        let mut subs: Vec<Rc<dyn Subscriber>> = {
            let mut list = self.0.subs.borrow_mut();
            list.retain(|(_, weak)| weak.strong_count() > 0);
            list.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        // Without the scheduler sorting the batch, fire in creation order.
        if !config::is_async() {
            subs.sort_by_key(|sub| sub.subscriber_id());
        }

        tracing::trace!(dep = self.id().raw(), subscribers = subs.len(), "notify");

        for sub in subs {
            sub.update();
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0
            .subs
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Whether `id` is currently subscribed.
    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.0.subs.borrow().iter().any(|(sub_id, _)| *sub_id == id)
    }

    /// Check whether two handles refer to the same dep.
    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
