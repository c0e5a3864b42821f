//! Dependency Tracking
//!
//! This module implements the publisher/subscriber half of the reactive
//! system: deps, watchers, and the context that connects them.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] belongs to one observable slot. Reading the slot while a
//! watcher is evaluating records the dep on that watcher; writing it
//! notifies every subscribed watcher.
//!
//! ## Watchers
//!
//! A [`Watcher`] is a computation plus the set of deps it read last time.
//! When any of them fires, the watcher is re-run, either immediately, on the
//! next scheduler flush, or lazily on the next read.
//!
//! # Implementation Notes
//!
//! Tracking is implicit. The active watcher lives on a thread-local stack
//! ([`ReactiveContext`]) that property accessors consult when read.

mod context;
mod dep;
mod subscriber;
mod traverse;
mod watcher;

pub use context::{untracked, ReactiveContext};
pub use dep::{Dep, DepId};
pub use subscriber::{Subscriber, SubscriberId};
pub use traverse::traverse;
pub use watcher::{BeforeHook, Callback, WatchFn, WatchSource, Watcher, WatcherOptions};
