//! Rivulet Core
//!
//! This crate provides the dependency-tracking engine behind a
//! component-based UI framework. It implements:
//!
//! - Observable state (objects and lists whose reads and writes are seen)
//! - Dependency tracking between state and the computations reading it
//! - Watchers: computed properties, explicit watches and render functions
//! - A batching scheduler that re-runs invalidated watchers once per tick
//!
//! Nothing here knows about templates or the DOM. A render function is just
//! a watcher whose callback calls a caller-supplied patch function.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observer`: values, observation and reactive property accessors
//! - `reactive`: deps, watchers and the active-watcher context
//! - `scheduler`: the watcher queue and the tick queue
//! - `scope`: owners of data, computed properties and watchers
//! - `config` / `error`: runtime tunables, error routing and warnings
//!
//! All reactive state is single-threaded (`Rc`/`RefCell`); each thread is an
//! independent reactive world.
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{flush_ticks, Scope, Value, WatchOptions};
//! use serde_json::json;
//!
//! let scope = Scope::new("counter");
//! let data = Value::from(json!({ "count": 0 }));
//! scope.init_data(data.as_object().cloned().unwrap_or_default());
//!
//! scope
//!     .watch(
//!         "count",
//!         |_, new, old| {
//!             println!("count: {old} -> {new}");
//!             Ok(())
//!         },
//!         WatchOptions::default(),
//!     )
//!     .unwrap();
//!
//! scope.assign("count", Value::from(1));
//! scope.assign("count", Value::from(2));
//!
//! // Both writes are batched into one callback: "count: 0 -> 2"
//! flush_ticks();
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod reactive;
pub mod scheduler;
pub mod scope;

pub use config::Config;
pub use error::{handle_error, warn, Error, Result};
pub use observer::{
    define_reactive, del, observe, set, toggle_observing, List, Object, Observer, PropKey, Value,
};
pub use reactive::{untracked, Dep, Subscriber, SubscriberId, WatchSource, Watcher, WatcherOptions};
pub use scheduler::{after_flush, flush_ticks, has_pending_ticks, next_tick, queue_watcher};
pub use scope::{Hook, Scope, WatchOptions};
