//! Update Scheduling
//!
//! Watchers that are neither lazy nor sync do not re-run the moment a
//! dependency changes. They are queued, and the queue is flushed once per
//! tick:
//!
//! - Several writes in the same tick re-run each watcher once.
//! - Watchers run parent-before-child, in creation order.
//!
//! A "tick" is whatever the host says it is: [`flush_ticks`] is the
//! checkpoint that drains callbacks registered with [`next_tick`],
//! including the scheduler's own flush request.

mod queue;
mod tick;

pub use queue::{after_flush, flush, is_flushing, pending_count, queue_watcher};
pub use tick::{flush_ticks, has_pending_ticks, next_tick};
