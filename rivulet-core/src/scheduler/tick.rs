//! Tick Queue
//!
//! The scheduler defers flushes to "the next tick". The host decides when a
//! tick boundary happens by calling [`flush_ticks`]; until then callbacks
//! registered with [`next_tick`] accumulate in order.

use std::cell::RefCell;
use std::collections::VecDeque;

type TickFn = Box<dyn FnOnce()>;

thread_local! {
    static TICKS: RefCell<VecDeque<TickFn>> = const { RefCell::new(VecDeque::new()) };
}

/// Run `callback` at the next tick boundary.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    TICKS.with(|ticks| ticks.borrow_mut().push_back(Box::new(callback)));
}

/// Drain the tick queue, including callbacks queued while draining.
///
/// Returns the number of callbacks run.
pub fn flush_ticks() -> usize {
    let mut ran = 0;
    // Pop one at a time so callbacks may queue more.
    while let Some(callback) = TICKS.with(|ticks| ticks.borrow_mut().pop_front()) {
        callback();
        ran += 1;
    }
    if ran > 0 {
        tracing::trace!(callbacks = ran, "ticks flushed");
    }
    ran
}

/// Whether any callback is waiting for the next tick.
pub fn has_pending_ticks() -> bool {
    TICKS.with(|ticks| !ticks.borrow().is_empty())
}
