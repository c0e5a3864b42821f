//! Watcher Queue
//!
//! Watchers invalidated during one tick are collected here and run together
//! in a single flush.
//!
//! # Algorithm
//!
//! 1. `queue_watcher` adds a watcher unless it is already pending, and
//!    requests a flush if none is pending yet.
//! 2. The flush sorts the queue by watcher id, so watchers created first run
//!    first and each runs at most once.
//! 3. A watcher queued while the flush is running is inserted in id order
//!    behind the cursor. If its id is at or before the cursor it is deferred
//!    to a follow-up flush instead.
//! 4. A watcher that keeps deferring itself across back-to-back flushes is
//!    dropped once it exceeds `max_update_count`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::tick::next_tick;
use crate::config;
use crate::error::{handle_error, warn};
use crate::reactive::{SubscriberId, Watcher};
use crate::scope::{Hook, Scope};

type AfterFlushFn = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    /// Watchers of the current (or next) flush.
    pending: Vec<Watcher>,

    /// Ids that are pending or deferred.
    has: HashSet<SubscriberId>,

    /// Re-queued at or before the cursor; they run in the next flush.
    deferred: Vec<Watcher>,

    /// Deferred re-queues per watcher across a chain of flushes.
    circular: HashMap<SubscriberId, usize>,

    /// A flush has been requested.
    waiting: bool,

    flushing: bool,

    /// Position of the watcher being run.
    index: usize,

    after_flush: Vec<AfterFlushFn>,
}

thread_local! {
    static QUEUE: RefCell<Queue> = RefCell::new(Queue::default());
}

/// Outcome of queueing, decided while the queue is borrowed.
enum Queued {
    Duplicate,
    Added { request_flush: bool },
    Runaway,
}

/// Schedule `watcher` to run in the next flush.
///
/// Queueing a watcher that is already pending is a no-op.
pub fn queue_watcher(watcher: Watcher) {
    let id = watcher.id();
    let max_update_count = config::with(|c| c.max_update_count);

    let outcome = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if !queue.has.insert(id) {
            return Queued::Duplicate;
        }

        if !queue.flushing {
            queue.pending.push(watcher.clone());
        } else {
            let current = queue.pending.get(queue.index).map(Watcher::id);
            match current {
                Some(current) if id > current => {
                    let mut i = queue.pending.len() - 1;
                    while i > queue.index && queue.pending[i].id() > id {
                        i -= 1;
                    }
                    queue.pending.insert(i + 1, watcher.clone());
                }
                _ => {
                    let count = queue.circular.entry(id).or_insert(0);
                    *count += 1;
                    if *count > max_update_count {
                        queue.has.remove(&id);
                        return Queued::Runaway;
                    }
                    queue.deferred.push(watcher.clone());
                }
            }
        }

        let request_flush = !queue.waiting;
        queue.waiting = true;
        Queued::Added { request_flush }
    });

    match outcome {
        Queued::Duplicate => {}
        Queued::Added { request_flush } => {
            tracing::trace!(watcher = id.raw(), "queued");
            if request_flush {
                if config::is_async() {
                    next_tick(flush);
                } else {
                    flush();
                }
            }
        }
        Queued::Runaway => {
            let scope = watcher.scope();
            warn(
                &format!(
                    "You may have an infinite update loop in watcher with expression \"{}\"",
                    watcher.expression()
                ),
                scope.as_ref(),
            );
        }
    }
}

/// Run every queued watcher in ascending id order.
///
/// Normally requested by [`queue_watcher`]; calling it directly flushes
/// whatever is pending right away.
pub fn flush() {
    let started = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if queue.flushing {
            return false;
        }
        queue.flushing = true;
        queue.index = 0;
        queue.pending.sort_by_key(Watcher::id);
        true
    });
    if !started {
        return;
    }
    tracing::debug!(watchers = pending_count(), "flush start");

    loop {
        let next = QUEUE.with(|queue| {
            let queue = queue.borrow();
            queue.pending.get(queue.index).cloned()
        });
        let Some(watcher) = next else {
            break;
        };

        if watcher.is_active() {
            watcher.call_before();
        }
        QUEUE.with(|queue| queue.borrow_mut().has.remove(&watcher.id()));

        if let Err(err) = watcher.run() {
            let scope = watcher.scope();
            handle_error(
                &err,
                scope.as_ref(),
                &format!("watcher \"{}\"", watcher.expression()),
            );
        }

        QUEUE.with(|queue| queue.borrow_mut().index += 1);
    }

    let (ran, callbacks, deferred) = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        let ran = std::mem::take(&mut queue.pending);
        let callbacks = std::mem::take(&mut queue.after_flush);
        let deferred = std::mem::take(&mut queue.deferred);
        if deferred.is_empty() {
            queue.circular.clear();
        }
        queue.has.clear();
        queue.waiting = false;
        queue.flushing = false;
        queue.index = 0;
        (ran, callbacks, deferred)
    });
    tracing::debug!(ran = ran.len(), deferred = deferred.len(), "flush end");

    call_updated_hooks(&ran);
    for callback in callbacks {
        callback();
    }
    for watcher in deferred {
        queue_watcher(watcher);
    }
}

/// Fire `Updated` on every mounted scope whose render watcher ran.
fn call_updated_hooks(ran: &[Watcher]) {
    for watcher in ran.iter().rev() {
        if !watcher.is_render() {
            continue;
        }
        let Some(scope) = watcher.scope() else {
            continue;
        };
        if is_render_watcher_of(&scope, watcher) && scope.is_mounted() && !scope.is_destroyed() {
            scope.call_hook(Hook::Updated);
        }
    }
}

fn is_render_watcher_of(scope: &Scope, watcher: &Watcher) -> bool {
    scope
        .render_watcher()
        .is_some_and(|render| render.ptr_eq(watcher))
}

/// Run `callback` once, after the current (or next) flush finishes.
pub fn after_flush(callback: impl FnOnce() + 'static) {
    QUEUE.with(|queue| queue.borrow_mut().after_flush.push(Box::new(callback)));
}

/// Whether a flush is running.
pub fn is_flushing() -> bool {
    QUEUE.with(|queue| queue.borrow().flushing)
}

/// Number of watchers waiting to run, including deferred ones.
pub fn pending_count() -> usize {
    QUEUE.with(|queue| {
        let queue = queue.borrow();
        queue.pending.len().saturating_sub(queue.index) + queue.deferred.len()
    })
}
