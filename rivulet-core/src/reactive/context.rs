//! Reactive Context
//!
//! The reactive context tracks which watcher is currently evaluating.
//! Property reads have no parameter through which to say who is reading
//! them, so they consult the top of this stack instead.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering an evaluation pushes the watcher,
//! the returned guard pops it again. A computed getter evaluated while a
//! render watcher is running pushes on top of it, and the render watcher
//! becomes active again once the inner evaluation finishes.
//!
//! An entry may also be `None`: that suspends tracking for everything
//! evaluated underneath it.

use std::cell::RefCell;

use super::Watcher;

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
///
/// This ensures the stack is restored even if the computation panics.
pub struct ReactiveContext {
    depth: usize,
}

impl ReactiveContext {
    /// Make `target` the active watcher until the guard is dropped.
    ///
    /// Passing `None` suspends dependency tracking.
    pub fn enter(target: Option<Watcher>) -> Self {
        let depth = TARGET_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(target);
            stack.len()
        });

        Self { depth }
    }

    /// The watcher currently collecting dependencies, if any.
    pub fn current() -> Option<Watcher> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Number of nested evaluations on this thread.
    pub fn depth() -> usize {
        TARGET_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Guards are strictly nested.
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext mismatch: expected depth {}, got {}",
                self.depth,
                stack.len()
            );
            stack.pop();
        });
    }
}

/// Run `f` with dependency tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(None);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_is_inactive() {
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current().is_none());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn none_entry_suspends_tracking() {
        {
            let _ctx = ReactiveContext::enter(None);
            assert!(!ReactiveContext::is_active());
            assert_eq!(ReactiveContext::depth(), 1);
        }

        // Context should be cleaned up after drop
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn untracked_restores_depth() {
        let depth = untracked(ReactiveContext::depth);
        assert_eq!(depth, 1);
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
