//! Runtime Configuration
//!
//! Configuration is per thread, like the rest of the reactive state: each
//! thread is an independent reactive world, so toggling synchronous flushing
//! in one thread never affects another.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;
use crate::scope::Scope;

/// Receives errors that were caught instead of propagated.
pub type ErrorHandler = Rc<dyn Fn(&Error, Option<&Scope>, &str)>;

/// Receives development warnings.
pub type WarnHandler = Rc<dyn Fn(&str, Option<&Scope>)>;

/// Default limit for back-to-back re-queues of one watcher.
pub const MAX_UPDATE_COUNT: usize = 100;

/// Tunables for the reactive runtime.
#[derive(Clone)]
pub struct Config {
    /// Defer flushes to the next tick. When `false`, every queued watcher
    /// flushes immediately and notifications fire in creation order.
    pub async_flush: bool,

    /// Suppress warnings.
    pub silent: bool,

    /// Overrides the default `tracing::error!` sink.
    pub error_handler: Option<ErrorHandler>,

    /// Overrides the default `tracing::warn!` sink.
    pub warn_handler: Option<WarnHandler>,

    /// How many times a watcher may re-queue itself behind the flush cursor
    /// before it is treated as an infinite update loop.
    pub max_update_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_flush: true,
            silent: false,
            error_handler: None,
            warn_handler: None,
            max_update_count: MAX_UPDATE_COUNT,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("async_flush", &self.async_flush)
            .field("silent", &self.silent)
            .field("error_handler", &self.error_handler.is_some())
            .field("warn_handler", &self.warn_handler.is_some())
            .field("max_update_count", &self.max_update_count)
            .finish()
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Read the current configuration.
pub fn with<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|config| f(&config.borrow()))
}

/// Modify the current configuration.
pub fn configure(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|config| f(&mut config.borrow_mut()));
}

/// Restore the defaults.
pub fn reset() {
    CONFIG.with(|config| *config.borrow_mut() = Config::default());
}

/// Whether flushes are deferred to the next tick.
pub fn is_async() -> bool {
    with(|c| c.async_flush)
}

/// Shorthand for toggling [`Config::async_flush`].
pub fn set_async(async_flush: bool) {
    configure(|c| c.async_flush = async_flush);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.async_flush);
        assert!(!config.silent);
        assert_eq!(config.max_update_count, 100);
    }

    #[test]
    fn configure_and_reset() {
        set_async(false);
        assert!(!is_async());

        reset();
        assert!(is_async());
    }

    #[test]
    fn config_is_thread_local() {
        set_async(false);
        let other = std::thread::spawn(is_async).join().unwrap();
        assert!(other);
        reset();
    }
}
