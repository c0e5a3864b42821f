//! Error Types
//!
//! Computations and callbacks in the reactive system return [`Result`].
//! Whether a failure propagates to the caller or is routed to the central
//! error handler depends on who supplied the computation:
//!
//! - User-level computations (explicit watches, computed getters) are
//!   reported through [`handle_error`] and execution continues.
//! - Internal computations (render watchers) propagate the error.

use thiserror::Error;

use crate::config;
use crate::scope::Scope;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by reactive computations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A user-supplied computation or callback failed.
    #[error("{0}")]
    Computation(String),

    /// A watcher was evaluated after its owning scope was dropped.
    #[error("scope for watcher \"{expression}\" has been dropped")]
    ScopeDropped {
        /// Expression of the orphaned watcher.
        expression: String,
    },

    /// A computed property was requested that was never defined.
    #[error("unknown computed property \"{0}\"")]
    UnknownComputed(String),
}

impl Error {
    /// Build a computation error from any displayable message.
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

/// Report an error that must not interrupt the caller.
///
/// `info` says which computation failed, e.g. `getter for watcher "a.b"`.
pub fn handle_error(err: &Error, scope: Option<&Scope>, info: &str) {
    let handler = config::with(|c| c.error_handler.clone());
    match handler {
        Some(handler) => handler(err, scope, info),
        None => tracing::error!(
            scope = scope.map(Scope::name).unwrap_or("<none>"),
            info,
            error = %err,
            "error in reactive computation"
        ),
    }
}

/// Emit a development warning.
pub fn warn(message: &str, scope: Option<&Scope>) {
    let (silent, handler) = config::with(|c| (c.silent, c.warn_handler.clone()));
    if silent {
        return;
    }
    match handler {
        Some(handler) => handler(message, scope),
        None => tracing::warn!(
            scope = scope.map(Scope::name).unwrap_or("<none>"),
            "{message}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn errors_render_context() {
        let err = Error::ScopeDropped {
            expression: "a.b".to_string(),
        };
        assert_eq!(err.to_string(), "scope for watcher \"a.b\" has been dropped");
        assert_eq!(Error::computation("boom").to_string(), "boom");
    }

    #[test]
    fn handle_error_uses_configured_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        config::configure(|c| {
            c.error_handler = Some(Rc::new(move |err, _, info| {
                sink.borrow_mut().push(format!("{info}: {err}"));
            }));
        });

        handle_error(&Error::computation("boom"), None, "getter for watcher \"x\"");

        assert_eq!(*seen.borrow(), vec!["getter for watcher \"x\": boom".to_string()]);
        config::reset();
    }

    #[test]
    fn silent_mutes_warnings() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        config::configure(|c| {
            c.silent = true;
            c.warn_handler = Some(Rc::new(move |_, _| *sink.borrow_mut() += 1));
        });

        warn("ignored", None);
        assert_eq!(*count.borrow(), 0);

        config::configure(|c| c.silent = false);
        warn("reported", None);
        assert_eq!(*count.borrow(), 1);
        config::reset();
    }
}
