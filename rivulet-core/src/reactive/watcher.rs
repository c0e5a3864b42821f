//! Watcher Implementation
//!
//! A Watcher evaluates a computation, records every dep the computation
//! read, and reacts when one of those deps fires.
//!
//! # How Watchers Work
//!
//! 1. `get()` makes the watcher the active target and runs the computation.
//!    Every reactive read calls back into `add_dep`.
//!
//! 2. Dependencies are kept in two generations. The deps seen during the
//!    current evaluation go into the new generation; afterwards any dep of
//!    the old generation that was not seen again is unsubscribed, and the
//!    generations swap. A computation that stops reading a property stops
//!    being notified about it.
//!
//! 3. When a dep fires, `update()` either marks a lazy watcher dirty, runs a
//!    sync watcher immediately, or hands the watcher to the scheduler.
//!
//! 4. `run()` re-evaluates and fires the callback if the value changed.
//!
//! # Kinds of Watchers
//!
//! - Lazy watchers back computed properties. They recompute on read, and
//!   only while dirty.
//! - User watchers come from explicit `watch` calls. Their failures are
//!   reported to the error handler instead of propagated.
//! - The render watcher of a scope re-renders it and calls its patch
//!   function.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, SubscriberId};
use super::traverse::traverse;
use crate::error::{handle_error, warn, Error, Result};
use crate::observer::{Path, Value};
use crate::scheduler::queue_watcher;
use crate::scope::{Scope, ScopeInner};

/// Computation evaluated by a watcher.
pub type WatchFn = Rc<dyn Fn(&Scope) -> Result<Value>>;

/// Called with `(new, old)` when a watcher's value changes.
pub type Callback = Rc<dyn Fn(&Scope, &Value, &Value) -> Result<()>>;

/// Called by the scheduler right before a queued watcher runs.
pub type BeforeHook = Rc<dyn Fn(&Scope)>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum WatchSource {
    /// A computation with a label used in diagnostics.
    Getter { expression: String, getter: WatchFn },

    /// A dot-path resolved against the scope, e.g. `user.name`.
    Path(String),
}

impl WatchSource {
    /// Wrap a closure. The expression shown in diagnostics is `function`.
    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn(&Scope) -> Result<Value> + 'static,
    {
        Self::labeled("function", getter)
    }

    /// Wrap a closure under a custom diagnostic label.
    pub fn labeled<F>(expression: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Scope) -> Result<Value> + 'static,
    {
        Self::Getter {
            expression: expression.into(),
            getter: Rc::new(getter),
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            Self::Getter { expression, .. } => expression,
            Self::Path(path) => path,
        }
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl fmt::Debug for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Getter { expression, .. } => f.debug_tuple("Getter").field(expression).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Behavior flags for a [`Watcher`].
#[derive(Clone, Default)]
pub struct WatcherOptions {
    /// Traverse the result so nested mutations also trigger.
    pub deep: bool,

    /// Report failures to the error handler instead of propagating.
    pub user: bool,

    /// Defer evaluation until read; `update()` only marks the watcher dirty.
    pub lazy: bool,

    /// Run immediately on notification instead of queueing.
    pub sync: bool,

    /// Invoked by the scheduler before each queued run.
    pub before: Option<BeforeHook>,
}

impl fmt::Debug for WatcherOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherOptions")
            .field("deep", &self.deep)
            .field("user", &self.user)
            .field("lazy", &self.lazy)
            .field("sync", &self.sync)
            .field("before", &self.before.is_some())
            .finish()
    }
}

#[derive(Default)]
struct DepSet {
    deps: SmallVec<[Dep; 8]>,
    ids: HashSet<DepId>,
}

impl DepSet {
    fn clear(&mut self) {
        self.deps.clear();
        self.ids.clear();
    }
}

pub(crate) struct WatcherInner {
    id: SubscriberId,
    scope: Weak<ScopeInner>,
    expression: String,
    getter: WatchFn,
    callback: Option<Callback>,
    options: WatcherOptions,
    is_render: bool,
    value: RefCell<Value>,
    deps: RefCell<DepSet>,
    new_deps: RefCell<DepSet>,
    dirty: Cell<bool>,
    active: Cell<bool>,
}

impl Subscriber for WatcherInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn update(self: Rc<Self>) {
        Watcher(self).update();
    }
}

/// A computation that re-runs when the state it read changes.
///
/// Cloning a `Watcher` yields another handle to the same watcher.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

impl Watcher {
    /// Create a watcher owned by `scope`.
    ///
    /// Unless the watcher is lazy it is evaluated once before returning; a
    /// failing first evaluation of a non-user watcher tears it down again
    /// and returns the error.
    pub fn new(
        scope: &Scope,
        source: impl Into<WatchSource>,
        callback: Option<Callback>,
        options: WatcherOptions,
        is_render: bool,
    ) -> Result<Self> {
        let source = source.into();
        let expression = source.expression().to_string();
        let getter: WatchFn = match source {
            WatchSource::Getter { getter, .. } => getter,
            WatchSource::Path(path) => match Path::parse(&path) {
                Some(path) => Rc::new(move |scope: &Scope| Ok(path.resolve(scope))),
                None => {
                    warn(
                        &format!(
                            "Failed watching path: \"{path}\" Watcher only accepts simple \
                             dot-delimited paths. For full control, use a function instead."
                        ),
                        Some(scope),
                    );
                    Rc::new(|_: &Scope| Ok(Value::Undefined))
                }
            },
        };

        let watcher = Self(Rc::new(WatcherInner {
            id: SubscriberId::new(),
            scope: scope.downgrade(),
            expression,
            getter,
            callback,
            dirty: Cell::new(options.lazy),
            options,
            is_render,
            value: RefCell::new(Value::Undefined),
            deps: RefCell::new(DepSet::default()),
            new_deps: RefCell::new(DepSet::default()),
            active: Cell::new(true),
        }));

        scope.register_watcher(watcher.clone(), is_render);

        if !watcher.0.options.lazy {
            match watcher.get() {
                Ok(value) => *watcher.0.value.borrow_mut() = value,
                Err(err) => {
                    watcher.teardown();
                    return Err(err);
                }
            }
        }

        Ok(watcher)
    }

    /// Evaluate the computation and re-collect dependencies.
    pub fn get(&self) -> Result<Value> {
        let scope = self.owner()?;
        tracing::trace!(watcher = self.id().raw(), expression = %self.0.expression, "evaluate");

        let result = {
            let _ctx = ReactiveContext::enter(Some(self.clone()));
            let result = match (self.0.getter)(&scope) {
                Err(err) if self.0.options.user => {
                    handle_error(
                        &err,
                        Some(&scope),
                        &format!("getter for watcher \"{}\"", self.0.expression),
                    );
                    Ok(Value::Undefined)
                }
                result => result,
            };
            if self.0.options.deep {
                if let Ok(value) = &result {
                    traverse(value);
                }
            }
            result
        };

        self.cleanup_deps();
        result
    }

    /// Record `dep` as a dependency of the running evaluation.
    pub fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        {
            let mut new_deps = self.0.new_deps.borrow_mut();
            if !new_deps.ids.insert(id) {
                return;
            }
            new_deps.deps.push(dep.clone());
        }
        if !self.0.deps.borrow().ids.contains(&id) {
            dep.add_sub(&self.0);
        }
    }

    /// Drop subscriptions the last evaluation no longer needs and promote
    /// the new generation.
    fn cleanup_deps(&self) {
        let stale: Vec<Dep> = {
            let deps = self.0.deps.borrow();
            let new_deps = self.0.new_deps.borrow();
            deps.deps
                .iter()
                .filter(|dep| !new_deps.ids.contains(&dep.id()))
                .cloned()
                .collect()
        };
        for dep in stale {
            dep.remove_sub(self.id());
        }

        self.0.deps.swap(&self.0.new_deps);
        self.0.new_deps.borrow_mut().clear();
    }

    /// React to a dependency change.
    pub fn update(&self) {
        if self.0.options.lazy {
            self.0.dirty.set(true);
        } else if self.0.options.sync {
            if let Err(err) = self.run() {
                let scope = self.scope();
                handle_error(
                    &err,
                    scope.as_ref(),
                    &format!("watcher \"{}\"", self.0.expression),
                );
            }
        } else {
            queue_watcher(self.clone());
        }
    }

    /// Re-evaluate and fire the callback if the value changed.
    ///
    /// Containers and deep watchers always fire: their contents may have
    /// changed without their identity changing. Torn-down watchers and
    /// watchers whose scope is gone do nothing.
    pub fn run(&self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let Some(scope) = self.scope() else {
            return Ok(());
        };

        let value = self.get()?;
        let changed = !value.strict_eq(&self.0.value.borrow())
            || value.is_container()
            || self.0.options.deep;
        if !changed {
            return Ok(());
        }

        let old = self.0.value.replace(value.clone());
        let Some(callback) = &self.0.callback else {
            return Ok(());
        };
        match callback(&scope, &value, &old) {
            Err(err) if self.0.options.user => {
                handle_error(
                    &err,
                    Some(&scope),
                    &format!("callback for watcher \"{}\"", self.0.expression),
                );
                Ok(())
            }
            result => result,
        }
    }

    /// Recompute a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) -> Result<()> {
        let value = self.get()?;
        *self.0.value.borrow_mut() = value;
        self.0.dirty.set(false);
        Ok(())
    }

    /// Make the active watcher depend on everything this watcher depends on.
    pub fn depend(&self) {
        let deps: SmallVec<[Dep; 8]> = self.0.deps.borrow().deps.clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Unsubscribe from every dep and deactivate. Idempotent.
    pub fn teardown(&self) {
        if !self.0.active.get() {
            return;
        }
        if let Some(scope) = self.scope() {
            if !scope.is_being_destroyed() {
                scope.remove_watcher(self.id());
            }
        }
        let deps: SmallVec<[Dep; 8]> = self.0.deps.borrow().deps.clone();
        for dep in deps {
            dep.remove_sub(self.id());
        }
        self.0.active.set(false);
        tracing::trace!(watcher = self.id().raw(), "teardown");
    }

    pub(crate) fn call_before(&self) {
        if let (Some(before), Some(scope)) = (&self.0.options.before, self.scope()) {
            before(&scope);
        }
    }

    fn owner(&self) -> Result<Scope> {
        self.scope().ok_or_else(|| Error::ScopeDropped {
            expression: self.0.expression.clone(),
        })
    }

    /// The owning scope, if it is still alive.
    pub fn scope(&self) -> Option<Scope> {
        Scope::upgrade(&self.0.scope)
    }

    pub fn id(&self) -> SubscriberId {
        self.0.id
    }

    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    /// The value of the last evaluation.
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_lazy(&self) -> bool {
        self.0.options.lazy
    }

    pub fn is_user(&self) -> bool {
        self.0.options.user
    }

    pub fn is_sync(&self) -> bool {
        self.0.options.sync
    }

    pub fn is_deep(&self) -> bool {
        self.0.options.deep
    }

    pub fn is_render(&self) -> bool {
        self.0.is_render
    }

    /// Number of deps collected by the last evaluation.
    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().deps.len()
    }

    /// Whether the last evaluation read `dep`.
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.0.deps.borrow().ids.contains(&dep.id())
    }

    /// Check whether two handles refer to the same watcher.
    pub fn ptr_eq(&self, other: &Watcher) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("active", &self.0.active.get())
            .field("dirty", &self.0.dirty.get())
            .field("deps", &self.dep_count())
            .finish()
    }
}
