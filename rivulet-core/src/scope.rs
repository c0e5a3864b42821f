//! Scopes
//!
//! A [`Scope`] is the owner of a group of watchers: it holds the props and
//! root data they read, the computed properties derived from them, and the
//! render watcher that re-renders it. Destroying a scope tears all of its
//! watchers down.
//!
//! # Lifecycle
//!
//! ```text
//! new -> init_props / init_data / computed / watch
//!     -> mount (BeforeMount, render, Mounted)
//!     -> [BeforeUpdate, render, Updated]*
//!     -> destroy (BeforeDestroy, Destroyed)
//! ```
//!
//! Watchers reference their scope weakly; the scope owns the watchers.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{handle_error, warn, Error, Result};
use crate::observer::{define_reactive, observe, toggle_observing, CustomSetter, Object, Value};
use crate::reactive::{
    untracked, BeforeHook, Callback, ReactiveContext, SubscriberId, WatchFn, WatchSource,
    Watcher, WatcherOptions,
};

/// Counter for generating unique scope IDs.
static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        Self(SCOPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hook {
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::BeforeDestroy => "beforeDestroy",
            Hook::Destroyed => "destroyed",
        })
    }
}

/// Options for [`Scope::watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Also fire on mutations nested anywhere inside the value.
    pub deep: bool,

    /// Run on every change instead of once per flush.
    pub sync: bool,

    /// Call the callback once with the initial value.
    pub immediate: bool,
}

/// Lifecycle hook handler.
pub type HookFn = Rc<dyn Fn(&Scope) -> Result<()>>;

/// Setter of a writable computed property.
pub type ComputedSetter = Rc<dyn Fn(&Scope, Value) -> Result<()>>;

struct Computed {
    watcher: Watcher,
    setter: Option<ComputedSetter>,
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    name: String,
    props: RefCell<Option<Object>>,
    data: RefCell<Option<Object>>,
    computed: RefCell<IndexMap<String, Computed>>,
    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    hooks: RefCell<HashMap<Hook, Vec<HookFn>>>,
    updating_props: Cell<bool>,
    mounted: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Owner of props, data, computed properties and watchers.
///
/// Cloning a `Scope` yields another handle to the same scope.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        let scope = Self(Rc::new(ScopeInner {
            id: ScopeId::next(),
            name: name.into(),
            props: RefCell::new(None),
            data: RefCell::new(None),
            computed: RefCell::new(IndexMap::new()),
            watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            hooks: RefCell::new(HashMap::new()),
            updating_props: Cell::new(false),
            mounted: Cell::new(false),
            being_destroyed: Cell::new(false),
            destroyed: Cell::new(false),
        }));
        tracing::debug!(scope = %scope.0.name, id = scope.0.id.raw(), "scope created");
        scope
    }

    pub fn id(&self) -> ScopeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Define the props of this scope.
    ///
    /// Prop values passed down from a parent (`is_root == false`) are not
    /// observed again here: the parent already owns them. Assigning such a
    /// prop directly is warned about, because the parent will overwrite it
    /// on its next update; use [`Scope::update_props`] for that instead.
    pub fn init_props<K, I>(&self, props: I, is_root: bool)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Object::new();
        if !is_root {
            toggle_observing(false);
        }
        for (key, value) in props {
            let key: String = key.into();
            let custom_setter: Option<CustomSetter> = if is_root {
                None
            } else {
                let owner = self.downgrade();
                let name = key.clone();
                let setter: CustomSetter = Rc::new(move |_: &Value| {
                    let Some(scope) = Scope::upgrade(&owner) else {
                        return;
                    };
                    if !scope.0.updating_props.get() {
                        warn(
                            &format!(
                                "Avoid mutating a prop directly since the value will be \
                                 overwritten whenever the parent component re-renders. \
                                 Instead, use a data or computed property based on the \
                                 prop's value. Prop being mutated: \"{name}\""
                            ),
                            Some(&scope),
                        );
                    }
                });
                Some(setter)
            };
            define_reactive(&obj, &key, Some(value), custom_setter, false);
        }
        toggle_observing(true);
        *self.0.props.borrow_mut() = Some(obj);
    }

    /// Assign props the way a parent re-render does, without warnings.
    pub fn update_props<K, I>(&self, values: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let Some(props) = self.props() else {
            return;
        };
        self.0.updating_props.set(true);
        for (key, value) in values {
            let key: String = key.into();
            props.set(&key, value);
        }
        self.0.updating_props.set(false);
    }

    /// Install `data` as the root data of this scope and observe it.
    pub fn init_data(&self, data: Object) {
        if let Some(props) = self.props() {
            for key in data.keys() {
                if props.has(&key) {
                    warn(
                        &format!(
                            "The data property \"{key}\" is already declared as a prop. \
                             Use prop default value instead."
                        ),
                        Some(self),
                    );
                }
            }
        }

        if let Some(previous) = self.0.data.borrow_mut().take() {
            if let Some(observer) = previous.observer() {
                observer.release_root();
            }
        }
        observe(&Value::from(data.clone()), true);
        *self.0.data.borrow_mut() = Some(data);
    }

    /// Build the root data with `factory`, without tracking its reads.
    ///
    /// A factory that fails or returns a non-object leaves the scope with
    /// empty data.
    pub fn init_data_with<F>(&self, factory: F)
    where
        F: FnOnce(&Scope) -> Result<Value>,
    {
        let data = match untracked(|| factory(self)) {
            Ok(Value::Object(obj)) => obj,
            Ok(_) => {
                warn("data functions should return an object", Some(self));
                Object::new()
            }
            Err(err) => {
                handle_error(&err, Some(self), "data()");
                Object::new()
            }
        };
        self.init_data(data);
    }

    pub fn props(&self) -> Option<Object> {
        self.0.props.borrow().clone()
    }

    pub fn data(&self) -> Option<Object> {
        self.0.data.borrow().clone()
    }

    /// Define a computed property.
    ///
    /// The getter runs lazily: on first read, and again on the first read
    /// after one of its dependencies changed. Returns `None` (with a
    /// warning) if `key` is already taken.
    pub fn computed<F>(&self, key: &str, getter: F) -> Option<Watcher>
    where
        F: Fn(&Scope) -> Result<Value> + 'static,
    {
        self.define_computed(key, Rc::new(getter), None)
    }

    /// Define a computed property that can also be assigned.
    pub fn computed_with_setter<F, S>(&self, key: &str, getter: F, setter: S) -> Option<Watcher>
    where
        F: Fn(&Scope) -> Result<Value> + 'static,
        S: Fn(&Scope, Value) -> Result<()> + 'static,
    {
        self.define_computed(key, Rc::new(getter), Some(Rc::new(setter)))
    }

    fn define_computed(
        &self,
        key: &str,
        getter: WatchFn,
        setter: Option<ComputedSetter>,
    ) -> Option<Watcher> {
        let taken_by = if self.data().is_some_and(|data| data.has(key)) {
            Some("in data")
        } else if self.props().is_some_and(|props| props.has(key)) {
            Some("as a prop")
        } else if self.0.computed.borrow().contains_key(key) {
            Some("as a computed property")
        } else {
            None
        };
        if let Some(taken_by) = taken_by {
            warn(
                &format!("The computed property \"{key}\" is already defined {taken_by}."),
                Some(self),
            );
            return None;
        }

        let options = WatcherOptions {
            lazy: true,
            ..Default::default()
        };
        let source = WatchSource::Getter {
            expression: key.to_string(),
            getter,
        };
        let watcher = match Watcher::new(self, source, None, options, false) {
            Ok(watcher) => watcher,
            Err(err) => {
                handle_error(&err, Some(self), &format!("computed property \"{key}\""));
                return None;
            }
        };
        self.0.computed.borrow_mut().insert(
            key.to_string(),
            Computed {
                watcher: watcher.clone(),
                setter,
            },
        );
        Some(watcher)
    }

    /// Read a computed property, propagating getter failures.
    pub fn try_computed(&self, key: &str) -> Result<Value> {
        let watcher = self
            .computed_watcher(key)
            .ok_or_else(|| Error::UnknownComputed(key.to_string()))?;
        if watcher.is_dirty() {
            watcher.evaluate()?;
        }
        if ReactiveContext::is_active() {
            watcher.depend();
        }
        Ok(watcher.value())
    }

    /// Read a prop, data property or computed property, in that order.
    ///
    /// Unknown keys read as `Undefined`; a failing computed getter is
    /// reported and reads as `Undefined` too.
    ///
    /// Data keys starting with `_` or `$` are reserved: they stay on the
    /// data object but are not reachable through the scope.
    pub fn get(&self, key: &str) -> Value {
        if let Some(props) = self.props().filter(|props| props.has(key)) {
            return props.get(key);
        }
        if let Some(data) = self.data().filter(|data| data.has(key)) {
            if !is_reserved(key) {
                return data.get(key);
            }
            warn(
                &format!(
                    "Property \"{key}\" must be accessed through the data object because \
                     properties starting with \"$\" or \"_\" are not exposed on the scope."
                ),
                Some(self),
            );
        }
        if !self.0.computed.borrow().contains_key(key) {
            return Value::Undefined;
        }
        self.try_computed(key).unwrap_or_else(|err| {
            handle_error(&err, Some(self), &format!("getter for computed \"{key}\""));
            Value::Undefined
        })
    }

    /// Assign a prop, data property or computed property.
    pub fn assign(&self, key: &str, value: Value) {
        if let Some(props) = self.props().filter(|props| props.has(key)) {
            props.set(key, value);
            return;
        }
        if let Some(data) = self.data().filter(|data| !is_reserved(key) && data.has(key)) {
            data.set(key, value);
            return;
        }

        let setter = self
            .0
            .computed
            .borrow()
            .get(key)
            .map(|computed| computed.setter.clone());
        match setter {
            Some(Some(setter)) => {
                if let Err(err) = setter(self, value) {
                    handle_error(&err, Some(self), &format!("setter for computed \"{key}\""));
                }
            }
            Some(None) => warn(
                &format!("Computed property \"{key}\" was assigned to but it has no setter."),
                Some(self),
            ),
            None => warn(
                &format!(
                    "Property \"{key}\" is not defined on the scope. \
                     Declare it in the data option."
                ),
                Some(self),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Watchers
    // ------------------------------------------------------------------

    /// Watch `source` and call `callback` with `(new, old)` when it changes.
    ///
    /// Tear the returned watcher down to stop watching.
    pub fn watch<F>(
        &self,
        source: impl Into<WatchSource>,
        callback: F,
        options: WatchOptions,
    ) -> Result<Watcher>
    where
        F: Fn(&Scope, &Value, &Value) -> Result<()> + 'static,
    {
        let callback: Callback = Rc::new(callback);
        let watcher_options = WatcherOptions {
            deep: options.deep,
            sync: options.sync,
            user: true,
            ..Default::default()
        };
        let watcher = Watcher::new(self, source, Some(callback.clone()), watcher_options, false)?;
        if options.immediate {
            if let Err(err) = callback(self, &watcher.value(), &Value::Undefined) {
                handle_error(
                    &err,
                    Some(self),
                    &format!("callback for immediate watcher \"{}\"", watcher.expression()),
                );
            }
        }
        Ok(watcher)
    }

    /// Mount the scope: render once, patch, and re-render on every change.
    ///
    /// `patch` receives `(new, old)` render results; the first call gets
    /// `Undefined` as the old value.
    pub fn mount<R, P>(&self, render: R, patch: P) -> Result<()>
    where
        R: Fn(&Scope) -> Result<Value> + 'static,
        P: Fn(&Scope, &Value, &Value) -> Result<()> + 'static,
    {
        if self.is_mounted() {
            warn("Scope is already mounted.", Some(self));
            return Ok(());
        }
        self.call_hook(Hook::BeforeMount);

        let patch: Callback = Rc::new(patch);
        let before: BeforeHook = Rc::new(|scope: &Scope| {
            if scope.is_mounted() && !scope.is_destroyed() {
                scope.call_hook(Hook::BeforeUpdate);
            }
        });
        let options = WatcherOptions {
            before: Some(before),
            ..Default::default()
        };
        let watcher = Watcher::new(
            self,
            WatchSource::labeled("render", render),
            Some(patch.clone()),
            options,
            true,
        )?;
        patch(self, &watcher.value(), &Value::Undefined)?;

        self.0.mounted.set(true);
        tracing::debug!(scope = %self.0.name, "mounted");
        self.call_hook(Hook::Mounted);
        Ok(())
    }

    pub(crate) fn register_watcher(&self, watcher: Watcher, is_render: bool) {
        if is_render {
            *self.0.render_watcher.borrow_mut() = Some(watcher.clone());
        }
        self.0.watchers.borrow_mut().push(watcher);
    }

    pub(crate) fn remove_watcher(&self, id: SubscriberId) {
        let mut render = self.0.render_watcher.borrow_mut();
        if render.as_ref().is_some_and(|watcher| watcher.id() == id) {
            *render = None;
        }
        drop(render);

        let mut watchers = self.0.watchers.borrow_mut();
        if let Some(pos) = watchers.iter().position(|watcher| watcher.id() == id) {
            watchers.remove(pos);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.0.watchers.borrow().len()
    }

    pub fn has_watcher(&self, id: SubscriberId) -> bool {
        self.0.watchers.borrow().iter().any(|watcher| watcher.id() == id)
    }

    pub fn render_watcher(&self) -> Option<Watcher> {
        self.0.render_watcher.borrow().clone()
    }

    pub fn computed_watcher(&self, key: &str) -> Option<Watcher> {
        self.0
            .computed
            .borrow()
            .get(key)
            .map(|computed| computed.watcher.clone())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register a lifecycle hook handler.
    pub fn on<F>(&self, hook: Hook, handler: F)
    where
        F: Fn(&Scope) -> Result<()> + 'static,
    {
        self.0
            .hooks
            .borrow_mut()
            .entry(hook)
            .or_default()
            .push(Rc::new(handler));
    }

    /// Run the handlers of `hook` in registration order.
    ///
    /// Handlers run untracked; failures are reported and do not stop the
    /// remaining handlers.
    pub fn call_hook(&self, hook: Hook) {
        let handlers = self.0.hooks.borrow().get(&hook).cloned().unwrap_or_default();
        untracked(|| {
            for handler in handlers {
                if let Err(err) = handler(self) {
                    handle_error(&err, Some(self), &format!("{hook} hook"));
                }
            }
        });
    }

    /// Tear down every watcher and release the root data. Idempotent.
    pub fn destroy(&self) {
        if self.0.being_destroyed.get() {
            return;
        }
        self.call_hook(Hook::BeforeDestroy);
        self.0.being_destroyed.set(true);

        if let Some(render) = self.render_watcher() {
            render.teardown();
        }
        let watchers = std::mem::take(&mut *self.0.watchers.borrow_mut());
        for watcher in watchers.iter().rev() {
            watcher.teardown();
        }
        if let Some(observer) = self.data().and_then(|data| data.observer()) {
            observer.release_root();
        }

        self.0.destroyed.set(true);
        tracing::debug!(scope = %self.0.name, watchers = watchers.len(), "destroyed");
        self.call_hook(Hook::Destroyed);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    pub(crate) fn is_being_destroyed(&self) -> bool {
        self.0.being_destroyed.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<ScopeInner>) -> Option<Scope> {
        weak.upgrade().map(Self)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("watchers", &self.watcher_count())
            .field("mounted", &self.is_mounted())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Keys starting with `_` or `$` are kept off the scope surface.
fn is_reserved(key: &str) -> bool {
    key.starts_with('_') || key.starts_with('$')
}
