//! Observer Implementation
//!
//! An Observer is attached to each observed object or list. Attaching it
//! converts every property of an object into a reactive accessor, or
//! observes every element of a list. The observer also owns a dep of its
//! own that fires for changes the per-property deps cannot see: added or
//! deleted keys, and list mutations.
//!
//! A container is observed at most once. Observing it again returns the
//! observer that is already attached.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::list::{List, ListData};
use super::object::{Object, ObjectData};
use super::property::define_reactive;
use super::value::Value;
use crate::reactive::Dep;

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Enable or disable automatic observation on this thread.
///
/// While disabled, [`observe`] leaves unobserved values alone. Values that
/// already carry an observer are unaffected.
pub fn toggle_observing(value: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(value));
}

/// Whether automatic observation is currently enabled.
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

enum Target {
    Object(Weak<RefCell<ObjectData>>),
    List(Weak<RefCell<ListData>>),
}

struct ObserverInner {
    target: Target,
    dep: Dep,
    root_count: Cell<usize>,
}

/// The observer attached to an observed container.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

impl Observer {
    /// Attach a new observer to `obj` and make its properties reactive.
    fn for_object(obj: &Object) -> Self {
        let observer = Self(Rc::new(ObserverInner {
            target: Target::Object(obj.downgrade()),
            dep: Dep::new(),
            root_count: Cell::new(0),
        }));
        obj.attach_observer(observer.clone());
        observer.walk(obj);
        observer
    }

    /// Attach a new observer to `list` and observe its elements.
    fn for_list(list: &List) -> Self {
        let observer = Self(Rc::new(ObserverInner {
            target: Target::List(list.downgrade()),
            dep: Dep::new(),
            root_count: Cell::new(0),
        }));
        list.attach_observer(observer.clone());
        observer.observe_items(&list.to_vec());
        observer
    }

    /// Convert every key of `obj` into a reactive accessor.
    fn walk(&self, obj: &Object) {
        for key in obj.keys() {
            define_reactive(obj, &key, None, None, false);
        }
    }

    /// Observe each of `items`.
    pub(crate) fn observe_items(&self, items: &[Value]) {
        for item in items {
            observe(item, false);
        }
    }

    /// The container-level dep.
    pub fn dep(&self) -> &Dep {
        &self.0.dep
    }

    /// The observed container, if it is still alive.
    pub fn value(&self) -> Option<Value> {
        match &self.0.target {
            Target::Object(weak) => weak.upgrade().map(|inner| Value::Object(Object::from_inner(inner))),
            Target::List(weak) => weak.upgrade().map(|inner| Value::List(List::from_inner(inner))),
        }
    }

    /// How many scopes use this value as their root data.
    pub fn root_count(&self) -> usize {
        self.0.root_count.get()
    }

    pub(crate) fn retain_root(&self) {
        self.0.root_count.set(self.0.root_count.get() + 1);
    }

    pub(crate) fn release_root(&self) {
        self.0.root_count.set(self.0.root_count.get().saturating_sub(1));
    }

    /// Check whether two handles refer to the same observer.
    pub fn ptr_eq(&self, other: &Observer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.0.dep.id())
            .field("root_count", &self.root_count())
            .finish()
    }
}

/// Observe `value`, returning its observer.
///
/// Returns the existing observer if `value` is already observed. Otherwise
/// a new observer is created only for extensible, non-raw containers while
/// observation is enabled; scalars and skipped containers yield `None`.
///
/// `as_root` marks the value as some scope's root data.
pub fn observe(value: &Value, as_root: bool) -> Option<Observer> {
    let observer = match value {
        Value::Object(obj) => match obj.observer() {
            Some(existing) => Some(existing),
            None if should_observe() && obj.is_extensible() && !obj.is_raw() => {
                Some(Observer::for_object(obj))
            }
            None => None,
        },
        Value::List(list) => match list.observer() {
            Some(existing) => Some(existing),
            None if should_observe() && list.is_extensible() && !list.is_raw() => {
                Some(Observer::for_list(list))
            }
            None => None,
        },
        _ => None,
    };

    if as_root {
        if let Some(observer) = &observer {
            observer.retain_root();
        }
    }
    observer
}
