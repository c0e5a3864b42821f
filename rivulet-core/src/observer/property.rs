//! Reactive Property Accessors
//!
//! [`define_reactive`] installs a get/set pair on one property. The pair
//! closes over a fresh [`Dep`] and the current value:
//!
//! - Reading while a watcher is evaluating registers the dep (and the dep
//!   of the child observer, so structural changes inside the value are
//!   seen too).
//! - Writing a different value stores it, observes it, and notifies.

use std::cell::RefCell;
use std::rc::Rc;

use super::list::List;
use super::object::{Getter, Object, Setter, Slot, SlotKind};
use super::observe::{observe, Observer};
use super::value::Value;
use crate::reactive::{Dep, ReactiveContext};

/// Hook invoked before a reactive property accepts a new value.
pub type CustomSetter = Rc<dyn Fn(&Value)>;

/// The get/set pair installed on one property.
pub(crate) struct ReactiveProperty {
    dep: Dep,
    value: RefCell<Value>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
    child: RefCell<Option<Observer>>,
}

impl ReactiveProperty {
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }

    fn current(&self) -> Value {
        match &self.getter {
            Some(getter) => getter(),
            None => self.value.borrow().clone(),
        }
    }

    pub(crate) fn get(&self) -> Value {
        let value = self.current();
        if ReactiveContext::is_active() {
            self.dep.depend();
            let child = self.child.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::List(list) = &value {
                    depend_list(list);
                }
            }
        }
        value
    }

    pub(crate) fn set(&self, new_value: Value) {
        let old = self.current();
        if new_value.is_unchanged_from(&old) {
            return;
        }
        if let Some(custom_setter) = &self.custom_setter {
            custom_setter(&new_value);
        }
        // Accessor properties without a setter stay read-only.
        if self.getter.is_some() && self.setter.is_none() {
            return;
        }
        match &self.setter {
            Some(setter) => setter(new_value.clone()),
            None => *self.value.borrow_mut() = new_value.clone(),
        }
        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child.borrow_mut() = child;
        self.dep.notify();
    }
}

/// Depend on every observed element of `list`, recursively.
///
/// Element reads cannot be intercepted, so whoever reads a list through a
/// reactive property subscribes to everything reachable inside it.
pub(crate) fn depend_list(list: &List) {
    for item in list.to_vec() {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
        if let Value::List(inner) = &item {
            depend_list(inner);
        }
    }
}

/// Install a reactive accessor on `obj[key]`.
///
/// - Non-configurable properties are left alone, as are new keys on
///   non-extensible objects.
/// - An existing getter/setter is kept and delegated to.
/// - With `value` set to `None`, the current value of the property is used.
/// - Unless `shallow`, the value is observed recursively.
pub fn define_reactive(
    obj: &Object,
    key: &str,
    value: Option<Value>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
) {
    let existing = obj.slot(key);
    if let Some(slot) = &existing {
        if !slot.configurable {
            return;
        }
    } else if !obj.is_extensible() {
        return;
    }

    let (getter, setter): (Option<Getter>, Option<Setter>) = match existing.map(|slot| slot.kind) {
        Some(SlotKind::Accessor { get, set }) => (get, set),
        Some(SlotKind::Reactive(prop)) => {
            let read = prop.clone();
            let get: Getter = Rc::new(move || read.get());
            let set: Setter = Rc::new(move |value| prop.set(value));
            (Some(get), Some(set))
        }
        Some(SlotKind::Data { .. }) | None => (None, None),
    };

    let value = match value {
        Some(value) => value,
        None if getter.is_none() || setter.is_some() => obj.get(key),
        None => Value::Undefined,
    };

    let child = if shallow { None } else { observe(&value, false) };

    let prop = ReactiveProperty {
        dep: Dep::new(),
        value: RefCell::new(value),
        getter,
        setter,
        custom_setter,
        shallow,
        child: RefCell::new(child),
    };

    obj.define_slot(
        key,
        Slot {
            kind: SlotKind::Reactive(Rc::new(prop)),
            configurable: true,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Subscriber, SubscriberId};
    use std::cell::Cell;

    struct Spy {
        id: SubscriberId,
        hits: Cell<usize>,
    }

    impl Spy {
        fn watch(obj: &Object, key: &str) -> Rc<Self> {
            let spy = Rc::new(Self {
                id: SubscriberId::new(),
                hits: Cell::new(0),
            });
            obj.property_dep(key).unwrap().add_sub(&spy);
            spy
        }
    }

    impl Subscriber for Spy {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn update(self: Rc<Self>) {
            self.hits.set(self.hits.get() + 1);
        }
    }

    #[test]
    fn read_write_round_trip() {
        let obj = Object::new();
        define_reactive(&obj, "x", Some(Value::from(1)), None, false);

        assert_eq!(obj.get("x").as_f64(), Some(1.0));
        obj.set("x", Value::from(2));
        assert_eq!(obj.get("x").as_f64(), Some(2.0));
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let obj = Object::new();
        define_reactive(&obj, "x", Some(Value::from(2)), None, false);
        let spy = Spy::watch(&obj, "x");

        obj.set("x", Value::from(2));
        assert_eq!(spy.hits.get(), 0);

        obj.set("x", Value::from(3));
        assert_eq!(spy.hits.get(), 1);
    }

    #[test]
    fn nan_assignment_notifies_once() {
        let obj = Object::new();
        define_reactive(&obj, "x", Some(Value::from(0)), None, false);
        let spy = Spy::watch(&obj, "x");

        obj.set("x", Value::from(f64::NAN));
        obj.set("x", Value::from(f64::NAN));
        assert_eq!(spy.hits.get(), 1);
    }

    #[test]
    fn non_configurable_properties_stay_plain() {
        let obj = Object::new();
        obj.define_data("x", Value::from(1), false);
        define_reactive(&obj, "x", None, None, false);
        assert!(!obj.is_reactive("x"));
    }

    #[test]
    fn delegates_to_existing_accessors() {
        let stored = Rc::new(RefCell::new(Value::from(1)));
        let read = stored.clone();
        let write = stored.clone();
        let obj = Object::new();
        obj.define_accessor(
            "x",
            Some(Rc::new(move || read.borrow().clone())),
            Some(Rc::new(move |v| *write.borrow_mut() = v)),
            true,
        );
        define_reactive(&obj, "x", None, None, false);
        let spy = Spy::watch(&obj, "x");

        obj.set("x", Value::from(5));
        assert_eq!(stored.borrow().as_f64(), Some(5.0));
        assert_eq!(obj.get("x").as_f64(), Some(5.0));
        assert_eq!(spy.hits.get(), 1);
    }

    #[test]
    fn getter_without_setter_ignores_writes() {
        let obj = Object::new();
        obj.define_accessor("x", Some(Rc::new(|| Value::from(1))), None, true);
        define_reactive(&obj, "x", None, None, false);
        let spy = Spy::watch(&obj, "x");

        obj.set("x", Value::from(2));
        assert_eq!(obj.get("x").as_f64(), Some(1.0));
        assert_eq!(spy.hits.get(), 0);
    }

    #[test]
    fn custom_setter_runs_before_store() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let obj = Object::new();
        define_reactive(
            &obj,
            "x",
            Some(Value::from(1)),
            Some(Rc::new(move |_: &Value| counter.set(counter.get() + 1))),
            false,
        );

        obj.set("x", Value::from(1));
        assert_eq!(calls.get(), 0);
        obj.set("x", Value::from(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn new_container_values_are_observed() {
        let obj = Object::new();
        define_reactive(&obj, "x", Some(Value::Null), None, false);

        let nested = Object::new();
        obj.set("x", Value::from(nested.clone()));
        assert!(nested.observer().is_some());
    }

    #[test]
    fn shallow_properties_skip_observation() {
        let nested = Object::new();
        let obj = Object::new();
        define_reactive(&obj, "x", Some(Value::from(nested.clone())), None, true);
        assert!(nested.observer().is_none());

        let replacement = Object::new();
        obj.set("x", Value::from(replacement.clone()));
        assert!(replacement.observer().is_none());
    }
}
