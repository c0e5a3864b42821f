//! Object Implementation
//!
//! An [`Object`] is an insertion-ordered map of property slots. A slot is
//! either plain data, a user accessor (getter and/or setter), or a reactive
//! accessor installed by [`define_reactive`](super::define_reactive).
//!
//! Reading and assigning go through [`Object::get`] and [`Object::set`].
//! Those behave like ordinary property access: assigning a key that does not
//! exist yet adds a plain, non-reactive slot. Use [`set`](super::set) to add
//! a property that should be reactive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::observe::Observer;
use super::property::ReactiveProperty;
use super::value::Value;
use crate::reactive::Dep;

/// User-supplied property getter.
pub type Getter = Rc<dyn Fn() -> Value>;

/// User-supplied property setter.
pub type Setter = Rc<dyn Fn(Value)>;

#[derive(Clone)]
pub(crate) enum SlotKind {
    Data { value: Value, writable: bool },
    Accessor { get: Option<Getter>, set: Option<Setter> },
    Reactive(Rc<ReactiveProperty>),
}

#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) kind: SlotKind,
    pub(crate) configurable: bool,
}

pub(crate) struct ObjectData {
    props: IndexMap<String, Slot>,
    observer: Option<Observer>,
    extensible: bool,
    frozen: bool,
    raw: bool,
}

/// A shared, mutable map of properties.
///
/// Cloning an `Object` yields another handle to the same map.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// Create an empty, extensible object.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            props: IndexMap::new(),
            observer: None,
            extensible: true,
            frozen: false,
            raw: false,
        })))
    }

    /// Read a property.
    ///
    /// Reactive properties register a dependency with the active watcher.
    /// Missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        // Clone the slot out so accessors can re-enter this object.
        let kind = self.0.borrow().props.get(key).map(|slot| slot.kind.clone());
        match kind {
            None => Value::Undefined,
            Some(SlotKind::Data { value, .. }) => value,
            Some(SlotKind::Accessor { get, .. }) => get.map(|get| get()).unwrap_or_default(),
            Some(SlotKind::Reactive(prop)) => prop.get(),
        }
    }

    /// Assign a property.
    ///
    /// Reactive properties notify their watchers. Assigning a missing key
    /// adds a plain data slot when the object is extensible; read-only slots
    /// and accessors without a setter ignore the assignment.
    pub fn set(&self, key: &str, value: Value) {
        let kind = self.0.borrow().props.get(key).map(|slot| slot.kind.clone());
        match kind {
            None => {
                let mut data = self.0.borrow_mut();
                if data.extensible {
                    data.props.insert(
                        key.to_string(),
                        Slot {
                            kind: SlotKind::Data {
                                value,
                                writable: true,
                            },
                            configurable: true,
                        },
                    );
                }
            }
            Some(SlotKind::Data { writable, .. }) => {
                if writable {
                    if let Some(slot) = self.0.borrow_mut().props.get_mut(key) {
                        slot.kind = SlotKind::Data {
                            value,
                            writable: true,
                        };
                    }
                }
            }
            Some(SlotKind::Accessor { set, .. }) => {
                if let Some(set) = set {
                    set(value);
                }
            }
            Some(SlotKind::Reactive(prop)) => prop.set(value),
        }
    }

    /// Define a plain data property, replacing any configurable slot.
    ///
    /// Returns `false` if the slot exists but is not configurable, or the key
    /// is new and the object is not extensible.
    pub fn define_data(&self, key: &str, value: Value, configurable: bool) -> bool {
        self.define_slot(
            key,
            Slot {
                kind: SlotKind::Data {
                    value,
                    writable: true,
                },
                configurable,
            },
        )
    }

    /// Define an accessor property, replacing any configurable slot.
    pub fn define_accessor(
        &self,
        key: &str,
        get: Option<Getter>,
        set: Option<Setter>,
        configurable: bool,
    ) -> bool {
        self.define_slot(
            key,
            Slot {
                kind: SlotKind::Accessor { get, set },
                configurable,
            },
        )
    }

    pub(crate) fn define_slot(&self, key: &str, slot: Slot) -> bool {
        let mut data = self.0.borrow_mut();
        let allowed = match data.props.get(key) {
            Some(existing) => existing.configurable,
            None => data.extensible,
        };
        if allowed {
            data.props.insert(key.to_string(), slot);
        }
        allowed
    }

    /// A clone of the slot stored under `key`.
    pub(crate) fn slot(&self, key: &str) -> Option<Slot> {
        self.0.borrow().props.get(key).cloned()
    }

    /// Delete a property. Non-configurable properties are kept.
    ///
    /// Returns `true` if the key is absent afterwards.
    pub fn remove(&self, key: &str) -> bool {
        let mut data = self.0.borrow_mut();
        let removable = match data.props.get(key) {
            None => return true,
            Some(slot) => slot.configurable,
        };
        if removable {
            data.props.shift_remove(key);
        }
        removable
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().props.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().props.is_empty()
    }

    /// Forbid adding new properties. Such objects are never observed.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Make every slot non-configurable and every data slot read-only.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        data.extensible = false;
        data.frozen = true;
        for slot in data.props.values_mut() {
            slot.configurable = false;
            if let SlotKind::Data { writable, .. } = &mut slot.kind {
                *writable = false;
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    /// Exempt this object from observation.
    pub fn mark_raw(&self) {
        self.0.borrow_mut().raw = true;
    }

    pub fn is_raw(&self) -> bool {
        self.0.borrow().raw
    }

    /// The observer attached to this object, if it has been observed.
    pub fn observer(&self) -> Option<Observer> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Observer) {
        self.0.borrow_mut().observer = Some(observer);
    }

    /// The dep owned by the reactive accessor on `key`, if one is installed.
    pub fn property_dep(&self, key: &str) -> Option<Dep> {
        match self.0.borrow().props.get(key).map(|slot| &slot.kind) {
            Some(SlotKind::Reactive(prop)) => Some(prop.dep().clone()),
            _ => None,
        }
    }

    /// Whether `key` carries a reactive accessor.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(
            self.0.borrow().props.get(key).map(|slot| &slot.kind),
            Some(SlotKind::Reactive(_))
        )
    }

    /// Check whether two handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<RefCell<ObjectData>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<ObjectData>>) -> Self {
        Self(inner)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let obj = Object::new();
        for (key, value) in iter {
            let key: String = key.into();
            obj.set(&key, value);
        }
        obj
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only keys: values may point back at this object.
        let data = self.0.borrow();
        f.debug_struct("Object")
            .field("keys", &data.props.keys().collect::<Vec<_>>())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}
