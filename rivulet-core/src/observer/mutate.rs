//! Adding and deleting reactive properties.
//!
//! Property accessors only exist for keys that were present when an object
//! was observed, so adding a key with a plain assignment goes unnoticed.
//! [`set`] and [`del`] change the shape of an observed container and notify
//! its observer dep.

use std::fmt;

use super::property::define_reactive;
use super::value::Value;
use crate::error::warn;

/// A property key: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    Name(String),
    Index(usize),
}

impl PropKey {
    /// The key as a list index, if it is one.
    ///
    /// Names made of decimal digits count as indices too.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PropKey::Index(index) => Some(*index),
            PropKey::Name(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Name(name) => f.write_str(name),
            PropKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(name.to_string())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(name)
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

/// Set a property, adding it reactively if it does not exist yet.
///
/// Returns `value`.
pub fn set(target: &Value, key: impl Into<PropKey>, value: Value) -> Value {
    let key = key.into();
    match target {
        Value::List(list) => match key.as_index() {
            Some(index) => {
                list.pad_to(index);
                list.splice(index, 1, vec![value.clone()]);
            }
            None => warn(
                &format!("Cannot set non-index key \"{key}\" on a list"),
                None,
            ),
        },
        Value::Object(obj) => {
            let name = key.to_string();
            if obj.has(&name) {
                obj.set(&name, value.clone());
                return value;
            }
            let observer = obj.observer();
            if observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                warn(
                    "Avoid adding reactive properties to a scope's root data at runtime - \
                     declare it upfront in the data option.",
                    None,
                );
                return value;
            }
            match observer {
                None => obj.set(&name, value.clone()),
                Some(observer) => {
                    define_reactive(obj, &name, Some(value.clone()), None, false);
                    observer.dep().notify();
                }
            }
        }
        _ => warn(
            &format!("Cannot set reactive property on undefined, null, or primitive value: {target}"),
            None,
        ),
    }
    value
}

/// Delete a property and notify if the container is observed.
pub fn del(target: &Value, key: impl Into<PropKey>) {
    let key = key.into();
    match target {
        Value::List(list) => {
            if let Some(index) = key.as_index() {
                list.splice(index, 1, Vec::new());
            }
        }
        Value::Object(obj) => {
            let name = key.to_string();
            let observer = obj.observer();
            if observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                warn(
                    "Avoid deleting properties on a scope's root data - just set it to null.",
                    None,
                );
                return;
            }
            if !obj.has(&name) || !obj.remove(&name) {
                return;
            }
            if let Some(observer) = observer {
                observer.dep().notify();
            }
        }
        _ => warn(
            &format!(
                "Cannot delete reactive property on undefined, null, or primitive value: {target}"
            ),
            None,
        ),
    }
}
