//! Dynamic Values
//!
//! Observable state is made of [`Value`]s. Scalars are stored inline;
//! [`Object`] and [`List`] are shared handles, so cloning a `Value` that
//! holds a container aliases the same container rather than copying it.
//!
//! Equality follows strict-identity rules: scalars compare by value (so
//! `NaN` is never equal to itself) and containers compare by identity.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};

use super::list::List;
use super::object::Object;
use super::observe::Observer;

/// A dynamically typed, possibly observable value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value; what a missing property reads as.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    List(List),
}

impl Value {
    /// Strict equality: scalars by value, containers by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether assigning `self` over `old` counts as no change.
    ///
    /// Strict equality, except that `NaN` over `NaN` is also unchanged.
    pub fn is_unchanged_from(&self, old: &Value) -> bool {
        self.strict_eq(old) || (self.is_nan() && old.is_nan())
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// Objects and lists. These may mutate in place without changing identity.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::List(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness: `false`, `0`, `NaN`, `""`, `Null` and `Undefined` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::List(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// The observer attached to this container, if any.
    pub fn observer(&self) -> Option<Observer> {
        match self {
            Value::Object(obj) => obj.observer(),
            Value::List(list) => list.observer(),
            _ => None,
        }
    }

    /// Read one key from this value.
    ///
    /// Objects read the named property (through its reactive accessor if
    /// installed). Lists accept a numeric index or `length`. Everything else
    /// reads as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::List(list) if key == "length" => Value::from(list.len()),
            Value::List(list) => key
                .parse::<usize>()
                .map(|index| list.get(index))
                .unwrap_or_default(),
            Value::String(s) if key == "length" => Value::from(s.chars().count()),
            _ => Value::Undefined,
        }
    }

    /// Snapshot this value as JSON.
    ///
    /// `Undefined` and non-finite numbers become `null`; a container already
    /// being serialized higher up the tree is cut to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut visiting = HashSet::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut HashSet<usize>) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Object(obj) => {
                if !visiting.insert(obj.addr()) {
                    return serde_json::Value::Null;
                }
                let map = obj
                    .keys()
                    .into_iter()
                    .map(|key| {
                        let value = obj.get(&key).to_json_inner(visiting);
                        (key, value)
                    })
                    .collect();
                visiting.remove(&obj.addr());
                serde_json::Value::Object(map)
            }
            Value::List(list) => {
                if !visiting.insert(list.addr()) {
                    return serde_json::Value::Null;
                }
                let items = list
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(visiting))
                    .collect();
                visiting.remove(&list.addr());
                serde_json::Value::Array(items)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(obj) => fmt::Debug::fmt(obj, f),
            Value::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object Object]"),
            Value::List(list) => write!(f, "[list; {}]", list.len()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nan_is_never_strictly_equal() {
        let nan = Value::from(f64::NAN);
        assert!(!nan.strict_eq(&nan));
        assert!(nan.is_unchanged_from(&Value::from(f64::NAN)));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Object::new();
        let b = Object::new();
        assert!(Value::from(a.clone()).strict_eq(&Value::from(a.clone())));
        assert!(!Value::from(a).strict_eq(&Value::from(b)));
    }

    #[test]
    fn mixed_kinds_are_unequal() {
        assert!(!Value::from(1).strict_eq(&Value::from("1")));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(Value::from(List::new()).is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn key_access_on_lists() {
        let list: List = vec![Value::from(1), Value::from(2)].into_iter().collect();
        let value = Value::from(list);
        assert_eq!(value.get("length").as_f64(), Some(2.0));
        assert_eq!(value.get("1").as_f64(), Some(2.0));
        assert!(value.get("5").is_undefined());
        assert!(value.get("nope").is_undefined());
    }

    #[test]
    fn json_conversion() {
        let source = json!({ "name": "ada", "tags": ["a", "b"], "nested": { "n": 1.5 } });
        let value = Value::from(source.clone());

        assert_eq!(value.get("name").as_str(), Some("ada"));
        assert_eq!(value.get("tags").get("length").as_f64(), Some(2.0));
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn json_snapshot_cuts_cycles() {
        let obj = Object::new();
        obj.set("me", Value::from(obj.clone()));
        assert_eq!(Value::from(obj).to_json(), json!({ "me": null }));
    }
}
