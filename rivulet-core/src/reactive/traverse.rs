//! Deep traversal for deep watchers.
//!
//! Reading every nested property while a watcher is active subscribes it to
//! every dep reachable from a value.

use std::collections::HashSet;

use crate::observer::Value;

/// Read every property reachable from `value`.
///
/// Each container is visited once, so cyclic structures terminate. Frozen
/// objects are skipped: they cannot change.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    visit(value, &mut seen);
}

fn visit(value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Object(obj) => {
            if obj.is_frozen() || !seen.insert(obj.addr()) {
                return;
            }
            for key in obj.keys() {
                visit(&obj.get(&key), seen);
            }
        }
        Value::List(list) => {
            if !seen.insert(list.addr()) {
                return;
            }
            for item in list.to_vec() {
                visit(&item, seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observe, Object};
    use crate::reactive::{ReactiveContext, Watcher, WatchSource, WatcherOptions};
    use crate::scope::Scope;
    use serde_json::json;

    #[test]
    fn cycles_terminate() {
        let obj = Object::new();
        obj.set("me", Value::from(obj.clone()));
        observe(&Value::from(obj.clone()), false);
        traverse(&Value::from(obj));
    }

    #[test]
    fn subscribes_to_nested_deps() {
        let scope = Scope::new("traverse");
        let data = Value::from(json!({ "a": { "b": { "c": 1 } } }));
        observe(&data, false);
        let probe = data.clone();
        let watcher = Watcher::new(
            &scope,
            WatchSource::getter(move |_| {
                traverse(&probe);
                Ok(Value::Null)
            }),
            None,
            WatcherOptions::default(),
            false,
        )
        .unwrap();

        let b = data.get("a").get("b");
        let c_dep = b.as_object().unwrap().property_dep("c").unwrap();
        assert!(watcher.depends_on(&c_dep));
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn frozen_objects_are_skipped() {
        let scope = Scope::new("traverse");
        let inner: Object = [("x", Value::from(1))].into_iter().collect();
        observe(&Value::from(inner.clone()), false);
        inner.freeze();
        let probe = Value::from(inner.clone());
        let watcher = Watcher::new(
            &scope,
            WatchSource::getter(move |_| {
                traverse(&probe);
                Ok(Value::Null)
            }),
            None,
            WatcherOptions::default(),
            false,
        )
        .unwrap();

        assert_eq!(watcher.dep_count(), 0);
    }
}
