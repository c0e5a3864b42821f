//! Integration Tests for the Reactive System
//!
//! These tests verify that observation, watchers and the scheduler work
//! together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rivulet_core::reactive::{Subscriber, SubscriberId, Watcher, WatcherOptions};
use rivulet_core::{
    config, del, flush_ticks, observe, set, List, Object, Scope, Value, WatchOptions, WatchSource,
};
use serde_json::json;

fn scope_with(name: &str, data: serde_json::Value) -> (Scope, Object) {
    let scope = Scope::new(name);
    let obj = Value::from(data).as_object().cloned().unwrap();
    scope.init_data(obj.clone());
    (scope, obj)
}

type Calls = Rc<RefCell<Vec<(Value, Value)>>>;

fn record(calls: &Calls) -> impl Fn(&Scope, &Value, &Value) -> rivulet_core::Result<()> {
    let calls = calls.clone();
    move |_, new, old| {
        calls.borrow_mut().push((new.clone(), old.clone()));
        Ok(())
    }
}

struct Spy {
    id: SubscriberId,
    hits: Cell<usize>,
}

impl Subscriber for Spy {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn update(self: Rc<Self>) {
        self.hits.set(self.hits.get() + 1);
    }
}

/// Test that observing a value twice yields the same observer.
#[test]
fn observation_is_idempotent() {
    let value = Value::from(json!({ "a": { "b": 1 } }));
    let first = observe(&value, false).unwrap();
    let second = observe(&value, false).unwrap();
    assert!(first.ptr_eq(&second));

    let nested = value.get("a");
    let nested_first = nested.observer().unwrap();
    observe(&value, false);
    assert!(nested_first.ptr_eq(&nested.observer().unwrap()));
}

/// Test that reactive properties read back what was written.
#[test]
fn reactive_read_write_round_trip() {
    let value = Value::from(json!({ "name": "ada", "age": 36 }));
    observe(&value, false);
    let obj = value.as_object().unwrap();

    obj.set("age", Value::from(37));
    assert_eq!(obj.get("age").as_f64(), Some(37.0));
    assert_eq!(value.to_json(), json!({ "name": "ada", "age": 37.0 }));
}

/// Test that a sync watch sees the new and the old value.
#[test]
fn sync_watch_reports_new_and_old() {
    let (scope, obj) = scope_with("sync", json!({ "a": 1 }));
    let calls: Calls = Rc::default();
    scope
        .watch(
            "a",
            record(&calls),
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

    obj.set("a", Value::from(5));

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_f64(), Some(5.0));
    assert_eq!(calls[0].1.as_f64(), Some(1.0));
}

/// Test that writing an equal value does not notify.
#[test]
fn unchanged_write_does_not_notify() {
    let value = Value::from(json!({ "a": 1 }));
    observe(&value, false);
    let obj = value.as_object().unwrap();
    let spy = Rc::new(Spy {
        id: SubscriberId::new(),
        hits: Cell::new(0),
    });
    obj.property_dep("a").unwrap().add_sub(&spy);

    obj.set("a", Value::from(1));
    assert_eq!(spy.hits.get(), 0);
}

/// Test that writing NaN over NaN counts as unchanged.
#[test]
fn nan_writes_notify_once() {
    let value = Value::from(json!({ "a": 0 }));
    observe(&value, false);
    let obj = value.as_object().unwrap();
    let spy = Rc::new(Spy {
        id: SubscriberId::new(),
        hits: Cell::new(0),
    });
    obj.property_dep("a").unwrap().add_sub(&spy);

    obj.set("a", Value::from(f64::NAN));
    obj.set("a", Value::from(f64::NAN));
    assert_eq!(spy.hits.get(), 1);
}

/// Test that a conditional computation drops dependencies it stopped reading.
#[test]
fn conditional_dependencies_are_pruned() {
    let (scope, obj) = scope_with("prune", json!({ "use_a": true, "a": 1, "b": 2 }));
    let calls: Calls = Rc::default();
    scope
        .watch(
            WatchSource::getter(|scope| {
                Ok(if scope.get("use_a").is_truthy() {
                    scope.get("a")
                } else {
                    scope.get("b")
                })
            }),
            record(&calls),
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

    obj.set("use_a", Value::from(false));
    assert_eq!(calls.borrow().len(), 1);

    // `a` is no longer read, so writing it is invisible.
    obj.set("a", Value::from(100));
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(obj.property_dep("a").unwrap().subscriber_count(), 0);

    obj.set("b", Value::from(3));
    assert_eq!(calls.borrow().len(), 2);
}

/// Test that several writes in one tick produce one callback.
#[test]
fn writes_are_batched_per_tick() {
    let (scope, obj) = scope_with("batch", json!({ "a": 0 }));
    let calls: Calls = Rc::default();
    scope.watch("a", record(&calls), WatchOptions::default()).unwrap();

    for n in 1..=10 {
        obj.set("a", Value::from(n));
    }
    assert!(calls.borrow().is_empty());

    flush_ticks();
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_f64(), Some(10.0));
    assert_eq!(calls[0].1.as_f64(), Some(0.0));
}

/// Test that queued watchers run in creation order.
#[test]
fn flush_runs_in_ascending_id_order() {
    let (scope, obj) = scope_with("order", json!({ "a": 0, "b": 0, "c": 0 }));
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut ids = Vec::new();
    for key in ["a", "b", "c"] {
        let order = order.clone();
        let watcher = scope
            .watch(
                key,
                move |_, _, _| {
                    order.borrow_mut().push(key);
                    Ok(())
                },
                WatchOptions::default(),
            )
            .unwrap();
        ids.push(watcher.id());
    }
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    obj.set("c", Value::from(1));
    obj.set("a", Value::from(1));
    obj.set("b", Value::from(1));
    flush_ticks();

    assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
}

/// Test that a torn-down watcher stops firing and leaves its scope.
#[test]
fn teardown_stops_callbacks() {
    let (scope, obj) = scope_with("teardown", json!({ "a": 0 }));
    let calls: Calls = Rc::default();
    let watcher = scope.watch("a", record(&calls), WatchOptions::default()).unwrap();
    assert!(scope.has_watcher(watcher.id()));

    watcher.teardown();
    obj.set("a", Value::from(1));
    flush_ticks();

    assert!(calls.borrow().is_empty());
    assert!(!scope.has_watcher(watcher.id()));
    assert!(!watcher.is_active());
}

/// Test that a deep watch fires on nested mutations.
#[test]
fn deep_watch_fires_on_nested_mutation() {
    let (scope, obj) = scope_with("deep", json!({ "user": { "address": { "city": "Paris" } } }));
    let calls: Calls = Rc::default();
    scope
        .watch(
            "user",
            record(&calls),
            WatchOptions {
                deep: true,
                ..Default::default()
            },
        )
        .unwrap();

    let address = obj.get("user").get("address");
    address.as_object().unwrap().set("city", Value::from("Lyon"));
    flush_ticks();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    // Same container on both sides: identity did not change.
    assert!(calls[0].0.strict_eq(&calls[0].1));
}

/// Test that a shallow watch on a container ignores nested mutations.
#[test]
fn shallow_watch_ignores_nested_mutation() {
    let (scope, obj) = scope_with("shallow", json!({ "user": { "name": "a" } }));
    let calls: Calls = Rc::default();
    scope.watch("user", record(&calls), WatchOptions::default()).unwrap();

    obj.get("user").as_object().unwrap().set("name", Value::from("b"));
    flush_ticks();
    assert!(calls.borrow().is_empty());
}

/// Test that a watcher returning a container fires even if its identity is
/// unchanged.
#[test]
fn container_results_always_fire() {
    let (scope, obj) = scope_with("container", json!({ "items": [1, 2] }));
    let calls: Calls = Rc::default();
    scope.watch("items", record(&calls), WatchOptions::default()).unwrap();

    let items = obj.get("items");
    items.as_list().unwrap().push(Value::from(3));
    flush_ticks();

    assert_eq!(calls.borrow().len(), 1);
}

/// Test that list mutators notify and observe inserted elements.
#[test]
fn list_mutations_notify_watchers() {
    let (scope, obj) = scope_with("lists", json!({ "items": [] }));
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let sink = lengths.clone();
    scope
        .watch(
            WatchSource::getter(|scope| Ok(scope.get("items").get("length"))),
            move |_, new, _| {
                sink.borrow_mut().push(new.as_f64());
                Ok(())
            },
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

    let items: List = obj.get("items").as_list().cloned().unwrap();
    let entry = Object::new();
    items.push(Value::from(entry.clone()));
    items.unshift(Value::from(0));
    items.pop();
    items.splice(0, 1, Vec::new());

    assert!(entry.observer().is_some());
    assert_eq!(*lengths.borrow(), vec![Some(1.0), Some(2.0), Some(1.0), Some(0.0)]);
}

/// Test that a watcher reading a list depends on the elements inside it.
#[test]
fn reading_a_list_depends_on_its_elements() {
    let (scope, obj) = scope_with("elements", json!({ "rows": [{ "cells": [] }] }));
    let calls: Calls = Rc::default();
    scope.watch("rows", record(&calls), WatchOptions::default()).unwrap();

    let row = obj.get("rows").get("0");
    set(&row, "extra", Value::from(true));
    flush_ticks();

    assert_eq!(calls.borrow().len(), 1);
}

/// Test that set and del trigger watchers of the containing object.
#[test]
fn set_and_del_notify_shape_watchers() {
    let (scope, obj) = scope_with("shape", json!({ "bag": {} }));
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let sink = sizes.clone();
    scope
        .watch(
            WatchSource::getter(|scope| {
                let bag = scope.get("bag");
                Ok(Value::from(bag.as_object().map(Object::len).unwrap_or_default()))
            }),
            move |_, new, _| {
                sink.borrow_mut().push(new.as_f64());
                Ok(())
            },
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

    let bag = obj.get("bag");
    set(&bag, "x", Value::from(1));
    set(&bag, "y", Value::from(2));
    del(&bag, "x");

    assert_eq!(*sizes.borrow(), vec![Some(1.0), Some(2.0), Some(1.0)]);
    assert!(bag.as_object().unwrap().is_reactive("y"));
}

/// Test that sync flushing sorts notifications by watcher id.
#[test]
fn synchronous_mode_runs_in_creation_order() {
    config::set_async(false);
    let (scope, obj) = scope_with("sync-mode", json!({ "gate": false, "a": 0 }));
    let order = Rc::new(RefCell::new(Vec::new()));

    // Created first, but only starts reading `a` once the gate opens.
    let early_log = order.clone();
    scope
        .watch(
            WatchSource::getter(|scope| {
                Ok(if scope.get("gate").is_truthy() {
                    scope.get("a")
                } else {
                    Value::Null
                })
            }),
            move |_, _, _| {
                early_log.borrow_mut().push("early");
                Ok(())
            },
            WatchOptions::default(),
        )
        .unwrap();
    let late_log = order.clone();
    scope
        .watch(
            "a",
            move |_, _, _| {
                late_log.borrow_mut().push("late");
                Ok(())
            },
            WatchOptions::default(),
        )
        .unwrap();

    obj.set("gate", Value::from(true));
    order.borrow_mut().clear();

    // The dep now lists `late` before `early`.
    obj.set("a", Value::from(1));
    assert_eq!(*order.borrow(), vec!["early", "late"]);
    config::reset();
}

/// Test that a lazy watcher only recomputes when read after a change.
#[test]
fn lazy_watchers_recompute_on_demand() {
    let (scope, obj) = scope_with("lazy", json!({ "a": 1 }));
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let watcher = Watcher::new(
        &scope,
        WatchSource::getter(move |scope| {
            counter.set(counter.get() + 1);
            Ok(scope.get("a"))
        }),
        None,
        WatcherOptions {
            lazy: true,
            ..Default::default()
        },
        false,
    )
    .unwrap();
    assert_eq!(runs.get(), 0);

    watcher.evaluate().unwrap();
    obj.set("a", Value::from(2));
    obj.set("a", Value::from(3));
    assert_eq!(runs.get(), 1);
    assert!(watcher.is_dirty());

    watcher.evaluate().unwrap();
    assert_eq!(watcher.value().as_f64(), Some(3.0));
    assert_eq!(runs.get(), 2);
}

/// Test a full mount / update / destroy cycle.
#[test]
fn render_watcher_patches_on_change() {
    let (scope, _) = scope_with("render", json!({ "todos": ["a"] }));
    let patches = Rc::new(RefCell::new(Vec::new()));
    let sink = patches.clone();
    scope
        .mount(
            |scope| {
                let todos = scope.get("todos");
                Ok(Value::from(format!("{} todos", todos.get("length"))))
            },
            move |_, new, _| {
                sink.borrow_mut().push(new.to_string());
                Ok(())
            },
        )
        .unwrap();

    let todos = scope.get("todos");
    todos.as_list().unwrap().push(Value::from("b"));
    todos.as_list().unwrap().push(Value::from("c"));
    flush_ticks();

    scope.destroy();
    todos.as_list().unwrap().push(Value::from("d"));
    flush_ticks();

    assert_eq!(*patches.borrow(), vec!["1 todos", "3 todos"]);
}
