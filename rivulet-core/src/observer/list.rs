//! List Implementation
//!
//! Element access on a list cannot be intercepted the way object properties
//! can, so an observed list reports changes through the container-level dep
//! on its [`Observer`]. The mutating methods below are the only sanctioned
//! way to change a list: each one performs the mutation, observes any
//! inserted elements and then notifies that dep.
//!
//! Reading an element does not register a dependency by itself. Whoever
//! reads the list through a reactive property already depends on the
//! container dep (and on every observed element).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::observe::Observer;
use super::value::Value;

pub(crate) struct ListData {
    items: Vec<Value>,
    observer: Option<Observer>,
    extensible: bool,
    raw: bool,
}

/// A shared, mutable sequence of values.
///
/// Cloning a `List` yields another handle to the same sequence.
#[derive(Clone)]
pub struct List(Rc<RefCell<ListData>>);

impl List {
    /// Create an empty list.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ListData {
            items: Vec::new(),
            observer: None,
            extensible: true,
            raw: false,
        })))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    /// Element at `index`, or `Undefined` when out of bounds.
    pub fn get(&self, index: usize) -> Value {
        self.0.borrow().items.get(index).cloned().unwrap_or_default()
    }

    /// A shallow copy of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: Value) -> usize {
        let len = {
            let mut data = self.0.borrow_mut();
            data.items.push(value.clone());
            data.items.len()
        };
        self.changed(&[value]);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        let removed = self.0.borrow_mut().items.pop().unwrap_or_default();
        self.changed(&[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        let removed = {
            let mut data = self.0.borrow_mut();
            if data.items.is_empty() {
                Value::Undefined
            } else {
                data.items.remove(0)
            }
        };
        self.changed(&[]);
        removed
    }

    /// Prepend an element. Returns the new length.
    pub fn unshift(&self, value: Value) -> usize {
        let len = {
            let mut data = self.0.borrow_mut();
            data.items.insert(0, value.clone());
            data.items.len()
        };
        self.changed(&[value]);
        len
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `items` in their place. Returns the removed elements.
    ///
    /// `start` and `delete_count` are clamped to the list bounds.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let removed = {
            let mut data = self.0.borrow_mut();
            let start = start.min(data.items.len());
            let end = start.saturating_add(delete_count).min(data.items.len());
            let removed: Vec<Value> = data.items.splice(start..end, items.iter().cloned()).collect();
            removed
        };
        self.changed(&items);
        removed
    }

    /// Sort in place with a comparator.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        // Sort a copy so the comparator may read the list itself.
        let mut items = self.to_vec();
        items.sort_by(&mut compare);
        self.0.borrow_mut().items = items;
        self.changed(&[]);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.0.borrow_mut().items.reverse();
        self.changed(&[]);
    }

    /// Grow to at least `len` elements with `Undefined`, without notifying.
    pub(crate) fn pad_to(&self, len: usize) {
        let mut data = self.0.borrow_mut();
        if data.items.len() < len {
            data.items.resize(len, Value::Undefined);
        }
    }

    fn changed(&self, inserted: &[Value]) {
        let Some(observer) = self.observer() else {
            return;
        };
        observer.observe_items(inserted);
        observer.dep().notify();
    }

    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Exempt this list from observation.
    pub fn mark_raw(&self) {
        self.0.borrow_mut().raw = true;
    }

    pub fn is_raw(&self) -> bool {
        self.0.borrow().raw
    }

    /// The observer attached to this list, if it has been observed.
    pub fn observer(&self) -> Option<Observer> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Observer) {
        self.0.borrow_mut().observer = Some(observer);
    }

    /// Check whether two handles refer to the same list.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<RefCell<ListData>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<ListData>>) -> Self {
        Self(inner)
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let list = List::new();
        list.0.borrow_mut().items = iter.into_iter().collect();
        list
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("List")
            .field("len", &data.items.len())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(list: &List) -> Vec<f64> {
        list.to_vec().iter().filter_map(Value::as_f64).collect()
    }

    fn list_of(values: &[i32]) -> List {
        values.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let list = List::new();
        assert_eq!(list.push(Value::from(1)), 1);
        assert_eq!(list.push(Value::from(2)), 2);
        assert_eq!(list.unshift(Value::from(0)), 3);
        assert_eq!(numbers(&list), vec![0.0, 1.0, 2.0]);

        assert_eq!(list.pop().as_f64(), Some(2.0));
        assert_eq!(list.shift().as_f64(), Some(0.0));
        assert_eq!(numbers(&list), vec![1.0]);
    }

    #[test]
    fn pop_and_shift_on_empty_list() {
        let list = List::new();
        assert!(list.pop().is_undefined());
        assert!(list.shift().is_undefined());
    }

    #[test]
    fn splice_replaces_range() {
        let list = list_of(&[1, 2, 3, 4]);
        let removed = list.splice(1, 2, vec![Value::from(9)]);

        assert_eq!(removed.len(), 2);
        assert_eq!(numbers(&list), vec![1.0, 9.0, 4.0]);
    }

    #[test]
    fn splice_clamps_out_of_range() {
        let list = list_of(&[1, 2]);
        let removed = list.splice(10, 5, vec![Value::from(3)]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&list), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn sort_and_reverse() {
        let list = list_of(&[3, 1, 2]);
        list.sort_by(|a, b| {
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal)
        });
        assert_eq!(numbers(&list), vec![1.0, 2.0, 3.0]);

        list.reverse();
        assert_eq!(numbers(&list), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn pad_to_fills_with_undefined() {
        let list = list_of(&[1]);
        list.pad_to(3);
        assert_eq!(list.len(), 3);
        assert!(list.get(2).is_undefined());
    }
}
