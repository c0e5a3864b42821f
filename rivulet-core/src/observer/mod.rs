//! Observable State
//!
//! This module turns plain data into observable state.
//!
//! # Concepts
//!
//! ## Values
//!
//! State is built from [`Value`]s. [`Object`] and [`List`] are shared
//! containers; everything else is a scalar.
//!
//! ## Observers
//!
//! Observing a container attaches an [`Observer`] to it and installs a
//! reactive accessor on every property, recursively. Reads through an
//! accessor register the active watcher with the property's dep; writes
//! notify it.
//!
//! ## Shape Changes
//!
//! Adding or removing keys is invisible to per-property deps. [`set`] and
//! [`del`] perform those changes and notify the container's observer dep,
//! as do the mutating methods of [`List`].

mod list;
mod mutate;
mod object;
mod observe;
mod path;
mod property;
mod value;

pub use list::List;
pub use mutate::{del, set, PropKey};
pub use object::{Getter, Object, Setter};
pub use observe::{observe, should_observe, toggle_observing, Observer};
pub use path::Path;
pub use property::{define_reactive, CustomSetter};
pub use value::Value;
