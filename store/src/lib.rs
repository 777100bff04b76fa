//! # ferry_store
//!
//! Observable stores: dynamic [`Value`]s whose [`Object`] fields are tracked when read
//! inside a [`reaction`], and whose writes re-run those reactions.
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//! use ferry_store::{observable, reaction, Value};
//!
//! let store = observable(serde_json::json!({ "count": 1 }));
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let root = store.clone();
//! let disposer = reaction(move || root.get("count"), {
//!     let seen = seen.clone();
//!     move |count: Value| seen.set(count.as_number().unwrap_or_default())
//! });
//!
//! store.as_object().unwrap().set("count", 2);
//! assert_eq!(seen.get(), 2.0);
//!
//! disposer.dispose();
//! store.as_object().unwrap().set("count", 3);
//! assert_eq!(seen.get(), 2.0);
//! ```
//!
//! Tracking is provided by `ferry_reactive`: every field owns an `Atom`, and a
//! reaction is an updater effect living in its own scope.

mod convert;
mod function;
mod object;
mod reaction;
mod value;


pub use convert::observable;
pub use function::Function;
pub use object::{Object, ObjectId};
pub use reaction::{autorun, reaction, run_in_action, Disposer};
pub use value::Value;
