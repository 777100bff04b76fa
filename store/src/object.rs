//! Observable objects.

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use ferry_reactive::{Atom, AtomHandle};
use indexmap::IndexMap;

use crate::{function::Function, value::Value};

/// Unique identifier for an observable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        ObjectId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type ComputedFn = Rc<dyn Fn(&Object) -> Value>;

enum Property {
    /// A plain field. Reading it tracks `atom`, changing it notifies `atom`.
    Data { value: Value, atom: Atom },
    /// A derived field evaluated on every read, so whatever it reads is tracked
    /// by the caller.
    Computed(ComputedFn),
}

struct ObjectInner {
    id: ObjectId,
    props: RefCell<IndexMap<String, Property>>,
    /// Notified when a field is added, so readers of a missing field see it appear.
    keys: Atom,
}

/// An observable object: reads of its fields inside a reaction are tracked and
/// writes re-run the reactions that read them.
///
/// `Object` is a cheap handle; clones share the same fields.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.inner.props.borrow();
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("keys", &props.keys().collect::<Vec<_>>())
            .finish()
    }
}

enum Read {
    Value(Value),
    Computed(ComputedFn),
    Missing,
}

enum Write {
    Unchanged,
    Changed(AtomHandle),
    Added,
    ReadOnly,
}

impl Object {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: ObjectId::next(),
                props: RefCell::new(IndexMap::new()),
                keys: Atom::new(),
            }),
        }
    }

    /// Builder form of [`Object::set`] that doesn't notify anyone.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_data(key.into(), value.into());
        self
    }

    /// Builder form of [`Object::define_computed`].
    pub fn with_computed(
        self,
        key: impl Into<String>,
        compute: impl Fn(&Object) -> Value + 'static,
    ) -> Self {
        self.inner
            .props
            .borrow_mut()
            .insert(key.into(), Property::Computed(Rc::new(compute)));
        self
    }

    /// Adds a method that runs as an action with this object as receiver.
    pub fn with_action(
        self,
        key: impl Into<String>,
        action: impl Fn(&Object, &[Value]) -> Value + 'static,
    ) -> Self {
        self.insert_data(key.into(), Value::Function(Function::method(action)));
        self
    }

    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn insert_data(&self, key: String, value: Value) {
        self.inner.props.borrow_mut().insert(
            key,
            Property::Data {
                value,
                atom: Atom::new(),
            },
        );
    }

    fn read(&self, key: &str, tracked: bool) -> Read {
        let props = self.inner.props.borrow();
        match props.get(key) {
            Some(Property::Data { value, atom }) => {
                if tracked {
                    atom.track();
                }
                Read::Value(value.clone())
            }
            Some(Property::Computed(compute)) => Read::Computed(compute.clone()),
            None => {
                if tracked {
                    self.inner.keys.track();
                }
                Read::Missing
            }
        }
    }

    /// Reads a field and subscribes the running reaction to it.
    ///
    /// A missing field reads as `Undefined`; the reaction is then re-run when the
    /// field is added. Unbound functions come back bound to this object.
    pub fn get(&self, key: &str) -> Value {
        match self.read(key, true) {
            Read::Value(value) => self.receive(value),
            Read::Computed(compute) => compute(self),
            Read::Missing => Value::Undefined,
        }
    }

    /// Reads a field without subscribing to it.
    pub fn get_untracked(&self, key: &str) -> Value {
        match self.read(key, false) {
            Read::Value(value) => self.receive(value),
            Read::Computed(compute) => ferry_reactive::untrack(|| compute(self)),
            Read::Missing => Value::Undefined,
        }
    }

    fn receive(&self, value: Value) -> Value {
        match value {
            Value::Function(function) if !function.is_bound() => {
                Value::Function(function.bind(Value::Object(self.clone())))
            }
            other => other,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        !matches!(self.read(key, true), Read::Missing)
    }

    /// Field names in insertion order. Tracks additions.
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys.track();
        self.inner.props.borrow().keys().cloned().collect()
    }

    /// Writes a field, notifying its readers when the value actually changed.
    ///
    /// Writing to a computed field is ignored.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let outcome = {
            let mut props = self.inner.props.borrow_mut();
            match props.get_mut(key) {
                Some(Property::Data { value: slot, atom }) => {
                    if *slot == value {
                        Write::Unchanged
                    } else {
                        *slot = value;
                        Write::Changed(atom.handle())
                    }
                }
                Some(Property::Computed(_)) => Write::ReadOnly,
                None => {
                    props.insert(
                        key.to_string(),
                        Property::Data {
                            value,
                            atom: Atom::new(),
                        },
                    );
                    Write::Added
                }
            }
        };

        match outcome {
            Write::Unchanged => {}
            Write::Changed(atom) => atom.notify(),
            Write::Added => self.inner.keys.notify(),
            Write::ReadOnly => {
                tracing::warn!(field = key, "ignoring write to a computed field");
            }
        }
    }

    /// Replaces a field by a computed one.
    pub fn define_computed(&self, key: &str, compute: impl Fn(&Object) -> Value + 'static) {
        let previous = self
            .inner
            .props
            .borrow_mut()
            .insert(key.to_string(), Property::Computed(Rc::new(compute)));
        match previous {
            Some(Property::Data { atom, .. }) => atom.notify(),
            Some(Property::Computed(_)) => {}
            None => self.inner.keys.notify(),
        }
    }

    /// Calls the function stored in `key` with this object as receiver.
    ///
    /// Returns `Undefined` when the field doesn't hold a function.
    pub fn call(&self, key: &str, args: &[Value]) -> Value {
        match self.get_untracked(key) {
            Value::Function(function) => {
                function.call_with(&Value::Object(self.clone()), args)
            }
            other => {
                tracing::warn!(
                    method = key,
                    found = other.type_name(),
                    "called a field that is not a function"
                );
                Value::Undefined
            }
        }
    }
}
