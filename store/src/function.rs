use std::{fmt, rc::Rc};

use crate::{object::Object, value::Value};

type Callable = dyn Fn(&Value, &[Value]) -> Value;

/// A callable stored in a store, optionally bound to a receiver.
///
/// The receiver plays the role of `this`: methods declared with
/// [`Function::method`] read and write fields of the object they are called on.
#[derive(Clone)]
pub struct Function {
    call: Rc<Callable>,
    receiver: Option<Rc<Value>>,
    action: bool,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("bound", &self.receiver.is_some())
            .field("action", &self.action)
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.call), Rc::as_ptr(&other.call))
            && self.receiver == other.receiver
    }
}

impl Function {
    /// A plain function receiving `(receiver, args)`.
    pub fn new(f: impl Fn(&Value, &[Value]) -> Value + 'static) -> Self {
        Self {
            call: Rc::new(f),
            receiver: None,
            action: false,
        }
    }

    /// Like [`Function::new`], but every call is batched: reactions observe the
    /// writes made by the call only once it returns.
    pub fn action(f: impl Fn(&Value, &[Value]) -> Value + 'static) -> Self {
        Self {
            action: true,
            ..Self::new(f)
        }
    }

    /// An action whose receiver must be an object. Called with any other
    /// receiver it does nothing and returns `Undefined`.
    pub fn method(f: impl Fn(&Object, &[Value]) -> Value + 'static) -> Self {
        Self::action(move |receiver, args| match receiver {
            Value::Object(object) => f(object, args),
            other => {
                tracing::warn!(receiver = other.type_name(), "method called without an object receiver");
                Value::Undefined
            }
        })
    }

    /// Fix the receiver. Binding an already bound function keeps the first receiver.
    pub fn bind(&self, receiver: Value) -> Function {
        if self.receiver.is_some() {
            return self.clone();
        }
        Function {
            call: self.call.clone(),
            receiver: Some(Rc::new(receiver)),
            action: self.action,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    /// Call with the bound receiver, or `Undefined` as receiver when unbound.
    pub fn call(&self, args: &[Value]) -> Value {
        self.call_with(&Value::Undefined, args)
    }

    /// Call with `receiver`, unless the function is already bound.
    pub fn call_with(&self, receiver: &Value, args: &[Value]) -> Value {
        let receiver = self.receiver.as_deref().unwrap_or(receiver);
        if self.action {
            ferry_reactive::batch(|| (self.call)(receiver, args))
        } else {
            (self.call)(receiver, args)
        }
    }
}
