//! Which store an instance binds against.

use std::{cell::OnceCell, fmt, rc::Rc};

use ferry_store::{Object, Value};

use crate::{instance::Instance, source::SourceSystem};

/// Instance property holding the resolved store.
pub const STORE_PROPERTY: &str = "$store";

/// Plain data, wrapped into an observable root the first time it is needed.
pub struct PlainStore {
    data: serde_json::Value,
    root: OnceCell<Value>,
}

impl PlainStore {
    fn root(&self, source: &dyn SourceSystem) -> Value {
        self.root
            .get_or_init(|| source.observable(self.data.clone()))
            .clone()
    }
}

/// A store as declared by a component or given to the plugin.
#[derive(Clone)]
pub enum StoreOption {
    /// An already observable value, shared as is.
    Observable(Value),
    /// Plain data. Every instance resolving to the same option shares a single
    /// observable root.
    Plain(Rc<PlainStore>),
    /// Produces the store when an instance is created. Yielding `None` falls
    /// back to the default store.
    Factory(Rc<dyn Fn() -> Option<StoreOption>>),
}

impl StoreOption {
    pub fn plain(data: serde_json::Value) -> Self {
        StoreOption::Plain(Rc::new(PlainStore {
            data,
            root: OnceCell::new(),
        }))
    }

    pub fn factory(f: impl Fn() -> Option<StoreOption> + 'static) -> Self {
        StoreOption::Factory(Rc::new(f))
    }

    /// The observable root, or `None` if a factory produced nothing.
    pub fn resolve(&self, source: &dyn SourceSystem) -> Option<Value> {
        match self {
            StoreOption::Observable(value) => Some(value.clone()),
            StoreOption::Plain(plain) => Some(plain.root(source)),
            StoreOption::Factory(factory) => factory()?.resolve(source),
        }
    }
}

impl fmt::Debug for StoreOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOption::Observable(value) => f.debug_tuple("Observable").field(value).finish(),
            StoreOption::Plain(plain) => f
                .debug_struct("Plain")
                .field("wrapped", &plain.root.get().is_some())
                .finish(),
            StoreOption::Factory(_) => f.write_str("Factory"),
        }
    }
}

impl From<Value> for StoreOption {
    fn from(value: Value) -> Self {
        StoreOption::Observable(value)
    }
}

impl From<Object> for StoreOption {
    fn from(object: Object) -> Self {
        StoreOption::Observable(Value::Object(object))
    }
}

impl From<serde_json::Value> for StoreOption {
    fn from(data: serde_json::Value) -> Self {
        StoreOption::plain(data)
    }
}

/// Resolves the store for `instance`: its own store option, else its parent's
/// store, else `default`. The first one present wins.
pub fn resolve_store(
    instance: &Instance,
    own: Option<&StoreOption>,
    default: Option<&StoreOption>,
    source: &dyn SourceSystem,
) -> Option<Value> {
    if let Some(own) = own {
        // a factory yielding nothing falls back to the default, not to the parent
        return own
            .resolve(source)
            .or_else(|| default?.resolve(source));
    }
    instance
        .parent()
        .and_then(|parent| parent.property(STORE_PROPERTY))
        .or_else(|| default?.resolve(source))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{component::ComponentOptions, host::Host, source::ObservableStore};

    #[test]
    fn plain_data_is_wrapped_once() {
        let option = StoreOption::plain(json!({ "count": 1 }));
        let first = option.resolve(&ObservableStore).unwrap();
        let second = option.clone().resolve(&ObservableStore).unwrap();
        assert!(first.as_object().is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn own_then_parent_then_default() {
        let host = Host::new();
        let parent = host.mount(ComponentOptions::new());
        let child = host.mount_child(&parent, ComponentOptions::new());
        let own = StoreOption::from(Object::new().with("who", "own"));
        let default = StoreOption::from(Object::new().with("who", "default"));
        let who = |store: Option<Value>| store.map(|store| store.get("who"));

        assert_eq!(
            who(resolve_store(&child, Some(&own), Some(&default), &ObservableStore)),
            Some(Value::from("own"))
        );
        assert_eq!(
            who(resolve_store(&child, None, Some(&default), &ObservableStore)),
            Some(Value::from("default"))
        );

        parent.set_property(
            STORE_PROPERTY,
            Value::Object(Object::new().with("who", "parent")),
        );
        assert_eq!(
            who(resolve_store(&child, None, Some(&default), &ObservableStore)),
            Some(Value::from("parent"))
        );
        assert_eq!(resolve_store(&parent, None, None, &ObservableStore), None);
    }

    #[test]
    fn empty_factory_falls_back_to_default() {
        let host = Host::new();
        let vm = host.mount(ComponentOptions::new());
        let factory = StoreOption::factory(|| None);
        let default = StoreOption::from(Object::new().with("who", "default"));

        let store = resolve_store(&vm, Some(&factory), Some(&default), &ObservableStore);
        assert_eq!(store.map(|store| store.get("who")), Some(Value::from("default")));

        let fresh = StoreOption::factory(|| Some(json!({ "who": "made" }).into()));
        let store = resolve_store(&vm, Some(&fresh), Some(&default), &ObservableStore);
        assert_eq!(store.map(|store| store.get("who")), Some(Value::from("made")));
    }
}
