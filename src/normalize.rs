//! Turns declarations into binding and action descriptors.

use std::{fmt, rc::Rc};

use ferry_store::{Function, Value};
use indexmap::IndexMap;

use crate::{
    declaration::{Accessor, ActionField, Mutator, StateField},
    instance::{Instance, WeakInstance},
    path::{parent_of, resolve, resolve_or},
};

/// A normalized state binding.
///
/// `get` performs reads the store can track. `set`, when present, writes
/// through the store.
#[derive(Clone)]
pub struct BindingDescriptor {
    pub key: String,
    pub get: Rc<dyn Fn() -> Value>,
    pub set: Option<Rc<dyn Fn(Value)>>,
}

impl fmt::Debug for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("key", &self.key)
            .field("writable", &self.set.is_some())
            .finish()
    }
}

/// A normalized action: a function with its receiver already fixed.
#[derive(Clone, Debug)]
pub struct ActionDescriptor {
    pub key: String,
    pub method: Function,
}

/// Folds declaration maps in order; a later map replaces the entries of earlier
/// ones with the same key.
pub fn merge<F>(sources: impl IntoIterator<Item = IndexMap<String, F>>) -> IndexMap<String, F> {
    sources
        .into_iter()
        .fold(IndexMap::new(), |mut merged, source| {
            merged.extend(source);
            merged
        })
}

/// [`merge`] of the native sources, then the compatibility entries for the keys
/// no native source declares.
pub fn merge_with_compat<F>(
    native: impl IntoIterator<Item = IndexMap<String, F>>,
    compat: Option<IndexMap<String, F>>,
) -> IndexMap<String, F> {
    let mut merged = merge(native);
    for (key, field) in compat.into_iter().flatten() {
        merged.entry(key).or_insert(field);
    }
    merged
}

pub fn normalize_state(
    entries: IndexMap<String, StateField>,
    instance: &Instance,
    store: &Value,
) -> Vec<BindingDescriptor> {
    entries
        .into_iter()
        .filter_map(|(key, field)| {
            let (get, set) = match field {
                StateField::Path(path) => (read_path(store, path), None),
                StateField::Getter(getter) => {
                    (read_with(instance.downgrade(), store, getter), None)
                }
                StateField::Descriptor { get, set } => {
                    let get = match get {
                        Accessor::Path(path) => read_path(store, path),
                        Accessor::Function(getter) => {
                            read_with(instance.downgrade(), store, getter)
                        }
                    };
                    let set = set.map(|set| match set {
                        Mutator::Path(path) => write_path(store, path),
                        Mutator::Function(setter) => {
                            write_with(instance.downgrade(), store, setter)
                        }
                    });
                    (get, set)
                }
                StateField::Unrecognized => {
                    tracing::warn!(key, "ignoring unrecognized state binding");
                    return None;
                }
            };
            Some(BindingDescriptor { key, get, set })
        })
        .collect()
}

pub fn normalize_actions(
    entries: IndexMap<String, ActionField>,
    instance: &Instance,
    store: &Value,
) -> Vec<ActionDescriptor> {
    entries
        .into_iter()
        .filter_map(|(key, field)| {
            let method = match field {
                ActionField::Path(path) => match resolve(store, Some(&path)) {
                    Some(Value::Function(function)) => function.bind(parent_of(store, &path)),
                    other => {
                        tracing::warn!(
                            key,
                            path,
                            found = other.as_ref().map_or("nothing", |value| value.type_name()),
                            "action path does not lead to a function"
                        );
                        return None;
                    }
                },
                ActionField::Factory(factory) => match factory(instance, store) {
                    Value::Function(function) => function.bind(store.clone()),
                    other => {
                        tracing::warn!(
                            key,
                            found = other.type_name(),
                            "action factory did not return a function"
                        );
                        return None;
                    }
                },
                ActionField::Unrecognized => {
                    tracing::warn!(key, "ignoring unrecognized action binding");
                    return None;
                }
            };
            Some(ActionDescriptor { key, method })
        })
        .collect()
}

fn read_path(store: &Value, path: String) -> Rc<dyn Fn() -> Value> {
    let store = store.clone();
    Rc::new(move || resolve_or(&store, &path, Value::Undefined))
}

fn read_with(
    instance: WeakInstance,
    store: &Value,
    getter: Rc<dyn Fn(&Instance, &Value) -> Value>,
) -> Rc<dyn Fn() -> Value> {
    let store = store.clone();
    Rc::new(move || {
        instance
            .upgrade()
            .map(|instance| getter(&instance, &store))
            .unwrap_or_default()
    })
}

fn write_path(store: &Value, path: String) -> Rc<dyn Fn(Value)> {
    let store = store.clone();
    Rc::new(move |value| {
        ferry_reactive::untrack(|| match resolve(&store, Some(&path)) {
            Some(Value::Function(setter)) => {
                setter.call_with(&parent_of(&store, &path), &[value, store.clone()]);
            }
            _ => tracing::warn!(path, "setter path does not lead to a function"),
        })
    })
}

fn write_with(
    instance: WeakInstance,
    store: &Value,
    setter: Rc<dyn Fn(&Instance, Value, &Value)>,
) -> Rc<dyn Fn(Value)> {
    let store = store.clone();
    Rc::new(move |value| {
        if let Some(instance) = instance.upgrade() {
            setter(&instance, value, &store);
        }
    })
}

#[cfg(test)]
mod tests {
    use ferry_store::{observable, Object};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::{
        component::ComponentOptions,
        declaration::{ActionDeclaration, StateDeclaration},
        host::Host,
    };

    fn instance() -> Instance {
        Host::new().mount(ComponentOptions::new().data("bar", 2))
    }

    fn counter() -> Value {
        Value::Object(
            Object::new()
                .with("num", 0)
                .with_action("setNum", |this, args| {
                    this.set("num", args.first().cloned().unwrap_or_default());
                    Value::Undefined
                }),
        )
    }

    #[test]
    fn every_shape_reads_through_the_store() {
        let vm = instance();
        let store = observable(json!({ "a": { "b": 1 }, "foo": 10 }));
        let declaration = StateDeclaration::list(["a.b"])
            .path("foo", "foo")
            .getter("sum", |vm, store| {
                let foo = store.get("foo").as_number().unwrap_or_default();
                let bar = vm.get("bar").as_number().unwrap_or_default();
                Value::Number(foo + bar)
            })
            .field(
                "described",
                StateField::Descriptor {
                    get: Accessor::Path("a.b".into()),
                    set: None,
                },
            )
            .field("junk", StateField::Unrecognized);

        let bindings = normalize_state(declaration.into_entries(), &vm, &store);
        let values: Vec<_> = bindings
            .iter()
            .map(|binding| (binding.key.as_str(), (binding.get)(), binding.set.is_some()))
            .collect();
        assert_eq!(
            values,
            [
                ("b", Value::from(1), false),
                ("foo", Value::from(10), false),
                ("sum", Value::from(12), false),
                ("described", Value::from(1), false),
            ]
        );
    }

    #[test]
    fn setter_paths_call_on_the_parent_object() {
        let vm = instance();
        let store = Value::Object(Object::new().with("counter", counter()));
        let declaration = StateDeclaration::map().descriptor("num", "counter.num", "counter.setNum");

        let bindings = normalize_state(declaration.into_entries(), &vm, &store);
        let set = bindings[0].set.clone().unwrap();
        set(Value::from(7));

        assert_eq!((bindings[0].get)(), Value::from(7));
        assert_eq!(store.get("num"), Value::Undefined);
    }

    #[test]
    fn setter_functions_receive_instance_and_store() {
        let vm = instance();
        let store = counter();
        let declaration = StateDeclaration::map().descriptor(
            "plusBar",
            Accessor::function(|vm, store| {
                let num = store.get("num").as_number().unwrap_or_default();
                Value::Number(num + vm.get("bar").as_number().unwrap_or_default())
            }),
            Mutator::function(|vm, value, store| {
                let bar = vm.get("bar").as_number().unwrap_or_default();
                let num = value.as_number().unwrap_or_default() - bar;
                store.as_object().unwrap().call("setNum", &[num.into()]);
            }),
        );

        let bindings = normalize_state(declaration.into_entries(), &vm, &store);
        (bindings[0].set.as_ref().unwrap())(Value::from(10));
        assert_eq!(store.get("num"), Value::from(8));
        assert_eq!((bindings[0].get)(), Value::from(10));
    }

    #[test]
    fn nested_action_paths_bind_to_their_parent() {
        let vm = instance();
        let c = Object::new().with_action("setValue", |this, args| {
            this.set("x", args[0].clone());
            Value::Undefined
        });
        let store = Value::Object(Object::new().with(
            "a",
            Object::new().with("b", Object::new().with("c", c.clone())),
        ));

        let actions = normalize_actions(
            ActionDeclaration::list(["a.b.c.setValue"]).into_entries(),
            &vm,
            &store,
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].key, "setValue");

        actions[0].method.call(&[5.into()]);
        assert_eq!(c.get_untracked("x"), Value::from(5));
        assert_eq!(store.get("x"), Value::Undefined);
    }

    #[test]
    fn bad_actions_are_skipped() {
        let vm = instance();
        let store = counter();
        let declaration = ActionDeclaration::map()
            .path("setNum", "setNum")
            .path("notAFunction", "num")
            .path("missing", "nowhere.setNum")
            .factory("notReturningAFunction", |_, _| Value::from(1))
            .factory("plain", |_, store| store.get("setNum"))
            .field("junk", ActionField::Unrecognized);

        let keys: Vec<_> = normalize_actions(declaration.into_entries(), &vm, &store)
            .into_iter()
            .map(|action| action.key)
            .collect();
        assert_eq!(keys, ["setNum", "plain"]);
    }

    #[test]
    fn native_beats_compat_on_the_same_key() {
        let native = IndexMap::from([("num".to_string(), 1), ("plus".to_string(), 2)]);
        let compat = IndexMap::from([("num".to_string(), 10), ("reset".to_string(), 30)]);
        let merged = merge_with_compat([native], Some(compat));
        assert_eq!(
            merged.into_iter().collect::<Vec<_>>(),
            [
                ("num".to_string(), 1),
                ("plus".to_string(), 2),
                ("reset".to_string(), 30),
            ]
        );
    }

    fn declarations() -> impl Strategy<Value = IndexMap<String, u8>> {
        prop::collection::vec(("[a-d]", any::<u8>()), 0..6)
            .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        #[test]
        fn later_sources_win(ancestor in declarations(), own in declarations()) {
            let merged = merge([ancestor.clone(), own.clone()]);
            for (key, value) in &merged {
                let expected = own.get(key).or_else(|| ancestor.get(key));
                prop_assert_eq!(Some(value), expected);
            }
            prop_assert_eq!(
                merged.len(),
                ancestor.keys().chain(own.keys()).collect::<std::collections::HashSet<_>>().len()
            );
        }

        #[test]
        fn compat_only_fills_gaps(native in declarations(), compat in declarations()) {
            let merged = merge_with_compat([native.clone()], Some(compat.clone()));
            for (key, value) in &merged {
                let expected = native.get(key).or_else(|| compat.get(key));
                prop_assert_eq!(Some(value), expected);
            }
        }
    }
}
