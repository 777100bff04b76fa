//! Helpers binding declarations to an explicit store instead of the instance's.

use std::rc::Rc;

use ferry_store::Value;

use crate::{
    component::MethodEntry,
    instance::Instance,
    declaration::{
        Accessor, ActionDeclaration, ActionField, GetterFn, Mutator, SetterFn, StateDeclaration,
        StateField,
    },
    path::{parent_of, resolve, resolve_or},
    source::{ObservableStore, SourceSystem},
};

/// Rewrites `fields` so every getter and setter works on `store`, whatever store
/// the instance using them resolves. The result is meant for
/// `with_map_state`, on its own or merged with other declarations.
pub fn map_fields(store: &Value, fields: StateDeclaration) -> StateDeclaration {
    fields
        .into_entries()
        .into_iter()
        .fold(StateDeclaration::map(), |declaration, (key, field)| {
            let field = match field {
                StateField::Path(path) => StateField::Getter(read_from(store, Accessor::Path(path))),
                StateField::Getter(getter) => {
                    StateField::Getter(read_from(store, Accessor::Function(getter)))
                }
                StateField::Descriptor { get, set } => StateField::Descriptor {
                    get: Accessor::Function(read_from(store, get)),
                    set: set.map(|set| Mutator::Function(write_to(store, set))),
                },
                StateField::Unrecognized => StateField::Unrecognized,
            };
            declaration.field(key, field)
        })
}

/// Methods of `store` as `methods` entries, each bound to the object it lives
/// on. Paths that don't lead to a function are skipped.
pub fn map_methods(store: &Value, methods: ActionDeclaration) -> Vec<(String, MethodEntry)> {
    methods
        .into_entries()
        .into_iter()
        .filter_map(|(key, field)| {
            let function = match field {
                ActionField::Path(path) => match resolve(store, Some(&path)) {
                    Some(Value::Function(function)) => function.bind(parent_of(store, &path)),
                    _ => {
                        tracing::warn!(key, path, "mapped method does not exist on the store");
                        return None;
                    }
                },
                ActionField::Factory(_) | ActionField::Unrecognized => {
                    tracing::warn!(key, "only store paths can be mapped to methods");
                    return None;
                }
            };
            Some((key, MethodEntry::method(move |_, args| function.call(args))))
        })
        .collect()
}

/// Wraps plain data into an observable store.
pub fn create_store(data: serde_json::Value) -> Value {
    ObservableStore.observable(data)
}

fn read_from(store: &Value, get: Accessor) -> GetterFn {
    let store = store.clone();
    match get {
        Accessor::Path(path) => Rc::new(move |_: &Instance, _: &Value| resolve_or(&store, &path, Value::Undefined)),
        Accessor::Function(getter) => Rc::new(move |instance: &Instance, _: &Value| getter(instance, &store)),
    }
}

fn write_to(store: &Value, set: Mutator) -> SetterFn {
    let store = store.clone();
    match set {
        Mutator::Path(path) => Rc::new(move |_: &Instance, value: Value, _: &Value| {
            ferry_reactive::untrack(|| match resolve(&store, Some(&path)) {
                Some(Value::Function(setter)) => {
                    setter.call_with(&parent_of(&store, &path), &[value, store.clone()]);
                }
                _ => tracing::warn!(path, "setter path does not lead to a function"),
            })
        }),
        Mutator::Function(setter) => Rc::new(move |instance: &Instance, value: Value, _: &Value| {
            setter(instance, value, &store)
        }),
    }
}
