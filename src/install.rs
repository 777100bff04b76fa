//! The store plugin: wires bindings into the host lifecycle.

use std::{cell::RefCell, fmt, rc::Rc};

use ferry_store::Value;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::{
    change_detector::ChangeDetector,
    compat::{MAP_ACTION_FIELD, MAP_STATE_FIELD},
    component::{ComponentOptions, ComputedEntry, ComputedProperty, MethodEntry},
    declaration::{ActionDeclaration, ActionField, StateDeclaration, StateField},
    host::{Host, LifecycleHooks, Plugin},
    instance::{Instance, InstanceId, WeakInstance},
    normalize::{merge_with_compat, normalize_actions, normalize_state, BindingDescriptor},
    source::{ObservableStore, SourceSystem},
    store_ref::{resolve_store, StoreOption, STORE_PROPERTY},
};

/// Component option holding a [`StateDeclaration`].
pub const MAP_STATE_OPTION: &str = "$mapState";
/// Component option holding an [`ActionDeclaration`].
pub const MAP_ACTION_OPTION: &str = "$mapAction";
/// Component option holding a [`StoreOption`].
pub const STORE_OPTION: &str = "store";

/// Binds component properties and methods to an observable store.
///
/// ```rust
/// use ferry::{ComponentOptions, Host, StateDeclaration, StoreOptionsExt, StorePlugin};
/// use serde_json::json;
///
/// let host = Host::new();
/// host.use_plugin(StorePlugin::new().default_store(json!({ "count": 1 })));
///
/// let vm = host.mount(
///     ComponentOptions::new()
///         .with_map_state(StateDeclaration::list(["count"]))
///         .render(|vm| format!("count: {}", vm.get("count"))),
/// );
/// assert_eq!(vm.text(), "count: 1");
/// ```
pub struct StorePlugin {
    default_store: Option<StoreOption>,
    source: Rc<dyn SourceSystem>,
}

impl Default for StorePlugin {
    fn default() -> Self {
        Self {
            default_store: None,
            source: Rc::new(ObservableStore),
        }
    }
}

impl fmt::Debug for StorePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorePlugin")
            .field("default_store", &self.default_store)
            .finish_non_exhaustive()
    }
}

impl StorePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store of instances that neither declare one nor have a parent with one.
    pub fn default_store(mut self, store: impl Into<StoreOption>) -> Self {
        self.default_store = Some(store.into());
        self
    }

    pub fn source(mut self, source: impl SourceSystem + 'static) -> Self {
        self.source = Rc::new(source);
        self
    }
}

impl Plugin for StorePlugin {
    fn install(&self, host: &Host) {
        let coordinator = Rc::new(Coordinator {
            detector: ChangeDetector::new(self.source.clone()),
            source: self.source.clone(),
            default_store: self.default_store.clone(),
            pending: RefCell::new(FxHashMap::default()),
        });

        host.register_lifecycle_hooks(LifecycleHooks {
            before_create: Some({
                let coordinator = coordinator.clone();
                Rc::new(move |instance: &Instance| coordinator.before_create(instance))
            }),
            created: Some({
                let coordinator = coordinator.clone();
                Rc::new(move |instance: &Instance| coordinator.created(instance))
            }),
            before_destroy: Some(Rc::new(move |instance: &Instance| {
                coordinator.before_destroy(instance)
            })),
        });
        tracing::debug!("store plugin installed");
    }
}

struct Bindings {
    owner: WeakInstance,
    descriptors: Vec<BindingDescriptor>,
    subscribed: bool,
}

struct Coordinator {
    detector: ChangeDetector,
    source: Rc<dyn SourceSystem>,
    default_store: Option<StoreOption>,
    pending: RefCell<FxHashMap<InstanceId, Bindings>>,
}

impl Coordinator {
    fn before_create(&self, instance: &Instance) {
        self.release_dropped();

        let options = instance.options().clone();
        let store = resolve_store(
            instance,
            options.option::<StoreOption>(STORE_OPTION),
            self.default_store.as_ref(),
            self.source.as_ref(),
        );
        if let Some(store) = &store {
            instance.set_property(STORE_PROPERTY, store.clone());
        }

        let compat_state = take_compat::<StateDeclaration>(
            instance.take_computed_entry(MAP_STATE_FIELD).and_then(|entry| match entry {
                ComputedEntry::Custom(custom) => Some(custom),
                ComputedEntry::Property(_) => None,
            }),
        );
        let compat_actions = take_compat::<ActionDeclaration>(
            instance.take_method_entry(MAP_ACTION_FIELD).and_then(|entry| match entry {
                MethodEntry::Custom(custom) => Some(custom),
                MethodEntry::Method(_) => None,
            }),
        );

        let state = merge_with_compat(
            state_sources(&options),
            compat_state.map(StateDeclaration::into_entries),
        );
        let actions = merge_with_compat(
            action_sources(&options),
            compat_actions.map(ActionDeclaration::into_entries),
        );
        if state.is_empty() && actions.is_empty() {
            return;
        }

        // bindings without any store still exist, reading `Undefined`
        let store = store.unwrap_or_default();

        let descriptors = normalize_state(state, instance, &store);
        for binding in &descriptors {
            self.detector.define_reactive_property(instance, binding);

            let key = binding.key.clone();
            let mut property = ComputedProperty::new(move |instance| instance.read_cell(&key));
            if let Some(set) = binding.set.clone() {
                property = property.with_setter(move |_, value| set(value));
            }
            instance.define_computed(binding.key.clone(), property);
        }

        for action in normalize_actions(actions, instance, &store) {
            let method = action.method;
            instance.define_method(action.key, move |_, args| method.call(args));
        }

        tracing::debug!(
            instance = %instance.id(),
            bindings = descriptors.len(),
            "bindings defined"
        );
        self.pending.borrow_mut().insert(
            instance.id(),
            Bindings {
                owner: instance.downgrade(),
                descriptors,
                subscribed: false,
            },
        );
    }

    fn created(&self, instance: &Instance) {
        let mut pending = self.pending.borrow_mut();
        let Some(bindings) = pending.get_mut(&instance.id()) else {
            return;
        };
        if bindings.subscribed {
            return;
        }
        bindings.subscribed = true;
        let descriptors = bindings.descriptors.clone();
        drop(pending);

        self.detector.define_reaction_list(instance, &descriptors);
    }

    fn before_destroy(&self, instance: &Instance) {
        let Some(bindings) = self.pending.borrow_mut().remove(&instance.id()) else {
            return;
        };
        self.detector.remove_reaction_list(instance);
        for binding in &bindings.descriptors {
            self.detector.remove_reactive_property(instance, &binding.key);
        }
    }

    /// Forgets instances that were dropped without [`Instance::destroy`].
    fn release_dropped(&self) {
        self.pending
            .borrow_mut()
            .retain(|_, bindings| bindings.owner.upgrade().is_some());
        self.detector.release_dropped();
    }
}

fn take_compat<T: Clone + 'static>(custom: Option<Rc<dyn std::any::Any>>) -> Option<T> {
    let custom = custom?;
    match custom.downcast_ref::<T>() {
        Some(declaration) => Some(declaration.clone()),
        None => {
            tracing::warn!("ignoring compatibility entry of an unexpected type");
            None
        }
    }
}

fn state_sources(options: &ComponentOptions) -> Vec<IndexMap<String, StateField>> {
    options
        .lineage()
        .into_iter()
        .filter_map(|options| options.option::<StateDeclaration>(MAP_STATE_OPTION))
        .map(|declaration| declaration.clone().into_entries())
        .collect()
}

fn action_sources(options: &ComponentOptions) -> Vec<IndexMap<String, ActionField>> {
    options
        .lineage()
        .into_iter()
        .filter_map(|options| options.option::<ActionDeclaration>(MAP_ACTION_OPTION))
        .map(|declaration| declaration.clone().into_entries())
        .collect()
}

/// Store related builder methods on [`ComponentOptions`].
pub trait StoreOptionsExt {
    /// Declares state bindings (`$mapState`).
    fn with_map_state(self, declaration: StateDeclaration) -> Self;
    /// Declares action bindings (`$mapAction`).
    fn with_map_action(self, declaration: ActionDeclaration) -> Self;
    /// Declares the store of this component and, unless they declare their own,
    /// of its children.
    fn with_store(self, store: impl Into<StoreOption>) -> Self;
}

impl StoreOptionsExt for ComponentOptions {
    fn with_map_state(self, declaration: StateDeclaration) -> Self {
        self.with_option(MAP_STATE_OPTION, declaration)
    }

    fn with_map_action(self, declaration: ActionDeclaration) -> Self {
        self.with_option(MAP_ACTION_OPTION, declaration)
    }

    fn with_store(self, store: impl Into<StoreOption>) -> Self {
        self.with_option(STORE_OPTION, store.into())
    }
}

/// Access to the store an instance resolved.
pub trait InstanceStoreExt {
    fn store(&self) -> Option<Value>;
}

impl InstanceStoreExt for Instance {
    fn store(&self) -> Option<Value> {
        self.property(STORE_PROPERTY)
    }
}
