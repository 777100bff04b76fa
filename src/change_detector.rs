//! Keeps bound cells in sync with the store.
//!
//! Every binding owns a cell on its instance and one store subscription. The
//! subscription re-runs the binding's getter whenever something it read
//! changes and writes the result into the cell; host readers of the binding
//! only ever read the cell.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use ferry_store::{Disposer, Value};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::{
    instance::{Instance, InstanceId, WeakInstance},
    normalize::BindingDescriptor,
    source::SourceSystem,
};

pub struct ChangeDetector {
    source: Rc<dyn SourceSystem>,
    reactions: RefCell<FxHashMap<InstanceId, Subscriptions>>,
}

struct Subscriptions {
    owner: WeakInstance,
    disposers: IndexMap<String, Disposer>,
}

/// The value seen by a subscription's first tracked run. Later runs are not kept.
#[derive(Default)]
struct FirstValue {
    seen: Cell<bool>,
    value: RefCell<Option<Value>>,
}

impl FirstValue {
    fn offer(&self, value: &Value) {
        if !self.seen.replace(true) {
            *self.value.borrow_mut() = Some(value.clone());
        }
    }

    fn take(&self) -> Option<Value> {
        self.value.borrow_mut().take()
    }
}

impl fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("instances", &self.reactions.borrow().len())
            .finish()
    }
}

impl ChangeDetector {
    pub fn new(source: Rc<dyn SourceSystem>) -> Self {
        Self {
            source,
            reactions: RefCell::new(FxHashMap::default()),
        }
    }

    /// Creates the cell for `binding`, holding one untracked run of its getter.
    pub fn define_reactive_property(&self, instance: &Instance, binding: &BindingDescriptor) {
        let initial = ferry_reactive::untrack(|| (binding.get)());
        instance.define_cell(binding.key.clone(), initial);
    }

    /// Tracked read of the cell behind `key`.
    pub fn get_reactive_property(&self, instance: &Instance, key: &str) -> Value {
        instance.read_cell(key)
    }

    pub fn remove_reactive_property(&self, instance: &Instance, key: &str) {
        instance.remove_cell(key);
    }

    /// Subscribes `binding`, replacing any live subscription for the same key.
    pub fn define_reaction(&self, instance: &Instance, binding: &BindingDescriptor) {
        let first = Rc::new(FirstValue::default());

        let track: Box<dyn Fn() -> Value> = {
            let get = binding.get.clone();
            let first = first.clone();
            Box::new(move || {
                let value = get();
                first.offer(&value);
                value
            })
        };
        let effect: Box<dyn Fn(Value)> = {
            let weak = instance.downgrade();
            let key = binding.key.clone();
            Box::new(move |value| {
                if let Some(instance) = weak.upgrade() {
                    instance.write_cell(&key, value);
                }
            })
        };
        let disposer = self.source.reaction(track, effect);

        let replaced = self
            .reactions
            .borrow_mut()
            .entry(instance.id())
            .or_insert_with(|| Subscriptions {
                owner: instance.downgrade(),
                disposers: IndexMap::new(),
            })
            .disposers
            .insert(binding.key.clone(), disposer);
        if let Some(replaced) = replaced {
            tracing::warn!(
                instance = %instance.id(),
                key = binding.key,
                "binding subscribed twice, dropping the older subscription"
            );
            replaced.dispose();
        }

        // state may have changed since the cell was defined
        if let Some(first) = first.take() {
            instance.write_cell(&binding.key, first);
        }
    }

    pub fn define_reaction_list(&self, instance: &Instance, bindings: &[BindingDescriptor]) {
        for binding in bindings {
            self.define_reaction(instance, binding);
        }
    }

    /// Disposes every subscription of `instance`. A second call is a no-op.
    pub fn remove_reaction_list(&self, instance: &Instance) {
        let reactions = self.reactions.borrow_mut().remove(&instance.id());
        let Some(reactions) = reactions else {
            return;
        };
        tracing::trace!(
            instance = %instance.id(),
            count = reactions.disposers.len(),
            "disposing bindings"
        );
        for disposer in reactions.disposers.into_values() {
            disposer.dispose();
        }
    }

    /// Disposes the subscriptions of instances that were dropped without being
    /// destroyed.
    pub fn release_dropped(&self) {
        let dropped: Vec<Subscriptions> = {
            let mut reactions = self.reactions.borrow_mut();
            let ids: Vec<InstanceId> = reactions
                .iter()
                .filter(|(_, subscriptions)| subscriptions.owner.upgrade().is_none())
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| reactions.remove(id)).collect()
        };
        for subscriptions in dropped {
            tracing::debug!(
                count = subscriptions.disposers.len(),
                "releasing bindings of a dropped instance"
            );
            for disposer in subscriptions.disposers.into_values() {
                disposer.dispose();
            }
        }
    }

    /// Number of live subscriptions held for `instance`.
    pub fn live_subscriptions(&self, instance: &Instance) -> usize {
        self.reactions
            .borrow()
            .get(&instance.id())
            .map_or(0, |reactions| {
                reactions
                    .disposers
                    .values()
                    .filter(|disposer| !disposer.is_disposed())
                    .count()
            })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ferry_store::Object;

    use super::*;
    use crate::{component::ComponentOptions, host::Host, source::ObservableStore};

    fn binding(key: &str, store: &Object, field: &'static str, runs: Rc<Cell<usize>>) -> BindingDescriptor {
        let store = store.clone();
        BindingDescriptor {
            key: key.to_string(),
            get: Rc::new(move || {
                runs.set(runs.get() + 1);
                store.get(field)
            }),
            set: None,
        }
    }

    fn setup() -> (ChangeDetector, Instance, Object) {
        let detector = ChangeDetector::new(Rc::new(ObservableStore));
        let vm = Host::new().mount(ComponentOptions::new());
        let store = Object::new().with("foo", 1).with("bar", 1);
        (detector, vm, store)
    }

    #[test]
    fn cell_follows_the_store() {
        let (detector, vm, store) = setup();
        let runs = Rc::new(Cell::new(0));
        let foo = binding("foo", &store, "foo", runs.clone());

        detector.define_reactive_property(&vm, &foo);
        assert_eq!(detector.get_reactive_property(&vm, "foo"), Value::from(1));
        detector.define_reaction(&vm, &foo);
        assert_eq!(detector.live_subscriptions(&vm), 1);

        store.set("foo", 2);
        assert_eq!(detector.get_reactive_property(&vm, "foo"), Value::from(2));
        store.set("bar", 2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn subscribing_reconciles_a_stale_cell() {
        let (detector, vm, store) = setup();
        let foo = binding("foo", &store, "foo", Rc::new(Cell::new(0)));

        detector.define_reactive_property(&vm, &foo);
        store.set("foo", 5);
        assert_eq!(vm.read_cell_untracked("foo"), Value::from(1));

        detector.define_reaction(&vm, &foo);
        assert_eq!(vm.read_cell_untracked("foo"), Value::from(5));
    }

    #[test]
    fn subscribing_twice_keeps_one_subscription() {
        let (detector, vm, store) = setup();
        let runs = Rc::new(Cell::new(0));
        let foo = binding("foo", &store, "foo", runs.clone());

        detector.define_reactive_property(&vm, &foo);
        detector.define_reaction(&vm, &foo);
        detector.define_reaction(&vm, &foo);
        assert_eq!(detector.live_subscriptions(&vm), 1);

        runs.set(0);
        store.set("foo", 3);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn removal_is_idempotent() {
        let (detector, vm, store) = setup();
        let runs = Rc::new(Cell::new(0));
        let foo = binding("foo", &store, "foo", runs.clone());

        detector.define_reactive_property(&vm, &foo);
        detector.define_reaction_list(&vm, std::slice::from_ref(&foo));
        detector.remove_reaction_list(&vm);
        detector.remove_reaction_list(&vm);
        detector.remove_reactive_property(&vm, "foo");
        assert_eq!(detector.live_subscriptions(&vm), 0);
        assert!(!vm.has_cell("foo"));

        runs.set(0);
        store.set("foo", 9);
        assert_eq!(runs.get(), 0);
        assert_eq!(detector.get_reactive_property(&vm, "foo"), Value::Undefined);
    }

    #[test]
    fn only_the_first_run_is_kept() {
        let first = FirstValue::default();
        first.offer(&Value::from(1));
        first.offer(&Value::from(2));
        assert_eq!(first.take(), Some(Value::from(1)));

        first.offer(&Value::from(3));
        assert_eq!(first.take(), None);
    }

    #[test]
    fn dropped_instances_are_released() {
        let (detector, vm, store) = setup();
        let runs = Rc::new(Cell::new(0));
        let foo = binding("foo", &store, "foo", runs.clone());

        detector.define_reactive_property(&vm, &foo);
        detector.define_reaction(&vm, &foo);
        let kept = Host::new().mount(ComponentOptions::new());
        detector.define_reaction(&kept, &binding("bar", &store, "bar", Rc::new(Cell::new(0))));

        drop(vm);
        detector.release_dropped();
        assert_eq!(detector.reactions.borrow().len(), 1);
        assert_eq!(detector.live_subscriptions(&kept), 1);

        runs.set(0);
        store.set("foo", 4);
        assert_eq!(runs.get(), 0);
    }
}
