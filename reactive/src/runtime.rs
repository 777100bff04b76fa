use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use smallvec::SmallVec;

use crate::{
    effect::{run_effect, EffectNode},
    id::Id,
};

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::new();
}

/// Something effects can depend on: a signal's value, or nothing at all for an atom.
pub(crate) struct Source {
    pub(crate) value: Option<Rc<dyn Any>>,
    pub(crate) subscribers: HashSet<Id>,
}

/// Per-thread reactive state.
///
/// `owner` is the scope new nodes are registered under; `observer` is the effect
/// whose run is in progress, which every tracked read subscribes.
pub(crate) struct Runtime {
    pub(crate) observer: RefCell<Option<Rc<EffectNode>>>,
    pub(crate) owner: Cell<Id>,
    pub(crate) owned: RefCell<HashMap<Id, HashSet<Id>>>,
    pub(crate) sources: RefCell<HashMap<Id, Source>>,
    pub(crate) effects: RefCell<HashMap<Id, Rc<EffectNode>>>,
    pub(crate) batch_depth: Cell<u32>,
    pub(crate) pending_effects: RefCell<SmallVec<[Id; 10]>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            observer: RefCell::new(None),
            owner: Cell::new(Id::next()),
            owned: RefCell::new(HashMap::new()),
            sources: RefCell::new(HashMap::new()),
            effects: RefCell::new(HashMap::new()),
            batch_depth: Cell::new(0),
            pending_effects: RefCell::new(SmallVec::new()),
        }
    }

    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub(crate) fn effect(&self, id: Id) -> Option<Rc<EffectNode>> {
        self.effects.borrow().get(&id).cloned()
    }

    pub(crate) fn value(&self, source: Id) -> Option<Rc<dyn Any>> {
        self.sources.borrow().get(&source)?.value.clone()
    }

    /// Registers `id` under the current owner so it is disposed with it.
    pub(crate) fn adopt(&self, id: Id) {
        self.owned
            .borrow_mut()
            .entry(self.owner.get())
            .or_default()
            .insert(id);
    }

    /// Subscribes the running effect, if any, to `source`.
    pub(crate) fn track(&self, source: Id) {
        let observer = self.observer.borrow();
        let Some(effect) = observer.as_ref() else {
            return;
        };
        if let Some(entry) = self.sources.borrow_mut().get_mut(&source) {
            entry.subscribers.insert(effect.id());
            effect.add_observer(source);
        }
    }

    fn queue(&self, effect: Id) {
        let mut pending = self.pending_effects.borrow_mut();
        if !pending.contains(&effect) {
            pending.push(effect);
        }
    }

    pub(crate) fn forget_pending_effect(&self, effect: Id) {
        self.pending_effects.borrow_mut().retain(|id| *id != effect);
    }
}

pub(crate) fn new_source(value: Option<Rc<dyn Any>>, scoped: bool) -> Id {
    let id = Id::next();
    RUNTIME.with(|runtime| {
        runtime.sources.borrow_mut().insert(
            id,
            Source {
                value,
                subscribers: HashSet::new(),
            },
        );
        if scoped {
            runtime.adopt(id);
        }
    });
    id
}

/// Re-runs every effect subscribed to `source`, or queues them while batching.
pub(crate) fn notify(source: Id) {
    let subscribers: Vec<Id> = RUNTIME.with(|runtime| {
        runtime
            .sources
            .borrow()
            .get(&source)
            .map(|entry| entry.subscribers.iter().copied().collect())
            .unwrap_or_default()
    });

    if RUNTIME.with(|runtime| runtime.is_batching()) {
        RUNTIME.with(|runtime| subscribers.into_iter().for_each(|id| runtime.queue(id)));
        return;
    }
    for subscriber in subscribers {
        // an earlier subscriber may have disposed this one
        if let Some(effect) = RUNTIME.with(|runtime| runtime.effect(subscriber)) {
            run_effect(effect);
        }
    }
}

/// Runs the effects queued during a batch until none are left. Effects disposed
/// while queued are skipped.
pub(crate) fn run_pending_effects() {
    loop {
        let pending = RUNTIME.with(|runtime| runtime.pending_effects.take());
        if pending.is_empty() {
            break;
        }
        for id in pending {
            if let Some(effect) = RUNTIME.with(|runtime| runtime.effect(id)) {
                run_effect(effect);
            }
        }
    }
}

/// Number of live signals, atoms and effects in the current thread's runtime.
///
/// Useful to assert that disposing a scope released everything created under it.
pub fn live_count() -> usize {
    RUNTIME.with(|runtime| runtime.sources.borrow().len() + runtime.effects.borrow().len())
}
