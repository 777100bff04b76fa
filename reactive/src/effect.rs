use std::{cell::RefCell, collections::HashSet, rc::Rc};

use crate::{
    id::Id,
    runtime::{run_pending_effects, RUNTIME},
};

/// An effect as stored in the runtime: a body to re-run and the sources its
/// last run read.
pub(crate) struct EffectNode {
    id: Id,
    body: Box<dyn Fn()>,
    observers: RefCell<HashSet<Id>>,
}

impl EffectNode {
    fn register(body: Box<dyn Fn()>) -> Rc<EffectNode> {
        let node = Rc::new(EffectNode {
            id: Id::next(),
            body,
            observers: RefCell::new(HashSet::new()),
        });
        RUNTIME.with(|runtime| {
            runtime.adopt(node.id);
            runtime.effects.borrow_mut().insert(node.id, node.clone());
        });
        node
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn add_observer(&self, source: Id) {
        self.observers.borrow_mut().insert(source);
    }

    pub(crate) fn remove_observer(&self, source: Id) {
        self.observers.borrow_mut().remove(&source);
    }
}

/// Handle to an effect. Effects live until disposed, directly or through the
/// scope they were created in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effect {
    id: Id,
}

impl Effect {
    pub fn new<T: 'static>(f: impl Fn(Option<T>) -> T + 'static) -> Effect {
        create_effect(f)
    }

    /// Stops the effect, including a run that is waiting in a batch.
    pub fn dispose(&self) {
        self.id.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        RUNTIME.with(|runtime| runtime.effect(self.id).is_none())
    }
}

/// Runs `f` now, and again every time a source read by its latest run changes.
///
/// `f` receives what its previous run returned. Dependencies are collected anew
/// on each run, and effects created inside `f` are disposed before the next one.
pub fn create_effect<T: 'static>(f: impl Fn(Option<T>) -> T + 'static) -> Effect {
    let previous: RefCell<Option<T>> = RefCell::new(None);
    let node = EffectNode::register(Box::new(move || {
        let last = previous.borrow_mut().take();
        let next = f(last);
        *previous.borrow_mut() = Some(next);
    }));
    let id = node.id;
    run_effect(node);
    Effect { id }
}

/// Splits an effect in two: `compute` is tracked, `on_change` runs untracked
/// with each value `compute` produces after the first.
///
/// The first value is returned to the caller instead of being handed to
/// `on_change`.
pub fn create_updater<R: 'static>(
    compute: impl Fn() -> R + 'static,
    on_change: impl Fn(R) + 'static,
) -> R {
    let compute = Rc::new(compute);
    let node = EffectNode::register(Box::new({
        let compute = compute.clone();
        move || {
            let value = compute();
            untrack(|| on_change(value));
        }
    }));
    observe(node, || compute())
}

/// Runs `f` without subscribing the running effect to anything `f` reads.
pub fn untrack<O>(f: impl FnOnce() -> O) -> O {
    let observer = RUNTIME.with(|runtime| runtime.observer.borrow_mut().take());
    let result = f();
    RUNTIME.with(|runtime| *runtime.observer.borrow_mut() = observer);
    result
}

/// Defers effect runs until the outermost `batch` returns. Each queued effect
/// then runs once.
pub fn batch<O>(f: impl FnOnce() -> O) -> O {
    RUNTIME.with(|runtime| runtime.batch_depth.set(runtime.batch_depth.get() + 1));
    let result = f();
    let outermost = RUNTIME.with(|runtime| {
        let depth = runtime.batch_depth.get().saturating_sub(1);
        runtime.batch_depth.set(depth);
        depth == 0
    });
    if outermost {
        run_pending_effects();
    }
    result
}

/// Runs `f` with `node` as both the observer and the owner of new nodes.
fn observe<O>(node: Rc<EffectNode>, f: impl FnOnce() -> O) -> O {
    let owner = node.id;
    let (observer, scope) = RUNTIME.with(|runtime| {
        (
            runtime.observer.borrow_mut().replace(node),
            runtime.owner.replace(owner),
        )
    });
    let result = f();
    RUNTIME.with(|runtime| {
        *runtime.observer.borrow_mut() = observer;
        runtime.owner.set(scope);
    });
    result
}

pub(crate) fn run_effect(node: Rc<EffectNode>) {
    node.id.dispose_owned();
    observer_clean_up(&node);

    let running = node.clone();
    observe(node, move || (running.body)());
}

/// Unsubscribes the effect from every source it read, so its next run starts
/// with no dependencies.
pub(crate) fn observer_clean_up(node: &EffectNode) {
    let observed = std::mem::take(&mut *node.observers.borrow_mut());
    RUNTIME.with(|runtime| {
        let mut sources = runtime.sources.borrow_mut();
        for source in observed {
            if let Some(entry) = sources.get_mut(&source) {
                entry.subscribers.remove(&node.id);
            }
        }
    });
}

