use std::sync::atomic::{AtomicU64, Ordering};

use crate::{effect::observer_clean_up, runtime::RUNTIME};

/// Identifies a node of the reactive graph: a signal, an atom, an effect or a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactiveId(u64);

pub(crate) type Id = ReactiveId;

impl Id {
    pub(crate) fn next() -> Id {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        ReactiveId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Disposes the nodes owned by this id, keeping the id itself.
    pub(crate) fn dispose_owned(&self) {
        // the runtime may already be gone when thread locals are torn down
        let owned = RUNTIME
            .try_with(|runtime| runtime.owned.borrow_mut().remove(self))
            .ok()
            .flatten();
        for child in owned.into_iter().flatten() {
            child.dispose();
        }
    }

    /// Disposes the node and everything it owns. Unknown ids are ignored.
    ///
    /// An effect is unsubscribed from all of its sources and dropped from the
    /// batch queue; a source is forgotten by every effect that read it.
    pub(crate) fn dispose(&self) {
        self.dispose_owned();

        let Ok((source, effect)) = RUNTIME.try_with(|runtime| {
            runtime.forget_pending_effect(*self);
            (
                runtime.sources.borrow_mut().remove(self),
                runtime.effects.borrow_mut().remove(self),
            )
        }) else {
            return;
        };

        if let Some(effect) = effect {
            observer_clean_up(&effect);
        }
        if let Some(source) = source {
            for subscriber in source.subscribers {
                if let Some(effect) = RUNTIME.with(|runtime| runtime.effect(subscriber)) {
                    effect.remove_observer(*self);
                }
            }
        }
    }
}
