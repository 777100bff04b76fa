use crate::{
    effect::{create_effect, create_updater, Effect},
    id::Id,
    runtime::RUNTIME,
    signal::RwSignal,
};

/// An owner of reactive nodes.
///
/// Signals and effects are owned by the scope that was current when they were
/// created; an effect is itself the scope of whatever its body creates.
/// Disposing a scope disposes what it owns, child scopes included. Disposing
/// twice is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scope(Id);

impl Scope {
    /// A root scope, disposed only explicitly.
    pub fn new() -> Self {
        Scope(Id::next())
    }

    /// A scope disposed together with `self`.
    pub fn create_child(self) -> Scope {
        let child = Id::next();
        RUNTIME.with(|runtime| {
            runtime
                .owned
                .borrow_mut()
                .entry(self.0)
                .or_default()
                .insert(child);
        });
        Scope(child)
    }

    /// Runs `f` with this scope owning everything `f` creates.
    pub fn enter<O>(self, f: impl FnOnce() -> O) -> O {
        let previous = RUNTIME.with(|runtime| runtime.owner.replace(self.0));
        let result = f();
        RUNTIME.with(|runtime| runtime.owner.set(previous));
        result
    }

    pub fn create_rw_signal<T: 'static>(self, value: T) -> RwSignal<T> {
        self.enter(|| RwSignal::new(value))
    }

    pub fn create_effect<T: 'static>(self, f: impl Fn(Option<T>) -> T + 'static) -> Effect {
        self.enter(|| create_effect(f))
    }

    pub fn create_updater<R: 'static>(
        self,
        compute: impl Fn() -> R + 'static,
        on_change: impl Fn(R) + 'static,
    ) -> R {
        self.enter(|| create_updater(compute, on_change))
    }

    pub fn dispose(self) {
        self.0.dispose();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
