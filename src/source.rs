//! The observable store the bridge subscribes to.

use ferry_store::{Disposer, Value};

/// What the bridge needs from an observable store.
pub trait SourceSystem {
    /// Makes plain data observable.
    fn observable(&self, data: serde_json::Value) -> Value;

    /// Runs `track` now and again whenever what it read changes, handing each
    /// new result to `effect`. Nothing runs after the disposer is disposed.
    fn reaction(&self, track: Box<dyn Fn() -> Value>, effect: Box<dyn Fn(Value)>) -> Disposer;
}

/// [`SourceSystem`] backed by `ferry_store`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObservableStore;

impl SourceSystem for ObservableStore {
    fn observable(&self, data: serde_json::Value) -> Value {
        ferry_store::observable(data)
    }

    fn reaction(&self, track: Box<dyn Fn() -> Value>, effect: Box<dyn Fn(Value)>) -> Disposer {
        ferry_store::reaction(track, effect)
    }
}
