use std::{any::Any, cell::RefCell, fmt, marker::PhantomData, rc::Rc};

use crate::{
    id::Id,
    runtime::{new_source, notify, RUNTIME},
};

/// A reactive slot holding a `T`, owned by the scope it was created in.
///
/// Tracked reads subscribe the running effect; writes re-run subscribers. Once
/// the signal is disposed reads return `None` and writes are ignored, so
/// holders of a stale handle never panic.
pub struct RwSignal<T> {
    id: Id,
    ty: PhantomData<fn() -> T>,
}

impl<T> Copy for RwSignal<T> {}

impl<T> Clone for RwSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for RwSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for RwSignal<T> {}

impl<T> fmt::Debug for RwSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RwSignal({:?})", self.id)
    }
}

/// Shorthand for [`RwSignal::new`].
pub fn create_rw_signal<T: 'static>(value: T) -> RwSignal<T> {
    RwSignal::new(value)
}

impl<T: 'static> RwSignal<T> {
    /// Creates a signal owned by the current scope.
    pub fn new(value: T) -> Self {
        let slot: Rc<dyn Any> = Rc::new(RefCell::new(value));
        RwSignal {
            id: new_source(Some(slot), true),
            ty: PhantomData,
        }
    }

    fn slot(&self) -> Option<Rc<dyn Any>> {
        RUNTIME.with(|runtime| runtime.value(self.id))
    }

    fn read<O>(&self, tracked: bool, f: impl FnOnce(&T) -> O) -> Option<O> {
        let slot = self.slot()?;
        let cell = slot.downcast_ref::<RefCell<T>>()?;
        if tracked {
            self.track();
        }
        let value = cell.borrow();
        Some(f(&value))
    }

    /// Subscribes the running effect without reading the value.
    pub fn track(&self) {
        RUNTIME.with(|runtime| runtime.track(self.id));
    }

    pub fn with<O>(&self, f: impl FnOnce(&T) -> O) -> Option<O> {
        self.read(true, f)
    }

    pub fn with_untracked<O>(&self, f: impl FnOnce(&T) -> O) -> Option<O> {
        self.read(false, f)
    }

    /// Changes the value in place and notifies subscribers. Returns `None`,
    /// without calling `f`, when the signal is disposed.
    pub fn update<O>(&self, f: impl FnOnce(&mut T) -> O) -> Option<O> {
        let slot = self.slot()?;
        let cell = slot.downcast_ref::<RefCell<T>>()?;
        let result = f(&mut cell.borrow_mut());
        notify(self.id);
        Some(result)
    }

    pub fn set(&self, value: T) {
        self.update(|slot| *slot = value);
    }

    pub fn dispose(&self) {
        self.id.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.slot().is_none()
    }
}

impl<T: Clone + 'static> RwSignal<T> {
    pub fn get(&self) -> Option<T> {
        self.with(T::clone)
    }

    pub fn get_untracked(&self) -> Option<T> {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> RwSignal<T> {
    /// Stores `value` and notifies subscribers, unless it equals the current
    /// value or the signal is disposed. Returns whether subscribers were notified.
    pub fn set_if_changed(&self, value: T) -> bool {
        let Some(slot) = self.slot() else {
            return false;
        };
        let Some(cell) = slot.downcast_ref::<RefCell<T>>() else {
            return false;
        };
        if *cell.borrow() == value {
            return false;
        }
        *cell.borrow_mut() = value;
        notify(self.id);
        true
    }
}
