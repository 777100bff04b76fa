use std::fmt;

use crate::{
    id::Id,
    runtime::{new_source, notify, RUNTIME},
};

/// A value-less source for data kept outside the runtime.
///
/// The holder reads its own data after calling [`Atom::track`] and calls
/// [`Atom::notify`] after changing it. An atom belongs to no scope: it lives
/// exactly as long as the `Atom` value, so data created during an effect run
/// survives the next run.
pub struct Atom {
    id: Id,
}

/// A copyable handle that can notify an [`Atom`]'s subscribers without
/// borrowing the data the atom guards. Does nothing once the atom is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtomHandle {
    id: Id,
}

impl Atom {
    pub fn new() -> Self {
        Atom {
            id: new_source(None, false),
        }
    }

    pub fn track(&self) {
        RUNTIME.with(|runtime| runtime.track(self.id));
    }

    pub fn notify(&self) {
        notify(self.id);
    }

    pub fn handle(&self) -> AtomHandle {
        AtomHandle { id: self.id }
    }
}

impl AtomHandle {
    pub fn notify(&self) {
        notify(self.id);
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.id)
    }
}

impl Drop for Atom {
    fn drop(&mut self) {
        self.id.dispose();
    }
}
