//! # ferry_reactive
//!
//! The single-threaded reactive runtime under ferry's stores and instances.
//!
//! - [`RwSignal`]: a typed value owned by a [`Scope`]. Instances keep their data
//!   fields, binding cells and render output in signals.
//! - [`Atom`]: a value-less source owned by its holder. Store fields pair their
//!   data with an atom.
//! - [`Effect`] / [`create_updater`]: code re-run when a source it read changes.
//!   Store reactions are updaters living in their own scope.
//! - [`batch`] / [`untrack`]: defer effect runs and read without subscribing.
//!
//! All state lives in a thread local.

mod atom;
mod effect;
mod id;
mod runtime;
mod scope;
mod signal;

pub use atom::{Atom, AtomHandle};
pub use effect::{batch, create_effect, create_updater, untrack, Effect};
pub use id::ReactiveId;
pub use runtime::live_count;
pub use scope::Scope;
pub use signal::{create_rw_signal, RwSignal};
