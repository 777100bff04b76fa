//! Declarations carried inside the `computed` and `methods` groups.
//!
//! Code written against the `mapState` / `mapAction` helpers of other state
//! libraries spreads their result into `computed` and `methods`. These helpers
//! do the same: they produce a single entry under a reserved key, which the
//! store plugin takes out and merges with the native declarations. On a key
//! declared both ways the native declaration wins.

use std::rc::Rc;

use crate::{
    component::{ComputedEntry, MethodEntry},
    declaration::{ActionDeclaration, StateDeclaration},
};

/// Reserved `computed` key.
pub const MAP_STATE_FIELD: &str = "__$mobxMapState__";
/// Reserved `methods` key.
pub const MAP_ACTION_FIELD: &str = "__$mobxMapAction__";

/// A `computed` entry carrying state bindings.
///
/// ```rust
/// use ferry::{map_state, ComponentOptions, StateDeclaration};
///
/// let options = ComponentOptions::new().extend_computed([map_state(StateDeclaration::list(["num"]))]);
/// ```
pub fn map_state(declaration: StateDeclaration) -> (&'static str, ComputedEntry) {
    (MAP_STATE_FIELD, ComputedEntry::Custom(Rc::new(declaration)))
}

/// A `methods` entry carrying action bindings.
pub fn map_action(declaration: ActionDeclaration) -> (&'static str, MethodEntry) {
    (MAP_ACTION_FIELD, MethodEntry::Custom(Rc::new(declaration)))
}
