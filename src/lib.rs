//! # Ferry
//! Ferry binds the properties of host components to an observable store.
//!
//! A component declares which store values it wants (`$mapState`) and which store
//! functions it exposes as methods (`$mapAction`). For every state binding the
//! store plugin keeps a reactive cell on the instance and one store subscription
//! that refreshes the cell whenever the values the binding read change. Host
//! consumers (render, computed properties, watchers) only ever read the cell.
//!
//! ## Example: Counter
//! ```rust
//! use ferry::{
//!     ActionDeclaration, ComponentOptions, Host, StateDeclaration, StoreOptionsExt, StorePlugin,
//! };
//! use ferry::store::{Object, Value};
//!
//! let counter = Object::new()
//!     .with("num", 0)
//!     .with_computed("numPlus", |this| {
//!         Value::Number(this.get("num").as_number().unwrap_or_default() + 1.0)
//!     })
//!     .with_action("setNum", |this, args| {
//!         this.set("num", args[0].clone());
//!         Value::Undefined
//!     });
//!
//! let host = Host::new();
//! host.use_plugin(StorePlugin::new());
//!
//! let vm = host.mount(
//!     ComponentOptions::new()
//!         .with_store(counter)
//!         .with_map_state(StateDeclaration::list(["num", "numPlus"]))
//!         .with_map_action(ActionDeclaration::list(["setNum"]))
//!         .render(|vm| format!("{}|{}", vm.get("num"), vm.get("numPlus"))),
//! );
//! assert_eq!(vm.text(), "0|1");
//!
//! vm.call("setNum", &[2.into()]).unwrap();
//! host.next_tick();
//! assert_eq!(vm.text(), "2|3");
//! ```
//!
//! ## Lifecycle
//!
//! The plugin hooks into every instance the host creates:
//!
//! - before create: the store is resolved (own option, then the parent's store,
//!   then the plugin default), declarations from mixins, the component and the
//!   compatibility entries are merged, and each binding gets a cell and a
//!   computed property; each action becomes a method.
//! - created: one subscription per binding is established.
//! - before destroy: subscriptions are disposed, then cells are removed.
//!
//! Malformed declarations, missing store fields and writes to read-only
//! bindings never fail: they are logged with `tracing` and ignored.

pub mod change_detector;
pub mod compat;
pub mod component;
pub mod declaration;
mod error;
pub mod helpers;
pub mod host;
mod install;
pub mod instance;
pub mod normalize;
pub mod path;
mod scheduler;
pub mod source;
pub mod store_ref;

pub use change_detector::ChangeDetector;
pub use compat::{map_action, map_state, MAP_ACTION_FIELD, MAP_STATE_FIELD};
pub use component::{ComponentOptions, ComputedEntry, ComputedProperty, MethodEntry};
pub use declaration::{
    Accessor, ActionDeclaration, ActionField, Mutator, StateDeclaration, StateField,
};
pub use error::{Error, Result};
pub use ferry_reactive as reactive;
pub use ferry_store as store;
pub use helpers::{create_store, map_fields, map_methods};
pub use host::{Host, LifecycleHooks, Plugin};
pub use install::{
    InstanceStoreExt, StoreOptionsExt, StorePlugin, MAP_ACTION_OPTION, MAP_STATE_OPTION,
    STORE_OPTION,
};
pub use instance::{Instance, InstanceId, WeakInstance};
pub use normalize::{ActionDescriptor, BindingDescriptor};
pub use source::{ObservableStore, SourceSystem};
pub use store_ref::{StoreOption, STORE_PROPERTY};
