//! Live component instances.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use ferry_reactive::{RwSignal, Scope};
use ferry_store::Value;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::{
    component::{ComponentOptions, ComputedEntry, ComputedProperty, Method, MethodEntry},
    error::{Error, Result},
    host::Host,
};

/// Unique identifier of an instance within its host. Parents always have a
/// smaller id than their children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub(crate) u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct InstanceState {
    pub(crate) id: InstanceId,
    pub(crate) host: Host,
    pub(crate) options: Rc<ComponentOptions>,
    pub(crate) scope: Scope,
    pub(crate) parent: Option<WeakInstance>,
    pub(crate) children: RefCell<Vec<Instance>>,
    data: RefCell<IndexMap<String, RwSignal<Value>>>,
    cells: RefCell<FxHashMap<String, RwSignal<Value>>>,
    computed: RefCell<IndexMap<String, ComputedEntry>>,
    methods: RefCell<IndexMap<String, MethodEntry>>,
    properties: RefCell<FxHashMap<String, Value>>,
    /// Last committed render output.
    text: RwSignal<String>,
    /// Render output waiting for the next flush.
    pub(crate) rendered: RefCell<Option<String>>,
    pub(crate) destroyed: Cell<bool>,
}

impl Drop for InstanceState {
    fn drop(&mut self) {
        if !self.destroyed.get() {
            self.scope.dispose();
        }
    }
}

/// A component instance.
///
/// `Instance` is a cheap handle; clones refer to the same instance. The
/// instance's signals and effects live in its own [`Scope`], released on
/// [`Instance::destroy`].
///
/// Dropping the last handle without [`Instance::destroy`] skips the
/// `before_destroy` hooks: the scope is released, and store bindings are released
/// the next time the host creates an instance.
#[derive(Clone)]
pub struct Instance {
    pub(crate) state: Rc<InstanceState>,
}

/// A non-owning [`Instance`] handle.
#[derive(Clone)]
pub struct WeakInstance(Weak<InstanceState>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(|state| Instance { state })
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(instance) => write!(f, "WeakInstance({})", instance.id()),
            None => f.write_str("WeakInstance(dropped)"),
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.state.id)
            .field("name", &self.state.options.get_name())
            .field("destroyed", &self.state.destroyed.get())
            .finish()
    }
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        host: Host,
        options: Rc<ComponentOptions>,
        parent: Option<&Instance>,
    ) -> Self {
        let scope = match parent {
            Some(parent) => parent.state.scope.create_child(),
            None => Scope::new(),
        };

        let mut data = IndexMap::new();
        let mut computed = IndexMap::new();
        let mut methods = IndexMap::new();
        for source in options.lineage() {
            data.extend(
                source
                    .data
                    .iter()
                    .map(|(key, value)| (key.clone(), scope.create_rw_signal(value.clone()))),
            );
            computed.extend(source.computed.clone());
            methods.extend(source.methods.clone());
        }

        Instance {
            state: Rc::new(InstanceState {
                id,
                host,
                options,
                scope,
                parent: parent.map(Instance::downgrade),
                children: RefCell::new(Vec::new()),
                data: RefCell::new(data),
                cells: RefCell::new(FxHashMap::default()),
                computed: RefCell::new(computed),
                methods: RefCell::new(methods),
                properties: RefCell::new(FxHashMap::default()),
                text: scope.create_rw_signal(String::new()),
                rendered: RefCell::new(None),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.state.id
    }

    pub fn options(&self) -> &Rc<ComponentOptions> {
        &self.state.options
    }

    pub fn host(&self) -> &Host {
        &self.state.host
    }

    pub fn scope(&self) -> Scope {
        self.state.scope
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.state))
    }

    pub fn parent(&self) -> Option<Instance> {
        self.state.parent.as_ref()?.upgrade()
    }

    pub fn children(&self) -> Vec<Instance> {
        self.state.children.borrow().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.destroyed.get()
    }

    /// Reads `key`: a data field, a computed property or an instance property,
    /// in that order. Data fields and computed properties are tracked.
    pub fn get(&self, key: &str) -> Value {
        let data = self.state.data.borrow().get(key).copied();
        if let Some(signal) = data {
            return signal.get().unwrap_or_default();
        }

        let computed = self.state.computed.borrow().get(key).cloned();
        match computed {
            Some(ComputedEntry::Property(property)) => return (property.get)(self),
            Some(ComputedEntry::Custom(_)) => return Value::Undefined,
            None => {}
        }

        self.property(key).unwrap_or_default()
    }

    /// Assigns `key`. Data fields are only written when the value changes;
    /// computed properties go through their setter.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let data = self.state.data.borrow().get(key).copied();
        if let Some(signal) = data {
            signal.set_if_changed(value);
            return;
        }

        let computed = self.state.computed.borrow().get(key).cloned();
        match computed {
            Some(ComputedEntry::Property(ComputedProperty { set: Some(set), .. })) => {
                set(self, value)
            }
            Some(_) => tracing::warn!(
                instance = %self.id(),
                key,
                "computed property was assigned to but it has no setter"
            ),
            None => tracing::warn!(
                instance = %self.id(),
                key,
                "assignment to an undeclared property is ignored"
            ),
        }
    }

    /// Calls the method `key`.
    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value> {
        if self.is_destroyed() {
            return Err(Error::Destroyed(self.id()));
        }
        let method = match self.state.methods.borrow().get(key) {
            Some(MethodEntry::Method(method)) => method.clone(),
            _ => {
                return Err(Error::UnknownMethod {
                    instance: self.id(),
                    name: key.to_string(),
                });
            }
        };
        Ok(method(self, args))
    }

    /// The committed render output. Tracked, so a parent's render can embed it.
    pub fn text(&self) -> String {
        self.state.text.get().unwrap_or_default()
    }

    pub(crate) fn commit(&self, text: String) {
        self.state.text.set_if_changed(text);
    }

    // Cells: reactive slots owned by the instance, equivalent to data fields but
    // managed by plugins rather than declared by the component.

    /// Creates the cell `key` holding `initial`. An existing cell is replaced.
    pub fn define_cell(&self, key: impl Into<String>, initial: Value) {
        let signal = self.state.scope.create_rw_signal(initial);
        let previous = self.state.cells.borrow_mut().insert(key.into(), signal);
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    /// Tracked read of the cell `key`; `Undefined` when there is no such cell.
    pub fn read_cell(&self, key: &str) -> Value {
        let cell = self.state.cells.borrow().get(key).copied();
        cell.and_then(|signal| signal.get()).unwrap_or_default()
    }

    pub fn read_cell_untracked(&self, key: &str) -> Value {
        let cell = self.state.cells.borrow().get(key).copied();
        cell.and_then(|signal| signal.get_untracked())
            .unwrap_or_default()
    }

    /// Writes the cell `key`, notifying readers only when the value changed.
    /// Returns whether anything was written.
    pub fn write_cell(&self, key: &str, value: Value) -> bool {
        let Some(signal) = self.state.cells.borrow().get(key).copied() else {
            return false;
        };
        signal.set_if_changed(value)
    }

    pub fn remove_cell(&self, key: &str) -> bool {
        let removed = self.state.cells.borrow_mut().remove(key);
        removed.map(|signal| signal.dispose()).is_some()
    }

    pub fn has_cell(&self, key: &str) -> bool {
        self.state.cells.borrow().contains_key(key)
    }

    pub fn define_computed(&self, key: impl Into<String>, property: ComputedProperty) {
        self.state
            .computed
            .borrow_mut()
            .insert(key.into(), ComputedEntry::Property(property));
    }

    /// Removes and returns the `computed` entry `key`.
    pub fn take_computed_entry(&self, key: &str) -> Option<ComputedEntry> {
        self.state.computed.borrow_mut().shift_remove(key)
    }

    pub fn define_method(
        &self,
        key: impl Into<String>,
        method: impl Fn(&Instance, &[Value]) -> Value + 'static,
    ) {
        let method: Method = Rc::new(method);
        self.state
            .methods
            .borrow_mut()
            .insert(key.into(), MethodEntry::Method(method));
    }

    /// Removes and returns the `methods` entry `key`.
    pub fn take_method_entry(&self, key: &str) -> Option<MethodEntry> {
        self.state.methods.borrow_mut().shift_remove(key)
    }

    pub fn has_method(&self, key: &str) -> bool {
        matches!(
            self.state.methods.borrow().get(key),
            Some(MethodEntry::Method(_))
        )
    }

    /// Sets a plain, non-reactive instance property.
    pub fn set_property(&self, key: impl Into<String>, value: Value) {
        self.state.properties.borrow_mut().insert(key.into(), value);
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.state.properties.borrow().get(key).cloned()
    }

    /// Tears the instance down: `before_destroy` hooks, then children, then the
    /// instance's reactive scope. Destroying twice is a no-op.
    pub fn destroy(&self) {
        if self.state.destroyed.replace(true) {
            return;
        }
        tracing::debug!(instance = %self.id(), "destroying instance");

        let host = self.state.host.clone();
        host.run_before_destroy(self);

        let children = std::mem::take(&mut *self.state.children.borrow_mut());
        for child in children {
            child.destroy();
        }
        if let Some(parent) = self.parent() {
            parent.state.children.borrow_mut().retain(|child| child != self);
        }

        self.state.cells.borrow_mut().clear();
        self.state.scope.dispose();
        self.state.rendered.borrow_mut().take();
    }
}
