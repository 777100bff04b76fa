//! Component declarations.
//!
//! A [`ComponentOptions`] describes what every instance of a component gets: data
//! fields, computed properties, methods, watchers, a render function, mixins,
//! child components and arbitrary custom options read by plugins.

use std::{any::Any, fmt, rc::Rc};

use ferry_store::Value;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::{host::LifecycleHooks, instance::Instance};

pub type Getter = Rc<dyn Fn(&Instance) -> Value>;
pub type Setter = Rc<dyn Fn(&Instance, Value)>;
pub type Method = Rc<dyn Fn(&Instance, &[Value]) -> Value>;
pub type WatchHandler = Rc<dyn Fn(&Instance, Value, Value)>;
pub type Render = Rc<dyn Fn(&Instance) -> String>;

/// A computed property: read through `get`, assigned through `set` when present.
#[derive(Clone)]
pub struct ComputedProperty {
    pub get: Getter,
    pub set: Option<Setter>,
}

impl ComputedProperty {
    pub fn new(get: impl Fn(&Instance) -> Value + 'static) -> Self {
        Self {
            get: Rc::new(get),
            set: None,
        }
    }

    pub fn with_setter(mut self, set: impl Fn(&Instance, Value) + 'static) -> Self {
        self.set = Some(Rc::new(set));
        self
    }
}

impl fmt::Debug for ComputedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedProperty")
            .field("writable", &self.set.is_some())
            .finish()
    }
}

/// An entry of the `computed` group. Plugins may reserve keys in the group for
/// their own data.
#[derive(Clone)]
pub enum ComputedEntry {
    Property(ComputedProperty),
    Custom(Rc<dyn Any>),
}

impl From<ComputedProperty> for ComputedEntry {
    fn from(property: ComputedProperty) -> Self {
        ComputedEntry::Property(property)
    }
}

/// An entry of the `methods` group. Plugins may reserve keys in the group for
/// their own data.
#[derive(Clone)]
pub enum MethodEntry {
    Method(Method),
    Custom(Rc<dyn Any>),
}

impl MethodEntry {
    pub fn method(f: impl Fn(&Instance, &[Value]) -> Value + 'static) -> Self {
        MethodEntry::Method(Rc::new(f))
    }
}

#[derive(Default)]
pub struct ComponentOptions {
    pub(crate) name: Option<String>,
    pub(crate) data: IndexMap<String, Value>,
    pub(crate) computed: IndexMap<String, ComputedEntry>,
    pub(crate) methods: IndexMap<String, MethodEntry>,
    pub(crate) watch: Vec<(String, WatchHandler)>,
    pub(crate) render: Option<Render>,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) mixins: Vec<Rc<ComponentOptions>>,
    pub(crate) children: Vec<Rc<ComponentOptions>>,
    custom: FxHashMap<String, Rc<dyn Any>>,
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("mixins", &self.mixins.len())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a reactive data field. Every instance starts from a clone of `value`.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn computed(
        self,
        key: impl Into<String>,
        get: impl Fn(&Instance) -> Value + 'static,
    ) -> Self {
        self.computed_property(key, ComputedProperty::new(get))
    }

    pub fn computed_property(mut self, key: impl Into<String>, property: ComputedProperty) -> Self {
        self.computed
            .insert(key.into(), ComputedEntry::Property(property));
        self
    }

    /// Adds several entries to the `computed` group at once.
    pub fn extend_computed<K: Into<String>>(
        mut self,
        entries: impl IntoIterator<Item = (K, ComputedEntry)>,
    ) -> Self {
        self.computed
            .extend(entries.into_iter().map(|(key, entry)| (key.into(), entry)));
        self
    }

    pub fn method(
        mut self,
        key: impl Into<String>,
        f: impl Fn(&Instance, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.insert(key.into(), MethodEntry::method(f));
        self
    }

    /// Adds several entries to the `methods` group at once.
    pub fn extend_methods<K: Into<String>>(
        mut self,
        entries: impl IntoIterator<Item = (K, MethodEntry)>,
    ) -> Self {
        self.methods
            .extend(entries.into_iter().map(|(key, entry)| (key.into(), entry)));
        self
    }

    /// Calls `handler(instance, new, old)` after a flush in which the value read
    /// through `key` changed.
    pub fn watch(
        mut self,
        key: impl Into<String>,
        handler: impl Fn(&Instance, Value, Value) + 'static,
    ) -> Self {
        self.watch.push((key.into(), Rc::new(handler)));
        self
    }

    pub fn render(mut self, render: impl Fn(&Instance) -> String + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Component level lifecycle hooks. They run after the host level ones.
    pub fn hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn mixin(mut self, mixin: ComponentOptions) -> Self {
        self.mixins.push(Rc::new(mixin));
        self
    }

    /// A child component, created and mounted together with this one.
    pub fn child(mut self, child: ComponentOptions) -> Self {
        self.children.push(Rc::new(child));
        self
    }

    /// Stores a custom option under `name`, for plugins to pick up.
    pub fn with_option<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.custom.insert(name.into(), Rc::new(value));
        self
    }

    /// The custom option `name`, if it was set with type `T`.
    pub fn option<T: Any>(&self, name: &str) -> Option<&T> {
        self.custom.get(name)?.downcast_ref()
    }

    pub fn mixins(&self) -> &[Rc<ComponentOptions>] {
        &self.mixins
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// This component and its mixins, depth first with mixins before the
    /// component that declares them.
    pub fn lineage(&self) -> Vec<&ComponentOptions> {
        let mut lineage = Vec::new();
        self.collect_lineage(&mut lineage);
        lineage
    }

    fn collect_lineage<'a>(&'a self, lineage: &mut Vec<&'a ComponentOptions>) {
        for mixin in &self.mixins {
            mixin.collect_lineage(lineage);
        }
        lineage.push(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineage_is_depth_first_with_mixins_first() {
        let options = ComponentOptions::new()
            .name("root")
            .mixin(
                ComponentOptions::new()
                    .name("a")
                    .mixin(ComponentOptions::new().name("a1")),
            )
            .mixin(ComponentOptions::new().name("b"));

        let names: Vec<_> = options
            .lineage()
            .into_iter()
            .filter_map(ComponentOptions::get_name)
            .collect();
        assert_eq!(names, ["a1", "a", "b", "root"]);
    }

    #[test]
    fn custom_options_are_typed() {
        let options = ComponentOptions::new().with_option("flag", 7u8);
        assert_eq!(options.option::<u8>("flag"), Some(&7));
        assert_eq!(options.option::<u16>("flag"), None);
        assert_eq!(options.option::<u8>("missing"), None);
    }
}
