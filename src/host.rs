//! The host: creates, mounts and schedules component instances.

use std::{
    any::TypeId,
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use ferry_store::Value;
use rustc_hash::FxHashSet;

use crate::{
    component::ComponentOptions,
    instance::{Instance, InstanceId},
    scheduler::{JobKey, JobKind, Scheduler},
};

pub type Hook = Rc<dyn Fn(&Instance)>;

/// Typed lifecycle callbacks.
///
/// `before_create` runs once data fields and the component's own computed
/// properties and methods exist, before watchers are wired; `created` runs
/// after. `before_destroy` runs first thing on destroy, while everything is
/// still alive.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub before_create: Option<Hook>,
    pub created: Option<Hook>,
    pub before_destroy: Option<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_create(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.before_create = Some(Rc::new(hook));
        self
    }

    pub fn on_created(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.created = Some(Rc::new(hook));
        self
    }

    pub fn on_before_destroy(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.before_destroy = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before_create", &self.before_create.is_some())
            .field("created", &self.created.is_some())
            .field("before_destroy", &self.before_destroy.is_some())
            .finish()
    }
}

/// Extends a [`Host`]. Each plugin type is installed at most once per host.
pub trait Plugin: 'static {
    fn install(&self, host: &Host);
}

#[derive(Default)]
struct HostState {
    hooks: RefCell<Vec<LifecycleHooks>>,
    plugins: RefCell<FxHashSet<TypeId>>,
    scheduler: Scheduler,
    next_id: Cell<u64>,
}

/// Owns lifecycle hooks, plugins and the render/watcher scheduler shared by the
/// instances it creates.
///
/// Changes made to reactive state are applied right away, but watchers are
/// called and render output is committed only on [`Host::next_tick`].
#[derive(Clone, Default)]
pub struct Host {
    state: Rc<HostState>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("hooks", &self.state.hooks.borrow().len())
            .field("plugins", &self.state.plugins.borrow().len())
            .field("pending_jobs", &self.state.scheduler.pending())
            .finish()
    }
}

enum Stage {
    BeforeCreate,
    Created,
    BeforeDestroy,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks apply to every instance created afterwards, in registration order.
    pub fn register_lifecycle_hooks(&self, hooks: LifecycleHooks) {
        self.state.hooks.borrow_mut().push(hooks);
    }

    /// Installs `plugin`, unless a plugin of the same type already is.
    /// Returns whether it was installed.
    pub fn use_plugin<P: Plugin>(&self, plugin: P) -> bool {
        if !self.state.plugins.borrow_mut().insert(TypeId::of::<P>()) {
            tracing::debug!(
                plugin = std::any::type_name::<P>(),
                "plugin already installed"
            );
            return false;
        }
        plugin.install(self);
        true
    }

    /// Creates and mounts a root instance, along with its declared children.
    /// The first render is committed before this returns.
    pub fn mount(&self, options: ComponentOptions) -> Instance {
        let instance = self.create(Rc::new(options), None);
        self.mount_instance(&instance);
        instance
    }

    /// Creates and mounts a child of `parent`.
    pub fn mount_child(&self, parent: &Instance, options: ComponentOptions) -> Instance {
        let child = self.create(Rc::new(options), Some(parent));
        self.mount_instance(&child);
        child
    }

    /// Runs queued watchers and commits pending renders.
    pub fn next_tick(&self) {
        self.state.scheduler.flush();
    }

    pub fn pending_jobs(&self) -> usize {
        self.state.scheduler.pending()
    }

    fn next_id(&self) -> InstanceId {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        InstanceId(id)
    }

    fn create(&self, options: Rc<ComponentOptions>, parent: Option<&Instance>) -> Instance {
        let instance = Instance::new(self.next_id(), self.clone(), options, parent);
        tracing::trace!(instance = %instance.id(), "creating instance");

        self.run_hooks(Stage::BeforeCreate, &instance);
        self.wire_watchers(&instance);
        self.run_hooks(Stage::Created, &instance);

        if let Some(parent) = parent {
            parent.state.children.borrow_mut().push(instance.clone());
        }
        instance
    }

    fn mount_instance(&self, instance: &Instance) {
        let children = instance.options().children.clone();
        for child in children {
            let child = self.create(child, Some(instance));
            self.mount_instance(&child);
        }
        self.wire_render(instance);
    }

    pub(crate) fn run_before_destroy(&self, instance: &Instance) {
        self.run_hooks(Stage::BeforeDestroy, instance);
    }

    fn run_hooks(&self, stage: Stage, instance: &Instance) {
        let pick = |hooks: &LifecycleHooks| match stage {
            Stage::BeforeCreate => hooks.before_create.clone(),
            Stage::Created => hooks.created.clone(),
            Stage::BeforeDestroy => hooks.before_destroy.clone(),
        };

        let mut hooks: Vec<Hook> = self
            .state
            .hooks
            .borrow()
            .iter()
            .filter_map(|hooks| pick(hooks))
            .collect();
        hooks.extend(
            instance
                .options()
                .lineage()
                .into_iter()
                .filter_map(|options| pick(&options.hooks)),
        );

        ferry_reactive::untrack(|| {
            for hook in hooks {
                hook(instance);
            }
        });
    }

    fn wire_watchers(&self, instance: &Instance) {
        let watchers: Vec<_> = instance
            .options()
            .lineage()
            .into_iter()
            .flat_map(|options| options.watch.iter().cloned())
            .collect();

        for (index, (key, handler)) in watchers.into_iter().enumerate() {
            let job_key = JobKey {
                instance: instance.id(),
                kind: JobKind::Watch(index),
            };
            let delivered = Rc::new(RefCell::new(Value::Undefined));
            let latest: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

            let job: Rc<dyn Fn()> = {
                let weak = instance.downgrade();
                let delivered = delivered.clone();
                let latest = latest.clone();
                Rc::new(move || {
                    let Some(instance) = weak.upgrade() else {
                        return;
                    };
                    let Some(value) = latest.borrow_mut().take() else {
                        return;
                    };
                    if *delivered.borrow() == value {
                        return;
                    }
                    let old = delivered.replace(value.clone());
                    handler(&instance, value, old);
                })
            };

            let weak = instance.downgrade();
            let host = self.clone();
            let initial = instance.scope().create_updater(
                move || {
                    weak.upgrade()
                        .map(|instance| instance.get(&key))
                        .unwrap_or_default()
                },
                move |value| {
                    *latest.borrow_mut() = Some(value);
                    host.state.scheduler.queue(job_key, job.clone());
                },
            );
            *delivered.borrow_mut() = initial;
        }
    }

    fn wire_render(&self, instance: &Instance) {
        let Some(render) = instance.options().render.clone() else {
            return;
        };
        let job_key = JobKey {
            instance: instance.id(),
            kind: JobKind::Render,
        };
        let commit: Rc<dyn Fn()> = {
            let weak = instance.downgrade();
            Rc::new(move || {
                if let Some(instance) = weak.upgrade() {
                    let rendered = instance.state.rendered.borrow_mut().take();
                    if let Some(text) = rendered {
                        instance.commit(text);
                    }
                }
            })
        };

        let weak = instance.downgrade();
        let host = self.clone();
        instance.scope().create_effect(move |mounted: Option<()>| {
            let Some(instance) = weak.upgrade() else {
                return;
            };
            let text = render(&instance);
            if mounted.is_none() {
                ferry_reactive::untrack(|| instance.commit(text));
            } else {
                *instance.state.rendered.borrow_mut() = Some(text);
                host.state.scheduler.queue(job_key, commit.clone());
            }
        });
    }
}
