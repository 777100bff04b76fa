//! Subscriptions to observable reads.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use ferry_reactive::{batch, Scope};

/// Tears down a subscription.
///
/// Disposing is idempotent: only the first call runs the teardown, later calls are
/// no-ops. Clones share the same teardown.
#[derive(Clone)]
pub struct Disposer {
    teardown: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Disposer {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))),
        }
    }

    pub fn dispose(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.teardown.borrow().is_none()
    }
}

/// Runs `track` now and again whenever a value it read changes; `effect` receives
/// the new result each time it differs from the previous one.
///
/// `effect` is not called for the first run. It runs untracked and inside an
/// action. Once the returned [`Disposer`] is disposed neither closure runs again.
pub fn reaction<T>(track: impl Fn() -> T + 'static, effect: impl Fn(T) + 'static) -> Disposer
where
    T: PartialEq + Clone + 'static,
{
    let scope = Scope::new();
    let alive = Rc::new(Cell::new(true));
    let previous: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));

    let initial = scope.create_updater(track, {
        let alive = alive.clone();
        let previous = previous.clone();
        move |value: T| {
            if !alive.get() {
                return;
            }
            if previous.borrow().as_ref() == Some(&value) {
                return;
            }
            *previous.borrow_mut() = Some(value.clone());
            batch(|| effect(value));
        }
    });
    *previous.borrow_mut() = Some(initial);

    Disposer::new(move || {
        alive.set(false);
        scope.dispose();
        tracing::trace!("reaction disposed");
    })
}

/// Runs `f` now and again whenever a value it read changes.
pub fn autorun(f: impl Fn() + 'static) -> Disposer {
    let scope = Scope::new();
    scope.create_effect(move |_| f());
    Disposer::new(move || scope.dispose())
}

/// Applies a group of writes as one change: reactions run once, after `f` returns.
pub fn run_in_action<O>(f: impl FnOnce() -> O) -> O {
    batch(f)
}
