use std::{cell::Cell, rc::Rc};

use ferry_reactive::{live_count, Atom, Effect, RwSignal, Scope};

#[test]
fn dispose_releases_everything_in_scope() {
    let baseline = live_count();

    let scope = Scope::new();
    let signal = scope.create_rw_signal(1);
    scope.create_effect(move |_| signal.track());
    scope.create_child().create_rw_signal("child");
    assert_eq!(live_count(), baseline + 3);

    scope.dispose();
    assert_eq!(live_count(), baseline);
    assert!(signal.is_disposed());
    assert_eq!(signal.get(), None);

    scope.dispose();
    assert_eq!(live_count(), baseline);
}

#[test]
fn effects_in_disposed_scope_stop_running() {
    let source = RwSignal::new(0);
    let runs = Rc::new(Cell::new(0));

    let scope = Scope::new();
    scope.create_effect({
        let runs = runs.clone();
        move |_| {
            source.track();
            runs.set(runs.get() + 1);
        }
    });
    source.set(1);
    assert_eq!(runs.get(), 2);

    scope.dispose();
    source.set(2);
    assert_eq!(runs.get(), 2);
}

#[test]
fn disposed_signals_ignore_access() {
    let scope = Scope::new();
    let signal = scope.create_rw_signal(1);
    scope.dispose();

    signal.set(2);
    assert_eq!(signal.update(|value| *value += 1), None);
    assert_eq!(signal.with(|value| *value), None);
    assert!(!signal.set_if_changed(3));
}

#[test]
fn nested_effect_is_recreated_with_its_parent() {
    let outer = RwSignal::new(0);
    let inner = RwSignal::new(0);
    let inner_runs = Rc::new(Cell::new(0));

    Effect::new({
        let inner_runs = inner_runs.clone();
        move |_| {
            outer.track();
            let inner_runs = inner_runs.clone();
            Effect::new(move |_| {
                inner.track();
                inner_runs.set(inner_runs.get() + 1);
            });
        }
    });
    assert_eq!(inner_runs.get(), 1);

    // the outer run disposes the inner effect it created last time
    outer.set(1);
    assert_eq!(inner_runs.get(), 2);

    inner.set(1);
    assert_eq!(inner_runs.get(), 3);
}

#[test]
fn atoms_outlive_the_scope_they_were_made_in() {
    let baseline = live_count();
    let scope = Scope::new();
    let atom = scope.enter(Atom::new);
    let handle = atom.handle();
    scope.dispose();
    assert_eq!(live_count(), baseline + 1);

    let runs = Rc::new(Cell::new(0));
    Effect::new({
        let runs = runs.clone();
        move |_| {
            atom.track();
            runs.set(runs.get() + 1);
        }
    });
    handle.notify();
    assert_eq!(runs.get(), 2);
}

#[test]
fn atoms_notify_and_dispose_on_drop() {
    let baseline = live_count();
    let atom = Atom::new();
    let handle = atom.handle();
    let runs = Rc::new(Cell::new(0));

    let scope = Scope::new();
    scope.create_effect({
        let runs = runs.clone();
        move |_| {
            atom.track();
            runs.set(runs.get() + 1);
        }
    });
    handle.notify();
    assert_eq!(runs.get(), 2);

    // the effect owned the atom
    scope.dispose();
    assert_eq!(live_count(), baseline);
    handle.notify();
    assert_eq!(runs.get(), 2);
}
