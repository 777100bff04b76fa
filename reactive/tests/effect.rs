use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use ferry_reactive::{batch, create_updater, untrack, Effect, RwSignal};

fn counting_effect(sources: &[RwSignal<i32>]) -> Rc<Cell<usize>> {
    let runs = Rc::new(Cell::new(0));
    let sources = sources.to_vec();
    Effect::new({
        let runs = runs.clone();
        move |_| {
            for source in &sources {
                source.track();
            }
            runs.set(runs.get() + 1);
        }
    });
    runs
}

#[test]
fn each_write_reruns_the_effect() {
    let width = RwSignal::new(1);
    let height = RwSignal::new(1);
    let runs = counting_effect(&[width, height]);
    assert_eq!(runs.get(), 1);

    width.set(2);
    height.set(2);
    assert_eq!(runs.get(), 3);
}

#[test]
fn batched_writes_run_the_effect_once() {
    let width = RwSignal::new(1);
    let height = RwSignal::new(1);
    let runs = counting_effect(&[width, height]);

    batch(|| {
        width.set(2);
        batch(|| {
            height.set(2);
            width.set(3);
        });
        assert_eq!(runs.get(), 1, "inner batch must not flush");
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn writing_inside_an_effect_reruns_it_right_away() {
    let state = RwSignal::new(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    Effect::new({
        let log = log.clone();
        move |_| {
            let value = state.get().unwrap_or_default();
            log.borrow_mut().push(format!("run {value}"));
            if value == 0 {
                state.set(1);
                log.borrow_mut().push("after write".to_string());
            }
        }
    });

    assert_eq!(*log.borrow(), ["run 0", "run 1", "after write"]);
}

#[test]
fn untracked_reads_do_not_subscribe() {
    let signal = RwSignal::new(0);
    let tracked = counting_effect(&[signal]);
    let untracked = Rc::new(Cell::new(0));

    Effect::new({
        let untracked = untracked.clone();
        move |_| {
            untrack(|| signal.get());
            signal.get_untracked();
            signal.with_untracked(|_| ());
            untracked.set(untracked.get() + 1);
        }
    });

    signal.set(1);
    assert_eq!(tracked.get(), 2);
    assert_eq!(untracked.get(), 1);
}

#[test]
fn dependencies_follow_the_latest_run() {
    let use_left = RwSignal::new(true);
    let left = RwSignal::new(0);
    let right = RwSignal::new(0);
    let runs = Rc::new(Cell::new(0));

    Effect::new({
        let runs = runs.clone();
        move |_| {
            runs.set(runs.get() + 1);
            if use_left.get() == Some(true) {
                left.track();
            } else {
                right.track();
            }
        }
    });

    right.set(1);
    assert_eq!(runs.get(), 1);

    use_left.set(false);
    left.set(1);
    assert_eq!(runs.get(), 2);

    right.set(2);
    assert_eq!(runs.get(), 3);
}

#[test]
fn disposing_drops_a_queued_run() {
    let signal = RwSignal::new(0);
    let runs = Rc::new(Cell::new(0));
    let effect = Effect::new({
        let runs = runs.clone();
        move |_| {
            signal.track();
            runs.set(runs.get() + 1);
        }
    });

    batch(|| {
        signal.set(1);
        effect.dispose();
    });
    signal.set(2);
    assert_eq!(runs.get(), 1);
    assert!(effect.is_disposed());

    effect.dispose();
    assert!(effect.is_disposed());
}

#[test]
fn effect_sees_its_previous_result() {
    let signal = RwSignal::new(1);
    let seen = Rc::new(RefCell::new(Vec::new()));

    Effect::new({
        let seen = seen.clone();
        move |previous: Option<i32>| {
            let value = signal.get().unwrap_or_default();
            seen.borrow_mut().push((previous, value));
            value
        }
    });

    signal.set(5);
    assert_eq!(*seen.borrow(), [(None, 1), (Some(1), 5)]);
}

#[test]
fn updater_hands_later_values_to_on_change() {
    let source = RwSignal::new(2);
    let other = RwSignal::new(0);
    let changes = Rc::new(RefCell::new(Vec::new()));

    let initial = create_updater(move || source.get().unwrap_or_default() * 10, {
        let changes = changes.clone();
        move |value| {
            other.get();
            changes.borrow_mut().push(value);
        }
    });
    assert_eq!(initial, 20);
    assert!(changes.borrow().is_empty());

    source.set(3);
    other.set(1);
    assert_eq!(*changes.borrow(), [30]);
}

#[test]
fn unchanged_writes_are_skipped() {
    let signal = RwSignal::new(String::from("a"));
    let runs = Rc::new(Cell::new(0));
    Effect::new({
        let runs = runs.clone();
        move |_| {
            signal.track();
            runs.set(runs.get() + 1);
        }
    });

    assert!(!signal.set_if_changed("a".to_string()));
    assert_eq!(runs.get(), 1);

    assert!(signal.set_if_changed("b".to_string()));
    assert_eq!(runs.get(), 2);
    assert_eq!(signal.get_untracked().as_deref(), Some("b"));
}
