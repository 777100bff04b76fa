mod common;

use common::{counter, host, join};
use ferry::store::Value;
use ferry::{
    map_action, map_state, ActionDeclaration, ComponentOptions, StateDeclaration,
    StoreOptionsExt, MAP_ACTION_FIELD, MAP_STATE_FIELD,
};

#[test]
fn map_state_and_map_action_in_computed_and_methods() {
    let host = host();
    let vm = host.mount(
        ComponentOptions::new()
            .with_store(counter())
            .extend_computed([map_state(StateDeclaration::list(["num", "numPlus"]))])
            .extend_methods([map_action(ActionDeclaration::list(["setNum", "plus", "reset"]))])
            .render(join(&["num", "numPlus"])),
    );
    assert_eq!(vm.text(), "0|1");

    vm.call("setNum", &[2.into()]).unwrap();
    host.next_tick();
    assert_eq!(vm.text(), "2|3");

    vm.call("plus", &[]).unwrap();
    host.next_tick();
    assert_eq!(vm.text(), "3|4");

    vm.call("reset", &[]).unwrap();
    host.next_tick();
    assert_eq!(vm.text(), "0|1");
}

#[test]
fn reserved_entries_are_consumed() {
    let host = host();
    let vm = host.mount(
        ComponentOptions::new()
            .with_store(counter())
            .extend_computed([map_state(StateDeclaration::list(["num"]))])
            .extend_methods([map_action(ActionDeclaration::list(["plus"]))]),
    );
    assert_eq!(vm.get(MAP_STATE_FIELD), Value::Undefined);
    assert!(!vm.has_method(MAP_ACTION_FIELD));
    assert!(vm.has_method("plus"));
}

#[test]
fn native_declarations_win_over_compat_ones() {
    let host = host();
    let vm = host.mount(
        ComponentOptions::new()
            .with_store(counter())
            .with_map_state(StateDeclaration::map().path("value", "numPlus"))
            .extend_computed([map_state(
                StateDeclaration::map()
                    .path("value", "num")
                    .path("other", "num"),
            )])
            .with_map_action(ActionDeclaration::map().path("bump", "plus"))
            .extend_methods([map_action(ActionDeclaration::map().path("bump", "reset"))])
            .render(join(&["value", "other"])),
    );
    assert_eq!(vm.text(), "1|0");

    vm.call("bump", &[]).unwrap();
    host.next_tick();
    assert_eq!(vm.text(), "2|1");
}

#[test]
fn compat_entries_from_mixins_are_ignored_when_overridden() {
    // the reserved key follows the usual computed merge: the component's own
    // entry replaces the mixin's
    let host = host();
    let vm = host.mount(
        ComponentOptions::new()
            .with_store(counter())
            .mixin(
                ComponentOptions::new()
                    .extend_computed([map_state(StateDeclaration::list(["numPlus"]))]),
            )
            .extend_computed([map_state(StateDeclaration::list(["num"]))]),
    );
    assert_eq!(vm.get("num"), Value::from(0));
    assert!(!vm.has_cell("numPlus"));
}
