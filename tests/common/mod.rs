#![allow(dead_code)]

use ferry::store::{Object, Value};
use ferry::{Host, StorePlugin};

/// `{ num, numPlus, setNum(value), plus(), reset() }`
pub fn counter() -> Object {
    Object::new()
        .with("num", 0)
        .with_computed("numPlus", |this| Value::Number(num(&this.get("num")) + 1.0))
        .with_action("setNum", |this, args| {
            this.set("num", args.first().cloned().unwrap_or_default());
            Value::Undefined
        })
        .with_action("plus", |this, _| {
            let next = num(&this.get_untracked("num")) + 1.0;
            this.call("setNum", &[next.into()])
        })
        .with_action("reset", |this, _| this.call("setNum", &[0.into()]))
}

pub fn num(value: &Value) -> f64 {
    value.as_number().unwrap_or(f64::NAN)
}

pub fn host_with(plugin: StorePlugin) -> Host {
    let host = Host::new();
    host.use_plugin(plugin);
    host
}

pub fn host() -> Host {
    host_with(StorePlugin::new())
}

/// Renders the given keys joined with `|`.
pub fn join(keys: &'static [&'static str]) -> impl Fn(&ferry::Instance) -> String + 'static {
    move |vm| {
        keys.iter()
            .map(|key| vm.get(key).to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}
