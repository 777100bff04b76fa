//! Benchmarks for store bindings shared by many instances.
//!
//! These benchmarks measure:
//! - Mounting N instances that bind the same store field
//! - Propagating one store mutation to N bound instances and flushing renders
//! - Tearing N bound instances down
//!
//! Run with: cargo bench --bench binding_fanout

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ferry::store::{Object, Value, run_in_action};
use ferry::{ComponentOptions, Host, Instance, StateDeclaration, StoreOptionsExt, StorePlugin};

fn bound() -> ComponentOptions {
    ComponentOptions::new()
        .with_map_state(StateDeclaration::list(["count"]))
        .render(|vm| vm.get("count").to_string())
}

fn mount_many(n: usize) -> (Host, Object, Vec<Instance>) {
    let store = Object::new().with("count", 0);
    let host = Host::new();
    host.use_plugin(StorePlugin::new().default_store(store.clone()));
    let instances = (0..n).map(|_| host.mount(bound())).collect();
    (host, store, instances)
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding_fanout_mount");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("mount_and_destroy", size), size, |b, &size| {
            b.iter(|| {
                let (_host, _store, instances) = mount_many(size);
                for instance in &instances {
                    instance.destroy();
                }
                black_box(instances.len());
            });
        });
    }

    group.finish();
}

fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding_fanout_propagate");

    for size in [10, 100, 1000].iter() {
        let (host, store, instances) = mount_many(*size);
        let mut next = 0;
        group.bench_with_input(BenchmarkId::new("set_and_flush", size), size, |b, _| {
            b.iter(|| {
                next += 1;
                run_in_action(|| store.set("count", Value::from(next)));
                host.next_tick();
                black_box(instances[0].text());
            });
        });
        for instance in &instances {
            instance.destroy();
        }
    }

    group.finish();
}

criterion_group!(benches, bench_mount, bench_propagate);
criterion_main!(benches);
