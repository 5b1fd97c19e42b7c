//! Benchmarks for closure-property binding.
//!
//! Performance budgets:
//! - Discovery of a 16-member expression: < 5µs
//! - Rebind (discover + resolve + detach) of a 16-member expression: < 20µs
//! - Propagation of one dependency change: < 1µs per downstream engine
//!
//! Run with: cargo bench -p fxbind-runtime --bench rebind_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxbind_core::{BeanObject, BeanObjectBuilder, ObjectRef, Value};
use fxbind_runtime::{ClosureProperty, Expression};
use std::hint::black_box;
use std::rc::Rc;

const NAMES: [&str; 16] = [
    "m00", "m01", "m02", "m03", "m04", "m05", "m06", "m07", "m08", "m09", "m10", "m11", "m12",
    "m13", "m14", "m15",
];

fn wide_object(members: usize) -> Rc<BeanObject> {
    NAMES[..members]
        .iter()
        .enumerate()
        .fold(BeanObject::builder("Wide"), |b: BeanObjectBuilder, (i, name)| {
            b.property(*name, i64::try_from(i).unwrap_or_default())
        })
        .build()
}

fn sum_of(object: &Rc<BeanObject>, members: usize) -> Expression {
    Expression::builder()
        .context(object.clone() as ObjectRef)
        .build(move |cx| {
            let mut total = 0;
            for name in &NAMES[..members] {
                total += cx.get(name)?.as_int()?;
            }
            Ok(Value::Int(total))
        })
}

// =============================================================================
// Discovery
// =============================================================================

fn bench_discover(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/discover");

    for members in [1usize, 4, 16] {
        let object = wide_object(members);
        let expr = sum_of(&object, members);
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(BenchmarkId::new("members", members), &expr, |b, expr| {
            b.iter(|| black_box(expr.discover()))
        });
    }

    group.finish();
}

// =============================================================================
// Rebind
// =============================================================================

fn bench_rebind(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/rebind");

    for members in [1usize, 4, 16] {
        let object = wide_object(members);
        let expr = sum_of(&object, members);
        let prop = ClosureProperty::new();
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(BenchmarkId::new("members", members), &expr, |b, expr| {
            b.iter(|| black_box(prop.set_expression(expr.clone())))
        });
    }

    group.finish();
}

// =============================================================================
// Propagation
// =============================================================================

fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/propagate");

    for engines in [1usize, 8, 64] {
        let object = wide_object(4);
        let props: Vec<_> = (0..engines)
            .filter_map(|_| ClosureProperty::from_expression(sum_of(&object, 4)).ok())
            .collect();
        let mut tick = 0_i64;
        group.throughput(Throughput::Elements(engines as u64));
        group.bench_function(BenchmarkId::new("engines", engines), |b| {
            b.iter(|| {
                tick += 1;
                black_box(object.set("m00", tick))
            })
        });
        black_box(props);
    }

    group.finish();
}

criterion_group!(benches, bench_discover, bench_rebind, bench_propagate);
criterion_main!(benches);
