//! Property-based invariant tests for closure-property binding.
//!
//! These tests verify invariants that must hold for any sequence of updates
//! and rebinds:
//!
//! **Propagation:**
//! 1. The bound value always equals direct evaluation of the expression.
//! 2. Every effective dependency change yields exactly one notification whose
//!    `old` is the previously reported value.
//! 3. Setting a dependency to its current value notifies nobody.
//!
//! **Discovery:**
//! 4. Recorded roots are the distinct accessed names in first-access order.
//! 5. Discovery never evaluates the body's live branch.
//!
//! **Lifecycle:**
//! 6. After any rebind sequence only the last target is watched, once per
//!    member.
//! 7. Dropping every engine leaves no listener behind.

use std::cell::Cell;
use std::rc::Rc;

use fxbind_core::testing::EventLog;
use fxbind_core::{BeanObject, ObjectRef, ObservableProperty, Value};
use fxbind_runtime::{ClosureProperty, Expression};
use proptest::prelude::*;

// ── Helpers ───────────────────────────────────────────────────────────────

fn point(x: i64, y: i64) -> Rc<BeanObject> {
    BeanObject::builder("Point")
        .property("x", x)
        .property("y", y)
        .build()
}

fn weighted_sum(point: &Rc<BeanObject>, wx: i64, wy: i64) -> Expression {
    Expression::builder()
        .capture("point", point.clone() as ObjectRef)
        .build(move |cx| {
            let point = cx.get("point")?;
            Ok(Value::Int(
                wx * point.get("x")?.as_int()? + wy * point.get("y")?.as_int()?,
            ))
        })
}

fn listener_total(point: &BeanObject) -> usize {
    ["x", "y"]
        .iter()
        .filter_map(|name| point.property(name))
        .map(|p| p.change_listener_count() + p.invalidation_listener_count())
        .sum()
}

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Update {
    X(i64),
    Y(i64),
}

fn update_strategy() -> impl Strategy<Value = Update> {
    prop_oneof![
        (-50i64..=50).prop_map(Update::X),
        (-50i64..=50).prop_map(Update::Y),
    ]
}

fn names_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop::sample::select(vec!["alpha", "beta", "gamma", "delta"]),
        0..=12,
    )
    .prop_map(|names| names.into_iter().map(String::from).collect())
}

// ── Propagation ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn value_tracks_direct_evaluation(
        x0 in -50i64..=50,
        y0 in -50i64..=50,
        wx in -3i64..=3,
        wy in -3i64..=3,
        updates in proptest::collection::vec(update_strategy(), 0..40),
    ) {
        let p = point(x0, y0);
        let expr = weighted_sum(&p, wx, wy);
        let prop = ClosureProperty::from_expression(expr.clone()).expect("bindable");
        let log = EventLog::new();
        prop.add_change_listener(log.change_handle());

        let mut expected_changes = 0usize;
        let mut last = expr.evaluate().expect("evaluates");
        for update in updates {
            let changed = match update {
                Update::X(v) => p.set("x", v).expect("x exists"),
                Update::Y(v) => p.set("y", v).expect("y exists"),
            };
            let direct = expr.evaluate().expect("evaluates");
            prop_assert_eq!(prop.value(), direct.clone());
            if changed {
                expected_changes += 1;
                let changes = log.changes();
                let (old, new) = changes.last().cloned().expect("notified");
                prop_assert_eq!(old, last.clone());
                prop_assert_eq!(new, direct.clone());
            }
            last = direct;
        }
        prop_assert_eq!(log.changes().len(), expected_changes);
    }

    #[test]
    fn equal_sets_are_silent(x in -50i64..=50, y in -50i64..=50, repeats in 1usize..8) {
        let p = point(x, y);
        let prop = ClosureProperty::from_expression(weighted_sum(&p, 1, 1)).expect("bindable");
        let log = EventLog::new();
        prop.add_change_listener(log.change_handle());
        prop.add_invalidation_listener(log.invalidation_handle());
        for _ in 0..repeats {
            prop_assert!(!p.set("x", x).expect("x exists"));
            prop_assert!(!p.set("y", y).expect("y exists"));
        }
        prop_assert!(log.changes().is_empty());
        prop_assert_eq!(log.invalidations(), 0);
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn roots_follow_first_access_order(names in names_strategy()) {
        let context = BeanObject::builder("Bag")
            .property("alpha", 1)
            .property("beta", 2)
            .property("gamma", 3)
            .property("delta", 4)
            .build();
        let live_runs = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&live_runs);
        let accessed = names.clone();
        let expr = Expression::builder()
            .context(context as ObjectRef)
            .build(move |cx| {
                if !cx.is_recording() {
                    seen.set(seen.get() + 1);
                }
                let mut total = 0;
                for name in &accessed {
                    total += cx.get(name)?.as_int()?;
                }
                Ok(Value::Int(total))
            });

        let roots = expr.discover().expect("discoverable");
        prop_assert_eq!(live_runs.get(), 0);

        let mut expected: Vec<&str> = Vec::new();
        for name in &names {
            if !expected.contains(&name.as_str()) {
                expected.push(name);
            }
        }
        let recorded: Vec<&str> = roots.iter().map(|node| node.name()).collect();
        prop_assert_eq!(recorded, expected.clone());

        let prop = ClosureProperty::from_expression(expr).expect("bindable");
        prop_assert_eq!(prop.dependencies(), expected);
        prop_assert_eq!(live_runs.get(), 1);
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn only_last_target_is_watched(targets in proptest::collection::vec(0usize..4, 1..16)) {
        let points: Vec<_> = (0..4).map(|i| point(i, i)).collect();
        let prop = ClosureProperty::new();
        for &index in &targets {
            prop.set_expression(weighted_sum(&points[index], 1, 1)).expect("bindable");
        }
        let last = *targets.last().expect("non-empty");
        for (index, p) in points.iter().enumerate() {
            let expected = if index == last { 4 } else { 0 };
            prop_assert_eq!(listener_total(p), expected);
        }
        let last_point = i64::try_from(last).expect("small index");
        prop_assert_eq!(prop.value(), Value::Int(2 * last_point));
    }

    #[test]
    fn dropping_engines_releases_listeners(engines in 1usize..8) {
        let p = point(1, 2);
        let props: Vec<_> = (0..engines)
            .map(|_| ClosureProperty::from_expression(weighted_sum(&p, 1, 1)).expect("bindable"))
            .collect();
        prop_assert_eq!(listener_total(&p), engines * 4);
        drop(props);
        prop_assert_eq!(listener_total(&p), 0);
    }
}
