//! Concurrency coverage for the guarantees the runtime actually makes:
//! atomic reference counting and serialized single-dispatch invocation on
//! a shared instance. Registry mutation stays single-threaded throughout,
//! per the registration contract.

mod common;

use objkit::runtime::{ClassDescriptor, DescriptorBuilder, ObjectPtr, instance_size_for};
use objkit::Result;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 1_000;

#[test]
fn parallel_refcounting_is_exact() {
    let registry = common::fixture_registry();
    let obj = ObjectPtr::new_by_name(&registry, "Blank").unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    obj.incref();
                }
            });
        }
    });
    assert_eq!(obj.ref_count(), (THREADS * ROUNDS) as u32);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    obj.decref();
                }
            });
        }
    });
    assert_eq!(obj.ref_count(), 0);

    obj.delete(&registry).unwrap();
}

#[test]
fn unmatched_decrements_saturate_under_contention() {
    let registry = common::fixture_registry();
    let obj = ObjectPtr::new_by_name(&registry, "Blank").unwrap();

    obj.incref();

    // far more decrements than increments: the count must saturate at 0
    // instead of wrapping
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    obj.decref();
                }
            });
        }
    });

    assert_eq!(obj.ref_count(), 0);
    obj.delete(&registry).unwrap();
}

#[repr(C)]
struct Cell {
    value: u64,
}

fn cell_print(obj: ObjectPtr) -> Result<String> {
    // SAFETY: dispatched on a Cell instance; the instance lock is held for
    // the duration of the callback
    let cell = unsafe { obj.state::<Cell>() };
    Ok(format!("Cell({})", cell.value))
}

fn cell_compare(a: ObjectPtr, b: ObjectPtr) -> Result<bool> {
    // SAFETY: compare only dispatches between equal hierarchies
    let (a, b) = unsafe { (a.state::<Cell>(), b.state::<Cell>()) };
    Ok(a.value == b.value)
}

static CELL: ClassDescriptor = DescriptorBuilder::new("Cell", instance_size_for::<Cell>())
    .print(cell_print)
    .compare(cell_compare)
    .build();

#[test]
fn single_dispatch_serializes_on_one_instance() {
    let mut registry = common::fixture_registry();
    registry.register(&CELL).unwrap();

    let obj = ObjectPtr::new_by_name(&registry, "Cell").unwrap();
    // SAFETY: not yet shared
    unsafe { obj.state_mut::<Cell>().value = 42 };

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..200 {
                    assert_eq!(obj.print().unwrap(), "Cell(42)");
                }
            });
        }
    });

    obj.delete(&registry).unwrap();
}

#[test]
fn concurrent_compares_with_consistent_lock_order() {
    let mut registry = common::fixture_registry();
    registry.register(&CELL).unwrap();

    let left = ObjectPtr::new_by_name(&registry, "Cell").unwrap();
    let right = ObjectPtr::new_by_name(&registry, "Cell").unwrap();
    // SAFETY: not yet shared
    unsafe {
        left.state_mut::<Cell>().value = 5;
        right.state_mut::<Cell>().value = 5;
    }

    // every thread locks left-then-right; the runtime imposes no global
    // order beyond self-first, so the callers agree on one
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..200 {
                    assert!(left.compare(right).unwrap());
                }
            });
        }
    });

    left.delete(&registry).unwrap();
    right.delete(&registry).unwrap();
}

#[test]
fn instances_are_independent_across_threads() {
    let registry = common::fixture_registry();

    // creation and deletion of distinct instances needs no coordination:
    // the registry is only read
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..100 {
                    let obj = ObjectPtr::new_by_name(&registry, "Sink").unwrap();
                    assert_eq!(
                        common::construction_marks(obj),
                        common::STAGE_BIT | common::PIPE_BIT | common::SINK_BIT
                    );
                    obj.delete(&registry).unwrap();
                }
            });
        }
    });
}
