//! Reservations, garbage collection, brackets, limits and interrupts.

use std::{thread, time::Duration};

use gapbridge::{ErrorKind, Kernel, ResourceLimits, Session};
use pretty_assertions::assert_eq;

fn session_with(limits: ResourceLimits) -> Session {
    Session::new(Kernel::with_limits(limits))
}

// === Reservations ===

/// Each live handle holds exactly one reservation on its target.
#[test]
fn clones_take_their_own_reservation() {
    let session = Session::kernel();
    let list = session.eval("[1, 2]").unwrap().into_inner();
    let obj = list.target();
    assert_eq!(session.engine().reservations(obj), 1);

    let copy = list.clone();
    assert_eq!(session.engine().reservations(obj), 2);
    drop(copy);
    assert_eq!(session.engine().reservations(obj), 1);
    drop(list);
    assert_eq!(session.engine().reservations(obj), 0);
}

/// Immediate values and null handles reserve nothing.
#[test]
fn immediates_are_not_reserved() {
    let session = Session::kernel();
    let small = session.convert(3).unwrap();
    assert!(small.target().is_immediate_int());
    assert_eq!(session.engine().reservations(small.target()), 0);
}

// === Collection ===

/// A reserved object survives a collection; once released it is reclaimed.
#[test]
fn collector_respects_reservations() {
    let session = Session::kernel();
    let list = session.eval("[1, 2, 3]").unwrap().into_list().unwrap();
    let obj = list.target();

    session.collect_garbage().unwrap();
    assert!(session.engine().is_live(obj));
    assert_eq!(list.len(), 3);

    drop(list);
    assert!(session.collect_garbage().unwrap() >= 1);
    assert!(!session.engine().is_live(obj));
}

/// Objects reachable from a reserved one survive with it.
#[test]
fn reachable_objects_survive() {
    let session = Session::kernel();
    let outer = session.eval("[[\"inner\"], 2^100]").unwrap().into_list().unwrap();
    session.collect_garbage().unwrap();

    let inner = outer.get(0).unwrap().into_list().unwrap();
    let text = inner.get(0).unwrap().into_string().unwrap();
    assert_eq!(text.to_string_lossless().unwrap(), "inner");
    let big = outer.get(1).unwrap().into_integer().unwrap();
    assert_eq!(big.to_bigint(), num_bigint::BigInt::from(1) << 100_u32);
}

/// Collecting while entered would free objects the caller still uses unreserved.
#[test]
fn collection_inside_a_bracket_is_refused() {
    let session = Session::kernel();
    let bracket = session.enter();
    let err = session.collect_garbage().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UsageError);
    drop(bracket);
    session.collect_garbage().unwrap();
}

/// With a collection after every allocation, every value still reads back.
#[test]
fn collection_after_every_allocation() {
    let session = session_with(ResourceLimits::new().gc_interval(Some(1)));
    let lists: Vec<_> = (0..50_i64)
        .map(|n| session.element(vec![n, n * n]).unwrap().into_list().unwrap())
        .collect();
    let mut total = session.element(0).unwrap();
    for (n, list) in (0_i64..).zip(&lists) {
        let square = list.get(1).unwrap();
        total = total.sum(&square).unwrap();
        let big = session.eval(&format!("2^{}", 64 + n)).unwrap();
        assert!(big.greater(&square).unwrap());
    }
    assert_eq!(total.as_integer().unwrap().to_i64().unwrap(), (0..50).map(|n| n * n).sum::<i64>());
    for (n, list) in (0_i64..).zip(&lists) {
        assert_eq!(list.get(0).unwrap().as_integer().unwrap().to_i64().unwrap(), n);
    }
}

/// Automatic collection reclaims garbage at the outermost leave.
#[test]
fn automatic_collection_reclaims_garbage() {
    let session = session_with(ResourceLimits::new().gc_interval(Some(1)));
    let target = session.eval("[1]").unwrap().into_inner().target();
    // the next outermost leave collects
    let _other = session.eval("[2]").unwrap();
    assert!(!session.engine().is_live(target));
}

// === Brackets ===

/// Brackets nest and unwind in order.
#[test]
fn brackets_nest() {
    let session = Session::kernel();
    assert_eq!(session.engine().bracket_depth(), 0);
    {
        let _outer = session.enter();
        let _inner = session.enter();
        assert_eq!(session.engine().bracket_depth(), 2);
    }
    assert_eq!(session.engine().bracket_depth(), 0);
}

/// Failed operations leave the engine.
#[test]
fn errors_release_the_bracket() {
    let session = Session::kernel();
    assert!(session.eval("1/0").is_err());
    assert!(session.eval("undefined_name").is_err());
    assert!(session.eval("true").unwrap().sum(1).is_err());
    assert_eq!(session.engine().bracket_depth(), 0);
}

// === Limits ===

/// Integers beyond the limb limit are refused.
#[test]
fn limb_limit() {
    let session = session_with(ResourceLimits::new().max_limbs(4));
    assert!(session.eval("2^100").is_ok());
    let err = session.eval("2^200").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
    assert_eq!(err.message(), "integer limb limit exceeded: 7 > 4");
}

/// Live objects beyond the object limit are refused.
#[test]
fn object_limit() {
    let session = session_with(ResourceLimits::new().max_objects(3).gc_interval(None));
    let err = session.eval("[[1], [2], [3], [4]]").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
    assert_eq!(err.message(), "allocation limit exceeded: 4 > 3");
}

/// Lists and permutations longer than the configured cap are refused.
#[test]
fn list_length_limit() {
    let session = session_with(ResourceLimits::new().max_list_length(4));
    let list = session.eval("[1, 2]").unwrap().into_list().unwrap();
    list.set(3, 4).unwrap();
    let err = list.set(4, 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
    assert_eq!(err.message(), "list length limit exceeded: 5 > 4");
    assert_eq!(list.len(), 4);

    assert!(session.eval("(1,4)").is_ok());
    let err = session.eval("(1,5)").unwrap_err();
    assert_eq!(err.message(), "list length limit exceeded: 5 > 4");
    let err = session.eval("ListPerm((1,2), 10)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
}

/// Even without a configured cap, a huge cycle is refused instead of allocated.
#[test]
fn unlimited_kernel_still_caps_cycles() {
    let session = session_with(ResourceLimits::default());
    let err = session.eval("(1,4000000000)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
}

/// The step budget applies per outermost bracket.
#[test]
fn operation_limit_resets_per_bracket() {
    let session = session_with(ResourceLimits::new().max_operations(10));
    let err = session.eval("Factorial(100)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceError);
    assert_eq!(err.message(), "operation limit exceeded: 11 > 10");

    let small = session.eval("Factorial(5)").unwrap();
    assert_eq!(small.as_integer().unwrap().to_i64().unwrap(), 120);
}

// === Interrupts ===

/// A pending interrupt aborts the next computation, and only that one.
#[test]
fn pending_interrupt_aborts_once() {
    let session = Session::kernel();
    let two = session.convert(2).unwrap();
    let interrupter = session.interrupter();
    interrupter.interrupt();
    assert!(interrupter.is_pending());

    let err = two.power(100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert_eq!(session.engine().bracket_depth(), 0);
    assert!(!interrupter.is_pending());

    let value = two.power(10).unwrap();
    assert_eq!(value.as_integer().unwrap().to_i64().unwrap(), 1024);
}

/// Another thread can stop a long computation.
#[test]
fn interrupt_from_another_thread() {
    let session = Session::kernel();
    let interrupter = session.interrupter();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        interrupter.interrupt();
    });

    let err = session.eval("Factorial(10^7)").unwrap_err();
    worker.join().unwrap();
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert_eq!(session.engine().bracket_depth(), 0);
    assert!(session.eval("Factorial(3)").is_ok());
}
