//! Trace events emitted by the bridge.

use gapbridge::{ErrorKind, Kind, RecordingTracer, Session, StderrTracer, TraceEvent};
use pretty_assertions::assert_eq;

fn traced() -> (Session, RecordingTracer) {
    let tracer = RecordingTracer::new();
    let session = Session::kernel().with_tracer(tracer.clone());
    (session, tracer)
}

/// Events other than reference traffic.
fn operations(tracer: &RecordingTracer) -> Vec<TraceEvent> {
    tracer
        .events()
        .into_iter()
        .filter(|event| !matches!(event, TraceEvent::Acquire { .. } | TraceEvent::Release { .. }))
        .collect()
}

// === Reference traffic ===

/// Acquire and release report the reservation count after the change.
#[test]
fn reservations_are_traced() {
    let (session, tracer) = traced();
    let list = session.eval("[1]").unwrap().into_inner();
    let obj = list.target();
    let copy = list.clone();
    drop(copy);
    drop(list);

    let traffic: Vec<TraceEvent> = tracer
        .events()
        .into_iter()
        .filter(|event| match event {
            TraceEvent::Acquire { obj: target, .. } | TraceEvent::Release { obj: target, .. } => *target == obj,
            _ => false,
        })
        .collect();
    assert_eq!(
        traffic,
        vec![
            TraceEvent::Acquire { obj, reservations: 1 },
            TraceEvent::Acquire { obj, reservations: 2 },
            TraceEvent::Release { obj, reservations: 1 },
            TraceEvent::Release { obj, reservations: 0 },
        ]
    );
}

// === Operations ===

/// Every classified result is traced with its kind.
#[test]
fn classification_is_traced() {
    let (session, tracer) = traced();
    session.eval("1/2").unwrap();
    session.eval("[]").unwrap();
    assert_eq!(
        operations(&tracer),
        vec![TraceEvent::Classify { kind: Kind::Rational }, TraceEvent::Classify { kind: Kind::List }]
    );
}

/// Arithmetic names the engine primitive it forwards to.
#[test]
fn arithmetic_is_traced() {
    let (session, tracer) = traced();
    let two = session.convert(2).unwrap();
    tracer.clear();
    two.product(3).unwrap();
    two.power(2).unwrap();
    assert_eq!(
        operations(&tracer),
        vec![
            TraceEvent::Dispatch { primitive: "PROD" },
            TraceEvent::Classify { kind: Kind::Integer },
            TraceEvent::Dispatch { primitive: "POW" },
            TraceEvent::Classify { kind: Kind::Integer },
        ]
    );
}

/// Derived comparisons ask for each primitive only when needed.
#[test]
fn comparisons_are_traced() {
    let (session, tracer) = traced();
    let three = session.convert(3).unwrap();
    tracer.clear();

    three.less(4).unwrap();
    assert_eq!(operations(&tracer), vec![TraceEvent::Dispatch { primitive: "LT" }]);

    tracer.clear();
    three.less_eq(3).unwrap();
    assert_eq!(
        operations(&tracer),
        vec![TraceEvent::Dispatch { primitive: "LT" }, TraceEvent::Dispatch { primitive: "EQ" }]
    );

    tracer.clear();
    three.not_equals(3).unwrap();
    assert_eq!(operations(&tracer), vec![TraceEvent::Dispatch { primitive: "EQ" }]);
}

/// Identity comparisons never reach the engine.
#[test]
fn identity_comparisons_are_silent() {
    let (session, tracer) = traced();
    let a = session.convert(1).unwrap().by_identity();
    let b = a.clone();
    tracer.clear();
    assert!(a.equals(&b).unwrap());
    assert!(operations(&tracer).is_empty());
}

/// A method call resolves, calls with the receiver prepended, then classifies.
#[test]
fn method_calls_are_traced() {
    let (session, tracer) = traced();
    let list = session.eval("[1, 2, 3]").unwrap();
    tracer.clear();
    list.call_method("Length", &[]).unwrap();
    assert_eq!(
        operations(&tracer),
        vec![
            TraceEvent::Resolve { name: "Length".to_owned() },
            TraceEvent::Call { arity: 1 },
            TraceEvent::Classify { kind: Kind::Integer },
        ]
    );
}

/// Reserved names are rejected before lookup.
#[test]
fn reserved_names_are_not_resolved() {
    let (session, tracer) = traced();
    let one = session.convert(1).unwrap();
    tracer.clear();
    let err = one.method("__len__").unwrap_err();
    assert_eq!(
        operations(&tracer),
        vec![TraceEvent::Error { kind: err.kind() }]
    );
    assert_eq!(err.kind(), ErrorKind::AttributeError);
}

// === Errors ===

/// Every failure is traced with its kind.
#[test]
fn errors_are_traced() {
    let (session, tracer) = traced();
    let list = session.eval("[1]").unwrap().into_list().unwrap();
    tracer.clear();

    list.get(10).unwrap_err();
    session.eval("true").unwrap().sum(1).unwrap_err();

    let errors: Vec<ErrorKind> = tracer
        .events()
        .into_iter()
        .filter_map(|event| match event {
            TraceEvent::Error { kind } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![ErrorKind::IndexError, ErrorKind::DispatchError]);
}

/// The same error is not reported twice as it travels outwards.
#[test]
fn nested_failures_are_traced_once() {
    let (session, tracer) = traced();
    let rational = session.eval("1/2").unwrap();
    tracer.clear();
    rational.into_list().unwrap_err();
    assert_eq!(operations(&tracer), vec![TraceEvent::Error { kind: ErrorKind::UsageError }]);
}

// === Other tracers ===

/// The stderr tracer observes without changing results.
#[test]
fn stderr_tracer_is_transparent() {
    for tracer in [StderrTracer::new(), StderrTracer::with_references()] {
        let session = Session::kernel().with_tracer(tracer);
        let value = session.eval("[1, 2]").unwrap().call_method("Length", &[]).unwrap().unwrap();
        assert_eq!(value.into_integer().unwrap().to_i64().unwrap(), 2);
        assert!(session.eval("1/0").is_err());
    }
}
