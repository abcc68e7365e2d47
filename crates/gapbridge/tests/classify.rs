//! Classification of engine objects into handle kinds.

use gapbridge::{
    Element, ErrorKind, Handle, HostValue, Kernel, Kind, RecordingTracer, ResourceLimits, Session, TraceEvent,
};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

fn kind_of(session: &Session, source: &str) -> Kind {
    session.eval(source).unwrap().kind()
}

// === One input per kind ===

/// Every kind the classifier can produce, from engine source text.
#[test]
fn every_kind_is_reachable() {
    let session = Session::kernel();
    let cases = [
        ("17", Kind::Integer),
        ("-17", Kind::Integer),
        ("2^70", Kind::Integer),
        ("2.5", Kind::Float),
        ("E(5)", Kind::Cyclotomic),
        ("Z(7)", Kind::FiniteFieldElement),
        ("1/3", Kind::Rational),
        ("true", Kind::Boolean),
        ("fail", Kind::Boolean),
        ("Length", Kind::Function),
        ("(1,2,3)", Kind::Permutation),
        ("rec(a := 1)", Kind::Record),
        ("[]", Kind::List),
        ("\"abc\"", Kind::String),
        ("[1, 2]", Kind::List),
        ("'x'", Kind::String),
        ("ZmodnZObj(2, 6)", Kind::IntegerMod),
        ("Integers", Kind::Ring),
        ("GF(7)", Kind::Ring),
    ];
    for (source, expected) in cases {
        assert_eq!(kind_of(&session, source), expected, "{source}");
    }
}

/// A null handle is the generic kind.
#[test]
fn null_is_a_plain_object() {
    let session = Session::kernel();
    let element = Handle::null(&session).into_element();
    assert_eq!(element.kind(), Kind::Object);
    assert!(element.is_null());
}

/// Host values classify by the engine object they become.
#[test]
fn host_values_classify_by_their_engine_form() {
    let session = Session::kernel();
    assert_eq!(session.element(5_i64).unwrap().kind(), Kind::Integer);
    assert_eq!(session.element(BigInt::from(u64::MAX)).unwrap().kind(), Kind::Integer);
    assert_eq!(session.element(0.5).unwrap().kind(), Kind::Float);
    assert_eq!(session.element(true).unwrap().kind(), Kind::Boolean);
    assert_eq!(session.element("hi").unwrap().kind(), Kind::String);
    assert_eq!(session.element(vec![1_i64, 2]).unwrap().kind(), Kind::List);
    let record = HostValue::Record([("x".to_owned(), HostValue::Int(1))].into_iter().collect());
    assert_eq!(session.element(&record).unwrap().kind(), Kind::Record);
}

// === Precedence ===

/// Rationals that reduce to integers are integers.
#[test]
fn whole_quotients_are_integers() {
    let session = Session::kernel();
    assert_eq!(kind_of(&session, "6/3"), Kind::Integer);
}

/// The empty-list check comes before the string check.
#[test]
fn empty_string_is_an_empty_list() {
    let session = Session::kernel();
    let element = session.eval("\"\"").unwrap();
    assert_eq!(element.kind(), Kind::List);
    assert!(element.into_list().unwrap().is_empty());
}

/// A plain list whose elements are all characters is a string.
#[test]
fn list_of_characters_is_a_string() {
    let session = Session::kernel();
    let element = session.eval("['o', 'k']").unwrap();
    assert_eq!(element.kind(), Kind::String);
    assert_eq!(element.into_string().unwrap().to_string_lossless().unwrap(), "ok");
}

/// A list with one non-character element stays a list.
#[test]
fn mixed_list_is_a_list() {
    let session = Session::kernel();
    assert_eq!(kind_of(&session, "['o', 1]"), Kind::List);
}

/// Both permutation encodings classify the same way.
#[test]
fn wide_permutations_are_permutations() {
    let session = Session::kernel();
    assert_eq!(kind_of(&session, "()"), Kind::Permutation);
    assert_eq!(kind_of(&session, "(1, 70000)"), Kind::Permutation);
}

/// A character becomes a fresh one-character string.
#[test]
fn characters_become_strings() {
    let session = Session::kernel();
    let string = session.eval("'q'").unwrap().into_string().unwrap();
    assert_eq!(string.len(), 1);
    assert_eq!(string.to_string_lossless().unwrap(), "q");
}

/// Without room for the string, a character stays a plain object and the
/// allocation failure is traced.
#[test]
fn character_without_room_stays_an_object() {
    let tracer = RecordingTracer::new();
    let limits = ResourceLimits::new().max_objects(0).gc_interval(None);
    let session = Session::new(Kernel::with_limits(limits)).with_tracer(tracer.clone());
    let element = session.eval("'q'").unwrap();
    assert_eq!(element.kind(), Kind::Object);
    let errors: Vec<ErrorKind> = tracer
        .events()
        .into_iter()
        .filter_map(|event| match event {
            TraceEvent::Error { kind } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![ErrorKind::ResourceError]);
}

// === Stability ===

/// Classifying the same object twice gives the same kind and target.
#[test]
fn classification_is_stable() {
    let session = Session::kernel();
    for source in ["1/3", "[1, 2]", "ZmodnZObj(2, 6)", "Integers", "rec()"] {
        let first = session.eval(source).unwrap();
        let second = first.handle().classify();
        assert_eq!(first.kind(), second.kind(), "{source}");
        assert!(first.is_identical(&second), "{source}");
    }
}

/// Unwrapping to the wrong kind names both kinds.
#[test]
fn wrong_kind_is_a_usage_error() {
    let session = Session::kernel();
    let err = session.eval("1/3").unwrap().into_list().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UsageError);
    assert_eq!(err.message(), "expected List, found Rational");
}

// === Kind accessors ===

/// Number accessors read their parts back out of the engine.
#[test]
fn number_accessors() {
    let session = Session::kernel();

    let rational = session.eval("-6/4").unwrap();
    let rational = rational.as_rational().unwrap();
    assert_eq!(rational.numerator().unwrap().to_i64().unwrap(), -3);
    assert_eq!(rational.denominator().unwrap().to_i64().unwrap(), 2);

    let float = session.eval("2.5").unwrap().into_float().unwrap();
    assert_eq!(float.to_f64(), 2.5);

    let ffe = session.eval("Z(7)^2").unwrap();
    let ffe = ffe.as_finite_field_element().unwrap();
    assert_eq!(ffe.characteristic().unwrap().to_i64().unwrap(), 7);
    assert_eq!(ffe.to_integer().unwrap().to_i64().unwrap(), 2);

    let residue = session.eval("ZmodnZObj(17, 6)").unwrap();
    let residue = residue.as_integer_mod().unwrap();
    assert_eq!(residue.residue().unwrap().to_i64().unwrap(), 5);
    assert_eq!(residue.modulus().unwrap().to_i64().unwrap(), 6);

    let root = session.eval("E(5)").unwrap();
    assert_eq!(root.as_cyclotomic().unwrap().conductor().unwrap().to_i64().unwrap(), 5);
}

/// Booleans convert; `fail` does not.
#[test]
fn boolean_accessors() {
    let session = Session::kernel();
    assert!(session.eval("true").unwrap().into_boolean().unwrap().to_bool().unwrap());
    let fail = session.eval("fail").unwrap().into_boolean().unwrap();
    assert!(fail.is_fail());
    assert_eq!(fail.to_bool().unwrap_err().kind(), ErrorKind::ConversionError);
}

/// Permutation images are 0-based with trailing fixed points dropped.
#[test]
fn permutation_accessors() {
    let session = Session::kernel();
    let perm = session.eval("(1,2,3)").unwrap().into_permutation().unwrap();
    assert_eq!(perm.images().unwrap(), vec![1, 2, 0]);
    assert_eq!(perm.largest_moved_point().unwrap(), 3);
    assert_eq!(perm.sign().unwrap(), 1);
    let swap = session.eval("(2,4)").unwrap().into_permutation().unwrap();
    assert_eq!(swap.sign().unwrap(), -1);
}

/// Rings report their characteristic and whether they are fields.
#[test]
fn ring_accessors() {
    let session = Session::kernel();
    let integers = session.eval("Integers").unwrap().into_ring().unwrap();
    assert_eq!(integers.characteristic().unwrap().to_i64().unwrap(), 0);
    assert!(!integers.is_field().unwrap());
    let field = session.eval("GF(7)").unwrap().into_ring().unwrap();
    assert_eq!(field.characteristic().unwrap().to_i64().unwrap(), 7);
    assert!(field.is_field().unwrap());
}

/// Functions know their engine name.
#[test]
fn function_name() {
    let session = Session::kernel();
    let function = session.global("Length").unwrap().into_function().unwrap();
    assert_eq!(function.name().unwrap(), "Length");
}

/// `Element` derefs to the underlying handle.
#[test]
fn element_exposes_its_handle() {
    let session = Session::kernel();
    let element: Element = session.eval("12").unwrap();
    assert_eq!(element.view(), "12");
    assert!(element.is_identical(element.handle()));
}

/// Predicates answer from the engine's type information, independent of the kind.
#[test]
fn kind_predicates() {
    let session = Session::kernel();
    let text = session.eval("\"abc\"").unwrap();
    assert!(text.is_string());
    assert!(text.is_list());
    assert!(!text.is_record());

    let letter = session.eval("'x'").unwrap();
    assert!(letter.is_string());

    let list = session.eval("[1, 2]").unwrap();
    assert!(list.is_list());
    assert!(!list.is_string());

    assert!(session.eval("rec()").unwrap().is_record());
    assert!(session.eval("fail").unwrap().is_boolean());
    assert!(session.eval("(1,2)").unwrap().is_permutation());
    assert!(session.global("Length").unwrap().is_function());
    assert!(!session.global("Integers").unwrap().is_function());
}
