//! Operator forwarding, calls and method resolution.

use gapbridge::{ArithOp, CompareOp, Element, ErrorKind, Handle, Kind, Resolution, Session};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use strum::IntoEnumIterator;

fn int(element: &Element) -> i64 {
    element.as_integer().unwrap().to_i64().unwrap()
}

// === Arithmetic ===

/// Each operator reaches its engine primitive.
#[test]
fn integer_arithmetic() {
    let session = Session::kernel();
    let seven = session.element(7).unwrap();
    assert_eq!(int(&seven.sum(3).unwrap()), 10);
    assert_eq!(int(&seven.difference(10).unwrap()), -3);
    assert_eq!(int(&seven.product(6).unwrap()), 42);
    assert_eq!(int(&seven.modulo(3).unwrap()), 1);
    assert_eq!(int(&seven.power(2).unwrap()), 49);

    let third = seven.quotient(21).unwrap();
    assert_eq!(third.kind(), Kind::Rational);
    assert!(third.equals(session.eval("1/3").unwrap()).unwrap());
}

/// `arith` and the named helpers agree for every operator.
#[test]
fn named_helpers_match_the_table() {
    let session = Session::kernel();
    let twelve = session.element(12).unwrap();
    for op in ArithOp::iter() {
        let via_table = twelve.arith(op, 5).unwrap();
        let via_helper = match op {
            ArithOp::Add => twelve.sum(5),
            ArithOp::Sub => twelve.difference(5),
            ArithOp::Mul => twelve.product(5),
            ArithOp::Div => twelve.quotient(5),
            ArithOp::Mod => twelve.modulo(5),
            ArithOp::Pow => twelve.power(5),
        }
        .unwrap();
        assert!(via_table.equals(&via_helper).unwrap(), "{op}");
    }
}

/// Results crossing the immediate boundary stay exact.
#[test]
fn large_integer_arithmetic() {
    let session = Session::kernel();
    let big = session.eval("2^100").unwrap();
    let sum = big.sum(1).unwrap().into_integer().unwrap();
    assert_eq!(sum.to_bigint(), (BigInt::from(1) << 100_u32) + 1);
    let back = sum.difference(&big).unwrap();
    assert_eq!(int(&back), 1);
}

/// Operands of different families meet in the engine's rules.
#[test]
fn mixed_operands() {
    let session = Session::kernel();
    let product = session.eval("(1,2)").unwrap().product(session.eval("(2,3)").unwrap()).unwrap();
    assert_eq!(product.kind(), Kind::Permutation);
    assert!(product.equals(session.eval("(1,2)(2,3)").unwrap()).unwrap());

    let ffe = session.eval("Z(7)").unwrap().power(6).unwrap();
    assert!(ffe.equals(session.eval("Z(7)^0").unwrap()).unwrap());

    let scaled = session.eval("[1, 2]").unwrap().product(3).unwrap().into_list().unwrap();
    assert_eq!(int(&scaled.get(1).unwrap()), 6);

    let float = session.element(0.5).unwrap().sum(1).unwrap();
    assert_eq!(float.as_float().unwrap().to_f64(), 1.5);
}

/// No method for the operand kinds is a dispatch error with the engine's text.
#[test]
fn missing_method_is_a_dispatch_error() {
    let session = Session::kernel();
    let err = session.eval("true").unwrap().sum(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DispatchError);
    assert_eq!(err.message(), "no 1st choice method found for `+' on 2 arguments");

    let err = session.eval("rec()").unwrap().power(2).unwrap_err();
    assert_eq!(err.message(), "no 1st choice method found for `^' on 2 arguments");
}

/// Other engine failures keep their own kind.
#[test]
fn division_by_zero_is_an_engine_error() {
    let session = Session::kernel();
    let err = session.element(1).unwrap().quotient(0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineError);
}

/// Null operands are refused before the engine sees them.
#[test]
fn null_operands_are_rejected() {
    let session = Session::kernel();
    let null = Handle::null(&session);
    assert_eq!(null.sum(1).unwrap_err().kind(), ErrorKind::UsageError);
    let one = session.convert(1).unwrap();
    assert_eq!(one.sum(&null).unwrap_err().kind(), ErrorKind::UsageError);
}

/// Handles never cross engine sessions.
#[test]
fn foreign_handles_are_rejected() {
    let ours = Session::kernel();
    let theirs = Session::kernel();
    let foreign = theirs.convert(1).unwrap();
    let err = ours.convert(2).unwrap().sum(foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UsageError);
}

// === Comparison ===

/// Exactly one of `<`, `==`, `>` holds for ordered operands.
#[test]
fn comparisons_are_trichotomous() {
    let session = Session::kernel();
    let sources = ["-2", "1/2", "1", "2^70", "Z(5)", "(1,2)", "()", "true", "[1, 2]", "[1, 3]", "\"ab\""];
    let values: Vec<Element> = sources.iter().map(|source| session.eval(source).unwrap()).collect();
    for (a, left) in sources.iter().zip(&values) {
        for (b, right) in sources.iter().zip(&values) {
            let lt = left.less(right).unwrap();
            let eq = left.equals(right).unwrap();
            let gt = left.greater(right).unwrap();
            assert_eq!(u8::from(lt) + u8::from(eq) + u8::from(gt), 1, "{a} vs {b}");
            assert_eq!(left.less_eq(right).unwrap(), lt || eq, "{a} <= {b}");
            assert_eq!(left.greater_eq(right).unwrap(), !lt, "{a} >= {b}");
            assert_eq!(left.not_equals(right).unwrap(), !eq, "{a} != {b}");
        }
    }
}

/// Integers and rationals compare by value.
#[test]
fn numbers_compare_by_value() {
    let session = Session::kernel();
    let half = session.eval("1/2").unwrap();
    assert!(half.less(1).unwrap());
    assert!(half.greater(0).unwrap());
    assert!(half.equals(session.eval("2/4").unwrap()).unwrap());
    assert!(session.element(2).unwrap().equals(2.0).unwrap());
}

/// Mismatched identity flags fail for every operator, whatever the values.
#[test]
fn identity_flags_must_agree() {
    let session = Session::kernel();
    let plain = session.convert(1).unwrap();
    let by_identity = session.convert(1).unwrap().by_identity();
    for op in CompareOp::iter() {
        let err = plain.compare(op, &by_identity).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComparisonError, "{op}");
        assert_eq!(
            err.message(),
            format!("cannot evaluate {}: both operands must agree on identity comparison", op.symbol())
        );
        assert_eq!(by_identity.compare(op, &plain).unwrap_err().kind(), ErrorKind::ComparisonError);
    }
}

/// Identity mode compares objects, not values.
#[test]
fn identity_comparison() {
    let session = Session::kernel();
    let list = session.eval("[1, 2]").unwrap().into_inner().by_identity();
    let copy = session.eval("[1, 2]").unwrap().into_inner().by_identity();
    assert!(!list.equals(&copy).unwrap());
    assert!(list.equals(&list.clone()).unwrap());
    assert_eq!(list.less(&copy).unwrap(), !copy.less_eq(&list).unwrap());

    let mut plain = list.clone();
    plain.set_compare_by_identity(false);
    let mut other = copy.clone();
    other.set_compare_by_identity(false);
    assert!(plain.equals(&other).unwrap());
}

/// Records have equality but no order.
#[test]
fn records_are_unordered() {
    let session = Session::kernel();
    let a = session.eval("rec(x := 1)").unwrap();
    let b = session.eval("rec(x := 1)").unwrap();
    assert!(a.equals(&b).unwrap());
    assert!(!a.not_equals(&b).unwrap());

    let err = a.less(&b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComparisonError);
    assert_eq!(err.message(), "no 1st choice method found for `<' on 2 arguments");
    assert_eq!(a.greater_eq(&b).unwrap_err().kind(), ErrorKind::ComparisonError);
}

// === Calls ===

/// A function handle calls its target with the given arguments.
#[test]
fn direct_call() {
    let session = Session::kernel();
    let length = session.global("Length").unwrap();
    let list = session.convert(vec![1_i64, 2, 3]).unwrap();
    let result = length.call(&[list]).unwrap().unwrap();
    assert_eq!(int(&result), 3);
}

/// Plain host values are converted before the call.
#[test]
fn call_with_host_values() {
    let session = Session::kernel();
    let length = session.global("Length").unwrap();
    assert_eq!(int(&length.call_with([vec![1_i64, 2, 3]]).unwrap().unwrap()), 3);

    let gcd = session.global("Gcd").unwrap();
    assert_eq!(int(&gcd.call_with([12, 18, 30]).unwrap().unwrap()), 6);

    let list = session.eval("[]").unwrap().into_list().unwrap();
    let add = list.method("Add").unwrap();
    assert!(add.call_with([5]).unwrap().is_none());
    assert!(list.call_method_with("Add", ["six"]).unwrap().is_none());
    assert_eq!(list.len(), 2);
    assert_eq!(int(&list.get(0).unwrap()), 5);
    assert_eq!(list.get(1).unwrap().kind(), Kind::String);
}

/// Arguments from another engine session are refused.
#[test]
fn call_with_foreign_handle_fails() {
    let session = Session::kernel();
    let other = Session::kernel();
    let length = session.global("Length").unwrap();
    let foreign = other.convert(vec![1_i64]).unwrap();
    let err = length.call(&[foreign]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UsageError);
    assert_eq!(err.message(), "handle belongs to a different engine session");
}

/// More than six arguments travel as an argument list.
#[test]
fn call_with_many_arguments() {
    let session = Session::kernel();
    let gcd = session.global("Gcd").unwrap();
    let args: Vec<Handle> = [12, 18, 24, 30, 36, 42, 48, 54]
        .into_iter()
        .map(|n| session.convert(n).unwrap())
        .collect();
    assert_eq!(int(&gcd.call(&args).unwrap().unwrap()), 6);
    assert_eq!(int(&gcd.call(&args[..6]).unwrap().unwrap()), 6);

    let concatenation = session.global("Concatenation").unwrap();
    let parts: Vec<Handle> = (0..7).map(|n| session.convert(vec![n]).unwrap()).collect();
    let joined = concatenation.call(&parts).unwrap().unwrap().into_list().unwrap();
    assert_eq!(joined.len(), 7);
    assert_eq!(int(&joined.get(6).unwrap()), 6);
}

/// Procedures return nothing.
#[test]
fn call_without_result() {
    let session = Session::kernel();
    let add = session.global("Add").unwrap();
    let list = session.eval("[]").unwrap().into_list().unwrap();
    let result = add.call(&[list.handle().clone(), session.convert(5).unwrap()]).unwrap();
    assert!(result.is_none());
    assert_eq!(list.len(), 1);
}

/// Calling a non-function is an engine error.
#[test]
fn calling_a_non_function_fails() {
    let session = Session::kernel();
    let err = session.convert(5).unwrap().call(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineError);
}

// === Method resolution ===

/// `list.Add(5)` is `Add(list, 5)`.
#[test]
fn bound_method_prepends_the_receiver() {
    let session = Session::kernel();
    let list = session.eval("[]").unwrap().into_list().unwrap();
    let Resolution::BoundProxy(proxy) = list.resolve("Add") else {
        panic!("Add should resolve to a bound proxy");
    };
    assert_eq!(proxy.name(), "Add");
    assert!(proxy.receiver().is_identical(&list));
    assert!(proxy.call(&[session.convert(5).unwrap()]).unwrap().is_none());
    assert_eq!(list.len(), 1);
    assert_eq!(int(&list.get(0).unwrap()), 5);
}

/// `call_method` returns the function's result.
#[test]
fn call_method_returns_the_result() {
    let session = Session::kernel();
    let list = session.eval("[4, 5, 6]").unwrap();
    assert_eq!(int(&list.call_method("Length", &[]).unwrap().unwrap()), 3);
    let negative = session.element(-5).unwrap();
    assert_eq!(int(&negative.call_method("AbsInt", &[]).unwrap().unwrap()), 5);
}

/// Unbound names are not found.
#[test]
fn unknown_names_are_not_found() {
    let session = Session::kernel();
    let value = session.convert(1).unwrap();
    assert!(matches!(value.resolve("NoSuchFunction"), Resolution::NotFound));
    let err = value.method("NoSuchFunction").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttributeError);
    assert_eq!(err.message(), "no attribute 'NoSuchFunction'");
}

/// A bound name that is not a function cannot be called as a method.
#[test]
fn non_functions_are_not_callable() {
    let session = Session::kernel();
    let value = session.convert(1).unwrap();
    assert!(matches!(value.resolve("Integers"), Resolution::NotCallable));
    let err = value.method("Integers").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotCallableError);
    assert_eq!(err.message(), "'Integers' is not a function and cannot be called as a method");
}

/// Reserved host names never reach the engine.
#[test]
fn reserved_names_are_not_found() {
    let session = Session::kernel();
    let value = session.convert(1).unwrap();
    for name in ["", "__len__", "__Length"] {
        assert!(matches!(value.resolve(name), Resolution::NotFound), "{name:?}");
    }
}

/// Methods resolve on null handles only through `resolve`.
#[test]
fn null_receivers_have_no_methods() {
    let session = Session::kernel();
    let err = Handle::null(&session).method("Length").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UsageError);
}
