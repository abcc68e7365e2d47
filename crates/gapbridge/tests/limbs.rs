//! Exact integer conversion between `BigInt` and the engine's integer layout.
//!
//! Values are chosen around the immediate/limb boundary as well as far
//! inside both ranges, for both signs.

use gapbridge::{Engine, Kernel, LimbBuf, Session, limbs};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use pretty_assertions::assert_eq;

fn edge() -> BigInt {
    BigInt::one() << limbs::IMMEDIATE_BITS
}

fn samples() -> Vec<BigInt> {
    let edge = edge();
    let two_limbs = BigInt::one() << 64_u32;
    vec![
        BigInt::zero(),
        BigInt::one(),
        -BigInt::one(),
        BigInt::from(i64::MAX),
        BigInt::from(i64::MIN),
        &edge - 1,
        edge.clone(),
        &edge + 1,
        -&edge,
        -&edge - 1,
        -&edge + 1,
        BigInt::from(u64::MAX),
        -BigInt::from(u64::MAX),
        two_limbs.clone(),
        &two_limbs - 1,
        -&two_limbs,
        BigInt::parse_bytes(b"123456789012345678901234567890123456789012345678901234567890", 10).unwrap(),
        -(BigInt::from(7) << 1000_u32) + 3,
    ]
}

// === Round trips ===

/// `to_host(to_engine(n)) == n` for every sample.
#[test]
fn round_trip_through_the_engine() {
    let kernel = Kernel::new();
    kernel.enter();
    for value in samples() {
        let obj = limbs::to_engine(&kernel, &value).unwrap();
        assert_eq!(limbs::to_host(&kernel, obj), Some(value));
    }
    kernel.leave();
}

/// The same round trip through the public handle API.
#[test]
fn round_trip_through_handles() {
    let session = Session::kernel();
    for value in samples() {
        let integer = session.element(&value).unwrap().into_integer().unwrap();
        assert_eq!(integer.to_bigint(), value);
    }
}

/// `i64` inputs take the immediate path when they can and still round-trip when they cannot.
#[test]
fn machine_integers_round_trip() {
    let session = Session::kernel();
    for value in [0_i64, 7, -7, i64::MAX, i64::MIN] {
        let integer = session.element(value).unwrap().into_integer().unwrap();
        assert_eq!(integer.to_i64().unwrap(), value);
    }
}

// === Immediate boundary ===

/// Zero is immediate and allocates nothing.
#[test]
fn zero_uses_the_immediate_path() {
    let kernel = Kernel::new();
    let before = kernel.live_bags();
    kernel.enter();
    let zero = limbs::to_engine(&kernel, &BigInt::zero()).unwrap();
    assert!(zero.is_immediate_int());
    assert_eq!(kernel.live_bags(), before);
    kernel.leave();
}

/// The boundary is decided by exact bit length, on both sides of zero.
#[test]
fn boundary_values_pick_the_right_encoding() {
    let kernel = Kernel::new();
    kernel.enter();
    let edge = edge();
    let cases = [
        (&edge - 1, true),
        (edge.clone(), false),
        (-&edge, true),
        (-&edge - 1, false),
    ];
    for (value, immediate) in cases {
        let obj = limbs::to_engine(&kernel, &value).unwrap();
        assert_eq!(obj.is_immediate_int(), immediate, "{value}");
        assert_eq!(limbs::fits_immediate(&value), immediate, "{value}");
    }
    kernel.leave();
}

/// Results of arithmetic that land back in the immediate range are immediates again.
#[test]
fn engine_results_are_normalized() {
    let session = Session::kernel();
    let big = session.element(edge()).unwrap();
    assert!(!big.as_integer().unwrap().is_immediate());
    let smaller = big.difference(1).unwrap().into_integer().unwrap();
    assert!(smaller.is_immediate());
    assert_eq!(smaller.to_bigint(), edge() - 1);
}

// === Limb layout ===

/// Limbs are exported least significant first with the sign kept apart.
#[test]
fn large_values_store_sign_and_limbs() {
    let kernel = Kernel::new();
    kernel.enter();
    let value = (BigInt::one() << 128_u32) + 5;

    let positive = limbs::to_engine(&kernel, &value).unwrap();
    assert_eq!(kernel.int_size(positive), 3);
    let mut out = LimbBuf::new();
    kernel.int_limbs(positive, &mut out);
    assert_eq!(out.as_slice(), &[5, 0, 1]);

    let negative = limbs::to_engine(&kernel, &-value).unwrap();
    assert_eq!(kernel.int_size(negative), -3);
    kernel.leave();
}

/// Non-integers have no host integer.
#[test]
fn non_integers_do_not_convert() {
    let kernel = Kernel::new();
    kernel.enter();
    let text = kernel.make_string("12").unwrap();
    assert_eq!(limbs::to_host(&kernel, text), None);
    kernel.leave();
}
