//! Generic arithmetic and comparison.
//!
//! Each operand pair is routed to the first family that accepts it: exact and
//! floating-point numbers, prime field elements, roots of unity,
//! permutations, residue classes, and finally lists (pointwise or scalar).
//! Anything else has no method.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::{Bag, Ffe, Kernel, MAX_NESTING, Ring};
use crate::{
    engine::{BinaryOp, Engine, EngineError, EngineResult, Obj},
    limbs,
};

pub(crate) fn no_method(symbol: &str) -> EngineError {
    EngineError::NoMethod(format!("no 1st choice method found for `{symbol}' on 2 arguments"))
}

fn division_by_zero() -> EngineError {
    EngineError::Failed("Rational operations: <divisor> must not be zero".to_owned())
}

fn nesting_too_deep() -> EngineError {
    EngineError::Failed(format!("recursion depth exceeds {MAX_NESTING}"))
}

/// A number as seen by the arithmetic: an exact fraction with positive
/// denominator, or a float.
#[derive(Debug, Clone)]
enum Num {
    Exact(BigInt, BigInt),
    Float(f64),
}

impl Num {
    fn of(kernel: &Kernel, obj: Obj) -> Option<Self> {
        if let Some(int) = kernel.int(obj) {
            return Some(Self::Exact(int, BigInt::one()));
        }
        kernel
            .with_bag(obj, |bag| match bag {
                Bag::Rat { num, den } => Some(Self::Exact(num.clone(), den.clone())),
                Bag::Float(value) => Some(Self::Float(*value)),
                _ => None,
            })
            .flatten()
    }

    fn to_f64(&self) -> f64 {
        match self {
            Self::Exact(num, den) => {
                let num = num.to_f64().unwrap_or(f64::NAN);
                let den = den.to_f64().unwrap_or(f64::NAN);
                num / den
            }
            Self::Float(value) => *value,
        }
    }
}

fn compare_numbers(a: &Num, b: &Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Exact(n1, d1), Num::Exact(n2, d2)) => Some((n1 * d2).cmp(&(n2 * d1))),
        _ => a.to_f64().partial_cmp(&b.to_f64()),
    }
}

/// Builds a normalized rational, or an integer when the denominator cancels.
pub(crate) fn make_rat(kernel: &Kernel, num: BigInt, den: BigInt) -> EngineResult<Obj> {
    if den.is_zero() {
        return Err(division_by_zero());
    }
    let gcd = num.gcd(&den);
    let (mut num, mut den) = (num / &gcd, den / &gcd);
    if den.is_negative() {
        num = -num;
        den = -den;
    }
    if den.is_one() {
        kernel.make_bigint(&num)
    } else {
        kernel.alloc(Bag::Rat { num, den })
    }
}

/// `base^exp` for a non-negative exponent by repeated squaring.
///
/// Every squaring step is interruptible.
pub(crate) fn int_pow(kernel: &Kernel, base: &BigInt, exp: &BigInt) -> EngineResult<BigInt> {
    if base.is_zero() {
        return Ok(if exp.is_zero() { BigInt::one() } else { BigInt::zero() });
    }
    if base.is_one() {
        return Ok(BigInt::one());
    }
    if *base == BigInt::from(-1) {
        return Ok(if exp.is_even() { BigInt::one() } else { -BigInt::one() });
    }
    let Some(mut rest) = exp.to_u64() else {
        return Err(EngineError::Failed("Integer operations: exponent too large".to_owned()));
    };
    let bits = base.bits().saturating_mul(rest);
    kernel.check_limbs(usize::try_from(bits / 64 + 1).unwrap_or(usize::MAX))?;

    let mut result = BigInt::one();
    let mut square = base.clone();
    while rest > 0 {
        kernel.poll()?;
        if rest & 1 == 1 {
            result *= &square;
        }
        rest >>= 1;
        if rest > 0 {
            square = &square * &square;
        }
    }
    Ok(result)
}

fn mod_inverse(value: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let egcd = value.mod_floor(modulus).extended_gcd(modulus);
    egcd.gcd.is_one().then(|| egcd.x.mod_floor(modulus))
}

pub(crate) fn binary(kernel: &Kernel, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
    kernel.poll()?;
    if let (Some(a), Some(b)) = (Num::of(kernel, left), Num::of(kernel, right)) {
        return numeric(kernel, op, a, b);
    }
    if left.is_immediate_ffe() || right.is_immediate_ffe() {
        return finite_field(kernel, op, left, right);
    }
    if is_cyc_bag(kernel, left) || is_cyc_bag(kernel, right) {
        return cyclotomic(kernel, op, left, right);
    }
    let left_perm = kernel.perm_images(left);
    let right_perm = kernel.perm_images(right);
    if left_perm.is_some() || right_perm.is_some() {
        return permutation(kernel, op, (left, left_perm), (right, right_perm));
    }
    if residue_class(kernel, left).is_some() || residue_class(kernel, right).is_some() {
        return residue_arith(kernel, op, left, right);
    }
    if kernel.is_list(left) || kernel.is_list(right) {
        return list_arith(kernel, op, left, right);
    }
    Err(no_method(op.symbol()))
}

fn numeric(kernel: &Kernel, op: BinaryOp, a: Num, b: Num) -> EngineResult<Obj> {
    let ((n1, d1), (n2, d2)) = match (a, b) {
        (Num::Exact(n1, d1), Num::Exact(n2, d2)) => ((n1, d1), (n2, d2)),
        (a, b) => {
            let (x, y) = (a.to_f64(), b.to_f64());
            let value = match op {
                BinaryOp::Sum => x + y,
                BinaryOp::Diff => x - y,
                BinaryOp::Prod => x * y,
                BinaryOp::Quo => x / y,
                BinaryOp::Mod => x.rem_euclid(y),
                BinaryOp::Pow => x.powf(y),
            };
            return kernel.make_float(value);
        }
    };

    let (num, den) = match op {
        BinaryOp::Sum => (&n1 * &d2 + &n2 * &d1, d1 * d2),
        BinaryOp::Diff => (&n1 * &d2 - &n2 * &d1, d1 * d2),
        BinaryOp::Prod => (n1 * n2, d1 * d2),
        BinaryOp::Quo => {
            if n2.is_zero() {
                return Err(division_by_zero());
            }
            (n1 * d2, d1 * n2)
        }
        BinaryOp::Mod => {
            if !d2.is_one() {
                return Err(no_method("mod"));
            }
            return modulo(kernel, &n1, &d1, &n2);
        }
        BinaryOp::Pow => {
            if !d2.is_one() {
                return Err(no_method("^"));
            }
            return power(kernel, n1, d1, &n2);
        }
    };
    make_rat(kernel, num, den)
}

/// `num/den mod m`, using the inverse of `den` modulo `m` for fractions.
fn modulo(kernel: &Kernel, num: &BigInt, den: &BigInt, m: &BigInt) -> EngineResult<Obj> {
    if m.is_zero() {
        return Err(EngineError::Failed(
            "Integer operations: <divisor> must be nonzero".to_owned(),
        ));
    }
    let m = m.abs();
    if den.is_one() {
        return kernel.make_bigint(&num.mod_floor(&m));
    }
    let inverse = mod_inverse(den, &m).ok_or_else(|| {
        EngineError::Failed("ModRat: for <r>/<s> mod <n>, <s> and <n> must be coprime".to_owned())
    })?;
    kernel.make_bigint(&(num * inverse).mod_floor(&m))
}

fn power(kernel: &Kernel, num: BigInt, den: BigInt, exp: &BigInt) -> EngineResult<Obj> {
    if exp.is_negative() {
        if num.is_zero() {
            return Err(division_by_zero());
        }
        return power(kernel, den, num, &-exp);
    }
    let num = int_pow(kernel, &num, exp)?;
    let den = int_pow(kernel, &den, exp)?;
    make_rat(kernel, num, den)
}

// ======================================================================
// Prime field elements
// ======================================================================

fn field_operand(kernel: &Kernel, obj: Obj, prime: u32) -> Option<Ffe> {
    Ffe::decode(obj).or_else(|| {
        let residue = kernel.int(obj)?.mod_floor(&BigInt::from(prime)).to_u64()?;
        Some(Ffe::from_residue(prime, residue))
    })
}

fn finite_field(kernel: &Kernel, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
    if op == BinaryOp::Pow {
        let (Some(base), Some(exp)) = (Ffe::decode(left), kernel.int(right)) else {
            return Err(no_method("^"));
        };
        return Ok(ffe_power(base, &exp)?.encode());
    }
    let Some(prime) = Ffe::decode(left).or_else(|| Ffe::decode(right)).map(|ffe| ffe.prime) else {
        return Err(no_method(op.symbol()));
    };
    let (Some(a), Some(b)) = (field_operand(kernel, left, prime), field_operand(kernel, right, prime)) else {
        return Err(no_method(op.symbol()));
    };
    if a.prime != b.prime {
        return Err(EngineError::Failed(
            "FFE operations: <x> and <y> must lie in the same field".to_owned(),
        ));
    }
    let p = u64::from(prime);
    let result = match op {
        BinaryOp::Sum => Ffe::from_residue(prime, u64::from(a.residue()) + u64::from(b.residue())),
        BinaryOp::Diff => Ffe::from_residue(prime, u64::from(a.residue()) + p - u64::from(b.residue())),
        BinaryOp::Prod => match (a.log, b.log) {
            (Some(x), Some(y)) => Ffe::power_of_root(prime, u64::from(x) + u64::from(y)),
            _ => Ffe::zero(prime),
        },
        BinaryOp::Quo => match (a.log, b.log) {
            (_, None) => {
                return Err(EngineError::Failed(
                    "FFE operations: <divisor> must not be zero".to_owned(),
                ));
            }
            (None, Some(_)) => Ffe::zero(prime),
            (Some(x), Some(y)) => Ffe::power_of_root(prime, u64::from(x) + (p - 1) - u64::from(y)),
        },
        BinaryOp::Mod | BinaryOp::Pow => return Err(no_method(op.symbol())),
    };
    Ok(result.encode())
}

fn ffe_power(base: Ffe, exp: &BigInt) -> EngineResult<Ffe> {
    let Some(log) = base.log else {
        return match exp.sign() {
            num_bigint::Sign::NoSign => Ok(Ffe::power_of_root(base.prime, 0)),
            num_bigint::Sign::Plus => Ok(base),
            num_bigint::Sign::Minus => Err(EngineError::Failed(
                "FFE operations: <divisor> must not be zero".to_owned(),
            )),
        };
    };
    let order = BigInt::from(base.prime - 1);
    let k = exp.mod_floor(&order).to_u64().unwrap_or(0);
    Ok(Ffe::power_of_root(base.prime, u64::from(log) * k))
}

// ======================================================================
// Roots of unity
// ======================================================================

fn is_cyc_bag(kernel: &Kernel, obj: Obj) -> bool {
    kernel.with_bag(obj, |bag| matches!(bag, Bag::Cyc { .. })).unwrap_or(false)
}

/// `(order, exponent)` of a root of unity, treating `1` and `-1` as `E(1)` and `E(2)`.
fn root_of(kernel: &Kernel, obj: Obj) -> Option<(u64, u64)> {
    match limbs::immediate_value(obj) {
        Some(1) => return Some((1, 0)),
        Some(-1) => return Some((2, 1)),
        _ => {}
    }
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::Cyc { order, exponent } => Some((u64::from(*order), u64::from(*exponent))),
            _ => None,
        })
        .flatten()
}

/// `E(order)^exponent`, reduced to lowest terms. Orders 1 and 2 give integers.
pub(crate) fn root_of_unity(kernel: &Kernel, order: u64, exponent: u64) -> EngineResult<Obj> {
    let exponent = exponent % order;
    let gcd = exponent.gcd(&order);
    let (order, exponent) = (order / gcd, exponent / gcd);
    match order {
        1 => kernel.small_int(1),
        2 => kernel.small_int(-1),
        _ => {
            let order = u32::try_from(order)
                .map_err(|_| EngineError::Failed("E: <n> must be less than 2^32".to_owned()))?;
            kernel.alloc(Bag::Cyc {
                order,
                exponent: exponent as u32,
            })
        }
    }
}

fn cyclotomic(kernel: &Kernel, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
    match op {
        BinaryOp::Pow => {
            let (Some((order, exponent)), Some(k)) = (root_of(kernel, left), kernel.int(right)) else {
                return Err(no_method("^"));
            };
            let k = k.mod_floor(&BigInt::from(order)).to_u64().unwrap_or(0);
            root_of_unity(kernel, order, exponent * k % order)
        }
        BinaryOp::Prod | BinaryOp::Quo => {
            let (Some((o1, e1)), Some((o2, e2))) = (root_of(kernel, left), root_of(kernel, right)) else {
                return Err(no_method(op.symbol()));
            };
            let e2 = if op == BinaryOp::Quo { (o2 - e2) % o2 } else { e2 };
            let lcm = u128::from(o1.lcm(&o2));
            let exponent = (u128::from(e1) * (lcm / u128::from(o1)) + u128::from(e2) * (lcm / u128::from(o2))) % lcm;
            root_of_unity(kernel, lcm as u64, exponent as u64)
        }
        BinaryOp::Sum | BinaryOp::Diff | BinaryOp::Mod => Err(no_method(op.symbol())),
    }
}

// ======================================================================
// Permutations
// ======================================================================

fn image(images: &[u32], point: u32) -> u32 {
    images.get(point as usize).copied().unwrap_or(point)
}

/// `p * q`: apply `p` first, then `q`.
pub(crate) fn compose(p: &[u32], q: &[u32]) -> Vec<u32> {
    let degree = p.len().max(q.len()) as u32;
    (0..degree).map(|i| image(q, image(p, i))).collect()
}

fn invert(p: &[u32]) -> Vec<u32> {
    let mut inverse = vec![0; p.len()];
    for (i, &img) in p.iter().enumerate() {
        inverse[img as usize] = i as u32;
    }
    inverse
}

fn perm_power(kernel: &Kernel, p: &[u32], exp: &BigInt) -> EngineResult<Vec<u32>> {
    let mut square = if exp.is_negative() { invert(p) } else { p.to_vec() };
    let Some(mut rest) = exp.abs().to_u64() else {
        return Err(EngineError::Failed("PowPermInt: exponent too large".to_owned()));
    };
    let mut result = Vec::new();
    while rest > 0 {
        kernel.poll()?;
        if rest & 1 == 1 {
            result = compose(&result, &square);
        }
        rest >>= 1;
        if rest > 0 {
            square = compose(&square, &square);
        }
    }
    Ok(result)
}

fn permutation(
    kernel: &Kernel,
    op: BinaryOp,
    (left, left_perm): (Obj, Option<Vec<u32>>),
    (right, right_perm): (Obj, Option<Vec<u32>>),
) -> EngineResult<Obj> {
    let images = match (op, left_perm, right_perm) {
        (BinaryOp::Prod, Some(p), Some(q)) => compose(&p, &q),
        (BinaryOp::Quo, Some(p), Some(q)) => compose(&p, &invert(&q)),
        (BinaryOp::Pow, Some(p), Some(q)) => compose(&compose(&invert(&q), &p), &q),
        (BinaryOp::Pow, Some(p), None) => {
            let exp = kernel.int(right).ok_or_else(|| no_method("^"))?;
            perm_power(kernel, &p, &exp)?
        }
        (BinaryOp::Pow, None, Some(q)) => {
            let point = kernel
                .int(left)
                .ok_or_else(|| no_method("^"))?
                .to_u32()
                .filter(|&point| point > 0)
                .ok_or_else(|| {
                    EngineError::Failed("Perm. Operations: <point> must be a positive integer".to_owned())
                })?;
            return kernel.small_int(i64::from(image(&q, point - 1)) + 1);
        }
        _ => return Err(no_method(op.symbol())),
    };
    kernel.alloc(Bag::perm(images))
}

// ======================================================================
// Residue classes
// ======================================================================

fn residue_class(kernel: &Kernel, obj: Obj) -> Option<(u64, u64)> {
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::ZmodnZ { residue, modulus } => Some((*residue, *modulus)),
            _ => None,
        })
        .flatten()
}

fn residue_arith(kernel: &Kernel, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
    let Some(modulus) = residue_class(kernel, left)
        .or_else(|| residue_class(kernel, right))
        .map(|(_, modulus)| modulus)
    else {
        return Err(no_method(op.symbol()));
    };
    let m = BigInt::from(modulus);
    let operand = |obj: Obj| -> EngineResult<BigInt> {
        if let Some((residue, other)) = residue_class(kernel, obj) {
            if other != modulus {
                return Err(EngineError::Failed(
                    "ZmodnZObj: <x> and <y> must have the same modulus".to_owned(),
                ));
            }
            return Ok(BigInt::from(residue));
        }
        kernel
            .int(obj)
            .map(|int| int.mod_floor(&m))
            .ok_or_else(|| no_method(op.symbol()))
    };

    let a = operand(left)?;
    let value = match op {
        BinaryOp::Pow => {
            let exp = kernel.int(right).ok_or_else(|| no_method("^"))?;
            let base = if exp.is_negative() { invert_residue(&a, &m)? } else { a };
            base.modpow(&exp.abs(), &m)
        }
        BinaryOp::Sum => (a + operand(right)?).mod_floor(&m),
        BinaryOp::Diff => (a - operand(right)?).mod_floor(&m),
        BinaryOp::Prod => (a * operand(right)?).mod_floor(&m),
        BinaryOp::Quo => (a * invert_residue(&operand(right)?, &m)?).mod_floor(&m),
        BinaryOp::Mod => return Err(no_method("mod")),
    };
    kernel.alloc(Bag::ZmodnZ {
        residue: value.to_u64().unwrap_or(0),
        modulus,
    })
}

fn invert_residue(value: &BigInt, modulus: &BigInt) -> EngineResult<BigInt> {
    mod_inverse(value, modulus)
        .ok_or_else(|| EngineError::Failed("ZmodnZObj: <divisor> must be invertible".to_owned()))
}

// ======================================================================
// Lists
// ======================================================================

fn list_arith(kernel: &Kernel, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
    let items = match (kernel.list_items(left), kernel.list_items(right)) {
        (Some(a), Some(b)) => match op {
            BinaryOp::Sum | BinaryOp::Diff => {
                let len = a.len().max(b.len());
                let mut items = Vec::with_capacity(len);
                for pos in 0..len {
                    let x = a.get(pos).copied().flatten();
                    let y = b.get(pos).copied().flatten();
                    items.push(match (x, y) {
                        (Some(x), Some(y)) => Some(binary(kernel, op, x, y)?),
                        (Some(x), None) => Some(x),
                        (None, Some(y)) if op == BinaryOp::Sum => Some(y),
                        (None, Some(y)) => Some(binary(kernel, BinaryOp::Diff, kernel.small_int(0)?, y)?),
                        (None, None) => None,
                    });
                }
                items
            }
            BinaryOp::Prod => return scalar_product(kernel, &a, &b),
            _ => return Err(no_method(op.symbol())),
        },
        (Some(a), None) if op != BinaryOp::Pow => a
            .into_iter()
            .map(|x| x.map(|x| binary(kernel, op, x, right)).transpose())
            .collect::<EngineResult<_>>()?,
        (None, Some(b)) if matches!(op, BinaryOp::Sum | BinaryOp::Diff | BinaryOp::Prod) => b
            .into_iter()
            .map(|y| y.map(|y| binary(kernel, op, left, y)).transpose())
            .collect::<EngineResult<_>>()?,
        _ => return Err(no_method(op.symbol())),
    };
    kernel.make_list(items)
}

fn scalar_product(kernel: &Kernel, a: &[Option<Obj>], b: &[Option<Obj>]) -> EngineResult<Obj> {
    let mut total = None;
    for (x, y) in a.iter().zip(b) {
        if let (Some(x), Some(y)) = (x, y) {
            let term = binary(kernel, BinaryOp::Prod, *x, *y)?;
            total = Some(match total {
                Some(sum) => binary(kernel, BinaryOp::Sum, sum, term)?,
                None => term,
            });
        }
    }
    total.ok_or_else(|| no_method("*"))
}

// ======================================================================
// Comparison
// ======================================================================

/// Objects compared by value but not by structure.
#[derive(Debug, PartialEq, Eq)]
enum AtomKey {
    Cyc(u32, u32),
    Residue(u64, u64),
    Ring(Ring),
}

fn atom_key(kernel: &Kernel, obj: Obj) -> Option<AtomKey> {
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::Cyc { order, exponent } => Some(AtomKey::Cyc(*order, *exponent)),
            Bag::ZmodnZ { residue, modulus } => Some(AtomKey::Residue(*residue, *modulus)),
            Bag::Ring(ring) => Some(AtomKey::Ring(*ring)),
            _ => None,
        })
        .flatten()
}

pub(crate) fn eq(kernel: &Kernel, left: Obj, right: Obj, depth: usize) -> EngineResult<bool> {
    if left == right {
        return Ok(true);
    }
    if depth > MAX_NESTING {
        return Err(nesting_too_deep());
    }
    kernel.poll()?;
    if let (Some(a), Some(b)) = (Num::of(kernel, left), Num::of(kernel, right)) {
        return Ok(compare_numbers(&a, &b) == Some(Ordering::Equal));
    }
    if let (Some(p), Some(q)) = (kernel.perm_images(left), kernel.perm_images(right)) {
        return Ok(p == q);
    }
    if let (Some(a), Some(b)) = (kernel.list_items(left), kernel.list_items(right)) {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.into_iter().zip(b) {
            let same = match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => eq(kernel, x, y, depth + 1)?,
                _ => false,
            };
            if !same {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    if kernel.is_record(left) && kernel.is_record(right) {
        let names = kernel.rec_rnams(left);
        if names.len() != kernel.rec_rnams(right).len() {
            return Ok(false);
        }
        for rnam in names {
            let (Some(x), Some(y)) = (kernel.rec_elm(left, rnam), kernel.rec_elm(right, rnam)) else {
                return Ok(false);
            };
            if !eq(kernel, x, y, depth + 1)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    Ok(atom_key(kernel, left).is_some_and(|key| Some(key) == atom_key(kernel, right)))
}

/// Families in their cross-family order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Family {
    Number,
    Cyclotomic,
    FiniteField,
    Permutation,
    Boolean,
    Char,
    List,
}

fn family(kernel: &Kernel, obj: Obj) -> Option<Family> {
    if obj.is_immediate_ffe() {
        return Some(Family::FiniteField);
    }
    if obj.is_immediate_int() {
        return Some(Family::Number);
    }
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::LargeInt { .. } | Bag::Rat { .. } | Bag::Float(_) => Some(Family::Number),
            Bag::Cyc { .. } => Some(Family::Cyclotomic),
            Bag::Perm2(_) | Bag::Perm4(_) => Some(Family::Permutation),
            Bag::True | Bag::False | Bag::Fail => Some(Family::Boolean),
            Bag::Char(_) => Some(Family::Char),
            Bag::String { .. } | Bag::List { .. } => Some(Family::List),
            _ => None,
        })
        .flatten()
}

pub(crate) fn lt(kernel: &Kernel, left: Obj, right: Obj, depth: usize) -> EngineResult<bool> {
    Ok(compare(kernel, left, right, depth)? == Ordering::Less)
}

fn compare(kernel: &Kernel, left: Obj, right: Obj, depth: usize) -> EngineResult<Ordering> {
    if depth > MAX_NESTING {
        return Err(nesting_too_deep());
    }
    kernel.poll()?;
    let (Some(lf), Some(rf)) = (family(kernel, left), family(kernel, right)) else {
        return Err(no_method("<"));
    };
    if lf != rf {
        return Ok(lf.cmp(&rf));
    }
    let ordering = match lf {
        Family::Number => match (Num::of(kernel, left), Num::of(kernel, right)) {
            (Some(a), Some(b)) => compare_numbers(&a, &b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        Family::Cyclotomic => root_of(kernel, left).cmp(&root_of(kernel, right)),
        Family::FiniteField => {
            let key = |obj| Ffe::decode(obj).map(|ffe| (ffe.prime, ffe.log.map_or(0, |log| u64::from(log) + 1)));
            key(left).cmp(&key(right))
        }
        Family::Permutation => {
            let p = kernel.perm_images(left).unwrap_or_default();
            let q = kernel.perm_images(right).unwrap_or_default();
            let degree = p.len().max(q.len()) as u32;
            (0..degree)
                .map(|i| image(&p, i).cmp(&image(&q, i)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        }
        Family::Boolean => kernel.truth_rank(left).cmp(&kernel.truth_rank(right)),
        Family::Char => kernel.char_value(left).cmp(&kernel.char_value(right)),
        Family::List => {
            let a = kernel.list_items(left).unwrap_or_default();
            let b = kernel.list_items(right).unwrap_or_default();
            for (x, y) in a.iter().zip(&b) {
                match (x, y) {
                    (None, None) => {}
                    (None, Some(_)) => return Ok(Ordering::Less),
                    (Some(_), None) => return Ok(Ordering::Greater),
                    (Some(x), Some(y)) => {
                        if !eq(kernel, *x, *y, depth + 1)? {
                            return compare(kernel, *x, *y, depth + 1);
                        }
                    }
                }
            }
            a.len().cmp(&b.len())
        }
    };
    Ok(ordering)
}
