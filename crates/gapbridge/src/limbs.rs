//! Exact integer conversion between the engine and `num_bigint::BigInt`.
//!
//! The engine stores an integer either directly in the tagged reference
//! ("immediate", no allocation) or as a bag holding a sign and a sequence of
//! machine-word limbs, least significant first. Both directions are exact for
//! any magnitude; the immediate range is decided by bit length, never by
//! comparing against a cached bound.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::engine::{Engine, EngineResult, Limb, LimbBuf, Obj};

/// Magnitude bits available to an immediate integer.
///
/// The kernel keeps `usize::BITS - 4` of them, so immediates cover
/// `[-2^IMMEDIATE_BITS, 2^IMMEDIATE_BITS)`.
pub const IMMEDIATE_BITS: u64 = (usize::BITS - 4) as u64;

/// True when `value` is representable as an immediate integer.
///
/// Decided from the exact bit length: non-negative values need at most
/// `IMMEDIATE_BITS` bits; negative values may additionally be exactly
/// `-2^IMMEDIATE_BITS`.
#[must_use]
pub fn fits_immediate(value: &BigInt) -> bool {
    magnitude_fits(value.is_negative(), value.magnitude())
}

fn magnitude_fits(negative: bool, magnitude: &BigUint) -> bool {
    let bits = magnitude.bits();
    bits <= IMMEDIATE_BITS
        || (negative && bits == IMMEDIATE_BITS + 1 && magnitude.trailing_zeros() == Some(IMMEDIATE_BITS))
}

/// Decodes an immediate integer with a single arithmetic shift.
#[must_use]
pub fn immediate_value(obj: Obj) -> Option<i64> {
    if obj.is_immediate_int() {
        Some(((obj.raw() as isize) >> 2) as i64)
    } else {
        None
    }
}

/// Encodes `value` as an immediate integer if it is in range.
#[must_use]
pub fn immediate(value: i64) -> Option<Obj> {
    let max = 1i64 << IMMEDIATE_BITS;
    if (-max..max).contains(&value) {
        Some(Obj::from_raw((((value as isize) << 2) | Obj::INT_TAG as isize) as usize))
    } else {
        None
    }
}

/// Returns the immediate value of a sign/limb pair when it fits.
///
/// Engines use this to keep integers normalized: a value in the immediate
/// range is never stored as a bag.
#[must_use]
pub fn limbs_to_immediate(negative: bool, limbs: &[Limb]) -> Option<i64> {
    let used = limbs.iter().rposition(|&limb| limb != 0).map_or(0, |last| last + 1);
    match used {
        0 => Some(0),
        1 => {
            let magnitude = limbs[0];
            let limit = 1u64 << IMMEDIATE_BITS;
            if magnitude < limit {
                let value = magnitude as i64;
                Some(if negative { -value } else { value })
            } else if negative && magnitude == limit {
                Some(-(limit as i64))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Converts an engine integer to a `BigInt`.
///
/// Returns `None` when `obj` is not an integer.
#[must_use]
pub fn to_host(engine: &dyn Engine, obj: Obj) -> Option<BigInt> {
    if let Some(value) = immediate_value(obj) {
        return Some(BigInt::from(value));
    }
    let size = engine.int_size(obj);
    if size == 0 {
        return None;
    }
    let mut limbs = LimbBuf::new();
    engine.int_limbs(obj, &mut limbs);
    let sign = if size < 0 { Sign::Minus } else { Sign::Plus };
    Some(BigInt::from_biguint(sign, biguint_from_limbs(&limbs)))
}

/// Converts a `BigInt` to an engine integer.
///
/// Allocation failure inside the engine is returned as is; callers must not
/// retry it.
pub fn to_engine(engine: &dyn Engine, value: &BigInt) -> EngineResult<Obj> {
    if fits_immediate(value)
        && let Some(small) = value.to_i64()
        && let Some(obj) = immediate(small)
    {
        return Ok(obj);
    }
    let limbs: LimbBuf = value.magnitude().iter_u64_digits().collect();
    engine.make_int(value.is_negative(), &limbs)
}

/// Converts an `i64`, taking the immediate path whenever possible.
pub fn from_i64(engine: &dyn Engine, value: i64) -> EngineResult<Obj> {
    match immediate(value) {
        Some(obj) => Ok(obj),
        None => to_engine(engine, &BigInt::from(value)),
    }
}

/// Imports limbs, least significant first, into a `BigUint`.
#[must_use]
pub fn biguint_from_limbs(limbs: &[Limb]) -> BigUint {
    if limbs.is_empty() {
        return BigUint::zero();
    }
    let digits: Vec<u32> = limbs
        .iter()
        .flat_map(|&limb| [limb as u32, (limb >> 32) as u32])
        .collect();
    BigUint::new(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_boundaries_follow_bit_length() {
        let top = BigInt::from(1u64 << IMMEDIATE_BITS);
        assert!(!fits_immediate(&top), "2^N must not be immediate");
        assert!(fits_immediate(&(&top - 1)), "2^N - 1 must be immediate");
        assert!(fits_immediate(&-&top), "-2^N must be immediate");
        assert!(!fits_immediate(&(-&top - 1)), "-2^N - 1 must not be immediate");
        assert!(fits_immediate(&BigInt::zero()));
    }

    #[test]
    fn immediate_encoding_is_a_shift() {
        for value in [0i64, 1, -1, 42, -42, (1 << IMMEDIATE_BITS) - 1, -(1 << IMMEDIATE_BITS)] {
            let obj = immediate(value).unwrap();
            assert!(obj.is_immediate_int());
            assert_eq!(immediate_value(obj), Some(value));
        }
        assert_eq!(immediate(1 << IMMEDIATE_BITS), None);
        assert_eq!(immediate(-(1 << IMMEDIATE_BITS) - 1), None);
    }

    #[test]
    fn zero_is_the_immediate_zero_word() {
        let zero = immediate(0).unwrap();
        assert_eq!(zero.raw(), 1);
        assert!(!zero.is_null());
    }

    #[test]
    fn limbs_normalize_to_immediates() {
        assert_eq!(limbs_to_immediate(false, &[]), Some(0));
        assert_eq!(limbs_to_immediate(true, &[5, 0, 0]), Some(-5));
        assert_eq!(limbs_to_immediate(false, &[1 << IMMEDIATE_BITS]), None);
        assert_eq!(
            limbs_to_immediate(true, &[1 << IMMEDIATE_BITS]),
            Some(-(1i64 << IMMEDIATE_BITS))
        );
        assert_eq!(limbs_to_immediate(false, &[0, 1]), None);
    }

    #[test]
    fn limb_import_is_least_significant_first() {
        let value = biguint_from_limbs(&[3, 1]);
        assert_eq!(value, (BigUint::from(1u32) << 64u32) + 3u32);
    }
}
