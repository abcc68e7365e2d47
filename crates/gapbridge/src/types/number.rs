use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::handle_kind;
use crate::{
    error::{BridgeError, BridgeResult},
    limbs,
};

handle_kind!(
    /// An integer of any size: immediate or a limb bag.
    Integer
);

handle_kind!(
    /// A machine float.
    Float
);

handle_kind!(
    /// An exact non-integral rational.
    Rational
);

handle_kind!(
    /// A non-rational element of a cyclotomic field.
    Cyclotomic
);

handle_kind!(
    /// An element of a prime field.
    FiniteFieldElement
);

handle_kind!(
    /// A residue class modulo a composite number.
    IntegerMod
);

impl Integer {
    /// The exact value, decoded limb by limb.
    #[must_use]
    pub fn to_bigint(&self) -> BigInt {
        let _bracket = self.session().enter();
        limbs::to_host(self.session().engine(), self.target()).unwrap_or_default()
    }

    /// The value as an `i64`, failing with a conversion error when it does not fit.
    pub fn to_i64(&self) -> BridgeResult<i64> {
        let value = self.to_bigint();
        value.to_i64().ok_or_else(|| {
            self.session()
                .fail(BridgeError::conversion(format!("{value} does not fit in a 64-bit integer")))
        })
    }

    /// True when the engine stores the value inline in the reference.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.target().is_immediate_int()
    }
}

impl Float {
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let _bracket = self.session().enter();
        self.session().engine().float_value(self.target()).unwrap_or(f64::NAN)
    }
}

impl Rational {
    pub fn numerator(&self) -> BridgeResult<Integer> {
        self.session().call_global("NumeratorRat", &[self.target()])?.into_integer()
    }

    /// Always positive.
    pub fn denominator(&self) -> BridgeResult<Integer> {
        self.session().call_global("DenominatorRat", &[self.target()])?.into_integer()
    }
}

impl Cyclotomic {
    /// Smallest `n` such that the value lies in the `n`-th cyclotomic field.
    pub fn conductor(&self) -> BridgeResult<Integer> {
        self.session().call_global("Conductor", &[self.target()])?.into_integer()
    }
}

impl FiniteFieldElement {
    pub fn characteristic(&self) -> BridgeResult<Integer> {
        self.session().call_global("Characteristic", &[self.target()])?.into_integer()
    }

    /// Residue in `0..p` representing the element.
    pub fn to_integer(&self) -> BridgeResult<Integer> {
        self.session().call_global("IntFFE", &[self.target()])?.into_integer()
    }
}

impl IntegerMod {
    /// Canonical residue in `0..modulus`.
    pub fn residue(&self) -> BridgeResult<Integer> {
        self.session().call_global("Int", &[self.target()])?.into_integer()
    }

    pub fn modulus(&self) -> BridgeResult<Integer> {
        self.session().call_global("Characteristic", &[self.target()])?.into_integer()
    }
}
