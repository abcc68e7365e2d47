//! Prime field elements `Z(p)^k`, stored immediately in the object word.

use crate::engine::Obj;

/// Largest characteristic the kernel supports.
pub(crate) const MAX_PRIME: u32 = 65_521;

/// Bits reserved for the log code inside an immediate element.
const CODE_BITS: u32 = 18;

/// A prime field element: `log == None` is zero, otherwise `Z(prime)^log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Ffe {
    pub prime: u32,
    pub log: Option<u32>,
}

impl Ffe {
    pub fn zero(prime: u32) -> Self {
        Self { prime, log: None }
    }

    /// `Z(prime)^log` with the exponent reduced modulo the group order.
    pub fn power_of_root(prime: u32, log: u64) -> Self {
        let order = u64::from(prime - 1);
        Self {
            prime,
            log: Some((log % order) as u32),
        }
    }

    pub fn encode(self) -> Obj {
        let code = self.log.map_or(0, |log| log as usize + 1);
        Obj::from_raw((((self.prime as usize) << CODE_BITS | code) << 2) | Obj::FFE_TAG)
    }

    pub fn decode(obj: Obj) -> Option<Self> {
        if !obj.is_immediate_ffe() {
            return None;
        }
        let payload = obj.raw() >> 2;
        let code = payload & ((1 << CODE_BITS) - 1);
        let prime = (payload >> CODE_BITS) as u32;
        let log = if code == 0 { None } else { Some((code - 1) as u32) };
        Some(Self { prime, log })
    }

    /// The element as a residue in `0..prime`.
    pub fn residue(self) -> u32 {
        match self.log {
            None => 0,
            Some(log) => pow_mod(primitive_root(self.prime), u64::from(log), self.prime),
        }
    }

    /// The element with the given residue.
    pub fn from_residue(prime: u32, residue: u64) -> Self {
        let residue = (residue % u64::from(prime)) as u32;
        if residue == 0 {
            return Self::zero(prime);
        }
        let root = primitive_root(prime);
        let mut acc = 1u32;
        for log in 0..prime - 1 {
            if acc == residue {
                return Self { prime, log: Some(log) };
            }
            acc = mul_mod(acc, root, prime);
        }
        Self::zero(prime)
    }
}

pub(crate) fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

fn mul_mod(a: u32, b: u32, p: u32) -> u32 {
    (u64::from(a) * u64::from(b) % u64::from(p)) as u32
}

pub(crate) fn pow_mod(base: u32, mut exp: u64, p: u32) -> u32 {
    let mut result = 1 % p;
    let mut base = base % p;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, p);
        }
        base = mul_mod(base, base, p);
        exp >>= 1;
    }
    result
}

/// Smallest generator of the multiplicative group of `GF(p)`.
pub(crate) fn primitive_root(p: u32) -> u32 {
    if p == 2 {
        return 1;
    }
    let order = p - 1;
    let mut factors = Vec::new();
    let mut rest = order;
    let mut d = 2;
    while d * d <= rest {
        if rest % d == 0 {
            factors.push(d);
            while rest % d == 0 {
                rest /= d;
            }
        }
        d += 1;
    }
    if rest > 1 {
        factors.push(rest);
    }
    (2..p)
        .find(|&g| factors.iter().all(|&q| pow_mod(g, u64::from(order / q), p) != 1))
        .unwrap_or(1)
}
