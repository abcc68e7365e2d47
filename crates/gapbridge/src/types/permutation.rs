use num_traits::ToPrimitive;

use super::handle_kind;
use crate::error::{BridgeError, BridgeResult};

handle_kind!(
    /// A permutation of the positive integers, in either storage width.
    Permutation
);

impl Permutation {
    /// Images of `0..degree`, zero-based. The identity has no images.
    pub fn images(&self) -> BridgeResult<Vec<u32>> {
        let list = self.session().call_global("ListPerm", &[self.target()])?.into_list()?;
        list.iter()
            .map(|item| {
                item.and_then(|item| item.into_integer().ok())
                    .and_then(|image| image.to_bigint().to_u32())
                    .and_then(|image| image.checked_sub(1))
                    .ok_or_else(|| self.session().fail(BridgeError::conversion("malformed permutation image")))
            })
            .collect()
    }

    /// Largest point the permutation moves, or zero for the identity.
    pub fn largest_moved_point(&self) -> BridgeResult<usize> {
        let point = self
            .session()
            .call_global("LargestMovedPoint", &[self.target()])?
            .into_integer()?;
        let value = point.to_i64()?;
        usize::try_from(value)
            .map_err(|_| self.session().fail(BridgeError::conversion("negative moved point")))
    }

    /// `1` for even permutations, `-1` for odd ones.
    pub fn sign(&self) -> BridgeResult<i64> {
        self.session().call_global("SignPerm", &[self.target()])?.into_integer()?.to_i64()
    }
}
