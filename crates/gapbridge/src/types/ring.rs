use super::{Integer, handle_kind};
use crate::error::BridgeResult;

handle_kind!(
    /// A ring component object such as `Integers` or `GF(7)`.
    Ring
);

impl Ring {
    pub fn characteristic(&self) -> BridgeResult<Integer> {
        self.session().call_global("Characteristic", &[self.target()])?.into_integer()
    }

    pub fn is_field(&self) -> BridgeResult<bool> {
        self.session().call_global("IsField", &[self.target()])?.into_boolean()?.to_bool()
    }
}
