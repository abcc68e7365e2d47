use super::handle_kind;
use crate::error::{BridgeError, BridgeResult};

handle_kind!(
    /// One of the engine's three truth values: `true`, `false` or `fail`.
    Boolean
);

impl Boolean {
    /// The host truth value. `fail` has none and is a conversion error.
    pub fn to_bool(&self) -> BridgeResult<bool> {
        let engine = self.session().engine();
        let target = self.target();
        if target == engine.true_obj() {
            Ok(true)
        } else if target == engine.false_obj() {
            Ok(false)
        } else {
            Err(self
                .session()
                .fail(BridgeError::conversion("fail has no boolean value")))
        }
    }

    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.target() == self.session().engine().fail_obj()
    }
}
