use super::handle_kind;
use crate::error::{BridgeError, BridgeResult};

handle_kind!(
    /// An engine string, or a non-empty list made only of characters.
    EngineString
);

impl EngineString {
    /// Raw bytes. Engine strings carry no encoding.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let _bracket = self.session().enter();
        self.session().engine().string_bytes(self.target()).unwrap_or_default()
    }

    /// The bytes as UTF-8, failing with a conversion error otherwise.
    pub fn to_string_lossless(&self) -> BridgeResult<String> {
        String::from_utf8(self.to_bytes()).map_err(|err| {
            self.session()
                .fail(BridgeError::conversion(format!("string is not valid UTF-8: {err}")))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let _bracket = self.session().enter();
        self.session().engine().list_len(self.target())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
