use super::{Element, handle_kind};
use crate::{
    error::{BridgeError, BridgeResult},
    object::IntoHandle,
    types,
};

handle_kind!(
    /// An engine record: string keys interned by the engine as small integers.
    Record
);

impl Record {
    /// Number of assigned components.
    #[must_use]
    pub fn len(&self) -> usize {
        let _bracket = self.session().enter();
        self.session().engine().rec_rnams(self.target()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Component names in assignment order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let _bracket = self.session().enter();
        let engine = self.session().engine();
        engine
            .rec_rnams(self.target())
            .into_iter()
            .filter_map(|rnam| engine.rnam_name(rnam))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let _bracket = self.session().enter();
        let engine = self.session().engine();
        engine.rec_elm(self.target(), engine.rnam(key)).is_some()
    }

    /// The component `key`, or a key error naming it.
    pub fn get(&self, key: &str) -> BridgeResult<Element> {
        let session = self.session();
        let _bracket = session.enter();
        let engine = session.engine();
        let value = engine
            .rec_elm(self.target(), engine.rnam(key))
            .ok_or_else(|| session.fail(BridgeError::no_such_field(key)))?;
        Ok(types::classify(session.wrap(value)))
    }

    /// Assigns the component `key`, adding it if absent.
    pub fn set(&self, key: &str, value: impl IntoHandle) -> BridgeResult<()> {
        let session = self.session();
        let value = value.into_handle(session)?;
        let _bracket = session.enter();
        let engine = session.engine();
        if !engine.is_mutable(self.target()) {
            return Err(session.fail(BridgeError::immutable("record")));
        }
        engine
            .rec_ass(self.target(), engine.rnam(key), value.target())
            .map_err(|err| session.engine_error(err))
    }

    /// Name and value of every component, in assignment order.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<(String, Element)> {
        let session = self.session();
        let _bracket = session.enter();
        let engine = session.engine();
        engine
            .rec_rnams(self.target())
            .into_iter()
            .filter_map(|rnam| {
                let name = engine.rnam_name(rnam)?;
                let value = engine.rec_elm(self.target(), rnam)?;
                Some((name, types::classify(session.wrap(value))))
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}
