//! Serialization of handles.
//!
//! A handle reduces to a faithful host value when one exists, otherwise to
//! the engine's printed form plus the instruction to evaluate it again. The
//! textual fallback does not preserve object identity (two reductions of the
//! same mutable list reconstruct two independent lists), so callers that need
//! a faithful copy use [`Handle::reduce_strict`].

use serde::{Deserialize, Serialize};

use crate::{
    Handle,
    error::{BridgeError, BridgeResult, ErrorKind},
    object::HostValue,
    session::Session,
    types::Element,
};

/// Serializable description of how to rebuild an engine object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reduction {
    /// Rebuild by converting this host value.
    Value(HostValue),
    /// Rebuild by evaluating this engine source text.
    Eval(String),
}

impl Reduction {
    /// Compact binary form.
    pub fn to_bytes(&self) -> BridgeResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|err| BridgeError::conversion(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        postcard::from_bytes(bytes).map_err(|err| BridgeError::conversion(err.to_string()))
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(|err| BridgeError::conversion(err.to_string()))
    }

    pub fn from_json(json: &str) -> BridgeResult<Self> {
        serde_json::from_str(json).map_err(|err| BridgeError::conversion(err.to_string()))
    }
}

impl Handle {
    /// Reduces to a host value if possible, else to the printed form.
    pub fn reduce(&self) -> BridgeResult<Reduction> {
        self.check_not_null()?;
        match self.classify().to_host() {
            Ok(value) => Ok(Reduction::Value(value)),
            Err(err) if err.kind() == ErrorKind::ConversionError => Ok(Reduction::Eval(self.print())),
            Err(err) => Err(err),
        }
    }

    /// Like [`Self::reduce`], but fails instead of falling back to text.
    pub fn reduce_strict(&self) -> BridgeResult<Reduction> {
        self.check_not_null()?;
        self.classify().to_host().map(Reduction::Value)
    }
}

impl Session {
    /// Rebuilds the object a [`Reduction`] describes.
    pub fn reconstruct(&self, reduction: &Reduction) -> BridgeResult<Element> {
        match reduction {
            Reduction::Value(value) => self.element(value),
            Reduction::Eval(text) => self.eval(text),
        }
    }
}
