//! Host-side values and the conversion entry point into the engine.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    Handle,
    engine::{EngineError, Obj},
    error::{BridgeError, BridgeResult},
    limbs,
    session::Session,
    types::{Element, Kind},
};

/// Nesting depth past which conversion back to the host gives up, so a list
/// that contains itself is an error rather than a stack overflow.
const MAX_HOST_DEPTH: usize = 256;

/// An owned host value that can be passed to or read back from the engine.
///
/// Every variant except `None` has an engine counterpart. `None` only exists
/// inside a list, where it stands for a hole.
///
/// # Serialization
///
/// Derived serde, so postcard and JSON both work. `BigInt` values serialize
/// through num-bigint's own serde support. In human-readable formats a
/// non-finite float is written as the string `"NaN"`, `"inf"` or `"-inf"`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i64),
    /// An integer outside the `i64` range.
    BigInt(BigInt),
    Float(#[serde(serialize_with = "serialize_float", deserialize_with = "deserialize_float")] f64),
    String(String),
    /// Lists convert to mutable engine lists; `None` items become holes.
    List(Vec<HostValue>),
    /// Records keep their key order.
    Record(IndexMap<String, HostValue>),
}

fn serialize_float<S: serde::Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    if s.is_human_readable() && !value.is_finite() {
        s.serialize_str(&value.to_string())
    } else {
        s.serialize_f64(*value)
    }
}

/// Accepts a plain number, or in human-readable formats one of the strings
/// written by [`serialize_float`].
fn deserialize_float<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    if !d.is_human_readable() {
        return <f64 as serde::Deserialize>::deserialize(d);
    }
    match <Repr as serde::Deserialize>::deserialize(d)? {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => text
            .parse::<f64>()
            .ok()
            .filter(|value| !value.is_finite())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid float: {text:?}"))),
    }
}

impl HostValue {
    /// Integer constructor that picks `Int` whenever the value fits.
    #[must_use]
    pub fn integer(value: BigInt) -> Self {
        match value.to_i64() {
            Some(small) => Self::Int(small),
            None => Self::BigInt(value),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<BigInt> for HostValue {
    fn from(value: BigInt) -> Self {
        Self::integer(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for HostValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Conversion of a host value into a reserved engine object.
///
/// Handles pass through unchanged after a check that they belong to the
/// same engine; everything else is built in the engine.
pub trait IntoHandle {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle>;
}

impl IntoHandle for Handle {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        if self.session().same_engine(session) {
            Ok(self)
        } else {
            Err(session.fail(BridgeError::usage("handle belongs to a different engine session")))
        }
    }
}

impl IntoHandle for &Handle {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        self.clone().into_handle(session)
    }
}

impl IntoHandle for Element {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        self.into_inner().into_handle(session)
    }
}

impl IntoHandle for &Element {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        self.handle().into_handle(session)
    }
}

impl IntoHandle for &HostValue {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        if matches!(self, HostValue::None) {
            return Err(session.fail(BridgeError::conversion("None has no engine value outside a list")));
        }
        let _bracket = session.enter();
        let obj = build(session, self)?.unwrap_or(Obj::NULL);
        Ok(session.wrap(obj))
    }
}

impl IntoHandle for HostValue {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        (&self).into_handle(session)
    }
}

impl IntoHandle for BigInt {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        (&self).into_handle(session)
    }
}

impl IntoHandle for &BigInt {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        let _bracket = session.enter();
        let obj = limbs::to_engine(session.engine(), self).map_err(|err| session.engine_error(err))?;
        Ok(session.wrap(obj))
    }
}

impl IntoHandle for i64 {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        let _bracket = session.enter();
        let obj = limbs::from_i64(session.engine(), self).map_err(|err| session.engine_error(err))?;
        Ok(session.wrap(obj))
    }
}

impl IntoHandle for i32 {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        i64::from(self).into_handle(session)
    }
}

impl IntoHandle for usize {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        BigInt::from(self).into_handle(session)
    }
}

impl IntoHandle for f64 {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        HostValue::Float(self).into_handle(session)
    }
}

impl IntoHandle for bool {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        HostValue::Bool(self).into_handle(session)
    }
}

impl IntoHandle for &str {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        let _bracket = session.enter();
        let obj = session
            .engine()
            .make_string(self)
            .map_err(|err| session.engine_error(err))?;
        Ok(session.wrap(obj))
    }
}

impl IntoHandle for String {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        self.as_str().into_handle(session)
    }
}

impl<T: IntoHandle> IntoHandle for Vec<T> {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        let items = self
            .into_iter()
            .map(|item| item.into_handle(session))
            .collect::<BridgeResult<Vec<_>>>()?;
        let _bracket = session.enter();
        let engine = session.engine();
        let list = engine.new_list(items.len()).map_err(|err| session.engine_error(err))?;
        for (pos, item) in items.iter().enumerate() {
            engine
                .list_ass(list, pos + 1, item.target())
                .map_err(|err| session.engine_error(err))?;
        }
        Ok(session.wrap(list))
    }
}

impl<T: IntoHandle> IntoHandle for IndexMap<String, T> {
    fn into_handle(self, session: &Session) -> BridgeResult<Handle> {
        let fields = self
            .into_iter()
            .map(|(key, value)| Ok((key, value.into_handle(session)?)))
            .collect::<BridgeResult<Vec<_>>>()?;
        let _bracket = session.enter();
        let engine = session.engine();
        let record = engine.new_record().map_err(|err| session.engine_error(err))?;
        for (key, value) in &fields {
            engine
                .rec_ass(record, engine.rnam(key), value.target())
                .map_err(|err| session.engine_error(err))?;
        }
        Ok(session.wrap(record))
    }
}

/// Builds the engine object for `value`; `None` maps to no object.
///
/// Must run inside a bracket. Intermediate objects stay unreserved until the
/// caller wraps the result; the collector only runs at the outermost leave.
fn build(session: &Session, value: &HostValue) -> BridgeResult<Option<Obj>> {
    let engine = session.engine();
    let check = |result: Result<Obj, EngineError>| result.map_err(|err| session.engine_error(err));
    let obj = match value {
        HostValue::None => return Ok(None),
        HostValue::Bool(true) => engine.true_obj(),
        HostValue::Bool(false) => engine.false_obj(),
        HostValue::Int(value) => check(limbs::from_i64(engine, *value))?,
        HostValue::BigInt(value) => check(limbs::to_engine(engine, value))?,
        HostValue::Float(value) => check(engine.make_float(*value))?,
        HostValue::String(value) => check(engine.make_string(value))?,
        HostValue::List(items) => {
            let list = check(engine.new_list(items.len()))?;
            for (pos, item) in items.iter().enumerate() {
                if let Some(item) = build(session, item)? {
                    check(engine.list_ass(list, pos + 1, item).map(|()| list))?;
                }
            }
            list
        }
        HostValue::Record(fields) => {
            let record = check(engine.new_record())?;
            for (key, value) in fields {
                let value = build(session, value)?.ok_or_else(|| {
                    session.fail(BridgeError::conversion(format!("record component '{key}' is None")))
                })?;
                check(engine.rec_ass(record, engine.rnam(key), value).map(|()| record))?;
            }
            record
        }
    };
    Ok(Some(obj))
}

impl Element {
    /// The inverse conversion: a host value equal to this element.
    ///
    /// Holes in lists come back as [`HostValue::None`]. `fail`, functions,
    /// permutations and the algebraic kinds have no host form and are
    /// conversion errors.
    pub fn to_host(&self) -> BridgeResult<HostValue> {
        self.to_host_at(0)
    }

    fn to_host_at(&self, depth: usize) -> BridgeResult<HostValue> {
        if depth > MAX_HOST_DEPTH {
            return Err(self
                .session()
                .fail(BridgeError::conversion("value is nested too deeply (or contains itself)")));
        }
        Ok(match self {
            Self::Integer(int) => HostValue::integer(int.to_bigint()),
            Self::Float(float) => HostValue::Float(float.to_f64()),
            Self::Boolean(boolean) => HostValue::Bool(boolean.to_bool()?),
            Self::String(string) => HostValue::String(string.to_string_lossless()?),
            Self::List(list) => HostValue::List(
                list.iter()
                    .map(|item| item.map_or(Ok(HostValue::None), |item| item.to_host_at(depth + 1)))
                    .collect::<BridgeResult<_>>()?,
            ),
            Self::Record(record) => HostValue::Record(
                record
                    .iter()
                    .map(|(key, value)| Ok((key, value.to_host_at(depth + 1)?)))
                    .collect::<BridgeResult<_>>()?,
            ),
            other => {
                return Err(self
                    .session()
                    .fail(BridgeError::conversion(no_host_form(other.kind()))));
            }
        })
    }
}

fn no_host_form(kind: Kind) -> String {
    format!("{kind} has no host value")
}
