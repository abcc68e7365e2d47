//! Variant kinds and the classifier that picks one for an engine object.
//!
//! Every kind is a [`Handle`] with kind-specific accessors; no kind carries
//! state beyond the handle itself. Semantic data is fetched from the engine
//! on demand.

mod boolean;
mod function;
mod list;
mod number;
mod permutation;
mod record;
mod ring;
mod string;

use std::{fmt, ops::Deref};

use strum::{Display, IntoStaticStr};

pub use self::{
    boolean::Boolean,
    function::{Function, MethodProxy},
    list::{List, ListIter},
    number::{Cyclotomic, FiniteFieldElement, Float, Integer, IntegerMod, Rational},
    permutation::Permutation,
    record::Record,
    ring::Ring,
    string::EngineString,
};
use crate::{
    Handle,
    engine::{EngineResult, Obj, Tnum},
    error::{BridgeError, BridgeResult},
    session::Session,
};

/// Declares a kind newtype around [`Handle`].
macro_rules! handle_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub(crate) $crate::Handle);

        impl $name {
            /// The underlying handle.
            #[must_use]
            pub fn handle(&self) -> &$crate::Handle {
                &self.0
            }

            /// Gives up the kind and returns the underlying handle.
            #[must_use]
            pub fn into_inner(self) -> $crate::Handle {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::Handle;

            fn deref(&self) -> &$crate::Handle {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut $crate::Handle {
                &mut self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
pub(crate) use handle_kind;

/// The closed set of host-visible kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Kind {
    /// Generic fallback, including the null handle.
    Object,
    Integer,
    Float,
    Rational,
    Cyclotomic,
    FiniteFieldElement,
    /// Residue class modulo a composite number.
    IntegerMod,
    Boolean,
    String,
    Permutation,
    Function,
    /// A function with its first argument bound.
    MethodProxy,
    List,
    Record,
    Ring,
}

/// A classified engine object.
#[derive(Debug, Clone)]
pub enum Element {
    Object(Handle),
    Integer(Integer),
    Float(Float),
    Rational(Rational),
    Cyclotomic(Cyclotomic),
    FiniteFieldElement(FiniteFieldElement),
    IntegerMod(IntegerMod),
    Boolean(Boolean),
    String(EngineString),
    Permutation(Permutation),
    Function(Function),
    MethodProxy(MethodProxy),
    List(List),
    Record(Record),
    Ring(Ring),
}

impl Element {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Object(_) => Kind::Object,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Rational(_) => Kind::Rational,
            Self::Cyclotomic(_) => Kind::Cyclotomic,
            Self::FiniteFieldElement(_) => Kind::FiniteFieldElement,
            Self::IntegerMod(_) => Kind::IntegerMod,
            Self::Boolean(_) => Kind::Boolean,
            Self::String(_) => Kind::String,
            Self::Permutation(_) => Kind::Permutation,
            Self::Function(_) => Kind::Function,
            Self::MethodProxy(_) => Kind::MethodProxy,
            Self::List(_) => Kind::List,
            Self::Record(_) => Kind::Record,
            Self::Ring(_) => Kind::Ring,
        }
    }

    /// The handle shared by every kind.
    ///
    /// For a method proxy this is the handle of the bound function.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        match self {
            Self::Object(handle) => handle,
            Self::Integer(inner) => inner,
            Self::Float(inner) => inner,
            Self::Rational(inner) => inner,
            Self::Cyclotomic(inner) => inner,
            Self::FiniteFieldElement(inner) => inner,
            Self::IntegerMod(inner) => inner,
            Self::Boolean(inner) => inner,
            Self::String(inner) => inner,
            Self::Permutation(inner) => inner,
            Self::Function(inner) => inner,
            Self::MethodProxy(inner) => inner,
            Self::List(inner) => inner,
            Self::Record(inner) => inner,
            Self::Ring(inner) => inner,
        }
    }

    /// Gives up the kind and returns the underlying handle.
    #[must_use]
    pub fn into_inner(self) -> Handle {
        match self {
            Self::Object(handle) => handle,
            Self::Integer(inner) => inner.into_inner(),
            Self::Float(inner) => inner.into_inner(),
            Self::Rational(inner) => inner.into_inner(),
            Self::Cyclotomic(inner) => inner.into_inner(),
            Self::FiniteFieldElement(inner) => inner.into_inner(),
            Self::IntegerMod(inner) => inner.into_inner(),
            Self::Boolean(inner) => inner.into_inner(),
            Self::String(inner) => inner.into_inner(),
            Self::Permutation(inner) => inner.into_inner(),
            Self::Function(inner) => inner.into_inner(),
            Self::MethodProxy(inner) => inner.into_function().into_inner(),
            Self::List(inner) => inner.into_inner(),
            Self::Record(inner) => inner.into_inner(),
            Self::Ring(inner) => inner.into_inner(),
        }
    }

    fn wrong_kind(&self, expected: Kind) -> BridgeError {
        self.session().fail(BridgeError::usage(format!(
            "expected {expected}, found {}",
            self.kind()
        )))
    }
}

macro_rules! element_accessors {
    ($($variant:ident => $ty:ty, $as_fn:ident, $into_fn:ident;)*) => {
        impl Element {
            $(
                #[doc = concat!("Borrows the element if it is ", stringify!($variant), ".")]
                #[must_use]
                pub fn $as_fn(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                #[doc = concat!("Converts into ", stringify!($variant), ", failing with a usage error for any other kind.")]
                pub fn $into_fn(self) -> BridgeResult<$ty> {
                    match self {
                        Self::$variant(inner) => Ok(inner),
                        other => Err(other.wrong_kind(Kind::$variant)),
                    }
                }
            )*
        }
    };
}

element_accessors! {
    Integer => Integer, as_integer, into_integer;
    Float => Float, as_float, into_float;
    Rational => Rational, as_rational, into_rational;
    Cyclotomic => Cyclotomic, as_cyclotomic, into_cyclotomic;
    FiniteFieldElement => FiniteFieldElement, as_finite_field_element, into_finite_field_element;
    IntegerMod => IntegerMod, as_integer_mod, into_integer_mod;
    Boolean => Boolean, as_boolean, into_boolean;
    String => EngineString, as_string, into_string;
    Permutation => Permutation, as_permutation, into_permutation;
    Function => Function, as_function, into_function;
    MethodProxy => MethodProxy, as_method_proxy, into_method_proxy;
    List => List, as_list, into_list;
    Record => Record, as_record, into_record;
    Ring => Ring, as_ring, into_ring;
}

impl Deref for Element {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        self.handle()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.handle(), f)
    }
}

/// Picks the most specific kind for `handle`'s target.
///
/// First match wins; several predicates overlap (a string is also a list of
/// characters), so the order below is significant:
///
/// 1. null → [`Kind::Object`]
/// 2. integer tags → [`Kind::Integer`]
/// 3. float → [`Kind::Float`]
/// 4. cyclotomic → [`Kind::Cyclotomic`]
/// 5. finite field element → [`Kind::FiniteFieldElement`]
/// 6. rational → [`Kind::Rational`]
/// 7. boolean → [`Kind::Boolean`]
/// 8. function → [`Kind::Function`]
/// 9. either permutation encoding → [`Kind::Permutation`]
/// 10. record → [`Kind::Record`]
/// 11. empty list → [`Kind::List`]
/// 12. string → [`Kind::String`]
/// 13. other lists → [`Kind::List`]
/// 14. character → a fresh one-character [`Kind::String`]; if the engine
///     cannot allocate that string the error is traced and the character
///     stays a generic [`Kind::Object`]
/// 15. otherwise a generic handle, refined to [`Kind::IntegerMod`] or
///     [`Kind::Ring`] when the engine says so
///
/// Must run inside a bracket.
pub(crate) fn classify(handle: Handle) -> Element {
    let session = handle.session().clone();
    let element = classify_in(&session, handle);
    session.trace(|tracer| tracer.on_classify(element.kind()));
    element
}

fn classify_in(session: &Session, handle: Handle) -> Element {
    let engine = session.engine();
    let obj = handle.target();
    if obj.is_null() {
        return Element::Object(handle);
    }

    let tnum = engine.tnum(obj);
    if tnum.is_int() {
        return Element::Integer(Integer(handle));
    }
    match tnum {
        Tnum::Float => return Element::Float(Float(handle)),
        Tnum::Cyc => return Element::Cyclotomic(Cyclotomic(handle)),
        Tnum::Ffe => return Element::FiniteFieldElement(FiniteFieldElement(handle)),
        Tnum::Rat => return Element::Rational(Rational(handle)),
        Tnum::Bool => return Element::Boolean(Boolean(handle)),
        Tnum::Function => return Element::Function(Function(handle)),
        Tnum::Perm2 | Tnum::Perm4 => return Element::Permutation(Permutation(handle)),
        _ => {}
    }

    if engine.is_record(obj) {
        return Element::Record(Record(handle));
    }
    let is_list = engine.is_list(obj);
    if is_list && engine.list_len(obj) == 0 {
        return Element::List(List(handle));
    }
    if engine.is_string(obj) {
        return Element::String(EngineString(handle));
    }
    if is_list {
        return Element::List(List(handle));
    }
    if tnum == Tnum::Char {
        return match one_char_string(session, obj) {
            Ok(string) => Element::String(EngineString(session.wrap(string))),
            Err(err) => {
                session.engine_error(err);
                Element::Object(handle)
            }
        };
    }
    refine(session, handle, tnum)
}

fn one_char_string(session: &Session, ch: Obj) -> EngineResult<Obj> {
    let engine = session.engine();
    let string = engine.new_list(1)?;
    engine.list_ass(string, 1, ch)?;
    Ok(string)
}

/// Second look at a generic object: asks the engine's own predicates.
fn refine(session: &Session, handle: Handle, tnum: Tnum) -> Element {
    let engine = session.engine();
    let holds = |predicate: &str| {
        engine
            .global(predicate)
            .and_then(|func| engine.call_args(func, &[handle.target()]).ok().flatten())
            .is_some_and(|result| result == engine.true_obj())
    };
    match tnum {
        Tnum::PosObj if holds("IsZmodnZObj") => Element::IntegerMod(IntegerMod(handle)),
        Tnum::ComObj if holds("IsRing") => Element::Ring(Ring(handle)),
        _ => Element::Object(handle),
    }
}
