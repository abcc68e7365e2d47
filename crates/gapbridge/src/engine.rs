//! The engine surface consumed by the bridge.
//!
//! The computer-algebra kernel exposes a tagged, reference-counted object model
//! through a C calling convention. [`Engine`] mirrors those entry points one to
//! one so the rest of the crate never depends on how a particular kernel is
//! linked. [`Kernel`](crate::Kernel) is the in-process implementation used by
//! default and by the test suite.
//!
//! Every method except [`Engine::acquire`], [`Engine::release`] and
//! [`Engine::reservations`] must be called between [`Engine::enter`] and
//! [`Engine::leave`]. The bridge enforces this with
//! [`Bracket`](crate::Bracket).

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use smallvec::SmallVec;
use strum::{Display, IntoStaticStr};

use crate::resource::ResourceError;

/// One machine-word chunk of a large integer's magnitude.
pub type Limb = u64;

/// Limb buffer that stays on the stack for integers of up to four limbs.
pub type LimbBuf = SmallVec<[Limb; 4]>;

/// Result type for engine primitives.
pub type EngineResult<T> = Result<T, EngineError>;

/// Opaque engine object: a pointer-sized tagged word.
///
/// The two low bits select the encoding: `01` is an immediate integer, `10` an
/// immediate finite-field element and `00` a reference to a heap bag. The all
/// zero word is the null reference. The host never looks inside a bag; it only
/// passes the word back to [`Engine`] primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Obj(usize);

impl Obj {
    /// The null reference.
    pub const NULL: Self = Self(0);

    pub(crate) const TAG_MASK: usize = 0b11;
    pub(crate) const INT_TAG: usize = 0b01;
    pub(crate) const FFE_TAG: usize = 0b10;

    /// Reinterprets a raw word as an object reference.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw tagged word.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// True for integers encoded directly in the reference.
    #[must_use]
    pub const fn is_immediate_int(self) -> bool {
        self.0 & Self::TAG_MASK == Self::INT_TAG
    }

    /// True for finite-field elements encoded directly in the reference.
    #[must_use]
    pub const fn is_immediate_ffe(self) -> bool {
        self.0 & Self::TAG_MASK == Self::FFE_TAG
    }

    /// True for references that point at a heap bag.
    #[must_use]
    pub const fn is_bag(self) -> bool {
        self.0 != 0 && self.0 & Self::TAG_MASK == 0
    }

    pub(crate) const fn from_bag_index(index: usize) -> Self {
        Self((index + 1) << 2)
    }

    pub(crate) const fn bag_index(self) -> Option<usize> {
        if self.is_bag() { Some((self.0 >> 2) - 1) } else { None }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Runtime type number of an engine object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Tnum {
    Null,
    /// Immediate integer.
    IntSmall,
    /// Positive large integer.
    IntPos,
    /// Negative large integer.
    IntNeg,
    Rat,
    Cyc,
    Ffe,
    Float,
    Bool,
    Char,
    Function,
    /// Permutation with 16-bit images.
    Perm2,
    /// Permutation with 32-bit images.
    Perm4,
    Plist,
    String,
    Record,
    /// Positional object (e.g. a residue class).
    PosObj,
    /// Component object (e.g. a ring).
    ComObj,
}

impl Tnum {
    /// True for both integer encodings.
    #[must_use]
    pub fn is_int(self) -> bool {
        matches!(self, Self::IntSmall | Self::IntPos | Self::IntNeg)
    }

    /// True for both permutation encodings.
    #[must_use]
    pub fn is_perm(self) -> bool {
        matches!(self, Self::Perm2 | Self::Perm4)
    }
}

/// Arithmetic primitives of the engine's generic operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BinaryOp {
    Sum,
    Diff,
    Prod,
    Quo,
    Mod,
    Pow,
}

impl BinaryOp {
    /// The operator symbol the engine uses in its diagnostics.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Diff => "-",
            Self::Prod => "*",
            Self::Quo => "/",
            Self::Mod => "mod",
            Self::Pow => "^",
        }
    }
}

/// Which captured output form [`Engine::render`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RenderMode {
    /// Short human-oriented form.
    View,
    /// Form that [`Engine::eval_string`] reads back.
    Print,
}

/// Failure reported by an engine primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The generic operation has no method for the operand kinds.
    NoMethod(String),
    /// Any other engine error, with the engine's diagnostic text.
    Failed(String),
    /// The computation was aborted by the interrupt flag.
    Interrupted,
    /// The engine ran out of a limited resource.
    Resource(ResourceError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMethod(msg) | Self::Failed(msg) => f.write_str(msg),
            Self::Interrupted => f.write_str("user interrupt"),
            Self::Resource(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ResourceError> for EngineError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

/// Thread-safe handle that raises the engine's asynchronous interrupt flag.
///
/// This is the only engine-related value that may cross threads. A pending
/// interrupt is consumed by the next interruptible step of a running
/// computation, which then fails with [`EngineError::Interrupted`].
#[derive(Debug, Clone, Default)]
pub struct Interrupter(Arc<AtomicBool>);

impl Interrupter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running (or next) computation abort.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True while an interrupt is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consumes a pending interrupt, returning whether there was one.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// The engine's C entry points.
///
/// List and record positions are 1-based, as in the engine. Objects returned
/// from any method are not reserved: callers that keep them across a bracket
/// boundary must [`acquire`](Self::acquire) them first.
pub trait Engine: fmt::Debug {
    /// Enters the engine. Brackets nest; every `enter` needs one `leave`.
    fn enter(&self);
    /// Leaves the engine. Leaving the outermost bracket may run the collector.
    fn leave(&self);
    /// Current bracket nesting depth.
    fn bracket_depth(&self) -> usize;

    /// Reserves `obj` so the collector keeps it. Null and immediates are ignored.
    fn acquire(&self, obj: Obj);
    /// Drops one reservation of `obj`. Null and immediates are ignored.
    fn release(&self, obj: Obj);
    /// Number of outstanding reservations of `obj`.
    fn reservations(&self, obj: Obj) -> usize;

    fn tnum(&self, obj: Obj) -> Tnum;
    fn is_list(&self, obj: Obj) -> bool;
    fn is_record(&self, obj: Obj) -> bool;
    /// True when `obj` can be read as a string (string bags and non-empty
    /// lists of characters).
    fn is_string(&self, obj: Obj) -> bool;
    fn is_mutable(&self, obj: Obj) -> bool;

    /// Signed limb count of a large integer: negative for negative values,
    /// zero for anything that is not a large integer.
    fn int_size(&self, obj: Obj) -> isize;
    /// Copies the magnitude limbs of a large integer, least significant first.
    fn int_limbs(&self, obj: Obj, out: &mut LimbBuf);
    /// Builds an integer from a sign and magnitude limbs, least significant first.
    fn make_int(&self, negative: bool, limbs: &[Limb]) -> EngineResult<Obj>;

    fn float_value(&self, obj: Obj) -> Option<f64>;
    fn make_float(&self, value: f64) -> EngineResult<Obj>;
    fn char_value(&self, obj: Obj) -> Option<u8>;
    fn make_char(&self, value: u8) -> EngineResult<Obj>;
    fn string_bytes(&self, obj: Obj) -> Option<Vec<u8>>;
    fn make_string(&self, value: &str) -> EngineResult<Obj>;

    fn true_obj(&self) -> Obj;
    fn false_obj(&self) -> Obj;
    fn fail_obj(&self) -> Obj;

    fn new_list(&self, capacity: usize) -> EngineResult<Obj>;
    fn list_len(&self, list: Obj) -> usize;
    /// Element at 1-based `pos`, or `None` for a hole or a position past the end.
    fn list_elm(&self, list: Obj, pos: usize) -> Option<Obj>;
    /// Assigns at 1-based `pos`, extending the list with holes when needed.
    fn list_ass(&self, list: Obj, pos: usize, value: Obj) -> EngineResult<()>;

    /// Interns a record component name. Idempotent within one engine session.
    fn rnam(&self, name: &str) -> u32;
    /// Name of an interned record component.
    fn rnam_name(&self, rnam: u32) -> Option<String>;
    fn new_record(&self) -> EngineResult<Obj>;
    fn rec_elm(&self, record: Obj, rnam: u32) -> Option<Obj>;
    fn rec_ass(&self, record: Obj, rnam: u32, value: Obj) -> EngineResult<()>;
    fn rec_rnams(&self, record: Obj) -> Vec<u32>;

    fn binary(&self, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj>;
    fn eq(&self, left: Obj, right: Obj) -> EngineResult<bool>;
    fn lt(&self, left: Obj, right: Obj) -> EngineResult<bool>;

    /// Calls `func` with at most six arguments. `Ok(None)` means the call
    /// produced no value.
    fn call_args(&self, func: Obj, args: &[Obj]) -> EngineResult<Option<Obj>>;
    /// Calls `func` with the elements of the list `args`.
    fn call_list(&self, func: Obj, args: Obj) -> EngineResult<Option<Obj>>;

    /// Value of a global variable, `None` when unbound.
    fn global(&self, name: &str) -> Option<Obj>;

    /// Output-capture rendering of `obj`.
    fn render(&self, obj: Obj, mode: RenderMode) -> Vec<u8>;
    /// Evaluates engine source text.
    fn eval_string(&self, text: &str) -> EngineResult<Obj>;

    fn interrupter(&self) -> Interrupter;
    /// Runs the collector now; returns the number of bags freed.
    fn collect_garbage(&self) -> usize;
    /// True when `obj` is an immediate or a bag that has not been reclaimed.
    fn is_live(&self, obj: Obj) -> bool;
}

/// Largest argument count [`Engine::call_args`] accepts.
pub const MAX_DIRECT_ARGS: usize = 6;
