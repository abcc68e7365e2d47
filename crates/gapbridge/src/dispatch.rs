//! Host operators forwarded to the engine's generic operations.
//!
//! The forwarding table is explicit: [`ArithOp`] maps each arithmetic
//! operator to one engine primitive, and [`CompareOp`] derives all six
//! comparisons from the two primitives `EQ` and `LT`, so an engine whose
//! equality and ordering disagree can never produce contradictory answers.

use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    Handle,
    engine::{BinaryOp, EngineError},
    error::{BridgeError, BridgeResult},
    object::IntoHandle,
    session::Session,
    types::{self, Element},
};

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    /// The engine primitive this operator forwards to.
    #[must_use]
    pub fn primitive(self) -> BinaryOp {
        match self {
            Self::Add => BinaryOp::Sum,
            Self::Sub => BinaryOp::Diff,
            Self::Mul => BinaryOp::Prod,
            Self::Div => BinaryOp::Quo,
            Self::Mod => BinaryOp::Mod,
            Self::Pow => BinaryOp::Pow,
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Host-level symbol, for diagnostics.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Evaluates the operator from the equality and strict-less-than
    /// primitives. Each primitive runs at most once, and only if needed.
    pub fn derive<E>(
        self,
        eq: impl FnOnce() -> Result<bool, E>,
        lt: impl FnOnce() -> Result<bool, E>,
    ) -> Result<bool, E> {
        Ok(match self {
            Self::Eq => eq()?,
            Self::Ne => !eq()?,
            Self::Lt => lt()?,
            Self::Ge => !lt()?,
            Self::Le => lt()? || eq()?,
            Self::Gt => !(lt()? || eq()?),
        })
    }
}

impl Handle {
    /// Applies `op` to `self` and `rhs` in the engine and classifies the result.
    ///
    /// `rhs` may be a host value; it is converted first. An engine without a
    /// method for the operand kinds yields a dispatch error carrying the
    /// engine's diagnostic verbatim.
    pub fn arith(&self, op: ArithOp, rhs: impl IntoHandle) -> BridgeResult<Element> {
        let session = self.session();
        let rhs = rhs.into_handle(session)?;
        self.check_not_null()?;
        rhs.check_not_null()?;

        let primitive = op.primitive();
        session.trace(|tracer| tracer.on_dispatch(primitive.into()));
        let _bracket = session.enter();
        let result = session
            .engine()
            .binary(primitive, self.target(), rhs.target())
            .map_err(|err| session.engine_error(err))?;
        Ok(types::classify(session.wrap(result)))
    }

    pub fn sum(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Add, rhs)
    }

    pub fn difference(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Sub, rhs)
    }

    pub fn product(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Mul, rhs)
    }

    pub fn quotient(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Div, rhs)
    }

    pub fn modulo(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Mod, rhs)
    }

    /// Exponentiation. Long computations can be aborted through the
    /// session's [`Interrupter`](crate::Interrupter); the abort surfaces as
    /// an error of kind `Interrupted`.
    pub fn power(&self, rhs: impl IntoHandle) -> BridgeResult<Element> {
        self.arith(ArithOp::Pow, rhs)
    }

    /// Compares `self` with `rhs`.
    ///
    /// Both operands must agree on [`Handle::compare_by_identity`]; a
    /// mismatch is a comparison error for every operator. In identity mode
    /// the engine is not consulted at all.
    pub fn compare(&self, op: CompareOp, rhs: impl IntoHandle) -> BridgeResult<bool> {
        let session = self.session();
        let rhs = rhs.into_handle(session)?;
        if self.compare_by_identity() != rhs.compare_by_identity() {
            return Err(session.fail(BridgeError::comparison(format!(
                "cannot evaluate {}: both operands must agree on identity comparison",
                op.symbol()
            ))));
        }
        let (left, right) = (self.target(), rhs.target());
        if self.compare_by_identity() {
            return op.derive(|| Ok(left == right), || Ok(left < right));
        }

        self.check_not_null()?;
        rhs.check_not_null()?;
        let _bracket = session.enter();
        let engine = session.engine();
        op.derive(
            || {
                session.trace(|tracer| tracer.on_dispatch("EQ"));
                engine.eq(left, right).map_err(|err| comparison_error(session, err))
            },
            || {
                session.trace(|tracer| tracer.on_dispatch("LT"));
                engine.lt(left, right).map_err(|err| comparison_error(session, err))
            },
        )
    }

    pub fn equals(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn not_equals(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn less(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn less_eq(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn greater(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn greater_eq(&self, rhs: impl IntoHandle) -> BridgeResult<bool> {
        self.compare(CompareOp::Ge, rhs)
    }

    /// Calls the target with `args`.
    ///
    /// Up to six arguments are passed directly, more through an argument
    /// list. A call that returns nothing yields `Ok(None)`.
    pub fn call(&self, args: &[Self]) -> BridgeResult<Option<Element>> {
        self.call_with(args)
    }

    /// Calls the target with host-level arguments, converting each one
    /// through [`IntoHandle`] first.
    ///
    /// ```
    /// # use gapbridge::Session;
    /// let session = Session::kernel();
    /// let length = session.global("Length").unwrap();
    /// let result = length.call_with([vec![1_i64, 2, 3]]).unwrap().unwrap();
    /// assert_eq!(result.into_integer().unwrap().to_i64().unwrap(), 3);
    /// ```
    pub fn call_with<A: IntoHandle>(&self, args: impl IntoIterator<Item = A>) -> BridgeResult<Option<Element>> {
        let session = self.session();
        self.check_not_null()?;
        let args = args
            .into_iter()
            .map(|arg| arg.into_handle(session))
            .collect::<BridgeResult<Vec<_>>>()?;
        let objs: Vec<_> = args.iter().map(Self::target).collect();
        let _bracket = session.enter();
        let result = session.call_raw(self.target(), &objs)?;
        Ok(result.map(|obj| types::classify(session.wrap(obj))))
    }
}

/// An engine that cannot order or compare the operands reports "no method";
/// that becomes a comparison error. Anything else keeps its own kind.
fn comparison_error(session: &Session, err: EngineError) -> BridgeError {
    match err {
        EngineError::NoMethod(message) => session.fail(BridgeError::comparison(message)),
        other => session.engine_error(other),
    }
}
