use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    Handle,
    engine::{Engine, EngineError, Interrupter, MAX_DIRECT_ARGS, Obj},
    error::{BridgeError, BridgeResult, ErrorKind},
    kernel::Kernel,
    object::IntoHandle,
    tracer::{BridgeTracer, NoopTracer},
    types::{self, Element},
};

/// Entry point of the bridge: one engine plus the tracer observing it.
///
/// Cloning a session is cheap and yields another reference to the same engine.
/// A session is `!Send`. The only value that may cross threads is its
/// [`Interrupter`].
#[derive(Clone)]
pub struct Session {
    engine: Rc<dyn Engine>,
    tracer: Rc<RefCell<Box<dyn BridgeTracer>>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("engine", &self.engine).finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over `engine` with tracing disabled.
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self {
            engine: Rc::new(engine),
            tracer: Rc::new(RefCell::new(Box::new(NoopTracer))),
        }
    }

    /// Creates a session over a fresh in-process [`Kernel`] with default limits.
    #[must_use]
    pub fn kernel() -> Self {
        Self::new(Kernel::new())
    }

    /// Replaces the tracer. Applies to every clone of this session.
    #[must_use]
    pub fn with_tracer(self, tracer: impl BridgeTracer + 'static) -> Self {
        *self.tracer.borrow_mut() = Box::new(tracer);
        self
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &dyn Engine {
        &*self.engine
    }

    /// True when both sessions drive the same engine.
    #[must_use]
    pub fn same_engine(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.engine, &other.engine)
    }

    /// Enters the engine for the lifetime of the returned guard.
    ///
    /// Brackets nest. The matching `leave` runs when the guard is dropped,
    /// including while an error or a panic unwinds.
    pub fn enter(&self) -> Bracket<'_> {
        self.engine.enter();
        Bracket { engine: &*self.engine }
    }

    /// Handle that raises the engine's asynchronous interrupt flag from any thread.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        self.engine.interrupter()
    }

    /// Runs the engine's collector; returns the number of objects reclaimed.
    ///
    /// Only objects no handle reserves (and that are not reachable from one)
    /// are reclaimed.
    pub fn collect_garbage(&self) -> BridgeResult<usize> {
        if self.engine.bracket_depth() > 0 {
            return Err(self.fail(BridgeError::usage(
                "cannot collect garbage while the engine is entered",
            )));
        }
        Ok(self.engine.collect_garbage())
    }

    /// Converts a host value into an engine object.
    pub fn convert(&self, value: impl IntoHandle) -> BridgeResult<Handle> {
        value.into_handle(self)
    }

    /// Converts a host value and classifies the result.
    pub fn element(&self, value: impl IntoHandle) -> BridgeResult<Element> {
        Ok(self.convert(value)?.classify())
    }

    /// Reserves `obj` and classifies it into its most specific kind.
    pub fn classify(&self, obj: Obj) -> Element {
        let _bracket = self.enter();
        types::classify(self.wrap(obj))
    }

    /// Value bound to a global engine name.
    pub fn global(&self, name: &str) -> BridgeResult<Element> {
        let _bracket = self.enter();
        let obj = self
            .engine
            .global(name)
            .ok_or_else(|| self.fail(BridgeError::attribute_not_found(name)))?;
        Ok(types::classify(self.wrap(obj)))
    }

    /// Evaluates engine source text.
    pub fn eval(&self, text: &str) -> BridgeResult<Element> {
        let _bracket = self.enter();
        let obj = self.engine.eval_string(text).map_err(|err| self.engine_error(err))?;
        Ok(types::classify(self.wrap(obj)))
    }

    /// Reserves `obj` in a new handle.
    pub(crate) fn wrap(&self, obj: Obj) -> Handle {
        Handle::new(self.clone(), obj)
    }

    /// Calls the global function `name` with raw arguments.
    ///
    /// Used by kind accessors that are implemented by engine functions.
    pub(crate) fn call_global(&self, name: &str, args: &[Obj]) -> BridgeResult<Element> {
        let _bracket = self.enter();
        let func = self
            .engine
            .global(name)
            .ok_or_else(|| self.fail(BridgeError::attribute_not_found(name)))?;
        let result = self.call_raw(func, args)?;
        let obj = result.ok_or_else(|| {
            self.fail(BridgeError::new(
                ErrorKind::EngineError,
                format!("{name} returned no value"),
            ))
        })?;
        Ok(types::classify(self.wrap(obj)))
    }

    /// Generic call: up to six arguments directly, more through an argument list.
    pub(crate) fn call_raw(&self, func: Obj, args: &[Obj]) -> BridgeResult<Option<Obj>> {
        let _bracket = self.enter();
        self.trace(|tracer| tracer.on_call(args.len()));
        let result = if args.len() <= MAX_DIRECT_ARGS {
            self.engine.call_args(func, args)
        } else {
            self.argument_list(args)
                .and_then(|list| self.engine.call_list(func, list))
        };
        result.map_err(|err| self.engine_error(err))
    }

    fn argument_list(&self, args: &[Obj]) -> Result<Obj, EngineError> {
        let list = self.engine.new_list(args.len())?;
        for (pos, &arg) in args.iter().enumerate() {
            self.engine.list_ass(list, pos + 1, arg)?;
        }
        Ok(list)
    }

    /// Runs a tracer hook. Skipped if the tracer is already borrowed, which
    /// keeps hooks safe to fire from `Drop`.
    pub(crate) fn trace(&self, hook: impl FnOnce(&mut dyn BridgeTracer)) {
        if let Ok(mut tracer) = self.tracer.try_borrow_mut() {
            hook(&mut **tracer);
        }
    }

    /// Records `err` with the tracer and returns it.
    pub(crate) fn fail(&self, err: BridgeError) -> BridgeError {
        self.trace(|tracer| tracer.on_error(err.kind()));
        err
    }

    pub(crate) fn engine_error(&self, err: EngineError) -> BridgeError {
        self.fail(err.into())
    }
}

/// Scope guard for one enter/leave bracket.
#[must_use = "the engine is left as soon as the bracket is dropped"]
pub struct Bracket<'a> {
    engine: &'a dyn Engine,
}

impl Drop for Bracket<'_> {
    fn drop(&mut self) {
        self.engine.leave();
    }
}
