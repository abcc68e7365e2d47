//! Bridge tracing infrastructure.
//!
//! A trait-based hook system in the spirit of a VM tracer: every hook has a
//! default no-op body, so [`NoopTracer`] costs nothing beyond a virtual call.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Production default |
//! | [`StderrTracer`] | Human-readable log to stderr |
//! | [`RecordingTracer`] | Records [`TraceEvent`]s into a shared log for tests and post-mortems |
//!
//! Hooks run while a [`Handle`](crate::Handle) is being dropped, so they must
//! not touch the engine.

use std::{cell::RefCell, rc::Rc};

use crate::{engine::Obj, error::ErrorKind, types::Kind};

/// Trace event recorded by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A handle reserved an object.
    Acquire {
        obj: Obj,
        /// Reservation count after the acquire.
        reservations: usize,
    },
    /// A handle gave up its reservation.
    Release {
        obj: Obj,
        /// Reservation count after the release.
        reservations: usize,
    },
    /// The classifier produced a handle of this kind.
    Classify { kind: Kind },
    /// An operator was forwarded to an engine primitive.
    Dispatch { primitive: &'static str },
    /// A function was called with this many arguments.
    Call { arity: usize },
    /// A method name was resolved against the global namespace.
    Resolve { name: String },
    /// An operation failed.
    Error { kind: ErrorKind },
}

/// Hooks invoked by the bridge. All methods default to no-ops.
pub trait BridgeTracer: std::fmt::Debug {
    #[inline]
    fn on_acquire(&mut self, _obj: Obj, _reservations: usize) {}

    #[inline]
    fn on_release(&mut self, _obj: Obj, _reservations: usize) {}

    #[inline]
    fn on_classify(&mut self, _kind: Kind) {}

    #[inline]
    fn on_dispatch(&mut self, _primitive: &'static str) {}

    #[inline]
    fn on_call(&mut self, _arity: usize) {}

    #[inline]
    fn on_resolve(&mut self, _name: &str) {}

    #[inline]
    fn on_error(&mut self, _kind: ErrorKind) {}
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl BridgeTracer for NoopTracer {}

/// Tracer that prints one line per event to stderr.
///
/// Output format:
/// ```text
/// [gapbridge] acquire 0x1c (1)
/// [gapbridge] dispatch SUM
/// [gapbridge] classify Integer
/// [gapbridge] release 0x1c (0)
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Whether acquire/release lines are printed; they dominate the output.
    references: bool,
}

impl StderrTracer {
    /// Creates a tracer that logs everything except reference traffic.
    #[must_use]
    pub fn new() -> Self {
        Self { references: false }
    }

    /// Creates a tracer that also logs every acquire and release.
    #[must_use]
    pub fn with_references() -> Self {
        Self { references: true }
    }
}

impl BridgeTracer for StderrTracer {
    fn on_acquire(&mut self, obj: Obj, reservations: usize) {
        if self.references {
            eprintln!("[gapbridge] acquire {obj} ({reservations})");
        }
    }

    fn on_release(&mut self, obj: Obj, reservations: usize) {
        if self.references {
            eprintln!("[gapbridge] release {obj} ({reservations})");
        }
    }

    fn on_classify(&mut self, kind: Kind) {
        eprintln!("[gapbridge] classify {kind}");
    }

    fn on_dispatch(&mut self, primitive: &'static str) {
        eprintln!("[gapbridge] dispatch {primitive}");
    }

    fn on_call(&mut self, arity: usize) {
        eprintln!("[gapbridge] call/{arity}");
    }

    fn on_resolve(&mut self, name: &str) {
        eprintln!("[gapbridge] resolve {name}");
    }

    fn on_error(&mut self, kind: ErrorKind) {
        eprintln!("[gapbridge] error {kind}");
    }
}

/// Tracer that records every event into a log shared with its clones.
///
/// Keep a clone before handing the tracer to a session:
///
/// ```
/// # use gapbridge::{RecordingTracer, Session};
/// let tracer = RecordingTracer::new();
/// let session = Session::kernel().with_tracer(tracer.clone());
/// let _three = session.eval("1 + 2").unwrap();
/// assert!(!tracer.events().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn push(&self, event: TraceEvent) {
        if let Ok(mut events) = self.events.try_borrow_mut() {
            events.push(event);
        }
    }
}

impl BridgeTracer for RecordingTracer {
    fn on_acquire(&mut self, obj: Obj, reservations: usize) {
        self.push(TraceEvent::Acquire { obj, reservations });
    }

    fn on_release(&mut self, obj: Obj, reservations: usize) {
        self.push(TraceEvent::Release { obj, reservations });
    }

    fn on_classify(&mut self, kind: Kind) {
        self.push(TraceEvent::Classify { kind });
    }

    fn on_dispatch(&mut self, primitive: &'static str) {
        self.push(TraceEvent::Dispatch { primitive });
    }

    fn on_call(&mut self, arity: usize) {
        self.push(TraceEvent::Call { arity });
    }

    fn on_resolve(&mut self, name: &str) {
        self.push(TraceEvent::Resolve { name: name.to_owned() });
    }

    fn on_error(&mut self, kind: ErrorKind) {
        self.push(TraceEvent::Error { kind });
    }
}
