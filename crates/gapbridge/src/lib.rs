#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "narrowing casts are range-checked by the caller")]
#![expect(clippy::cast_sign_loss, reason = "tagged reference words are reinterpreted on purpose")]
#![expect(clippy::cast_possible_wrap, reason = "tagged reference words are reinterpreted on purpose")]

mod dispatch;
mod engine;
mod error;
mod handle;
mod kernel;
pub mod limbs;
mod object;
mod pickle;
mod resolve;
mod resource;
mod session;
mod tracer;
mod types;

pub use crate::{
    dispatch::{ArithOp, CompareOp},
    engine::{
        BinaryOp, Engine, EngineError, EngineResult, Interrupter, Limb, LimbBuf, MAX_DIRECT_ARGS, Obj, RenderMode,
        Tnum,
    },
    error::{BridgeError, BridgeResult, ErrorKind},
    handle::Handle,
    kernel::Kernel,
    object::{HostValue, IntoHandle},
    pickle::Reduction,
    resolve::Resolution,
    resource::{DEFAULT_GC_INTERVAL, DEFAULT_MAX_LIST_LENGTH, ResourceError, ResourceLimits},
    session::{Bracket, Session},
    tracer::{BridgeTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    types::{
        Boolean, Cyclotomic, Element, EngineString, FiniteFieldElement, Float, Function, Integer, IntegerMod, Kind,
        List, ListIter, MethodProxy, Rational, Record, Ring,
    },
};
