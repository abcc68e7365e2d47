use std::fmt::{self, Display};

use strum::{Display, EnumString, IntoStaticStr};

use crate::{engine::EngineError, resource::ResourceError};

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Kinds of failure the bridge reports.
///
/// Uses strum derives so the string form matches the variant name exactly
/// (e.g. `IndexError` -> "IndexError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// The engine has no applicable method for an operator or function.
    DispatchError,
    /// A value has no representation on the other side of the bridge.
    ConversionError,
    /// Write attempted on an immutable container.
    MutabilityError,
    /// Out-of-range position, unbound hole, or malformed multi-index.
    IndexError,
    /// Record component missing or unassigned.
    KeyError,
    /// Mismatched identity-comparison flags, or operands the engine cannot order.
    ComparisonError,
    /// Name not bound in the engine's global namespace, or reserved.
    AttributeError,
    /// Name bound to something that is not a function.
    NotCallableError,
    /// Incorrect use of the bridge API (wrong handle kind, arity, ...).
    UsageError,
    /// Any other error raised inside the engine.
    EngineError,
    /// The engine ran out of a limited resource.
    ResourceError,
    /// The computation was cancelled by the interrupt flag.
    Interrupted,
}

/// A typed bridge failure carrying the diagnostic text.
///
/// Engine diagnostics are kept verbatim in `message`; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    kind: ErrorKind,
    message: String,
}

impl BridgeError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn dispatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DispatchError, message)
    }

    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConversionError, message)
    }

    pub(crate) fn immutable(what: impl Display) -> Self {
        Self::new(ErrorKind::MutabilityError, format!("{what} is not mutable"))
    }

    pub(crate) fn index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    pub(crate) fn index_out_of_range(index: usize) -> Self {
        Self::index(format!("index {index} out of range"))
    }

    pub(crate) fn no_such_field(field: &str) -> Self {
        Self::new(ErrorKind::KeyError, format!("no such field: {field}"))
    }

    pub(crate) fn comparison(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ComparisonError, message)
    }

    pub(crate) fn attribute_not_found(name: &str) -> Self {
        Self::new(ErrorKind::AttributeError, format!("no attribute '{name}'"))
    }

    pub(crate) fn not_callable(name: &str) -> Self {
        Self::new(
            ErrorKind::NotCallableError,
            format!("'{name}' is not a function and cannot be called as a method"),
        )
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UsageError, message)
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BridgeError {}

impl From<ResourceError> for BridgeError {
    fn from(err: ResourceError) -> Self {
        Self::new(ErrorKind::ResourceError, err.to_string())
    }
}

impl From<EngineError> for BridgeError {
    /// Maps engine failures onto bridge kinds:
    /// - `NoMethod` → `DispatchError`
    /// - `Failed` → `EngineError`
    /// - `Interrupted` → `Interrupted`
    /// - `Resource` → `ResourceError`
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoMethod(msg) => Self::dispatch(msg),
            EngineError::Failed(msg) => Self::new(ErrorKind::EngineError, msg),
            EngineError::Interrupted => Self::new(ErrorKind::Interrupted, "user interrupt"),
            EngineError::Resource(err) => err.into(),
        }
    }
}
