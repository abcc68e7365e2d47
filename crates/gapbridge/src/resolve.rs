//! Method resolution: `handle.method("Foo")` binds the global engine
//! function `Foo` with the handle as its first argument.

use crate::{
    Handle,
    engine::Tnum,
    error::{BridgeError, BridgeResult},
    object::IntoHandle,
    types::{Element, Function, MethodProxy},
};

/// Outcome of looking a name up for use as a method.
#[derive(Debug)]
pub enum Resolution {
    /// No global of that name, or a reserved host name.
    NotFound,
    /// The global exists but is not a function.
    NotCallable,
    BoundProxy(MethodProxy),
}

/// Names the host keeps for itself; they never reach engine lookup.
fn is_reserved(name: &str) -> bool {
    name.is_empty() || name.starts_with("__")
}

impl Handle {
    /// Looks `name` up in the engine's global namespace.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Resolution {
        if is_reserved(name) {
            return Resolution::NotFound;
        }
        let session = self.session();
        session.trace(|tracer| tracer.on_resolve(name));
        let _bracket = session.enter();
        let engine = session.engine();
        let Some(func) = engine.global(name) else {
            return Resolution::NotFound;
        };
        if engine.tnum(func) != Tnum::Function {
            return Resolution::NotCallable;
        }
        Resolution::BoundProxy(Function(session.wrap(func)).bind(name, self.clone()))
    }

    /// [`Self::resolve`], with the failures turned into errors naming `name`.
    pub fn method(&self, name: &str) -> BridgeResult<MethodProxy> {
        self.check_not_null()?;
        match self.resolve(name) {
            Resolution::BoundProxy(proxy) => Ok(proxy),
            Resolution::NotFound => Err(self.session().fail(BridgeError::attribute_not_found(name))),
            Resolution::NotCallable => Err(self.session().fail(BridgeError::not_callable(name))),
        }
    }

    /// `Foo(self, args...)` for the global function `Foo`.
    pub fn call_method(&self, name: &str, args: &[Self]) -> BridgeResult<Option<Element>> {
        self.method(name)?.call(args)
    }

    /// [`Self::call_method`] with host-level arguments.
    pub fn call_method_with<A: IntoHandle>(
        &self,
        name: &str,
        args: impl IntoIterator<Item = A>,
    ) -> BridgeResult<Option<Element>> {
        self.method(name)?.call_with(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_recognised() {
        assert!(is_reserved(""));
        assert!(is_reserved("__dict__"));
        assert!(!is_reserved("Length"));
        assert!(!is_reserved("_Private"));
    }
}
