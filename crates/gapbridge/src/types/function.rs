use std::{fmt, ops::Deref};

use super::{Element, handle_kind};
use crate::{Handle, error::BridgeResult, object::IntoHandle};

handle_kind!(
    /// A callable engine function. Call it through [`Handle::call`].
    Function
);

impl Function {
    /// The name the engine knows the function by.
    pub fn name(&self) -> BridgeResult<String> {
        self.session()
            .call_global("NameFunction", &[self.target()])?
            .into_string()?
            .to_string_lossless()
    }

    /// Binds `receiver` as the first argument.
    #[must_use]
    pub fn bind(self, name: impl Into<String>, receiver: Handle) -> MethodProxy {
        MethodProxy {
            function: self,
            receiver,
            name: name.into(),
        }
    }
}

/// A function with its receiver bound, produced by method resolution.
///
/// Calling the proxy with `args` calls the function with the receiver
/// prepended. The proxy holds reservations on both.
#[derive(Debug, Clone)]
pub struct MethodProxy {
    function: Function,
    receiver: Handle,
    name: String,
}

impl MethodProxy {
    /// The attribute name the proxy was resolved from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn function(&self) -> &Function {
        &self.function
    }

    #[must_use]
    pub fn receiver(&self) -> &Handle {
        &self.receiver
    }

    /// Calls `function(receiver, args...)`.
    pub fn call(&self, args: &[Handle]) -> BridgeResult<Option<Element>> {
        self.call_with(args)
    }

    /// Like [`Self::call`], converting host-level arguments first.
    pub fn call_with<A: IntoHandle>(&self, args: impl IntoIterator<Item = A>) -> BridgeResult<Option<Element>> {
        let session = self.function.session();
        let mut full = vec![self.receiver.clone()];
        for arg in args {
            full.push(arg.into_handle(session)?);
        }
        self.function.call(&full)
    }

    /// Drops the receiver and keeps the function.
    #[must_use]
    pub fn into_function(self) -> Function {
        self.function
    }
}

impl Deref for MethodProxy {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.function
    }
}

impl fmt::Display for MethodProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.receiver, self.name)
    }
}
