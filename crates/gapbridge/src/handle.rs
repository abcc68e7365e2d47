//! Owning proxies for engine objects.
//!
//! A [`Handle`] holds exactly one reservation of its target. The reservation
//! is taken when the handle is created (or cloned) and given back when it is
//! dropped, so the engine's collector never reclaims an object the host can
//! still reach. Acquire and release are the only engine calls a handle makes
//! outside an enter/leave bracket.

use std::fmt;

use crate::{
    engine::{Obj, RenderMode, Tnum},
    error::{BridgeError, BridgeResult},
    session::Session,
    types::{self, Element},
};

/// Host-owned proxy that keeps one engine object alive.
pub struct Handle {
    session: Session,
    target: Obj,
    compare_by_identity: bool,
}

impl Handle {
    /// Reserves `target` and wraps it. A null target is allowed and reserves nothing.
    pub(crate) fn new(session: Session, target: Obj) -> Self {
        session.engine().acquire(target);
        if !target.is_null() {
            let reservations = session.engine().reservations(target);
            session.trace(|tracer| tracer.on_acquire(target, reservations));
        }
        Self {
            session,
            target,
            compare_by_identity: false,
        }
    }

    /// A handle with no target.
    #[must_use]
    pub fn null(session: &Session) -> Self {
        Self::new(session.clone(), Obj::NULL)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The wrapped engine object.
    #[must_use]
    pub fn target(&self) -> Obj {
        self.target
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.target.is_null()
    }

    /// Whether comparisons use object identity instead of engine equality and order.
    #[must_use]
    pub fn compare_by_identity(&self) -> bool {
        self.compare_by_identity
    }

    /// Switches identity comparison on or off.
    ///
    /// Both operands of a comparison must agree on this flag.
    pub fn set_compare_by_identity(&mut self, enabled: bool) {
        self.compare_by_identity = enabled;
    }

    /// Builder form of [`Self::set_compare_by_identity`].
    #[must_use]
    pub fn by_identity(mut self) -> Self {
        self.compare_by_identity = true;
        self
    }

    /// True when both handles wrap the very same engine object.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        self.session.same_engine(&other.session) && self.target == other.target
    }

    /// Classifies the target into its most specific kind.
    ///
    /// The returned element holds its own reservation.
    #[must_use]
    pub fn classify(&self) -> Element {
        let _bracket = self.session.enter();
        types::classify(self.clone())
    }

    /// Consumes the handle and classifies it.
    #[must_use]
    pub fn into_element(self) -> Element {
        let session = self.session.clone();
        let _bracket = session.enter();
        types::classify(self)
    }

    /// The target's runtime type number.
    #[must_use]
    pub fn tnum(&self) -> Tnum {
        let _bracket = self.session.enter();
        self.session.engine().tnum(self.target)
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        self.tnum() == Tnum::Function
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        let _bracket = self.session.enter();
        self.session.engine().is_list(self.target)
    }

    #[must_use]
    pub fn is_record(&self) -> bool {
        let _bracket = self.session.enter();
        self.session.engine().is_record(self.target)
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.tnum() == Tnum::Bool
    }

    /// True for strings, non-empty lists of characters and single characters.
    #[must_use]
    pub fn is_string(&self) -> bool {
        let _bracket = self.session.enter();
        let engine = self.session.engine();
        engine.is_string(self.target) || engine.tnum(self.target) == Tnum::Char
    }

    #[must_use]
    pub fn is_permutation(&self) -> bool {
        self.tnum().is_perm()
    }

    /// The engine's short human-oriented rendering.
    #[must_use]
    pub fn view(&self) -> String {
        self.render(RenderMode::View)
    }

    /// The engine's printed form, which [`Session::eval`] reads back.
    #[must_use]
    pub fn print(&self) -> String {
        self.render(RenderMode::Print)
    }

    fn render(&self, mode: RenderMode) -> String {
        if self.is_null() {
            return "<null>".to_owned();
        }
        let _bracket = self.session.enter();
        String::from_utf8_lossy(&self.session.engine().render(self.target, mode)).into_owned()
    }

    /// Fails with a usage error on a null handle.
    pub(crate) fn check_not_null(&self) -> BridgeResult<()> {
        if self.is_null() {
            Err(self.session.fail(BridgeError::usage("operation on a null handle")))
        } else {
            Ok(())
        }
    }
}

impl Clone for Handle {
    /// Takes a fresh reservation for the copy.
    fn clone(&self) -> Self {
        let mut copy = Self::new(self.session.clone(), self.target);
        copy.compare_by_identity = self.compare_by_identity;
        copy
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let engine = self.session.engine();
        engine.release(self.target);
        if !self.target.is_null() {
            let reservations = engine.reservations(self.target);
            let target = self.target;
            self.session.trace(|tracer| tracer.on_release(target, reservations));
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("target", &self.target)
            .field("compare_by_identity", &self.compare_by_identity)
            .finish()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.view())
    }
}
