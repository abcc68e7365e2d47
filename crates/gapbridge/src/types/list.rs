//! Indexed access to engine lists.
//!
//! The host sees 0-based positions; the engine is 1-based. Reads of a hole
//! or past the end fail, while writes past the end extend the list and leave
//! holes in between.

use super::{Element, handle_kind};
use crate::{
    Handle,
    engine::Obj,
    error::{BridgeError, BridgeResult},
    object::IntoHandle,
    types,
};

handle_kind!(
    /// A plain engine list, possibly sparse.
    List
);

impl List {
    /// Length including trailing positions up to the last bound one.
    #[must_use]
    pub fn len(&self) -> usize {
        let _bracket = self.session().enter();
        self.session().engine().list_len(self.target())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Asks the engine; the answer is never cached.
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        let _bracket = self.session().enter();
        self.session().engine().is_mutable(self.target())
    }

    /// True when `index` is within bounds and not a hole.
    #[must_use]
    pub fn is_bound(&self, index: usize) -> bool {
        let _bracket = self.session().enter();
        index
            .checked_add(1)
            .and_then(|pos| self.session().engine().list_elm(self.target(), pos))
            .is_some()
    }

    pub fn get(&self, index: usize) -> BridgeResult<Element> {
        self.get_nested(&[index])
    }

    /// Walks one list level per index: `get_nested(&[i, j])` is `self[i][j]`.
    pub fn get_nested(&self, indices: &[usize]) -> BridgeResult<Element> {
        let session = self.session();
        if indices.is_empty() {
            return Err(session.fail(BridgeError::index("no index given")));
        }
        let _bracket = session.enter();
        let obj = self.walk(self.target(), indices)?;
        Ok(types::classify(session.wrap(obj)))
    }

    pub fn set(&self, index: usize, value: impl IntoHandle) -> BridgeResult<()> {
        self.set_nested(&[index], value)
    }

    /// Assigns at the position named by `indices`; every index but the last
    /// must land on a bound element.
    ///
    /// Writing past the end of the innermost list extends it with holes.
    /// Fails with a mutability error when that list is immutable.
    pub fn set_nested(&self, indices: &[usize], value: impl IntoHandle) -> BridgeResult<()> {
        let session = self.session();
        let value = value.into_handle(session)?;
        let Some((&last, outer)) = indices.split_last() else {
            return Err(session.fail(BridgeError::index("no index given")));
        };

        let _bracket = session.enter();
        let engine = session.engine();
        let container = self.walk(self.target(), outer)?;
        if !engine.is_list(container) {
            return Err(session.fail(BridgeError::index("too many indices")));
        }
        if !engine.is_mutable(container) {
            return Err(session.fail(BridgeError::immutable("list")));
        }
        let pos = last
            .checked_add(1)
            .ok_or_else(|| session.fail(BridgeError::index_out_of_range(last)))?;
        engine
            .list_ass(container, pos, value.target())
            .map_err(|err| session.engine_error(err))
    }

    /// Iterates over positions; holes yield `None`.
    #[must_use]
    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            list: self,
            pos: 0,
            len: self.len(),
        }
    }

    /// An immutable deep copy.
    pub fn freeze(&self) -> BridgeResult<Self> {
        self.session().call_global("Immutable", &[self.target()])?.into_list()
    }

    /// Follows `indices` from `obj`; an empty path stays at `obj`. Must run
    /// inside a bracket.
    fn walk(&self, mut obj: Obj, indices: &[usize]) -> BridgeResult<Obj> {
        let session = self.session();
        let engine = session.engine();
        for &index in indices {
            if !engine.is_list(obj) {
                return Err(session.fail(BridgeError::index("too many indices")));
            }
            obj = index
                .checked_add(1)
                .and_then(|pos| engine.list_elm(obj, pos))
                .ok_or_else(|| session.fail(BridgeError::index_out_of_range(index)))?;
        }
        Ok(obj)
    }
}

/// Iterator returned by [`List::iter`].
#[derive(Debug)]
pub struct ListIter<'a> {
    list: &'a List,
    pos: usize,
    len: usize,
}

impl Iterator for ListIter<'_> {
    type Item = Option<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.len {
            return None;
        }
        self.pos += 1;
        let session = self.list.session();
        let _bracket = session.enter();
        let item = session.engine().list_elm(self.list.target(), self.pos);
        Some(item.map(|obj| types::classify(Handle::new(session.clone(), obj))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len.saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = Option<Element>;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> ListIter<'a> {
        self.iter()
    }
}
