//! In-process implementation of the engine's C entry points.
//!
//! `Kernel` models the parts of the computer-algebra kernel the bridge relies
//! on: tagged references with immediate integers and field elements, a bag
//! heap reclaimed by a mark-sweep collector, a reservation table, a global
//! function namespace, generic arithmetic and comparison, and an evaluator for
//! its own printed syntax.
//!
//! Mutable state lives behind `RefCell`s so the [`Engine`] methods can take
//! `&self`. No borrow is held across a call back into the kernel.

mod arith;
mod bag;
mod builtins;
mod eval;
mod field;
mod render;

use std::cell::{Cell, RefCell};

use ahash::AHashMap;
use indexmap::IndexSet;
use num_bigint::BigInt;

pub(crate) use self::bag::{Bag, Native, Ring};
pub(crate) use self::field::Ffe;
use crate::{
    engine::{
        BinaryOp, Engine, EngineError, EngineResult, Interrupter, Limb, LimbBuf, MAX_DIRECT_ARGS, Obj, RenderMode, Tnum,
    },
    limbs,
    resource::{LimitTracker, ResourceLimits},
};

/// Nesting depth after which recursive structure walks give up.
pub(crate) const MAX_NESTING: usize = 256;

/// The in-process engine.
#[derive(Debug)]
pub struct Kernel {
    heap: RefCell<bag::BagHeap>,
    reservations: RefCell<AHashMap<Obj, usize>>,
    globals: AHashMap<String, Obj>,
    /// Record component names; the rnam of a name is its index plus one.
    rnams: RefCell<IndexSet<String>>,
    tracker: RefCell<LimitTracker>,
    depth: Cell<usize>,
    interrupter: Interrupter,
    /// `true`, `false`, `fail`.
    truth: [Obj; 3],
    /// One preallocated bag per character value.
    chars: Vec<Obj>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Creates a kernel with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::new())
    }

    /// Creates a kernel enforcing `limits`.
    ///
    /// Bootstrap objects (booleans, characters, global functions and rings)
    /// are permanent and do not count against `max_objects`.
    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        let mut heap = bag::BagHeap::default();
        let truth = [heap.insert(Bag::True), heap.insert(Bag::False), heap.insert(Bag::Fail)];
        let chars = (0..=u8::MAX).map(|c| heap.insert(Bag::Char(c))).collect();

        let mut globals = AHashMap::new();
        for &(name, native) in builtins::BUILTINS {
            globals.insert(name.to_owned(), heap.insert(Bag::Function { name, native }));
        }
        for (name, ring) in [
            ("Integers", Ring::Integers),
            ("Rationals", Ring::Rationals),
            ("Cyclotomics", Ring::Cyclotomics),
        ] {
            globals.insert(name.to_owned(), heap.insert(Bag::Ring(ring)));
        }

        Self {
            heap: RefCell::new(heap),
            reservations: RefCell::new(AHashMap::new()),
            globals,
            rnams: RefCell::new(IndexSet::new()),
            tracker: RefCell::new(LimitTracker::new(limits)),
            depth: Cell::new(0),
            interrupter: Interrupter::new(),
            truth,
            chars,
        }
    }

    /// Number of bags currently on the heap, permanent ones included.
    #[must_use]
    pub fn live_bags(&self) -> usize {
        self.heap.borrow().live_count()
    }

    fn check_entered(&self) {
        debug_assert!(self.depth.get() > 0, "engine used outside an enter/leave bracket");
    }

    pub(crate) fn alloc(&self, bag: Bag) -> EngineResult<Obj> {
        self.tracker.borrow_mut().on_allocate()?;
        Ok(self.heap.borrow_mut().insert(bag))
    }

    pub(crate) fn with_bag<R>(&self, obj: Obj, f: impl FnOnce(&Bag) -> R) -> Option<R> {
        self.heap.borrow().get(obj).map(f)
    }

    pub(crate) fn with_bag_mut<R>(&self, obj: Obj, f: impl FnOnce(&mut Bag) -> R) -> Option<R> {
        self.heap.borrow_mut().get_mut(obj).map(f)
    }

    /// One interruptible step: consumes a pending interrupt and counts
    /// against the operation budget.
    pub(crate) fn poll(&self) -> EngineResult<()> {
        if self.interrupter.take() {
            return Err(EngineError::Interrupted);
        }
        self.tracker.borrow_mut().check_operation()?;
        Ok(())
    }

    pub(crate) fn check_limbs(&self, limbs: usize) -> EngineResult<()> {
        self.tracker.borrow().check_limbs(limbs)?;
        Ok(())
    }

    pub(crate) fn check_list_length(&self, len: usize) -> EngineResult<()> {
        self.tracker.borrow().check_list_length(len)?;
        Ok(())
    }

    pub(crate) fn int(&self, obj: Obj) -> Option<BigInt> {
        limbs::to_host(self, obj)
    }

    pub(crate) fn make_bigint(&self, value: &BigInt) -> EngineResult<Obj> {
        limbs::to_engine(self, value)
    }

    pub(crate) fn small_int(&self, value: i64) -> EngineResult<Obj> {
        limbs::from_i64(self, value)
    }

    pub(crate) fn boolean(&self, value: bool) -> Obj {
        if value { self.truth[0] } else { self.truth[1] }
    }

    /// Position of a boolean singleton: 0 for `true`, 1 for `false`, 2 for `fail`.
    pub(crate) fn truth_rank(&self, obj: Obj) -> Option<usize> {
        self.truth.iter().position(|&t| t == obj)
    }

    pub(crate) fn perm_images(&self, obj: Obj) -> Option<Vec<u32>> {
        self.with_bag(obj, Bag::perm_images).flatten()
    }

    pub(crate) fn ring(&self, obj: Obj) -> Option<Ring> {
        self.with_bag(obj, |bag| match bag {
            Bag::Ring(ring) => Some(*ring),
            _ => None,
        })
        .flatten()
    }

    /// Elements of a list-like object, holes as `None`.
    pub(crate) fn list_items(&self, obj: Obj) -> Option<Vec<Option<Obj>>> {
        if !self.is_list(obj) {
            return None;
        }
        let len = self.list_len(obj);
        Some((1..=len).map(|pos| self.list_elm(obj, pos)).collect())
    }

    /// Builds a mutable list from elements.
    pub(crate) fn make_list(&self, items: Vec<Option<Obj>>) -> EngineResult<Obj> {
        self.alloc(Bag::list(items, true))
    }

    pub(crate) fn function_name(&self, obj: Obj) -> Option<&'static str> {
        self.with_bag(obj, |bag| match bag {
            Bag::Function { name, .. } => Some(*name),
            _ => None,
        })
        .flatten()
    }

    fn native(&self, func: Obj) -> EngineResult<Native> {
        self.with_bag(func, |bag| match bag {
            Bag::Function { native, .. } => Some(*native),
            _ => None,
        })
        .flatten()
        .ok_or_else(|| EngineError::Failed("Function Calls: <func> must be a function".to_owned()))
    }

    fn collect(&self) -> usize {
        let mut roots: Vec<Obj> = self.reservations.borrow().keys().copied().collect();
        roots.extend(self.globals.values().copied());
        roots.extend(self.truth);
        roots.extend(self.chars.iter().copied());
        let freed = self.heap.borrow_mut().collect(roots);
        let mut tracker = self.tracker.borrow_mut();
        tracker.on_free(freed);
        tracker.on_collect();
        freed
    }
}

impl Engine for Kernel {
    fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn leave(&self) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth == 0 {
            self.tracker.borrow_mut().reset_operations();
            if self.tracker.borrow().should_collect() {
                self.collect();
            }
        }
    }

    fn bracket_depth(&self) -> usize {
        self.depth.get()
    }

    fn acquire(&self, obj: Obj) {
        if obj.is_bag() {
            *self.reservations.borrow_mut().entry(obj).or_insert(0) += 1;
        }
    }

    fn release(&self, obj: Obj) {
        if !obj.is_bag() {
            return;
        }
        let mut reservations = self.reservations.borrow_mut();
        if let Some(count) = reservations.get_mut(&obj) {
            *count -= 1;
            if *count == 0 {
                reservations.remove(&obj);
            }
        }
    }

    fn reservations(&self, obj: Obj) -> usize {
        self.reservations.borrow().get(&obj).copied().unwrap_or(0)
    }

    fn tnum(&self, obj: Obj) -> Tnum {
        if obj.is_null() {
            return Tnum::Null;
        }
        if obj.is_immediate_int() {
            return Tnum::IntSmall;
        }
        if obj.is_immediate_ffe() {
            return Tnum::Ffe;
        }
        self.with_bag(obj, |bag| match bag {
            Bag::LargeInt { negative: false, .. } => Tnum::IntPos,
            Bag::LargeInt { negative: true, .. } => Tnum::IntNeg,
            Bag::Rat { .. } => Tnum::Rat,
            Bag::Cyc { .. } => Tnum::Cyc,
            Bag::Float(_) => Tnum::Float,
            Bag::True | Bag::False | Bag::Fail => Tnum::Bool,
            Bag::Char(_) => Tnum::Char,
            Bag::String { .. } => Tnum::String,
            Bag::List { .. } => Tnum::Plist,
            Bag::Record { .. } => Tnum::Record,
            Bag::Function { .. } => Tnum::Function,
            Bag::Perm2(_) => Tnum::Perm2,
            Bag::Perm4(_) => Tnum::Perm4,
            Bag::ZmodnZ { .. } => Tnum::PosObj,
            Bag::Ring(_) => Tnum::ComObj,
        })
        .unwrap_or(Tnum::Null)
    }

    fn is_list(&self, obj: Obj) -> bool {
        self.with_bag(obj, |bag| matches!(bag, Bag::List { .. } | Bag::String { .. }))
            .unwrap_or(false)
    }

    fn is_record(&self, obj: Obj) -> bool {
        self.with_bag(obj, |bag| matches!(bag, Bag::Record { .. })).unwrap_or(false)
    }

    fn is_string(&self, obj: Obj) -> bool {
        let items = self
            .with_bag(obj, |bag| match bag {
                Bag::String { .. } => Some(None),
                Bag::List { items, .. } if !items.is_empty() => Some(Some(items.clone())),
                _ => None,
            })
            .flatten();
        let items = match items {
            None => return false,
            Some(None) => return true,
            Some(Some(items)) => items,
        };
        items.iter().all(|&obj| self.char_value(obj).is_some())
    }

    fn is_mutable(&self, obj: Obj) -> bool {
        self.with_bag(obj, |bag| match bag {
            Bag::String { mutable, .. } | Bag::List { mutable, .. } | Bag::Record { mutable, .. } => *mutable,
            _ => false,
        })
        .unwrap_or(false)
    }

    fn int_size(&self, obj: Obj) -> isize {
        self.with_bag(obj, |bag| match bag {
            Bag::LargeInt { negative, limbs } => {
                let len = limbs.len() as isize;
                if *negative { -len } else { len }
            }
            _ => 0,
        })
        .unwrap_or(0)
    }

    fn int_limbs(&self, obj: Obj, out: &mut LimbBuf) {
        out.clear();
        self.with_bag(obj, |bag| {
            if let Bag::LargeInt { limbs, .. } = bag {
                out.extend_from_slice(limbs);
            }
        });
    }

    fn make_int(&self, negative: bool, limbs: &[Limb]) -> EngineResult<Obj> {
        self.check_entered();
        if let Some(small) = limbs::limbs_to_immediate(negative, limbs)
            && let Some(obj) = limbs::immediate(small)
        {
            return Ok(obj);
        }
        let used = limbs.iter().rposition(|&limb| limb != 0).map_or(0, |last| last + 1);
        self.check_limbs(used)?;
        self.alloc(Bag::LargeInt {
            negative,
            limbs: LimbBuf::from_slice(&limbs[..used]),
        })
    }

    fn float_value(&self, obj: Obj) -> Option<f64> {
        self.with_bag(obj, |bag| match bag {
            Bag::Float(value) => Some(*value),
            _ => None,
        })
        .flatten()
    }

    fn make_float(&self, value: f64) -> EngineResult<Obj> {
        self.check_entered();
        self.alloc(Bag::Float(value))
    }

    fn char_value(&self, obj: Obj) -> Option<u8> {
        self.with_bag(obj, |bag| match bag {
            Bag::Char(c) => Some(*c),
            _ => None,
        })
        .flatten()
    }

    fn make_char(&self, value: u8) -> EngineResult<Obj> {
        Ok(self.chars[usize::from(value)])
    }

    fn string_bytes(&self, obj: Obj) -> Option<Vec<u8>> {
        if !self.is_string(obj) {
            return None;
        }
        let bytes = self
            .with_bag(obj, |bag| match bag {
                Bag::String { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .flatten();
        match bytes {
            Some(bytes) => Some(bytes),
            None => self
                .list_items(obj)?
                .into_iter()
                .map(|item| item.and_then(|c| self.char_value(c)))
                .collect(),
        }
    }

    fn make_string(&self, value: &str) -> EngineResult<Obj> {
        self.check_entered();
        self.alloc(Bag::String {
            bytes: value.as_bytes().to_vec(),
            mutable: true,
        })
    }

    fn true_obj(&self) -> Obj {
        self.truth[0]
    }

    fn false_obj(&self) -> Obj {
        self.truth[1]
    }

    fn fail_obj(&self) -> Obj {
        self.truth[2]
    }

    fn new_list(&self, capacity: usize) -> EngineResult<Obj> {
        self.check_entered();
        self.check_list_length(capacity)?;
        self.alloc(Bag::List {
            items: Vec::with_capacity(capacity),
            mutable: true,
        })
    }

    fn list_len(&self, list: Obj) -> usize {
        self.with_bag(list, |bag| match bag {
            Bag::List { items, .. } => items.len(),
            Bag::String { bytes, .. } => bytes.len(),
            _ => 0,
        })
        .unwrap_or(0)
    }

    fn list_elm(&self, list: Obj, pos: usize) -> Option<Obj> {
        if pos == 0 {
            return None;
        }
        self.with_bag(list, |bag| match bag {
            Bag::List { items, .. } => items.get(pos - 1).copied().and_then(bag::slot),
            Bag::String { bytes, .. } => bytes.get(pos - 1).map(|&c| self.chars[usize::from(c)]),
            _ => None,
        })
        .flatten()
    }

    fn list_ass(&self, list: Obj, pos: usize, value: Obj) -> EngineResult<()> {
        self.check_entered();
        if pos == 0 {
            return Err(EngineError::Failed(
                "List Assignment: <position> must be a positive integer".to_owned(),
            ));
        }
        if !self.is_mutable(list) {
            return Err(EngineError::Failed(
                "List Assignment: <list> must be a mutable list".to_owned(),
            ));
        }
        if pos > self.list_len(list) {
            self.check_list_length(pos)?;
        }
        let as_char = self.char_value(value);
        self.with_bag_mut(list, |bag| {
            if let Bag::String { bytes, .. } = &mut *bag {
                match as_char {
                    Some(c) if pos <= bytes.len() => bytes[pos - 1] = c,
                    Some(c) if pos == bytes.len() + 1 => bytes.push(c),
                    _ => {
                        // anything but an in-place character write turns the string into a plain list
                        let items = bytes.iter().map(|&c| self.chars[usize::from(c)]).collect();
                        *bag = Bag::List { items, mutable: true };
                    }
                }
            }
            if let Bag::List { items, .. } = &mut *bag {
                if items.len() < pos {
                    items.resize(pos, Obj::NULL);
                }
                items[pos - 1] = value;
            }
        })
        .ok_or_else(|| EngineError::Failed("List Assignment: <list> must be a list".to_owned()))
    }

    fn rnam(&self, name: &str) -> u32 {
        let (index, _) = self.rnams.borrow_mut().insert_full(name.to_owned());
        index as u32 + 1
    }

    fn rnam_name(&self, rnam: u32) -> Option<String> {
        let index = (rnam as usize).checked_sub(1)?;
        self.rnams.borrow().get_index(index).cloned()
    }

    fn new_record(&self) -> EngineResult<Obj> {
        self.check_entered();
        self.alloc(Bag::Record {
            fields: Vec::new(),
            mutable: true,
        })
    }

    fn rec_elm(&self, record: Obj, rnam: u32) -> Option<Obj> {
        self.with_bag(record, |bag| match bag {
            Bag::Record { fields, .. } => fields.iter().find(|&&(key, _)| key == rnam).map(|&(_, value)| value),
            _ => None,
        })
        .flatten()
    }

    fn rec_ass(&self, record: Obj, rnam: u32, value: Obj) -> EngineResult<()> {
        self.check_entered();
        if !self.is_mutable(record) {
            return Err(EngineError::Failed(
                "Record Assignment: <rec> must be a mutable record".to_owned(),
            ));
        }
        self.with_bag_mut(record, |bag| {
            if let Bag::Record { fields, .. } = bag {
                match fields.iter_mut().find(|(key, _)| *key == rnam) {
                    Some(slot) => slot.1 = value,
                    None => fields.push((rnam, value)),
                }
            }
        })
        .ok_or_else(|| EngineError::Failed("Record Assignment: <rec> must be a record".to_owned()))
    }

    fn rec_rnams(&self, record: Obj) -> Vec<u32> {
        self.with_bag(record, |bag| match bag {
            Bag::Record { fields, .. } => fields.iter().map(|&(key, _)| key).collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default()
    }

    fn binary(&self, op: BinaryOp, left: Obj, right: Obj) -> EngineResult<Obj> {
        self.check_entered();
        arith::binary(self, op, left, right)
    }

    fn eq(&self, left: Obj, right: Obj) -> EngineResult<bool> {
        self.check_entered();
        arith::eq(self, left, right, 0)
    }

    fn lt(&self, left: Obj, right: Obj) -> EngineResult<bool> {
        self.check_entered();
        arith::lt(self, left, right, 0)
    }

    fn call_args(&self, func: Obj, args: &[Obj]) -> EngineResult<Option<Obj>> {
        self.check_entered();
        if args.len() > MAX_DIRECT_ARGS {
            return Err(EngineError::Failed(format!(
                "Function Calls: at most {MAX_DIRECT_ARGS} direct arguments (got {})",
                args.len()
            )));
        }
        let native = self.native(func)?;
        native(self, args)
    }

    fn call_list(&self, func: Obj, args: Obj) -> EngineResult<Option<Obj>> {
        self.check_entered();
        let native = self.native(func)?;
        let items = self
            .list_items(args)
            .ok_or_else(|| EngineError::Failed("CallFuncList: <args> must be a list".to_owned()))?;
        let args = items
            .into_iter()
            .collect::<Option<Vec<Obj>>>()
            .ok_or_else(|| EngineError::Failed("CallFuncList: <args> must be a dense list".to_owned()))?;
        native(self, &args)
    }

    fn global(&self, name: &str) -> Option<Obj> {
        self.globals.get(name).copied()
    }

    fn render(&self, obj: Obj, mode: RenderMode) -> Vec<u8> {
        render::render(self, obj, mode).into_bytes()
    }

    fn eval_string(&self, text: &str) -> EngineResult<Obj> {
        self.check_entered();
        eval::eval(self, text)
    }

    fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    fn collect_garbage(&self) -> usize {
        self.collect()
    }

    fn is_live(&self, obj: Obj) -> bool {
        !obj.is_null() && (!obj.is_bag() || self.heap.borrow().get(obj).is_some())
    }
}
