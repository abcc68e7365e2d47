use num_bigint::BigInt;

use super::Kernel;
use crate::engine::{EngineResult, LimbBuf, Obj};

/// Kernel function body. Receives already-evaluated arguments.
pub(crate) type Native = fn(&Kernel, &[Obj]) -> EngineResult<Option<Obj>>;

/// Payload of one heap bag.
#[derive(Debug, Clone)]
pub(crate) enum Bag {
    LargeInt {
        negative: bool,
        limbs: LimbBuf,
    },
    /// Normalized rational: `den > 1`, `gcd(num, den) == 1`.
    Rat {
        num: BigInt,
        den: BigInt,
    },
    /// Root of unity `E(order)^exponent` with `gcd(order, exponent) == 1` and `order > 2`.
    Cyc {
        order: u32,
        exponent: u32,
    },
    Float(f64),
    True,
    False,
    Fail,
    Char(u8),
    String {
        bytes: Vec<u8>,
        mutable: bool,
    },
    /// Holes are stored as [`Obj::NULL`], one word per slot.
    List {
        items: Vec<Obj>,
        mutable: bool,
    },
    Record {
        fields: Vec<(u32, Obj)>,
        mutable: bool,
    },
    Function {
        name: &'static str,
        native: Native,
    },
    /// Permutation of degree < 65536 as 0-based images, trailing fixed points trimmed.
    Perm2(Vec<u16>),
    /// Permutation of larger degree.
    Perm4(Vec<u32>),
    ZmodnZ {
        residue: u64,
        modulus: u64,
    },
    Ring(Ring),
}

/// Ring component objects known to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Ring {
    Integers,
    Rationals,
    Cyclotomics,
    PrimeField(u32),
    ZmodnZ(u64),
}

impl Bag {
    /// Builds a list bag, storing each `None` as a hole.
    pub fn list(items: Vec<Option<Obj>>, mutable: bool) -> Self {
        Self::List {
            items: items.into_iter().map(|item| item.unwrap_or(Obj::NULL)).collect(),
            mutable,
        }
    }

    /// Builds a permutation bag from 0-based images, choosing the encoding by degree.
    pub fn perm(mut images: Vec<u32>) -> Self {
        while let Some(&last) = images.last() {
            if last as usize + 1 == images.len() {
                images.pop();
            } else {
                break;
            }
        }
        if images.len() <= usize::from(u16::MAX) {
            Self::Perm2(images.into_iter().map(|i| i as u16).collect())
        } else {
            Self::Perm4(images)
        }
    }

    /// 0-based images of a permutation bag.
    pub fn perm_images(&self) -> Option<Vec<u32>> {
        match self {
            Self::Perm2(images) => Some(images.iter().map(|&i| u32::from(i)).collect()),
            Self::Perm4(images) => Some(images.clone()),
            _ => None,
        }
    }

    /// Objects directly referenced by this bag.
    fn children(&self, out: &mut Vec<Obj>) {
        match self {
            Self::List { items, .. } => out.extend(items.iter().copied().filter_map(slot)),
            Self::Record { fields, .. } => out.extend(fields.iter().map(|&(_, value)| value)),
            _ => {}
        }
    }
}

/// A list slot as an element, `None` for a hole.
pub(crate) fn slot(obj: Obj) -> Option<Obj> {
    (!obj.is_null()).then_some(obj)
}

/// Slot arena holding every live bag.
///
/// Freed slots go to a free list and are reused by later allocations, so a
/// stale reference may end up pointing at an unrelated bag. Reservations are
/// what prevent that from happening to objects the host still uses.
#[derive(Debug, Default)]
pub(crate) struct BagHeap {
    entries: Vec<Option<Bag>>,
    free_list: Vec<usize>,
}

impl BagHeap {
    pub fn insert(&mut self, bag: Bag) -> Obj {
        let index = if let Some(index) = self.free_list.pop() {
            self.entries[index] = Some(bag);
            index
        } else {
            self.entries.push(Some(bag));
            self.entries.len() - 1
        };
        Obj::from_bag_index(index)
    }

    pub fn get(&self, obj: Obj) -> Option<&Bag> {
        self.entries.get(obj.bag_index()?)?.as_ref()
    }

    pub fn get_mut(&mut self, obj: Obj) -> Option<&mut Bag> {
        self.entries.get_mut(obj.bag_index()?)?.as_mut()
    }

    pub fn live_count(&self) -> usize {
        self.entries.len() - self.free_list.len()
    }

    /// Mark-sweep collection from `roots`. Returns the number of bags freed.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = Obj>) -> usize {
        let mut marked = vec![false; self.entries.len()];
        let mut stack: Vec<Obj> = roots.into_iter().collect();
        let mut children = Vec::new();
        while let Some(obj) = stack.pop() {
            let Some(index) = obj.bag_index() else { continue };
            if index >= marked.len() || marked[index] {
                continue;
            }
            marked[index] = true;
            if let Some(bag) = &self.entries[index] {
                bag.children(&mut children);
                stack.append(&mut children);
            }
        }

        let mut freed = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.is_some() && !marked[index] {
                *entry = None;
                self.free_list.push(index);
                freed += 1;
            }
        }
        freed
    }
}
