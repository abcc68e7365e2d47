//! Kernel functions bound in the global namespace at start-up.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use super::{
    Bag, Ffe, Kernel, MAX_NESTING, Native, Ring, arith,
    field::{self, MAX_PRIME},
    render,
};
use crate::engine::{BinaryOp, Engine, EngineError, EngineResult, Obj, RenderMode, Tnum};

pub(super) const BUILTINS: &[(&str, Native)] = &[
    ("Add", add),
    ("Append", append),
    ("Length", length),
    ("Immutable", immutable),
    ("ShallowCopy", shallow_copy),
    ("IsMutable", is_mutable),
    ("NumeratorRat", numerator_rat),
    ("DenominatorRat", denominator_rat),
    ("E", root_of_unity),
    ("Z", primitive_root),
    ("IntFFE", int_ffe),
    ("Characteristic", characteristic),
    ("Conductor", conductor),
    ("ZmodnZ", zmodnz),
    ("ZmodnZObj", zmodnz_obj),
    ("GF", galois_field),
    ("IsRing", is_ring),
    ("IsField", is_field),
    ("IsZmodnZObj", is_zmodnz_obj),
    ("PermList", perm_list),
    ("ListPerm", list_perm),
    ("LargestMovedPoint", largest_moved_point),
    ("SignPerm", sign_perm),
    ("NameFunction", name_function),
    ("RecNames", rec_names),
    ("String", string),
    ("Maximum", maximum),
    ("Minimum", minimum),
    ("Sum", sum),
    ("Product", product),
    ("Concatenation", concatenation),
    ("Reversed", reversed),
    ("AbsInt", abs_int),
    ("Int", int),
    ("Factorial", factorial),
    ("Gcd", gcd),
];

fn wrong_arity(expected: &str, got: usize) -> EngineError {
    EngineError::Failed(format!(
        "Function: number of arguments must be {expected} (not {got})"
    ))
}

fn no_method_for(name: &str, arity: usize) -> EngineError {
    EngineError::NoMethod(format!(
        "no 1st choice method found for `{name}' on {arity} arguments"
    ))
}

fn exact<const N: usize>(args: &[Obj]) -> EngineResult<[Obj; N]> {
    <[Obj; N]>::try_from(args).map_err(|_| wrong_arity(&N.to_string(), args.len()))
}

fn int_arg(kernel: &Kernel, obj: Obj, name: &str, arity: usize) -> EngineResult<BigInt> {
    kernel.int(obj).ok_or_else(|| no_method_for(name, arity))
}

fn positive_u64(kernel: &Kernel, obj: Obj, what: &str) -> EngineResult<u64> {
    kernel
        .int(obj)
        .and_then(|n| n.to_u64())
        .filter(|&n| n > 0)
        .ok_or_else(|| EngineError::Failed(format!("{what} must be a positive integer")))
}

fn prime_arg(kernel: &Kernel, obj: Obj, name: &str) -> EngineResult<u32> {
    kernel
        .int(obj)
        .and_then(|n| n.to_u32())
        .filter(|&p| p <= MAX_PRIME && field::is_prime(u64::from(p)))
        .ok_or_else(|| EngineError::Failed(format!("{name}: <p> must be a prime less than 65536")))
}

fn list_arg(kernel: &Kernel, obj: Obj, name: &str, arity: usize) -> EngineResult<Vec<Option<Obj>>> {
    kernel.list_items(obj).ok_or_else(|| no_method_for(name, arity))
}

/// The single list argument, or all arguments when there are several.
fn values_of(kernel: &Kernel, args: &[Obj], name: &str) -> EngineResult<Vec<Obj>> {
    match args {
        [] => Err(wrong_arity("at least 1", 0)),
        [list] => Ok(list_arg(kernel, *list, name, 1)?.into_iter().flatten().collect()),
        _ => Ok(args.to_vec()),
    }
}

fn perm_arg(kernel: &Kernel, obj: Obj, name: &str) -> EngineResult<Vec<u32>> {
    kernel.perm_images(obj).ok_or_else(|| no_method_for(name, 1))
}

// ======================================================================
// Lists and records
// ======================================================================

fn add(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let (list, value, pos) = match *args {
        [list, value] => (list, value, None),
        [list, value, pos] => (list, value, Some(positive_u64(kernel, pos, "Add: <pos>")?)),
        _ => return Err(wrong_arity("2 or 3", args.len())),
    };
    if !kernel.is_list(list) {
        return Err(no_method_for("Add", args.len()));
    }
    if !kernel.is_mutable(list) {
        return Err(EngineError::Failed("Add: <list> must be a mutable list".to_owned()));
    }
    let len = kernel.list_len(list);
    kernel.check_list_length(len + 1)?;
    match pos {
        None => kernel.list_ass(list, len + 1, value)?,
        Some(pos) => {
            let pos = usize::try_from(pos).unwrap_or(usize::MAX);
            if pos > len + 1 {
                kernel.list_ass(list, pos, value)?;
            } else {
                let mut items = kernel.list_items(list).unwrap_or_default();
                items.insert(pos - 1, Some(value));
                kernel.with_bag_mut(list, |bag| {
                    *bag = Bag::list(items, true);
                });
            }
        }
    }
    Ok(None)
}

fn append(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [list, other] = exact(args)?;
    if !kernel.is_list(list) {
        return Err(no_method_for("Append", 2));
    }
    if !kernel.is_mutable(list) {
        return Err(EngineError::Failed(
            "Append: <list1> must be a mutable list".to_owned(),
        ));
    }
    let base = kernel.list_len(list);
    for (offset, item) in list_arg(kernel, other, "Append", 2)?.into_iter().enumerate() {
        if let Some(item) = item {
            kernel.list_ass(list, base + offset + 1, item)?;
        }
    }
    Ok(None)
}

fn length(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [list] = exact(args)?;
    if !kernel.is_list(list) {
        return Err(no_method_for("Length", 1));
    }
    Ok(Some(kernel.small_int(kernel.list_len(list) as i64)?))
}

fn immutable_copy(kernel: &Kernel, obj: Obj, depth: usize) -> EngineResult<Obj> {
    if depth > MAX_NESTING {
        return Err(EngineError::Failed(format!("Immutable: nesting exceeds {MAX_NESTING}")));
    }
    if !kernel.is_mutable(obj) {
        return Ok(obj);
    }
    let Some(bag) = kernel.with_bag(obj, Bag::clone) else {
        return Ok(obj);
    };
    let bag = match bag {
        Bag::String { bytes, .. } => Bag::String { bytes, mutable: false },
        Bag::List { items, .. } => Bag::List {
            items: items
                .into_iter()
                .map(|item| if item.is_null() { Ok(item) } else { immutable_copy(kernel, item, depth + 1) })
                .collect::<EngineResult<_>>()?,
            mutable: false,
        },
        Bag::Record { fields, .. } => Bag::Record {
            fields: fields
                .into_iter()
                .map(|(rnam, value)| Ok((rnam, immutable_copy(kernel, value, depth + 1)?)))
                .collect::<EngineResult<_>>()?,
            mutable: false,
        },
        _ => return Ok(obj),
    };
    kernel.alloc(bag)
}

fn immutable(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    immutable_copy(kernel, obj, 0).map(Some)
}

fn shallow_copy(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let copy = kernel
        .with_bag(obj, |bag| match bag {
            Bag::String { bytes, .. } => Some(Bag::String {
                bytes: bytes.clone(),
                mutable: true,
            }),
            Bag::List { items, .. } => Some(Bag::List {
                items: items.clone(),
                mutable: true,
            }),
            Bag::Record { fields, .. } => Some(Bag::Record {
                fields: fields.clone(),
                mutable: true,
            }),
            _ => None,
        })
        .flatten();
    match copy {
        Some(bag) => kernel.alloc(bag).map(Some),
        None => Ok(Some(obj)),
    }
}

fn is_mutable(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    Ok(Some(kernel.boolean(kernel.is_mutable(obj))))
}

fn rec_names(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [record] = exact(args)?;
    if !kernel.is_record(record) {
        return Err(no_method_for("RecNames", 1));
    }
    let names = kernel
        .rec_rnams(record)
        .into_iter()
        .filter_map(|rnam| kernel.rnam_name(rnam))
        .map(|name| kernel.make_string(&name).map(Some))
        .collect::<EngineResult<_>>()?;
    kernel.make_list(names).map(Some)
}

fn string(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let bytes = match kernel.string_bytes(obj) {
        Some(bytes) => bytes,
        None => render::render(kernel, obj, RenderMode::Print).into_bytes(),
    };
    kernel.alloc(Bag::String { bytes, mutable: true }).map(Some)
}

/// Builds a string when every part is a string (or empty), a list otherwise.
fn build_sequence(kernel: &Kernel, parts: &[Obj], items: Vec<Option<Obj>>) -> EngineResult<Obj> {
    let textual = parts.iter().any(|&part| kernel.is_string(part))
        && parts
            .iter()
            .all(|&part| kernel.is_string(part) || kernel.list_len(part) == 0);
    if textual {
        let bytes = items
            .iter()
            .map(|item| item.and_then(|c| kernel.char_value(c)))
            .collect::<Option<Vec<u8>>>();
        if let Some(bytes) = bytes {
            return kernel.alloc(Bag::String { bytes, mutable: true });
        }
    }
    kernel.make_list(items)
}

fn concatenation(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let parts = match args {
        [single] if !kernel.is_string(*single) => values_of(kernel, args, "Concatenation")?,
        _ => args.to_vec(),
    };
    let mut items = Vec::new();
    for &part in &parts {
        items.extend(list_arg(kernel, part, "Concatenation", args.len())?);
        kernel.check_list_length(items.len())?;
    }
    build_sequence(kernel, &parts, items).map(Some)
}

fn reversed(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [list] = exact(args)?;
    let mut items = list_arg(kernel, list, "Reversed", 1)?;
    items.reverse();
    build_sequence(kernel, &[list], items).map(Some)
}

// ======================================================================
// Numbers
// ======================================================================

fn rational_parts(kernel: &Kernel, obj: Obj) -> Option<(BigInt, BigInt)> {
    if let Some(int) = kernel.int(obj) {
        return Some((int, BigInt::one()));
    }
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::Rat { num, den } => Some((num.clone(), den.clone())),
            _ => None,
        })
        .flatten()
}

fn numerator_rat(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let (num, _) = rational_parts(kernel, obj).ok_or_else(|| no_method_for("NumeratorRat", 1))?;
    kernel.make_bigint(&num).map(Some)
}

fn denominator_rat(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let (_, den) = rational_parts(kernel, obj).ok_or_else(|| no_method_for("DenominatorRat", 1))?;
    kernel.make_bigint(&den).map(Some)
}

fn root_of_unity(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [n] = exact(args)?;
    let order = positive_u64(kernel, n, "E: <n>")?;
    arith::root_of_unity(kernel, order, 1).map(Some)
}

fn conductor(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    if rational_parts(kernel, obj).is_some() {
        return kernel.small_int(1).map(Some);
    }
    let order = kernel
        .with_bag(obj, |bag| match bag {
            Bag::Cyc { order, .. } => Some(*order),
            _ => None,
        })
        .flatten()
        .ok_or_else(|| no_method_for("Conductor", 1))?;
    kernel.small_int(i64::from(order)).map(Some)
}

/// Integer part of a number, or the canonical representative of a residue.
fn int(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    if let Some((num, den)) = rational_parts(kernel, obj) {
        return kernel.make_bigint(&(num / den)).map(Some);
    }
    if let Some(ffe) = Ffe::decode(obj) {
        return kernel.small_int(i64::from(ffe.residue())).map(Some);
    }
    if let Some((residue, _)) = residue_class(kernel, obj) {
        return kernel.make_bigint(&BigInt::from(residue)).map(Some);
    }
    match kernel.float_value(obj) {
        Some(value) if value.is_finite() => {
            let truncated = BigInt::from_f64(value.trunc()).unwrap_or_default();
            kernel.make_bigint(&truncated).map(Some)
        }
        Some(_) => Err(EngineError::Failed("Int: <x> must be finite".to_owned())),
        None => Err(no_method_for("Int", 1)),
    }
}

fn abs_int(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [n] = exact(args)?;
    let n = int_arg(kernel, n, "AbsInt", 1)?;
    kernel.make_bigint(&n.abs()).map(Some)
}

fn factorial(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [n] = exact(args)?;
    let n = int_arg(kernel, n, "Factorial", 1)?
        .to_u64()
        .ok_or_else(|| EngineError::Failed("Factorial: <n> must be a non-negative integer".to_owned()))?;
    let mut acc = BigInt::one();
    for k in 2..=n {
        kernel.poll()?;
        acc *= k;
        kernel.check_limbs(usize::try_from(acc.bits() / 64 + 1).unwrap_or(usize::MAX))?;
    }
    kernel.make_bigint(&acc).map(Some)
}

fn gcd(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let mut acc = BigInt::zero();
    for value in values_of(kernel, args, "Gcd")? {
        acc = acc.gcd(&int_arg(kernel, value, "Gcd", args.len())?);
    }
    kernel.make_bigint(&acc).map(Some)
}

fn extremum(kernel: &Kernel, args: &[Obj], name: &str, want_max: bool) -> EngineResult<Option<Obj>> {
    let mut values = values_of(kernel, args, name)?.into_iter();
    let mut best = values
        .next()
        .ok_or_else(|| EngineError::Failed(format!("{name}: <list> must not be empty")))?;
    for value in values {
        let better = if want_max {
            arith::lt(kernel, best, value, 0)?
        } else {
            arith::lt(kernel, value, best, 0)?
        };
        if better {
            best = value;
        }
    }
    Ok(Some(best))
}

fn maximum(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    extremum(kernel, args, "Maximum", true)
}

fn minimum(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    extremum(kernel, args, "Minimum", false)
}

fn fold(kernel: &Kernel, args: &[Obj], name: &str, op: BinaryOp, empty: i64) -> EngineResult<Option<Obj>> {
    let [list] = exact(args)?;
    let mut values = list_arg(kernel, list, name, 1)?.into_iter().flatten();
    let Some(mut acc) = values.next() else {
        return kernel.small_int(empty).map(Some);
    };
    for value in values {
        acc = arith::binary(kernel, op, acc, value)?;
    }
    Ok(Some(acc))
}

fn sum(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    fold(kernel, args, "Sum", BinaryOp::Sum, 0)
}

fn product(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    fold(kernel, args, "Product", BinaryOp::Prod, 1)
}

// ======================================================================
// Finite fields, residue classes and rings
// ======================================================================

fn primitive_root(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [p] = exact(args)?;
    let prime = prime_arg(kernel, p, "Z")?;
    Ok(Some(Ffe::power_of_root(prime, 1).encode()))
}

fn int_ffe(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [z] = exact(args)?;
    let ffe = Ffe::decode(z).ok_or_else(|| no_method_for("IntFFE", 1))?;
    kernel.small_int(i64::from(ffe.residue())).map(Some)
}

fn residue_class(kernel: &Kernel, obj: Obj) -> Option<(u64, u64)> {
    kernel
        .with_bag(obj, |bag| match bag {
            Bag::ZmodnZ { residue, modulus } => Some((*residue, *modulus)),
            _ => None,
        })
        .flatten()
}

fn characteristic(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let value = if let Some(ffe) = Ffe::decode(obj) {
        u64::from(ffe.prime)
    } else if let Some((_, modulus)) = residue_class(kernel, obj) {
        modulus
    } else if let Some(ring) = kernel.ring(obj) {
        match ring {
            Ring::Integers | Ring::Rationals | Ring::Cyclotomics => 0,
            Ring::PrimeField(p) => u64::from(p),
            Ring::ZmodnZ(n) => n,
        }
    } else if rational_parts(kernel, obj).is_some() || kernel.tnum(obj) == Tnum::Cyc {
        0
    } else {
        return Err(no_method_for("Characteristic", 1));
    };
    kernel.make_bigint(&BigInt::from(value)).map(Some)
}

fn small_prime(n: u64) -> Option<u32> {
    u32::try_from(n)
        .ok()
        .filter(|&p| p <= MAX_PRIME && field::is_prime(n))
}

fn zmodnz(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [n] = exact(args)?;
    let n = positive_u64(kernel, n, "ZmodnZ: <n>")?;
    let ring = match small_prime(n) {
        Some(p) => Ring::PrimeField(p),
        None => Ring::ZmodnZ(n),
    };
    kernel.alloc(Bag::Ring(ring)).map(Some)
}

fn zmodnz_obj(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [residue, n] = exact(args)?;
    let modulus = positive_u64(kernel, n, "ZmodnZObj: <n>")?;
    let residue = int_arg(kernel, residue, "ZmodnZObj", 2)?
        .mod_floor(&BigInt::from(modulus))
        .to_u64()
        .unwrap_or(0);
    if let Some(prime) = small_prime(modulus) {
        return Ok(Some(Ffe::from_residue(prime, residue).encode()));
    }
    kernel.alloc(Bag::ZmodnZ { residue, modulus }).map(Some)
}

fn galois_field(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [p] = exact(args)?;
    let prime = prime_arg(kernel, p, "GF")?;
    kernel.alloc(Bag::Ring(Ring::PrimeField(prime))).map(Some)
}

fn is_ring(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    Ok(Some(kernel.boolean(kernel.ring(obj).is_some())))
}

fn is_field(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    let field = matches!(
        kernel.ring(obj),
        Some(Ring::Rationals | Ring::Cyclotomics | Ring::PrimeField(_))
    );
    Ok(Some(kernel.boolean(field)))
}

fn is_zmodnz_obj(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [obj] = exact(args)?;
    Ok(Some(kernel.boolean(residue_class(kernel, obj).is_some())))
}

// ======================================================================
// Permutations and functions
// ======================================================================

fn perm_list(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [list] = exact(args)?;
    let items = list_arg(kernel, list, "PermList", 1)?;
    let degree = items.len();
    let mut seen = vec![false; degree];
    let mut images = Vec::with_capacity(degree);
    for item in items {
        let image = item
            .and_then(|obj| kernel.int(obj))
            .and_then(|n| n.to_usize())
            .filter(|&n| (1..=degree).contains(&n) && !seen[n - 1]);
        let Some(image) = image else {
            return Ok(Some(kernel.fail_obj()));
        };
        seen[image - 1] = true;
        images.push((image - 1) as u32);
    }
    kernel.alloc(Bag::perm(images)).map(Some)
}

fn list_perm(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let (perm, degree) = match *args {
        [perm] => (perm, None),
        [perm, degree] => (perm, Some(int_arg(kernel, degree, "ListPerm", 2)?)),
        _ => return Err(wrong_arity("1 or 2", args.len())),
    };
    let images = perm_arg(kernel, perm, "ListPerm")?;
    let degree = degree
        .and_then(|d| d.to_usize())
        .unwrap_or(images.len())
        .max(images.len());
    kernel.check_list_length(degree)?;
    let items = (0..degree)
        .map(|i| {
            let image = images.get(i).map_or(i as i64, |&img| i64::from(img));
            kernel.small_int(image + 1).map(Some)
        })
        .collect::<EngineResult<_>>()?;
    kernel.make_list(items).map(Some)
}

fn largest_moved_point(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [perm] = exact(args)?;
    let images = perm_arg(kernel, perm, "LargestMovedPoint")?;
    kernel.small_int(images.len() as i64).map(Some)
}

fn sign_perm(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [perm] = exact(args)?;
    let images = perm_arg(kernel, perm, "SignPerm")?;
    let mut visited = vec![false; images.len()];
    let mut cycles = 0;
    for start in 0..images.len() {
        if visited[start] {
            continue;
        }
        cycles += 1;
        let mut point = start;
        while !visited[point] {
            visited[point] = true;
            point = images[point] as usize;
        }
    }
    let sign = if (images.len() - cycles) % 2 == 0 { 1 } else { -1 };
    kernel.small_int(sign).map(Some)
}

fn name_function(kernel: &Kernel, args: &[Obj]) -> EngineResult<Option<Obj>> {
    let [func] = exact(args)?;
    let name = kernel
        .function_name(func)
        .ok_or_else(|| no_method_for("NameFunction", 1))?;
    kernel.make_string(name).map(Some)
}
