//! Output capture: the text the kernel prints for an object.
//!
//! `Print` output is valid input for the evaluator, which is what the
//! textual pickling fallback relies on. `View` differs only where the kernel
//! has a shorter human-oriented form.

use std::fmt::Write;

use super::{Bag, Ffe, Kernel, MAX_NESTING, Ring};
use crate::engine::{Engine, Obj, RenderMode, Tnum};

pub(crate) fn render(kernel: &Kernel, obj: Obj, mode: RenderMode) -> String {
    let mut out = String::new();
    render_into(kernel, obj, mode, 0, &mut out);
    out
}

fn render_into(kernel: &Kernel, obj: Obj, mode: RenderMode, depth: usize, out: &mut String) {
    if depth > MAX_NESTING {
        out.push_str("...");
        return;
    }
    if let Some(ffe) = Ffe::decode(obj) {
        render_ffe(ffe, out);
        return;
    }
    if let Some(int) = kernel.int(obj) {
        let _ = write!(out, "{int}");
        return;
    }
    if let Some(items) = kernel.list_items(obj) {
        match kernel.string_bytes(obj) {
            Some(bytes) if !items.is_empty() || kernel.tnum(obj) == Tnum::String => quote_string(&bytes, out),
            _ => render_list(kernel, &items, mode, depth, out),
        }
        return;
    }
    if kernel.is_record(obj) {
        render_record(kernel, obj, mode, depth, out);
        return;
    }
    let Some(bag) = kernel.with_bag(obj, Bag::clone) else {
        out.push_str("<null>");
        return;
    };
    match bag {
        Bag::Rat { num, den } => {
            let _ = write!(out, "{num}/{den}");
        }
        Bag::Cyc { order, exponent } => {
            let _ = write!(out, "E({order})");
            if exponent != 1 {
                let _ = write!(out, "^{exponent}");
            }
        }
        Bag::Float(value) => render_float(value, out),
        Bag::True => out.push_str("true"),
        Bag::False => out.push_str("false"),
        Bag::Fail => out.push_str("fail"),
        Bag::Char(c) => {
            out.push('\'');
            escape_byte(c, b'\'', out);
            out.push('\'');
        }
        Bag::Function { name, .. } => match mode {
            RenderMode::View => {
                let _ = write!(out, "<Function \"{name}\">");
            }
            RenderMode::Print => out.push_str(name),
        },
        Bag::Perm2(_) | Bag::Perm4(_) => render_perm(&bag.perm_images().unwrap_or_default(), out),
        Bag::ZmodnZ { residue, modulus } => {
            let _ = write!(out, "ZmodnZObj( {residue}, {modulus} )");
        }
        Bag::Ring(ring) => render_ring(ring, mode, out),
        Bag::LargeInt { .. } | Bag::String { .. } | Bag::List { .. } | Bag::Record { .. } => {}
    }
}

fn render_ffe(ffe: Ffe, out: &mut String) {
    let prime = ffe.prime;
    match ffe.log {
        None => {
            let _ = write!(out, "0*Z({prime})");
        }
        Some(1) if prime > 2 => {
            let _ = write!(out, "Z({prime})");
        }
        Some(log) => {
            let _ = write!(out, "Z({prime})^{log}");
        }
    }
}

fn render_float(value: f64, out: &mut String) {
    let text = value.to_string();
    let bare = text.bytes().all(|b| b.is_ascii_digit() || b == b'-');
    out.push_str(&text);
    if bare {
        out.push('.');
    }
}

fn escape_byte(byte: u8, quote: u8, out: &mut String) {
    match byte {
        b'\n' => out.push_str("\\n"),
        b'\t' => out.push_str("\\t"),
        b'\r' => out.push_str("\\r"),
        b'\\' => out.push_str("\\\\"),
        b if b == quote => {
            out.push('\\');
            out.push(char::from(b));
        }
        b if b.is_ascii() && !b.is_ascii_control() => out.push(char::from(b)),
        b => {
            let _ = write!(out, "\\{b:03o}");
        }
    }
}

fn quote_string(bytes: &[u8], out: &mut String) {
    out.push('"');
    for &byte in bytes {
        escape_byte(byte, b'"', out);
    }
    out.push('"');
}

fn render_list(kernel: &Kernel, items: &[Option<Obj>], mode: RenderMode, depth: usize, out: &mut String) {
    out.push_str("[ ");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if let Some(item) = item {
            if i > 0 {
                out.push(' ');
            }
            render_into(kernel, *item, mode, depth + 1, out);
        }
    }
    out.push_str(" ]");
}

fn render_record(kernel: &Kernel, record: Obj, mode: RenderMode, depth: usize, out: &mut String) {
    out.push_str("rec( ");
    for (i, rnam) in kernel.rec_rnams(record).into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&kernel.rnam_name(rnam).unwrap_or_default());
        out.push_str(" := ");
        if let Some(value) = kernel.rec_elm(record, rnam) {
            render_into(kernel, value, mode, depth + 1, out);
        }
    }
    out.push_str(" )");
}

fn render_perm(images: &[u32], out: &mut String) {
    let mut seen = vec![false; images.len()];
    let mut any = false;
    for start in 0..images.len() {
        if seen[start] || images[start] as usize == start {
            continue;
        }
        any = true;
        out.push('(');
        let mut point = start;
        loop {
            seen[point] = true;
            let _ = write!(out, "{}", point + 1);
            point = images[point] as usize;
            if point == start {
                break;
            }
            out.push(',');
        }
        out.push(')');
    }
    if !any {
        out.push_str("()");
    }
}

fn render_ring(ring: Ring, mode: RenderMode, out: &mut String) {
    let _ = match (ring, mode) {
        (Ring::Integers, _) => write!(out, "Integers"),
        (Ring::Rationals, _) => write!(out, "Rationals"),
        (Ring::Cyclotomics, _) => write!(out, "Cyclotomics"),
        (Ring::PrimeField(p), _) => write!(out, "GF({p})"),
        (Ring::ZmodnZ(n), RenderMode::View) => write!(out, "(Integers mod {n})"),
        (Ring::ZmodnZ(n), RenderMode::Print) => write!(out, "ZmodnZ({n})"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn print(kernel: &Kernel, text: &str) -> String {
        kernel.enter();
        let obj = kernel.eval_string(text).unwrap();
        let printed = render(kernel, obj, RenderMode::Print);
        kernel.leave();
        printed
    }

    #[test]
    fn lists_show_holes() {
        let kernel = Kernel::new();
        assert_eq!(print(&kernel, "[1,,3]"), "[ 1,, 3 ]");
        assert_eq!(print(&kernel, "[]"), "[  ]");
    }

    #[test]
    fn permutations_use_cycle_notation() {
        let kernel = Kernel::new();
        assert_eq!(print(&kernel, "(1,2,3)(5,6)"), "(1,2,3)(5,6)");
        assert_eq!(print(&kernel, "(1,2)*(1,2)"), "()");
    }

    #[test]
    fn field_elements_and_roots() {
        let kernel = Kernel::new();
        assert_eq!(print(&kernel, "Z(5)^2"), "Z(5)^2");
        assert_eq!(print(&kernel, "0*Z(5)"), "0*Z(5)");
        assert_eq!(print(&kernel, "E(4)^3"), "E(4)^3");
        assert_eq!(print(&kernel, "E(4)^2"), "-1");
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        let kernel = Kernel::new();
        assert_eq!(print(&kernel, "\"a\\\"b\""), "\"a\\\"b\"");
        assert_eq!(print(&kernel, "rec( a := 1 )"), "rec( a := 1 )");
    }

    #[test]
    fn floats_always_carry_a_point() {
        let mut out = String::new();
        render_float(2.0, &mut out);
        assert_eq!(out, "2.");
    }
}
