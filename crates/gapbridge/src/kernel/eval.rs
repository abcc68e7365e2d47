//! Evaluator for the kernel's own printed syntax.
//!
//! Covers what `Print` produces plus ordinary expressions: integers,
//! floats, strings, characters, lists with holes, `rec( ... )`, permutations
//! in cycle notation, global names, calls, element access, unary minus and
//! `+ - * / mod ^`. Expressions are evaluated while they are parsed.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{Bag, Kernel, arith};
use crate::engine::{BinaryOp, Engine, EngineError, EngineResult, MAX_DIRECT_ARGS, Obj};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(BigInt),
    Float(f64),
    Str(Vec<u8>),
    Char(u8),
    Ident(String),
    Punct(&'static str),
}

fn syntax_error(message: impl std::fmt::Display) -> EngineError {
    EngineError::Failed(format!("Syntax error: {message}"))
}

const PUNCTUATION: &[&str] = &[":=", "[", "]", "(", ")", ",", "+", "-", "*", "/", "^", ";", "."];

fn escape(bytes: &[u8], pos: &mut usize) -> EngineResult<u8> {
    let byte = *bytes.get(*pos).ok_or_else(|| syntax_error("unterminated escape"))?;
    *pos += 1;
    Ok(match byte {
        b'n' => b'\n',
        b't' => b'\t',
        b'r' => b'\r',
        b'0'..=b'7' => {
            let digits = bytes
                .get(*pos - 1..*pos + 2)
                .filter(|digits| digits.iter().all(|d| (b'0'..=b'7').contains(d)))
                .ok_or_else(|| syntax_error("malformed octal escape"))?;
            *pos += 2;
            digits.iter().fold(0u8, |acc, d| acc.wrapping_mul(8).wrapping_add(d - b'0'))
        }
        other => other,
    })
}

fn tokenize(text: &str) -> EngineResult<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let byte = bytes[pos];
        if byte.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if byte == b'#' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if byte.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let mut float = false;
            if pos < bytes.len() && bytes[pos] == b'.' && bytes.get(pos + 1) != Some(&b'.') {
                float = true;
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
                float = true;
                pos += 1;
                if pos < bytes.len() && matches!(bytes[pos], b'+' | b'-') {
                    pos += 1;
                }
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            let literal = &text[start..pos];
            tokens.push(if float {
                Token::Float(
                    literal
                        .parse()
                        .map_err(|_| syntax_error(format_args!("bad float literal {literal}")))?,
                )
            } else {
                Token::Int(
                    literal
                        .parse()
                        .map_err(|_| syntax_error(format_args!("bad integer literal {literal}")))?,
                )
            });
            continue;
        }
        if byte.is_ascii_alphabetic() || byte == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push(Token::Ident(text[start..pos].to_owned()));
            continue;
        }
        if byte == b'"' {
            pos += 1;
            let mut value = Vec::new();
            loop {
                match bytes.get(pos) {
                    None => return Err(syntax_error("unterminated string")),
                    Some(b'"') => {
                        pos += 1;
                        break;
                    }
                    Some(b'\\') => {
                        pos += 1;
                        value.push(escape(bytes, &mut pos)?);
                    }
                    Some(&b) => {
                        value.push(b);
                        pos += 1;
                    }
                }
            }
            tokens.push(Token::Str(value));
            continue;
        }
        if byte == b'\'' {
            pos += 1;
            let value = match bytes.get(pos) {
                Some(b'\\') => {
                    pos += 1;
                    escape(bytes, &mut pos)?
                }
                Some(&b) => {
                    pos += 1;
                    b
                }
                None => return Err(syntax_error("unterminated character")),
            };
            if bytes.get(pos) != Some(&b'\'') {
                return Err(syntax_error("unterminated character"));
            }
            pos += 1;
            tokens.push(Token::Char(value));
            continue;
        }
        let punct = PUNCTUATION
            .iter()
            .find(|p| text[pos..].starts_with(**p))
            .ok_or_else(|| syntax_error(format_args!("unexpected character {:?}", char::from(byte))))?;
        tokens.push(Token::Punct(*punct));
        pos += punct.len();
    }
    Ok(tokens)
}

struct Parser<'k> {
    kernel: &'k Kernel,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == keyword)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, punct: &str) -> EngineResult<()> {
        if self.at(punct) {
            self.pos += 1;
            Ok(())
        } else {
            Err(syntax_error(format_args!("expected '{punct}'")))
        }
    }

    fn program(&mut self) -> EngineResult<Obj> {
        let value = self.expr()?;
        if self.at(";") {
            self.pos += 1;
        }
        match self.peek() {
            None => Ok(value),
            Some(token) => Err(syntax_error(format_args!("unexpected {token:?}"))),
        }
    }

    fn expr(&mut self) -> EngineResult<Obj> {
        let mut value = self.term()?;
        loop {
            let op = if self.at("+") {
                BinaryOp::Sum
            } else if self.at("-") {
                BinaryOp::Diff
            } else {
                return Ok(value);
            };
            self.pos += 1;
            let right = self.term()?;
            value = arith::binary(self.kernel, op, value, right)?;
        }
    }

    fn term(&mut self) -> EngineResult<Obj> {
        let mut value = self.unary()?;
        loop {
            let op = if self.at("*") {
                BinaryOp::Prod
            } else if self.at("/") {
                BinaryOp::Quo
            } else if self.at_keyword("mod") {
                BinaryOp::Mod
            } else {
                return Ok(value);
            };
            self.pos += 1;
            let right = self.unary()?;
            value = arith::binary(self.kernel, op, value, right)?;
        }
    }

    fn unary(&mut self) -> EngineResult<Obj> {
        if self.at("-") {
            self.pos += 1;
            let value = self.unary()?;
            let minus_one = self.kernel.small_int(-1)?;
            return arith::binary(self.kernel, BinaryOp::Prod, minus_one, value);
        }
        self.power()
    }

    fn power(&mut self) -> EngineResult<Obj> {
        let base = self.postfix()?;
        if self.at("^") {
            self.pos += 1;
            let exponent = self.unary()?;
            return arith::binary(self.kernel, BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn postfix(&mut self) -> EngineResult<Obj> {
        let mut value = self.atom()?;
        loop {
            if self.at("(") {
                self.pos += 1;
                let args = self.sequence(")")?;
                value = self.call(value, &args)?;
            } else if self.at("[") {
                self.pos += 1;
                let index = self.expr()?;
                self.expect("]")?;
                value = self.element(value, index)?;
            } else if self.at(".") {
                self.pos += 1;
                let Some(Token::Ident(name)) = self.next() else {
                    return Err(syntax_error("expected a component name after '.'"));
                };
                let rnam = self.kernel.rnam(&name);
                value = self.kernel.rec_elm(value, rnam).ok_or_else(|| {
                    EngineError::Failed(format!("Record Element: '<rec>.{name}' must have an assigned value"))
                })?;
            } else {
                return Ok(value);
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn sequence(&mut self, close: &str) -> EngineResult<Vec<Obj>> {
        let mut values = Vec::new();
        if self.at(close) {
            self.pos += 1;
            return Ok(values);
        }
        loop {
            values.push(self.expr()?);
            if self.at(",") {
                self.pos += 1;
            } else {
                self.expect(close)?;
                return Ok(values);
            }
        }
    }

    fn call(&self, func: Obj, args: &[Obj]) -> EngineResult<Obj> {
        let result = if args.len() <= MAX_DIRECT_ARGS {
            self.kernel.call_args(func, args)?
        } else {
            let list = self.kernel.make_list(args.iter().copied().map(Some).collect())?;
            self.kernel.call_list(func, list)?
        };
        result.ok_or_else(|| EngineError::Failed("Function Calls: <func> must return a value".to_owned()))
    }

    fn element(&self, list: Obj, index: Obj) -> EngineResult<Obj> {
        let pos = self
            .kernel
            .int(index)
            .and_then(|n| n.to_usize())
            .filter(|&n| n > 0)
            .ok_or_else(|| EngineError::Failed("List Element: <position> must be a positive integer".to_owned()))?;
        self.kernel.list_elm(list, pos).ok_or_else(|| {
            EngineError::Failed(format!("List Element: <list>[{pos}] must have an assigned value"))
        })
    }

    fn atom(&mut self) -> EngineResult<Obj> {
        let token = self.next().ok_or_else(|| syntax_error("unexpected end of input"))?;
        match token {
            Token::Int(value) => self.kernel.make_bigint(&value),
            Token::Float(value) => self.kernel.make_float(value),
            Token::Str(bytes) => self.kernel.alloc(Bag::String { bytes, mutable: true }),
            Token::Char(c) => self.kernel.make_char(c),
            Token::Punct("[") => self.list(),
            Token::Punct("(") => self.parenthesized(),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(self.kernel.true_obj()),
                "false" => Ok(self.kernel.false_obj()),
                "fail" => Ok(self.kernel.fail_obj()),
                "rec" => self.record(),
                _ => self
                    .kernel
                    .global(&name)
                    .ok_or_else(|| EngineError::Failed(format!("Variable: '{name}' must have a value"))),
            },
            other => Err(syntax_error(format_args!("unexpected {other:?}"))),
        }
    }

    fn list(&mut self) -> EngineResult<Obj> {
        let mut items = Vec::new();
        loop {
            if self.at("]") {
                self.pos += 1;
                break;
            }
            if self.at(",") {
                self.pos += 1;
                items.push(None);
                continue;
            }
            items.push(Some(self.expr()?));
            if self.at(",") {
                self.pos += 1;
            } else {
                self.expect("]")?;
                break;
            }
        }
        self.kernel.make_list(items)
    }

    fn record(&mut self) -> EngineResult<Obj> {
        self.expect("(")?;
        let record = self.kernel.new_record()?;
        if self.at(")") {
            self.pos += 1;
            return Ok(record);
        }
        loop {
            let Some(Token::Ident(name)) = self.next() else {
                return Err(syntax_error("expected a component name"));
            };
            self.expect(":=")?;
            let value = self.expr()?;
            self.kernel.rec_ass(record, self.kernel.rnam(&name), value)?;
            if self.at(",") {
                self.pos += 1;
            } else {
                self.expect(")")?;
                return Ok(record);
            }
        }
    }

    /// Grouping, the identity `()`, or a product of cycles.
    fn parenthesized(&mut self) -> EngineResult<Obj> {
        if self.at(")") {
            self.pos += 1;
            return self.kernel.alloc(Bag::perm(Vec::new()));
        }
        let first = self.expr()?;
        if self.at(")") {
            self.pos += 1;
            return Ok(first);
        }
        self.expect(",")?;
        let mut points = vec![first];
        points.extend(self.sequence(")")?);
        let mut images = self.cycle(&points)?;
        while self.at("(") {
            self.pos += 1;
            let points = self.sequence(")")?;
            images = arith::compose(&images, &self.cycle(&points)?);
        }
        self.kernel.alloc(Bag::perm(images))
    }

    fn cycle(&self, points: &[Obj]) -> EngineResult<Vec<u32>> {
        let points = points
            .iter()
            .map(|&point| {
                self.kernel
                    .int(point)
                    .and_then(|n| n.to_u32())
                    .filter(|&n| n > 0)
                    .map(|n| n - 1)
                    .ok_or_else(|| {
                        EngineError::Failed("Permutation: <expr> must be a positive integer".to_owned())
                    })
            })
            .collect::<EngineResult<Vec<u32>>>()?;
        let degree = points.iter().max().map_or(0, |&max| max as usize + 1);
        self.kernel.check_list_length(degree)?;
        let mut images: Vec<u32> = (0..degree as u32).collect();
        for (i, &point) in points.iter().enumerate() {
            if points[..i].contains(&point) {
                return Err(EngineError::Failed(
                    "Permutation: cycles must not contain a point twice".to_owned(),
                ));
            }
            images[point as usize] = points[(i + 1) % points.len()];
        }
        Ok(images)
    }
}

pub(crate) fn eval(kernel: &Kernel, text: &str) -> EngineResult<Obj> {
    let tokens = tokenize(text)?;
    Parser { kernel, tokens, pos: 0 }.program()
}
