//! String formulas over scalar columns.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! ||   &&   == != < <= > >=   + -   * / %   unary - !   atoms
//! ```
//!
//! Atoms are numbers, `true`/`false`, column identifiers, parenthesized
//! formulas and calls to `abs sqrt log exp pow min max`. Every value is an
//! `f64`; booleans are 0/1 and any non-zero value is true. A formula whose
//! root is a comparison, a logical operator or a boolean literal binds as a
//! predicate; anything else binds as a scalar.

use std::sync::Arc;

use evloop_io::Slot;

use crate::error::ExprError;
use crate::evaluator::Evaluator;
use crate::kernel::{IntoKernel, Kernel, NumericCursor};
use crate::shape::{OutputKind, ParamType, Shape};

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Left and right binding power.
    fn power(self) -> (u8, u8) {
        match self {
            BinOp::Or => (1, 2),
            BinOp::And => (3, 4),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (5, 6),
            BinOp::Add | BinOp::Sub => (7, 8),
            BinOp::Mul | BinOp::Div | BinOp::Rem => (9, 10),
        }
    }

    fn is_boolean(self) -> bool {
        !matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }
}

const PREFIX_POWER: u8 = 11;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Bool(bool),
    Input(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

fn truth(x: f64) -> bool {
    x != 0.0
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Node {
    fn is_predicate(&self) -> bool {
        match self {
            Node::Bool(_) | Node::Not(_) => true,
            Node::Binary(op, _, _) => op.is_boolean(),
            _ => false,
        }
    }

    fn eval<R: Fn(usize) -> f64>(&self, read: &R) -> f64 {
        match self {
            Node::Num(x) => *x,
            Node::Bool(b) => flag(*b),
            Node::Input(i) => read(*i),
            Node::Neg(a) => -a.eval(read),
            Node::Not(a) => flag(!truth(a.eval(read))),
            Node::Binary(BinOp::And, a, b) => flag(truth(a.eval(read)) && truth(b.eval(read))),
            Node::Binary(BinOp::Or, a, b) => flag(truth(a.eval(read)) || truth(b.eval(read))),
            Node::Binary(op, a, b) => {
                let (l, r) = (a.eval(read), b.eval(read));
                match op {
                    BinOp::Eq => flag(l == r),
                    BinOp::Ne => flag(l != r),
                    BinOp::Lt => flag(l < r),
                    BinOp::Le => flag(l <= r),
                    BinOp::Gt => flag(l > r),
                    BinOp::Ge => flag(l >= r),
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Rem => l % r,
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                }
            }
            Node::Call(func, args) => {
                let x = args[0].eval(read);
                match func {
                    Func::Abs => x.abs(),
                    Func::Sqrt => x.sqrt(),
                    Func::Log => x.ln(),
                    Func::Exp => x.exp(),
                    Func::Pow => x.powf(args[1].eval(read)),
                    Func::Min => x.min(args[1].eval(read)),
                    Func::Max => x.max(args[1].eval(read)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    Not,
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text = &src[start..i];
            let value = text
                .parse::<f64>()
                .map_err(|_| format!("bad number '{text}'"))?;
            tokens.push(Token::Num(value));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(src[start..i].to_string()));
            continue;
        }
        let next = bytes.get(i + 1).map(|b| *b as char);
        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::Op(BinOp::And), 2),
            ('|', Some('|')) => (Token::Op(BinOp::Or), 2),
            ('=', Some('=')) => (Token::Op(BinOp::Eq), 2),
            ('!', Some('=')) => (Token::Op(BinOp::Ne), 2),
            ('<', Some('=')) => (Token::Op(BinOp::Le), 2),
            ('>', Some('=')) => (Token::Op(BinOp::Ge), 2),
            ('<', _) => (Token::Op(BinOp::Lt), 1),
            ('>', _) => (Token::Op(BinOp::Gt), 1),
            ('!', _) => (Token::Not, 1),
            ('+', _) => (Token::Op(BinOp::Add), 1),
            ('-', _) => (Token::Op(BinOp::Sub), 1),
            ('*', _) => (Token::Op(BinOp::Mul), 1),
            ('/', _) => (Token::Op(BinOp::Div), 1),
            ('%', _) => (Token::Op(BinOp::Rem), 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(format!("unexpected character '{c}' at offset {i}")),
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    inputs: Vec<String>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), String> {
        match self.bump() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(format!("expected {want:?}, found {t:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn input(&mut self, name: String) -> usize {
        match self.inputs.iter().position(|n| *n == name) {
            Some(i) => i,
            None => {
                self.inputs.push(name);
                self.inputs.len() - 1
            }
        }
    }

    fn expr(&mut self, min_power: u8) -> Result<Node, String> {
        let mut lhs = self.prefix()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let (left, right) = op.power();
            if left < min_power {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(right)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Node, String> {
        match self.bump() {
            Some(Token::Num(x)) => Ok(Node::Num(x)),
            Some(Token::Op(BinOp::Sub)) => Ok(Node::Neg(Box::new(self.expr(PREFIX_POWER)?))),
            Some(Token::Not) => Ok(Node::Not(Box::new(self.expr(PREFIX_POWER)?))),
            Some(Token::LParen) => {
                let inner = self.expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Node::Bool(true)),
                "false" => Ok(Node::Bool(false)),
                _ if self.peek() == Some(&Token::LParen) => self.call(name),
                _ => Ok(Node::Input(self.input(name))),
            },
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("unexpected end of input".into()),
        }
    }

    fn call(&mut self, name: String) -> Result<Node, String> {
        let func = Func::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.expr(0)?);
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        if args.len() != func.arity() {
            return Err(format!(
                "{name}() takes {} argument(s), got {}",
                func.arity(),
                args.len()
            ));
        }
        Ok(Node::Call(func, args))
    }
}

/// A parsed formula. Inputs are the referenced column names in order of
/// first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    root: Node,
    inputs: Vec<String>,
}

impl Formula {
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let fail = |message: String| ExprError::Formula {
            formula: src.to_string(),
            message,
        };
        let tokens = tokenize(src).map_err(fail)?;
        if tokens.is_empty() {
            return Err(fail("empty formula".into()));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            inputs: Vec::new(),
        };
        let root = parser.expr(0).map_err(fail)?;
        if let Some(t) = parser.peek() {
            return Err(fail(format!("unexpected trailing {t:?}")));
        }
        Ok(Self {
            source: src.trim().to_string(),
            root,
            inputs: parser.inputs,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn is_predicate(&self) -> bool {
        self.root.is_predicate()
    }

    pub fn output_kind(&self) -> OutputKind {
        if self.is_predicate() {
            OutputKind::Predicate
        } else {
            OutputKind::Scalar
        }
    }

    /// Evaluate against values given in `inputs()` order. `None` when fewer
    /// values than inputs are given.
    pub fn eval(&self, values: &[f64]) -> Option<f64> {
        if values.len() < self.inputs.len() {
            return None;
        }
        Some(self.root.eval(&|i| values[i]))
    }
}

impl IntoKernel<Formula> for Formula {
    fn into_kernel(self) -> Kernel {
        let shape = Shape::new(
            vec![ParamType::Numeric; self.inputs.len()],
            self.output_kind(),
        );
        let predicate = self.is_predicate();
        let formula = Arc::new(self);
        Kernel::from_parts(shape, move |slots: &[Slot]| {
            if slots.is_empty() {
                // No inputs: the formula is a constant.
                let value = formula.root.eval(&|_| 0.0);
                return Ok(if predicate {
                    let pass = truth(value);
                    Evaluator::Predicate(Box::new(move || pass))
                } else {
                    Evaluator::Scalar(Box::new(move || value))
                });
            }
            let cursors = slots
                .iter()
                .enumerate()
                .map(|(i, s)| NumericCursor::new(s).ok_or(i))
                .collect::<Result<Vec<_>, _>>()?;
            let formula = Arc::clone(&formula);
            Ok(if predicate {
                Evaluator::Predicate(Box::new(move || {
                    truth(formula.root.eval(&|i| cursors[i].get()))
                }))
            } else {
                Evaluator::Scalar(Box::new(move || formula.root.eval(&|i| cursors[i].get())))
            })
        })
    }
}
