//! Recursive descent parser for BV surface syntax.
//!
//! Binder names are not fixed: `(lambda (v) v)` parses, with `v`
//! mapped to the kernel's X slot, and a fold's inner lambda maps its
//! two names to Y and Z. A scope of currently-bound spellings travels
//! down the recursion; referencing a name outside its scope is an
//! error, which also enforces the rule that y/z only occur inside a
//! fold body.

use std::rc::Rc;

use bitfold_base::{Result, Span, SpannedError};
use bitfold_kernel::{BinaryOp, Expr, Id, UnaryOp};

use crate::token::{Token, Tokenizer};

/// Spellings currently bound to the three variable slots.
#[derive(Clone, Copy, Default)]
struct Scope<'a> {
    x: Option<&'a str>,
    y: Option<&'a str>,
    z: Option<&'a str>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<Id> {
        if self.x == Some(name) {
            Some(Id::X)
        } else if self.y == Some(name) {
            Some(Id::Y)
        } else if self.z == Some(name) {
            Some(Id::Z)
        } else {
            None
        }
    }
}

/// Parses an expression, with `x`, `y`, `z` pre-bound to their usual
/// spellings so fragments like `(or y z)` parse on their own.
pub fn parse(source: &str) -> Result<Rc<Expr>> {
    let mut parser = Parser {
        tokens: Tokenizer::new(source),
    };
    let scope = Scope {
        x: Some("x"),
        y: Some("y"),
        z: Some("z"),
    };
    let expr = parser.expr(scope)?;
    if let Some((_, span)) = parser.tokens.peek() {
        return Err(SpannedError::new("trailing input after expression", span));
    }
    Ok(expr)
}

/// Parses a whole program and requires the `(lambda (..) ..)` wrapper.
pub fn parse_program(source: &str) -> Result<Rc<Expr>> {
    let expr = parse(source)?;
    if !matches!(expr.node(), bitfold_kernel::Node::Lambda(_)) {
        return Err(SpannedError::new(
            "expected a (lambda (x) ...) program",
            Span::new(0, source.len()),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Tokenizer<'a>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<(Token<'a>, Span)> {
        self.tokens
            .next()
            .ok_or_else(|| SpannedError::new("unexpected end of input", self.tokens.eof_span()))
    }

    fn expect_open(&mut self) -> Result<Span> {
        match self.next()? {
            (Token::Open, span) => Ok(span),
            (_, span) => Err(SpannedError::new("expected '('", span)),
        }
    }

    fn expect_close(&mut self) -> Result<Span> {
        match self.next()? {
            (Token::Close, span) => Ok(span),
            (_, span) => Err(SpannedError::new("expected ')'", span)),
        }
    }

    fn expect_atom(&mut self) -> Result<(&'a str, Span)> {
        match self.next()? {
            (Token::Atom(name), span) => Ok((name, span)),
            (_, span) => Err(SpannedError::new("expected an identifier", span)),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Span> {
        let (name, span) = self.expect_atom()?;
        if name != keyword {
            return Err(SpannedError::new(format!("expected '{}'", keyword), span));
        }
        Ok(span)
    }

    fn expr(&mut self, scope: Scope<'a>) -> Result<Rc<Expr>> {
        match self.next()? {
            (Token::Atom(atom), span) => self.leaf(atom, span, scope),
            (Token::Open, _) => {
                let (head, span) = self.expect_atom()?;
                let expr = self.form(head, span, scope)?;
                self.expect_close()?;
                Ok(expr)
            }
            (Token::Close, span) => Err(SpannedError::new("unexpected ')'", span)),
        }
    }

    fn leaf(&self, atom: &'a str, span: Span, scope: Scope<'a>) -> Result<Rc<Expr>> {
        if let Some(id) = scope.lookup(atom) {
            return Ok(Expr::id(id));
        }
        if atom.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let parsed = if let Some(hex) = atom.strip_prefix("0x").or_else(|| atom.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16)
            } else {
                atom.parse()
            };
            return match parsed {
                Ok(value) => Ok(Expr::constant(value)),
                Err(_) => Err(SpannedError::new(
                    format!("invalid constant: '{}'", atom),
                    span,
                )),
            };
        }
        Err(SpannedError::new(
            format!("unbound identifier: '{}'", atom),
            span,
        ))
    }

    fn form(&mut self, head: &'a str, span: Span, scope: Scope<'a>) -> Result<Rc<Expr>> {
        if head == "lambda" {
            self.expect_open()?;
            let (param, _) = self.expect_atom()?;
            self.expect_close()?;
            let body = self.expr(Scope {
                x: Some(param),
                ..scope
            })?;
            return Ok(Expr::lambda(body));
        }

        if head == "if0" {
            let cond = self.expr(scope)?;
            let then_body = self.expr(scope)?;
            let else_body = self.expr(scope)?;
            return Ok(Expr::if0(cond, then_body, else_body));
        }

        if head == "fold" {
            let value = self.expr(scope)?;
            let init = self.expr(scope)?;
            self.expect_open()?;
            self.expect_keyword("lambda")?;
            self.expect_open()?;
            let (byte_param, _) = self.expect_atom()?;
            let (acc_param, _) = self.expect_atom()?;
            self.expect_close()?;
            let body = self.expr(Scope {
                y: Some(byte_param),
                z: Some(acc_param),
                ..scope
            })?;
            self.expect_close()?;
            return Ok(Expr::fold(value, init, body));
        }

        let unary = match head {
            "not" => Some(UnaryOp::Not),
            "shl1" => Some(UnaryOp::Shl1),
            "shr1" => Some(UnaryOp::Shr1),
            "shr4" => Some(UnaryOp::Shr4),
            "shr16" => Some(UnaryOp::Shr16),
            _ => None,
        };
        if let Some(op) = unary {
            let arg = self.expr(scope)?;
            return Ok(Expr::unary(op, arg));
        }

        let binary = match head {
            "and" => Some(BinaryOp::And),
            "or" => Some(BinaryOp::Or),
            "xor" => Some(BinaryOp::Xor),
            "plus" => Some(BinaryOp::Plus),
            _ => None,
        };
        if let Some(op) = binary {
            let lhs = self.expr(scope)?;
            let rhs = self.expr(scope)?;
            return Ok(Expr::binary(op, lhs, rhs));
        }

        Err(SpannedError::new(
            format!("unknown operator: '{}'", head),
            span,
        ))
    }
}
