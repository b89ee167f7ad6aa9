//! Conservative known-bit analysis.
//!
//! [`known_zero`] and [`known_one`] compute bit masks with a set bit
//! at position `i` only when the expression's value provably has a 0
//! (resp. 1) at `i` for every environment. The analysis is sound but
//! incomplete: positions it cannot decide are simply left clear, so
//! the simplifier uses the masks only to prove results constant,
//! never to rewrite toward weaker claims.
//!
//! Inside a fold body, `y` holds one byte of the folded value, so its
//! upper 56 bits are known zero.

use crate::expr::{Expr, Id};
use crate::ops::{BinaryOp, UnaryOp};

const FULL: u64 = u64::MAX;

/// Bits provably 0 in every evaluation of `e`.
pub fn known_zero(e: &Expr) -> u64 {
    if let Some(value) = e.as_const() {
        return !value;
    }

    if let Some(arg) = e.as_unary(UnaryOp::Not) {
        return known_one(arg);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shl1) {
        return (known_zero(arg) << 1) | 1;
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr1) {
        return (known_zero(arg) >> 1) | (1 << 63);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr4) {
        return (known_zero(arg) >> 4) | (0xF << 60);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr16) {
        return (known_zero(arg) >> 16) | (0xFFFF << 48);
    }

    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::And) {
        return known_zero(lhs) | known_zero(rhs);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::Or) {
        return known_zero(lhs) & known_zero(rhs);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::Xor) {
        return (known_zero(lhs) & known_zero(rhs)) | (known_one(lhs) & known_one(rhs));
    }

    // One byte of the folded value: the upper 56 bits are zero.
    if e.as_id() == Some(Id::Y) {
        return 0xFFFF_FFFF_FFFF_FF00;
    }

    if let Some((_, then_body, else_body)) = e.as_if0() {
        return known_zero(then_body) & known_zero(else_body);
    }

    0
}

/// Bits provably 1 in every evaluation of `e`.
pub fn known_one(e: &Expr) -> u64 {
    if let Some(value) = e.as_const() {
        return value;
    }

    if let Some(arg) = e.as_unary(UnaryOp::Not) {
        return known_zero(arg);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shl1) {
        return known_one(arg) << 1;
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr1) {
        return known_one(arg) >> 1;
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr4) {
        return known_one(arg) >> 4;
    }
    if let Some(arg) = e.as_unary(UnaryOp::Shr16) {
        return known_one(arg) >> 16;
    }

    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::And) {
        return known_one(lhs) & known_one(rhs);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::Or) {
        return known_one(lhs) | known_one(rhs);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::Xor) {
        return (known_zero(lhs) & known_one(rhs)) | (known_one(lhs) & known_zero(rhs));
    }

    if let Some((_, then_body, else_body)) = e.as_if0() {
        return known_one(then_body) & known_one(else_body);
    }

    0
}

/// True when some bit of `e` is provably 0, i.e. `e` can never be the
/// all-ones value.
pub fn always_has_zero_bit(e: &Expr) -> bool {
    if e.as_unary(UnaryOp::Shl1).is_some()
        || e.as_unary(UnaryOp::Shr1).is_some()
        || e.as_unary(UnaryOp::Shr4).is_some()
        || e.as_unary(UnaryOp::Shr16).is_some()
    {
        return true;
    }
    if let Some((_, then_body, else_body)) = e.as_if0() {
        return always_has_zero_bit(then_body) && always_has_zero_bit(else_body);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::And) {
        return always_has_zero_bit(lhs) || always_has_zero_bit(rhs);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Not) {
        return always_has_one_bit(arg);
    }
    known_zero(e) != 0
}

/// True when some bit of `e` is provably 1, i.e. `e` can never be 0.
/// The simplifier uses this to resolve `if0` conditions.
pub fn always_has_one_bit(e: &Expr) -> bool {
    if let Some((_, then_body, else_body)) = e.as_if0() {
        return always_has_one_bit(then_body) && always_has_one_bit(else_body);
    }
    if let Some((lhs, rhs)) = e.as_binary(BinaryOp::Or) {
        return always_has_one_bit(lhs) || always_has_one_bit(rhs);
    }
    if let Some(arg) = e.as_unary(UnaryOp::Not) {
        return always_has_zero_bit(arg);
    }
    known_one(e) != 0
}
