//! BV evaluation semantics.
//!
//! Evaluation is total on well-formed expressions and works on 64-bit
//! unsigned values with wrapping arithmetic and logical shifts.
//!
//! `fold` iterates LSB-first over the eight bytes of its folded value:
//!
//! ```text
//! acc = eval(init);
//! v = eval(value);
//! for _ in 0..8 {
//!     acc = eval(body, { x, y: v & 0xFF, z: acc });
//!     v >>= 8;
//! }
//! acc
//! ```
//!
//! The byte order is observable and must not change.
//!
//! Nodes that do not reference `y` or `z` depend only on `x`, so each
//! node keeps a single-entry `(x, result)` memo that short-circuits
//! re-evaluation against the same input. The memo is written on every
//! evaluation but consulted only for such nodes.

use crate::expr::{Expr, Id, Node};

/// A variable environment. `y`/`z` are only meaningful inside a fold body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Env {
    pub x: u64,
    pub y: u64,
    pub z: u64,
}

impl Env {
    /// A top-level environment binding only `x`.
    pub fn with_x(x: u64) -> Env {
        Env { x, y: 0, z: 0 }
    }
}

/// Evaluates an expression under an environment.
pub fn eval(e: &Expr, env: Env) -> u64 {
    if !e.in_fold() {
        if let Some((x, result)) = e.eval_memo.get() {
            if x == env.x {
                return result;
            }
        }
    }

    let result = eval_node(e, env);
    e.eval_memo.set(Some((env.x, result)));
    result
}

/// Evaluates a whole program (or any y/z-free expression) against `x`.
pub fn eval_program(e: &Expr, x: u64) -> u64 {
    eval(e, Env::with_x(x))
}

fn eval_node(e: &Expr, env: Env) -> u64 {
    match e.node() {
        Node::Const(v) => *v,
        Node::Id(Id::X) => env.x,
        Node::Id(Id::Y) => env.y,
        Node::Id(Id::Z) => env.z,
        Node::Lambda(body) => eval(body, env),
        Node::If0 {
            cond,
            then_body,
            else_body,
        } => {
            if eval(cond, env) == 0 {
                eval(then_body, env)
            } else {
                eval(else_body, env)
            }
        }
        Node::Fold {
            value, init, body, ..
        } => {
            let value = eval(value, env);
            let init = eval(init, env);
            eval_fold_body(body, env.x, value, init)
        }
        Node::Unary(op, arg) => op.apply(eval(arg, env)),
        Node::Binary(op, lhs, rhs) => op.apply(eval(lhs, env), eval(rhs, env)),
    }
}

/// Runs the eight fold iterations of `body` directly, without a
/// surrounding fold node. The search driver and the tfold catalog
/// pre-pass use this to try bodies against candidate arguments.
pub fn eval_fold_body(body: &Expr, x: u64, value: u64, init: u64) -> u64 {
    let mut v = value;
    let mut acc = init;
    for _ in 0..8 {
        acc = eval(
            body,
            Env {
                x,
                y: v & 0xFF,
                z: acc,
            },
        );
        v >>= 8;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::ops::{BinaryOp, UnaryOp};

    #[test]
    fn leaves_and_unaries() {
        let x = Expr::id(Id::X);
        assert_eq!(eval_program(&x, 42), 42);
        assert_eq!(eval_program(&Expr::constant(7), 42), 7);
        assert_eq!(eval_program(&Expr::unary(UnaryOp::Not, x.clone()), 0), !0);
        assert_eq!(eval_program(&Expr::unary(UnaryOp::Shl1, x.clone()), 3), 6);
        assert_eq!(eval_program(&Expr::unary(UnaryOp::Shr1, x.clone()), 3), 1);
        assert_eq!(
            eval_program(&Expr::unary(UnaryOp::Shr4, x.clone()), 0xFF),
            0x0F
        );
        assert_eq!(
            eval_program(&Expr::unary(UnaryOp::Shr16, x), 0xDEAD_0000),
            0xDEAD
        );
    }

    #[test]
    fn plus_wraps_at_64_bits() {
        let e = Expr::binary(BinaryOp::Plus, Expr::id(Id::X), Expr::constant(1));
        assert_eq!(eval_program(&e, u64::MAX), 0);
    }

    #[test]
    fn if0_selects_on_zero() {
        let e = Expr::if0(Expr::id(Id::X), Expr::constant(10), Expr::constant(20));
        assert_eq!(eval_program(&e, 0), 10);
        assert_eq!(eval_program(&e, 5), 20);
    }

    #[test]
    fn fold_iterates_bytes_lsb_first() {
        // (fold x 0 (lambda (y z) (or (shl1 (shl1 (shl1 (shl1 z)))) y)))
        // shifts the accumulator by a nibble each round, so only byte
        // order determines the result.
        let shifted = (0..4).fold(Expr::id(Id::Z), |e, _| Expr::unary(UnaryOp::Shl1, e));
        let body = Expr::binary(BinaryOp::Or, shifted, Expr::id(Id::Y));
        let e = Expr::fold(Expr::id(Id::X), Expr::constant(0), body);
        // Bytes of x, low byte first, each ORed over the accumulator
        // shifted left by 4: the last (highest) byte lands unshifted.
        let x = 0x0102_0304_0506_0708u64;
        let mut acc = 0u64;
        for i in 0..8 {
            acc = (acc << 4) | ((x >> (8 * i)) & 0xFF);
        }
        assert_eq!(eval_program(&e, x), acc);
    }

    #[test]
    fn fold_xor_accumulates_bytes() {
        let body = Expr::binary(BinaryOp::Xor, Expr::id(Id::Y), Expr::id(Id::Z));
        let e = Expr::tfold(body);
        assert_eq!(eval_program(&e, 0x0807_0605_0403_0201), 0x08);
    }

    #[test]
    fn fold_body_helper_matches_fold_node() {
        let body = Expr::binary(BinaryOp::Plus, Expr::id(Id::Y), Expr::id(Id::Z));
        let fold = Expr::fold(Expr::id(Id::X), Expr::constant(1), body.clone());
        for x in [0u64, 1, 0xFFFF_FFFF_FFFF_FFFF, 0x0123_4567_89AB_CDEF] {
            assert_eq!(eval_program(&fold, x), eval_fold_body(&body, x, x, 1));
        }
    }

    #[test]
    fn memo_returns_same_result_for_same_x() {
        let e = Expr::binary(BinaryOp::Plus, Expr::id(Id::X), Expr::id(Id::X));
        assert_eq!(eval_program(&e, 21), 42);
        assert_eq!(eval_program(&e, 21), 42);
        assert_eq!(eval_program(&e, 3), 6);
        assert_eq!(eval_program(&e, 21), 42);
    }
}
