//! The canonicalizing simplifier.
//!
//! [`simplify`] rewrites an expression into a canonical form with the
//! same value in every environment. Canonical text is the identity
//! used for deduplication by the enumerator and the fold-body catalog,
//! so three properties are load-bearing:
//!
//! 1. **Soundness** — `eval(simplify(e), env) == eval(e, env)` for
//!    every environment.
//! 2. **Idempotence** — simplifying a canonical form changes nothing.
//! 3. **Determinism** — equal inputs canonicalize identically.
//!
//! Rewriting runs bottom-up: children are canonicalized first, then
//! the node's own rules fire, and rules that build new subtrees feed
//! them back through [`simplify`]. The result is memoized on the node,
//! either as an "already canonical" flag or as a pointer to the
//! rewrite, so shared subtrees pay for canonicalization once.
//!
//! The rule families:
//!
//! - constant folding on every operator, including full fold unrolling;
//! - identity, absorption and involution laws (`and a a`, `or 0 a`,
//!   `xor a (not a)`, `plus a a -> shl1 a`, ...);
//! - De Morgan pushes of `not` into `and`/`or`/`xor`/`if0` when a
//!   constant operand lets folding continue;
//! - shift distribution over bitwise operators and `if0` when a
//!   constant operand is present, shift-chain sorting
//!   (`shr4 (shr1 a) -> shr1 (shr4 a)`) and collapsing (four `shr1`
//!   into `shr4`, four `shr4` into `shr16`);
//! - known-bit proofs (see [`crate::analysis`]) that force a result
//!   constant, e.g. `(and a b)` where the zero masks cover every bit;
//! - `if0` condition resolution, branch convergence, and the
//!   `x`-condition specialization that substitutes `x := 0` into the
//!   then branch (only — substituting into the else branch would be
//!   unsound, it runs precisely when `x != 0`);
//! - fold reductions: a body ignoring both fold variables replaces the
//!   fold, `z` alone yields the init, dead value/init arguments are
//!   zeroed, uniform-byte constant values substitute `y`;
//! - commutative operand ordering by [`Expr::compare`].

use std::rc::Rc;

use crate::analysis::{always_has_one_bit, known_one, known_zero};
use crate::expr::{Expr, Id, Node};
use crate::ops::{BinaryOp, UnaryOp};
use crate::subst::substitute;

const FULL: u64 = u64::MAX;

/// Returns the canonical form of `e`, memoizing on the node.
pub fn simplify(e: &Rc<Expr>) -> Rc<Expr> {
    if e.is_canonical() {
        return e.clone();
    }
    if let Some(rewrite) = e.cached_rewrite() {
        return rewrite;
    }
    match build(e) {
        None => {
            e.set_canonical();
            e.clone()
        }
        Some(rewrite) => {
            e.store_rewrite(rewrite.clone());
            rewrite
        }
    }
}

/// Marks a freshly built node as canonical. Only for nodes whose
/// children are canonical and on which no rule can fire.
fn canon(e: Rc<Expr>) -> Rc<Expr> {
    e.set_canonical();
    e
}

/// Computes the canonical rewrite of `e`, or `None` when `e` is
/// already canonical.
fn build(e: &Rc<Expr>) -> Option<Rc<Expr>> {
    match e.node() {
        Node::Const(_) | Node::Id(_) => None,
        Node::Lambda(body) => {
            let simplified = simplify(body);
            if Rc::ptr_eq(body, &simplified) {
                return None;
            }
            Some(canon(Expr::lambda(simplified)))
        }
        Node::If0 { .. } => build_if0(e),
        Node::Fold { .. } => build_fold(e),
        Node::Unary(UnaryOp::Not, arg) => build_not(arg),
        Node::Unary(op, arg) => build_shift(*op, arg),
        Node::Binary(BinaryOp::And, lhs, rhs) => build_and(lhs, rhs),
        Node::Binary(BinaryOp::Or, lhs, rhs) => build_or(lhs, rhs),
        Node::Binary(BinaryOp::Xor, lhs, rhs) => build_xor(lhs, rhs),
        Node::Binary(BinaryOp::Plus, lhs, rhs) => build_plus(lhs, rhs),
    }
}

fn build_if0(e: &Rc<Expr>) -> Option<Rc<Expr>> {
    let Node::If0 {
        cond,
        then_body,
        else_body,
    } = e.node()
    else {
        unreachable!("build_if0 on non-if0 node");
    };
    let s_cond = simplify(cond);

    if let Some(value) = s_cond.as_const() {
        return Some(if value == 0 {
            simplify(then_body)
        } else {
            simplify(else_body)
        });
    }

    // The condition varies but provably never hits zero.
    if always_has_one_bit(&s_cond) {
        return Some(simplify(else_body));
    }

    let s_then = simplify(then_body);
    let s_else = simplify(else_body);

    // (if0 x A B): inside A we know x == 0, so specialize it. The else
    // branch sees x != 0 and must stay untouched; its specialization
    // is computed only to detect that both branches agree.
    if s_cond.as_id() == Some(Id::X) {
        let sub_then = match substitute(&s_then, Id::X, 0) {
            Some(t) => simplify(&t),
            None => s_then.clone(),
        };
        let sub_else = match substitute(&s_else, Id::X, 0) {
            Some(t) => simplify(&t),
            None => s_else.clone(),
        };
        if *sub_then == *sub_else {
            return Some(s_else);
        }
        return Some(canon(Expr::if0(s_cond, sub_then, s_else)));
    }

    // (if0 c A A) -> A
    if *s_then == *s_else {
        return Some(s_then);
    }

    if Rc::ptr_eq(cond, &s_cond) && Rc::ptr_eq(then_body, &s_then) && Rc::ptr_eq(else_body, &s_else)
    {
        return None;
    }
    Some(canon(Expr::if0(s_cond, s_then, s_else)))
}

fn build_fold(e: &Rc<Expr>) -> Option<Rc<Expr>> {
    let Node::Fold {
        value,
        init,
        body,
        tfold,
    } = e.node()
    else {
        unreachable!("build_fold on non-fold node");
    };

    if *tfold {
        // The implied x/0 arguments are fixed; only the body rewrites.
        let s_body = simplify(body);
        if Rc::ptr_eq(body, &s_body) {
            return None;
        }
        return Some(canon(Expr::tfold(s_body)));
    }

    let mut s_value = simplify(value);
    let mut s_init = simplify(init);
    let mut s_body = simplify(body);

    if let Some(v) = s_value.as_const() {
        if !s_body.has_z() {
            // The accumulator is dead: only the final iteration's byte
            // survives, and that is the top byte of the folded value.
            if let Some(sub) = substitute(&s_body, Id::Y, v >> 56) {
                s_body = simplify(&sub);
            }
        } else {
            let byte = v & 0xFF;
            let uniform = (1..8).all(|i| (v >> (i * 8)) & 0xFF == byte);
            if uniform {
                if let Some(sub) = substitute(&s_body, Id::Y, byte) {
                    s_body = simplify(&sub);
                }
            }
        }
    }

    // A body ignoring both fold variables is the result itself: every
    // iteration overwrites the accumulator with the same value.
    if !s_body.in_fold() {
        return Some(s_body);
    }

    // (fold v i (lambda (y z) z)) -> i
    if s_body.as_id() == Some(Id::Z) {
        return Some(s_init);
    }

    // Dead arguments decay to the cheapest constant.
    if !s_body.has_y() {
        s_value = Expr::constant(0);
    }
    if !s_body.has_z() {
        s_init = Expr::constant(0);
    }

    // Both arguments constant: unroll all eight iterations.
    if let (Some(value_const), Some(init_const)) = (s_value.as_const(), s_init.as_const()) {
        let mut v = value_const;
        let mut acc = init_const;
        let mut unrolled = true;
        for _ in 0..8 {
            let step = if s_body.has_z() {
                match substitute(&s_body, Id::Z, acc) {
                    Some(sub) => simplify(&sub),
                    None => s_body.clone(),
                }
            } else {
                s_body.clone()
            };
            let step = if step.has_y() {
                match substitute(&step, Id::Y, v & 0xFF) {
                    Some(sub) => simplify(&sub),
                    None => step,
                }
            } else {
                step
            };
            match step.as_const() {
                Some(folded) => acc = folded,
                None => {
                    unrolled = false;
                    break;
                }
            }
            v >>= 8;
        }
        if unrolled {
            return Some(Expr::constant(acc));
        }
    }

    if Rc::ptr_eq(value, &s_value) && Rc::ptr_eq(init, &s_init) && Rc::ptr_eq(body, &s_body) {
        return None;
    }
    Some(canon(Expr::fold(s_value, s_init, s_body)))
}

fn build_not(arg: &Rc<Expr>) -> Option<Rc<Expr>> {
    let s_arg = simplify(arg);

    if let Some(value) = s_arg.as_const() {
        return Some(Expr::constant(!value));
    }

    // (not (not a)) -> a
    if let Some(inner) = s_arg.as_unary(UnaryOp::Not) {
        return Some(inner.clone());
    }

    match s_arg.node() {
        // (not (and a b)) -> (or (not a) (not b)), when a constant or an
        // inner negation lets the push make progress.
        Node::Binary(BinaryOp::And, lhs, rhs) => {
            if let Some(value) = lhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Or,
                    Expr::constant(!value),
                    Expr::unary(UnaryOp::Not, rhs.clone()),
                )));
            }
            if let Some(value) = rhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Or,
                    Expr::unary(UnaryOp::Not, lhs.clone()),
                    Expr::constant(!value),
                )));
            }
            if let Some(inner) = lhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Or,
                    inner.clone(),
                    Expr::unary(UnaryOp::Not, rhs.clone()),
                )));
            }
            if let Some(inner) = rhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Or,
                    Expr::unary(UnaryOp::Not, lhs.clone()),
                    inner.clone(),
                )));
            }
        }

        // (not (or a b)) -> (and (not a) (not b)), same conditions.
        Node::Binary(BinaryOp::Or, lhs, rhs) => {
            if let Some(value) = lhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::And,
                    Expr::constant(!value),
                    Expr::unary(UnaryOp::Not, rhs.clone()),
                )));
            }
            if let Some(value) = rhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::And,
                    Expr::unary(UnaryOp::Not, lhs.clone()),
                    Expr::constant(!value),
                )));
            }
            if let Some(inner) = lhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::And,
                    inner.clone(),
                    Expr::unary(UnaryOp::Not, rhs.clone()),
                )));
            }
            if let Some(inner) = rhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::And,
                    Expr::unary(UnaryOp::Not, lhs.clone()),
                    inner.clone(),
                )));
            }
        }

        // (not (xor a b)) -> (xor (not a) b); the negation lands on a
        // constant or cancels an inner negation.
        Node::Binary(BinaryOp::Xor, lhs, rhs) => {
            if let Some(value) = lhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Xor,
                    Expr::constant(!value),
                    rhs.clone(),
                )));
            }
            if let Some(value) = rhs.as_const() {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Xor,
                    lhs.clone(),
                    Expr::constant(!value),
                )));
            }
            if let Some(inner) = lhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Xor,
                    inner.clone(),
                    rhs.clone(),
                )));
            }
            if let Some(inner) = rhs.as_unary(UnaryOp::Not) {
                return Some(simplify(&Expr::binary(
                    BinaryOp::Xor,
                    lhs.clone(),
                    inner.clone(),
                )));
            }
        }

        // (not (if0 c a b)) -> (if0 c (not a) (not b)) when a branch is
        // constant, so at least one negation folds away.
        Node::If0 {
            cond,
            then_body,
            else_body,
        } => {
            if then_body.as_const().is_some() || else_body.as_const().is_some() {
                return Some(simplify(&Expr::if0(
                    cond.clone(),
                    Expr::unary(UnaryOp::Not, then_body.clone()),
                    Expr::unary(UnaryOp::Not, else_body.clone()),
                )));
            }
        }

        _ => {}
    }

    if Rc::ptr_eq(arg, &s_arg) {
        return None;
    }
    Some(canon(Expr::unary(UnaryOp::Not, s_arg)))
}

/// Whether the known-zero mask of the argument forces the shifted
/// result to zero.
fn shift_forces_zero(op: UnaryOp, zero_mask: u64) -> bool {
    match op {
        UnaryOp::Shl1 => (zero_mask << 1) | 1 == FULL,
        UnaryOp::Shr1 => (zero_mask >> 1) | (1 << 63) == FULL,
        UnaryOp::Shr4 => (zero_mask >> 4) | (0xF << 60) == FULL,
        UnaryOp::Shr16 => (zero_mask >> 16) | (0xFFFF << 48) == FULL,
        UnaryOp::Not => false,
    }
}

fn build_shift(op: UnaryOp, arg: &Rc<Expr>) -> Option<Rc<Expr>> {
    let s_arg = simplify(arg);

    if let Some(value) = s_arg.as_const() {
        return Some(Expr::constant(op.apply(value)));
    }

    if shift_forces_zero(op, known_zero(&s_arg)) {
        return Some(Expr::constant(0));
    }

    // Keep right-shift chains sorted (shr1 outermost, shr16 innermost)
    // and collapse runs of four.
    match op {
        UnaryOp::Shr1 => {
            if let Some(third) = s_arg
                .as_unary(UnaryOp::Shr1)
                .and_then(|a| a.as_unary(UnaryOp::Shr1))
                .and_then(|a| a.as_unary(UnaryOp::Shr1))
            {
                return Some(simplify(&Expr::unary(UnaryOp::Shr4, third.clone())));
            }
        }
        UnaryOp::Shr4 => {
            if let Some(inner) = s_arg.as_unary(UnaryOp::Shr1) {
                return Some(canon(Expr::unary(
                    UnaryOp::Shr1,
                    simplify(&Expr::unary(UnaryOp::Shr4, inner.clone())),
                )));
            }
            if let Some(third) = s_arg
                .as_unary(UnaryOp::Shr4)
                .and_then(|a| a.as_unary(UnaryOp::Shr4))
                .and_then(|a| a.as_unary(UnaryOp::Shr4))
            {
                return Some(simplify(&Expr::unary(UnaryOp::Shr16, third.clone())));
            }
        }
        UnaryOp::Shr16 => {
            if let Some(inner) = s_arg.as_unary(UnaryOp::Shr1) {
                return Some(canon(Expr::unary(
                    UnaryOp::Shr1,
                    simplify(&Expr::unary(UnaryOp::Shr16, inner.clone())),
                )));
            }
            if let Some(inner) = s_arg.as_unary(UnaryOp::Shr4) {
                return Some(canon(Expr::unary(
                    UnaryOp::Shr4,
                    simplify(&Expr::unary(UnaryOp::Shr16, inner.clone())),
                )));
            }
        }
        UnaryOp::Shl1 | UnaryOp::Not => {}
    }

    // Distribute the shift when a constant operand can absorb it.
    match s_arg.node() {
        Node::Binary(bop @ (BinaryOp::And | BinaryOp::Or | BinaryOp::Xor), lhs, rhs) => {
            if lhs.as_const().is_some() || rhs.as_const().is_some() {
                return Some(simplify(&Expr::binary(
                    *bop,
                    Expr::unary(op, lhs.clone()),
                    Expr::unary(op, rhs.clone()),
                )));
            }
        }
        Node::If0 {
            cond,
            then_body,
            else_body,
        } => {
            if then_body.as_const().is_some() || else_body.as_const().is_some() {
                return Some(simplify(&Expr::if0(
                    cond.clone(),
                    Expr::unary(op, then_body.clone()),
                    Expr::unary(op, else_body.clone()),
                )));
            }
        }
        _ => {}
    }

    if Rc::ptr_eq(arg, &s_arg) {
        return None;
    }
    Some(canon(Expr::unary(op, s_arg)))
}

fn build_and(lhs: &Rc<Expr>, rhs: &Rc<Expr>) -> Option<Rc<Expr>> {
    // An annihilating operand makes the other side irrelevant, so skip
    // simplifying it.
    if lhs.as_const() == Some(0) || rhs.as_const() == Some(0) {
        return Some(Expr::constant(0));
    }

    let s1 = simplify(lhs);
    if s1.as_const() == Some(0) {
        return Some(Expr::constant(0));
    }
    let s2 = simplify(rhs);
    if s2.as_const() == Some(0) {
        return Some(Expr::constant(0));
    }

    if known_zero(&s1) | known_zero(&s2) == FULL {
        return Some(Expr::constant(0));
    }

    // (and ~0 a) -> a
    if s1.as_const() == Some(FULL) {
        return Some(s2);
    }
    if s2.as_const() == Some(FULL) {
        return Some(s1);
    }

    // (and (not a) a) -> 0
    if let Some(inner) = s1.as_unary(UnaryOp::Not) {
        if **inner == *s2 {
            return Some(Expr::constant(0));
        }
    }
    if let Some(inner) = s2.as_unary(UnaryOp::Not) {
        if **inner == *s1 {
            return Some(Expr::constant(0));
        }
    }

    if let (Some(a), Some(b)) = (s1.as_const(), s2.as_const()) {
        return Some(Expr::constant(a & b));
    }

    let cmp = s1.compare(&s2);

    // (and a a) -> a
    if cmp == std::cmp::Ordering::Equal {
        return Some(s1);
    }

    let (a, b) = if cmp == std::cmp::Ordering::Greater {
        (s2, s1)
    } else {
        (s1, s2)
    };
    if Rc::ptr_eq(lhs, &a) && Rc::ptr_eq(rhs, &b) {
        return None;
    }
    Some(canon(Expr::binary(BinaryOp::And, a, b)))
}

fn build_or(lhs: &Rc<Expr>, rhs: &Rc<Expr>) -> Option<Rc<Expr>> {
    if lhs.as_const() == Some(FULL) || rhs.as_const() == Some(FULL) {
        return Some(Expr::constant(FULL));
    }

    let s1 = simplify(lhs);
    if s1.as_const() == Some(FULL) {
        return Some(Expr::constant(FULL));
    }
    let s2 = simplify(rhs);
    if s2.as_const() == Some(FULL) {
        return Some(Expr::constant(FULL));
    }

    if known_one(&s1) | known_one(&s2) == FULL {
        return Some(Expr::constant(FULL));
    }

    // (or 0 a) -> a
    if s1.as_const() == Some(0) {
        return Some(s2);
    }
    if s2.as_const() == Some(0) {
        return Some(s1);
    }

    if let (Some(a), Some(b)) = (s1.as_const(), s2.as_const()) {
        return Some(Expr::constant(a | b));
    }

    // (or (not a) a) -> ~0
    if let Some(inner) = s1.as_unary(UnaryOp::Not) {
        if **inner == *s2 {
            return Some(Expr::constant(FULL));
        }
    }
    if let Some(inner) = s2.as_unary(UnaryOp::Not) {
        if **inner == *s1 {
            return Some(Expr::constant(FULL));
        }
    }

    // Absorption into an existing or-chain, in both orientations.
    if let Some(result) = or_chain(&s1, &s2) {
        return Some(result);
    }
    if let Some(result) = or_chain(&s2, &s1) {
        return Some(result);
    }

    let cmp = s1.compare(&s2);

    // (or a a) -> a
    if cmp == std::cmp::Ordering::Equal {
        return Some(s1);
    }

    let (a, b) = if cmp == std::cmp::Ordering::Greater {
        (s2, s1)
    } else {
        (s1, s2)
    };
    if Rc::ptr_eq(lhs, &a) && Rc::ptr_eq(rhs, &b) {
        return None;
    }
    Some(canon(Expr::binary(BinaryOp::Or, a, b)))
}

/// Rules for `(or chain other)` where `chain` is itself an `or`:
/// absorption of a repeated operand, constant merging, and complement
/// detection across the chain.
fn or_chain(chain: &Rc<Expr>, other: &Rc<Expr>) -> Option<Rc<Expr>> {
    let (a, b) = chain.as_binary(BinaryOp::Or)?;

    if **a == **other || **b == **other {
        return Some(chain.clone());
    }

    if let (Some(v1), Some(v2)) = (a.as_const(), other.as_const()) {
        return Some(simplify(&Expr::binary(
            BinaryOp::Or,
            Expr::constant(v1 | v2),
            b.clone(),
        )));
    }
    if let (Some(v1), Some(v2)) = (b.as_const(), other.as_const()) {
        return Some(simplify(&Expr::binary(
            BinaryOp::Or,
            Expr::constant(v1 | v2),
            a.clone(),
        )));
    }

    if let Some(inner) = other.as_unary(UnaryOp::Not) {
        if **inner == **a || **inner == **b {
            return Some(Expr::constant(FULL));
        }
    }
    if let Some(inner) = a.as_unary(UnaryOp::Not) {
        if **inner == **other {
            return Some(Expr::constant(FULL));
        }
    }
    if let Some(inner) = b.as_unary(UnaryOp::Not) {
        if **inner == **other {
            return Some(Expr::constant(FULL));
        }
    }

    None
}

fn build_xor(lhs: &Rc<Expr>, rhs: &Rc<Expr>) -> Option<Rc<Expr>> {
    let s1 = simplify(lhs);
    let s2 = simplify(rhs);

    // (xor a a) -> 0
    let cmp = s1.compare(&s2);
    if cmp == std::cmp::Ordering::Equal {
        return Some(Expr::constant(0));
    }

    // Bitwise-provable equality or complement across all 64 bits.
    let (z1, o1) = (known_zero(&s1), known_one(&s1));
    let (z2, o2) = (known_zero(&s2), known_one(&s2));
    if (z1 & z2) | (o1 & o2) == FULL {
        return Some(Expr::constant(0));
    }
    if (z1 & o2) | (o1 & z2) == FULL {
        return Some(Expr::constant(FULL));
    }

    // (xor (not a) a) -> ~0
    if let Some(inner) = s1.as_unary(UnaryOp::Not) {
        if **inner == *s2 {
            return Some(Expr::constant(FULL));
        }
    }
    if let Some(inner) = s2.as_unary(UnaryOp::Not) {
        if **inner == *s1 {
            return Some(Expr::constant(FULL));
        }
    }

    if let (Some(a), Some(b)) = (s1.as_const(), s2.as_const()) {
        return Some(Expr::constant(a ^ b));
    }

    if let Some(value) = s1.as_const() {
        // (xor 0 a) -> a
        if value == 0 {
            return Some(s2);
        }
        // (xor ~0 a) -> (not a)
        if value == FULL {
            return Some(simplify(&Expr::unary(UnaryOp::Not, s2)));
        }
    }
    if let Some(value) = s2.as_const() {
        if value == 0 {
            return Some(s1);
        }
        if value == FULL {
            return Some(simplify(&Expr::unary(UnaryOp::Not, s1)));
        }
    }

    // (xor (xor a b) a) -> b
    if let Some((a, b)) = s1.as_binary(BinaryOp::Xor) {
        if **a == *s2 {
            return Some(b.clone());
        }
        if **b == *s2 {
            return Some(a.clone());
        }
    }
    if let Some((a, b)) = s2.as_binary(BinaryOp::Xor) {
        if **a == *s1 {
            return Some(b.clone());
        }
        if **b == *s1 {
            return Some(a.clone());
        }
    }

    let (a, b) = if cmp == std::cmp::Ordering::Greater {
        (s2, s1)
    } else {
        (s1, s2)
    };
    if Rc::ptr_eq(lhs, &a) && Rc::ptr_eq(rhs, &b) {
        return None;
    }
    Some(canon(Expr::binary(BinaryOp::Xor, a, b)))
}

fn build_plus(lhs: &Rc<Expr>, rhs: &Rc<Expr>) -> Option<Rc<Expr>> {
    let s1 = simplify(lhs);
    let s2 = simplify(rhs);

    if let (Some(a), Some(b)) = (s1.as_const(), s2.as_const()) {
        return Some(Expr::constant(a.wrapping_add(b)));
    }

    // (plus (not a) a) -> ~0
    if let Some(inner) = s1.as_unary(UnaryOp::Not) {
        if **inner == *s2 {
            return Some(Expr::constant(FULL));
        }
    }
    if let Some(inner) = s2.as_unary(UnaryOp::Not) {
        if **inner == *s1 {
            return Some(Expr::constant(FULL));
        }
    }

    // (plus 0 a) -> a
    if s1.as_const() == Some(0) {
        return Some(s2);
    }
    if s2.as_const() == Some(0) {
        return Some(s1);
    }

    let cmp = s1.compare(&s2);

    // (plus a a) -> (shl1 a)
    if cmp == std::cmp::Ordering::Equal {
        return Some(simplify(&Expr::unary(UnaryOp::Shl1, s1)));
    }

    let (a, b) = if cmp == std::cmp::Ordering::Greater {
        (s2, s1)
    } else {
        (s1, s2)
    };
    if Rc::ptr_eq(lhs, &a) && Rc::ptr_eq(rhs, &b) {
        return None;
    }
    Some(canon(Expr::binary(BinaryOp::Plus, a, b)))
}
