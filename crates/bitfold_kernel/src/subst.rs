//! Constant substitution.
//!
//! `substitute(e, id, value)` rewrites every reference to `id` into
//! the constant `value`. The return value doubles as a change signal:
//! `None` means no reference was found and the caller can keep the
//! original node (and skip re-canonicalization).

use std::rc::Rc;

use crate::expr::{Expr, Id, Node};

/// Replaces `Id(id)` with `Const(value)` throughout `e`.
///
/// Returns `None` when `e` contains no reference to `id`; shared
/// subtrees without a reference are reused, not copied.
pub fn substitute(e: &Rc<Expr>, id: Id, value: u64) -> Option<Rc<Expr>> {
    match e.node() {
        Node::Const(_) => None,
        Node::Id(name) => {
            if *name == id {
                Some(Expr::constant(value))
            } else {
                None
            }
        }
        Node::Lambda(body) => substitute(body, id, value).map(Expr::lambda),
        Node::If0 {
            cond,
            then_body,
            else_body,
        } => {
            let new_cond = substitute(cond, id, value);
            let new_then = substitute(then_body, id, value);
            let new_else = substitute(else_body, id, value);
            if new_cond.is_none() && new_then.is_none() && new_else.is_none() {
                return None;
            }
            Some(Expr::if0(
                new_cond.unwrap_or_else(|| cond.clone()),
                new_then.unwrap_or_else(|| then_body.clone()),
                new_else.unwrap_or_else(|| else_body.clone()),
            ))
        }
        Node::Fold {
            value: fold_value,
            init,
            body,
            tfold,
        } => {
            if *tfold {
                // The implied x/0 arguments stay implied.
                return substitute(body, id, value).map(Expr::tfold);
            }
            let new_value = substitute(fold_value, id, value);
            let new_init = substitute(init, id, value);
            let new_body = substitute(body, id, value);
            if new_value.is_none() && new_init.is_none() && new_body.is_none() {
                return None;
            }
            Some(Expr::fold(
                new_value.unwrap_or_else(|| fold_value.clone()),
                new_init.unwrap_or_else(|| init.clone()),
                new_body.unwrap_or_else(|| body.clone()),
            ))
        }
        Node::Unary(op, arg) => {
            substitute(arg, id, value).map(|arg| Expr::unary(*op, arg))
        }
        Node::Binary(op, lhs, rhs) => {
            let new_lhs = substitute(lhs, id, value);
            let new_rhs = substitute(rhs, id, value);
            if new_lhs.is_none() && new_rhs.is_none() {
                return None;
            }
            Some(Expr::binary(
                *op,
                new_lhs.unwrap_or_else(|| lhs.clone()),
                new_rhs.unwrap_or_else(|| rhs.clone()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_program;
    use crate::ops::{BinaryOp, UnaryOp};

    #[test]
    fn unchanged_when_id_absent() {
        let e = Expr::unary(UnaryOp::Not, Expr::id(Id::X));
        assert!(substitute(&e, Id::Y, 5).is_none());
    }

    #[test]
    fn replaces_all_occurrences() {
        let e = Expr::binary(BinaryOp::Plus, Expr::id(Id::X), Expr::id(Id::X));
        let s = substitute(&e, Id::X, 21).unwrap();
        assert_eq!(eval_program(&s, 0), 42);
        assert!(!s.has_x());
    }

    #[test]
    fn shares_untouched_subtrees() {
        let untouched = Expr::unary(UnaryOp::Shl1, Expr::constant(1));
        let e = Expr::binary(BinaryOp::Or, untouched.clone(), Expr::id(Id::Y));
        let s = substitute(&e, Id::Y, 0xFF).unwrap();
        let (lhs, _) = s.as_binary(BinaryOp::Or).unwrap();
        assert!(Rc::ptr_eq(lhs, &untouched));
    }

    #[test]
    fn substitutes_inside_fold_body() {
        let body = Expr::binary(BinaryOp::Or, Expr::id(Id::Y), Expr::id(Id::Z));
        let e = Expr::fold(Expr::id(Id::X), Expr::constant(0), body);
        let s = substitute(&e, Id::Y, 3).unwrap();
        // y := 3 in every iteration, so the fold ORs 3 into the accumulator.
        assert_eq!(eval_program(&s, 0), 3);
    }

    #[test]
    fn agrees_with_environment_binding() {
        let e = Expr::binary(
            BinaryOp::Xor,
            Expr::unary(UnaryOp::Shr4, Expr::id(Id::X)),
            Expr::constant(0x0F),
        );
        let s = substitute(&e, Id::X, 0xA5).unwrap();
        assert_eq!(eval_program(&s, 999), eval_program(&e, 0xA5));
    }
}
