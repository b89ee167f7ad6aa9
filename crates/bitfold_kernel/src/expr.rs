//! The immutable BV expression tree.
//!
//! Every node caches its structural attributes at construction time:
//! BV-size, the set of operator kinds occurring in the subtree, the
//! referenced variables, and whether a `fold` occurs. The attributes
//! never change afterwards, so enumeration and search read them
//! without walking the tree.
//!
//! Nodes are shared by reference counting. The per-size tables built
//! during enumeration own their expressions; search tables and the
//! canonical-form memo hold additional references. Two memo cells use
//! interior mutability and are invisible to equality and ordering:
//!
//! - the canonical form computed by the simplifier (a flag when the
//!   node is its own canonical form, a pointer otherwise — a node
//!   never points at itself, which would leak the reference cycle);
//! - a single-entry evaluation cache keyed by `x`, consulted only for
//!   nodes that do not reference `y`/`z`.
//!
//! # Size accounting
//!
//! Leaf nodes cost 1; `lambda` and unary operators cost 1 plus the
//! child; binary operators and `if0` cost 1 plus the children; `fold`
//! costs 2 plus its three children. A top-level fold (`tfold`) is
//! stored with its implied `x`/`0` arguments, so its cost of 4 plus
//! the body falls out of the ordinary fold accounting.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::ops::{BinaryOp, OpKind, OpSet, UnaryOp};

/// A variable identifier. `Y` and `Z` are only bound inside a fold body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Id {
    X,
    Y,
    Z,
}

impl Id {
    /// The surface-syntax name of this identifier.
    pub fn name(self) -> &'static str {
        match self {
            Id::X => "x",
            Id::Y => "y",
            Id::Z => "z",
        }
    }

    fn var_bit(self) -> u8 {
        match self {
            Id::X => VAR_X,
            Id::Y => VAR_Y,
            Id::Z => VAR_Z,
        }
    }
}

pub(crate) const VAR_X: u8 = 1;
pub(crate) const VAR_Y: u8 = 2;
pub(crate) const VAR_Z: u8 = 4;

/// The shape of an expression node.
#[derive(Debug)]
pub enum Node {
    /// A 64-bit constant. Programs may only spell `0` and `1`, but
    /// constant folding produces arbitrary values.
    Const(u64),
    /// A variable reference.
    Id(Id),
    /// The program wrapper `(lambda (x) body)`. Only at the root.
    Lambda(Rc<Expr>),
    /// `(if0 cond then else)` — zero test.
    If0 {
        cond: Rc<Expr>,
        then_body: Rc<Expr>,
        else_body: Rc<Expr>,
    },
    /// `(fold value init (lambda (y z) body))`.
    ///
    /// `tfold` marks the top-level sugar `(fold x 0 ...)`; the stored
    /// `value`/`init` are then the implied `x` and `0`.
    Fold {
        value: Rc<Expr>,
        init: Rc<Expr>,
        body: Rc<Expr>,
        tfold: bool,
    },
    /// A unary operator application.
    Unary(UnaryOp, Rc<Expr>),
    /// A binary operator application.
    Binary(BinaryOp, Rc<Expr>, Rc<Expr>),
}

/// An immutable BV expression with cached attributes.
pub struct Expr {
    node: Node,
    op: OpKind,
    op_set: OpSet,
    size: usize,
    vars: u8,
    has_fold: bool,
    /// True once the simplifier has proven this node canonical.
    canonical: Cell<bool>,
    /// The canonical rewrite, when it differs from this node.
    rewritten: RefCell<Option<Rc<Expr>>>,
    /// Last `(x, result)` pair; consulted only when `!in_fold()`.
    pub(crate) eval_memo: Cell<Option<(u64, u64)>>,
}

impl Expr {
    fn make(node: Node) -> Rc<Expr> {
        let (op, op_set, size, vars, has_fold, canonical) = match &node {
            Node::Const(_) => (OpKind::Const, OpSet::EMPTY, 1, 0, false, true),
            Node::Id(id) => (OpKind::Id, OpSet::EMPTY, 1, id.var_bit(), false, true),
            Node::Lambda(body) => (
                OpKind::Lambda,
                body.op_set,
                1 + body.size,
                body.vars,
                body.has_fold,
                false,
            ),
            Node::If0 {
                cond,
                then_body,
                else_body,
            } => (
                OpKind::If0,
                OpSet::only(OpKind::If0)
                    .union(cond.op_set)
                    .union(then_body.op_set)
                    .union(else_body.op_set),
                1 + cond.size + then_body.size + else_body.size,
                cond.vars | then_body.vars | else_body.vars,
                cond.has_fold || then_body.has_fold || else_body.has_fold,
                false,
            ),
            Node::Fold {
                value,
                init,
                body,
                tfold,
            } => (
                OpKind::Fold,
                OpSet::only(if *tfold { OpKind::TFold } else { OpKind::Fold })
                    .union(value.op_set)
                    .union(init.op_set)
                    .union(body.op_set),
                2 + value.size + init.size + body.size,
                // y and z are bound here; only the body's x escapes.
                body.vars & VAR_X,
                true,
                false,
            ),
            Node::Unary(op, arg) => (
                op.kind(),
                OpSet::only(op.kind()).union(arg.op_set),
                1 + arg.size,
                arg.vars,
                arg.has_fold,
                false,
            ),
            Node::Binary(op, lhs, rhs) => (
                op.kind(),
                OpSet::only(op.kind()).union(lhs.op_set).union(rhs.op_set),
                1 + lhs.size + rhs.size,
                lhs.vars | rhs.vars,
                lhs.has_fold || rhs.has_fold,
                false,
            ),
        };
        Rc::new(Expr {
            node,
            op,
            op_set,
            size,
            vars,
            has_fold,
            canonical: Cell::new(canonical),
            rewritten: RefCell::new(None),
            eval_memo: Cell::new(None),
        })
    }

    /// A constant node. Already canonical.
    pub fn constant(value: u64) -> Rc<Expr> {
        Expr::make(Node::Const(value))
    }

    /// A variable node. Already canonical.
    pub fn id(id: Id) -> Rc<Expr> {
        Expr::make(Node::Id(id))
    }

    /// The program wrapper around a body.
    pub fn lambda(body: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::Lambda(body))
    }

    /// An `if0` node.
    pub fn if0(cond: Rc<Expr>, then_body: Rc<Expr>, else_body: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::If0 {
            cond,
            then_body,
            else_body,
        })
    }

    /// A `fold` node.
    pub fn fold(value: Rc<Expr>, init: Rc<Expr>, body: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::Fold {
            value,
            init,
            body,
            tfold: false,
        })
    }

    /// The top-level `tfold` sugar: `(fold x 0 (lambda (y z) body))`.
    pub fn tfold(body: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::Fold {
            value: Expr::id(Id::X),
            init: Expr::constant(0),
            body,
            tfold: true,
        })
    }

    /// A unary operator node.
    pub fn unary(op: UnaryOp, arg: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::Unary(op, arg))
    }

    /// A binary operator node.
    pub fn binary(op: BinaryOp, lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
        Expr::make(Node::Binary(op, lhs, rhs))
    }

    /// The node shape.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The kind of this node (structural kinds included).
    pub fn op(&self) -> OpKind {
        self.op
    }

    /// Every operator kind occurring in this subtree.
    pub fn op_set(&self) -> OpSet {
        self.op_set
    }

    /// The BV-size of this subtree.
    pub fn size(&self) -> usize {
        self.size
    }

    /// True if the subtree references `x`.
    pub fn has_x(&self) -> bool {
        self.vars & VAR_X != 0
    }

    /// True if the subtree references `y`.
    pub fn has_y(&self) -> bool {
        self.vars & VAR_Y != 0
    }

    /// True if the subtree references `z`.
    pub fn has_z(&self) -> bool {
        self.vars & VAR_Z != 0
    }

    /// True if the subtree references a fold-bound variable, i.e. it
    /// is only valid inside a fold body.
    pub fn in_fold(&self) -> bool {
        self.vars & (VAR_Y | VAR_Z) != 0
    }

    /// True if the subtree contains a `fold` node.
    pub fn has_fold(&self) -> bool {
        self.has_fold
    }

    /// The constant value, if this is a constant node.
    pub fn as_const(&self) -> Option<u64> {
        match self.node {
            Node::Const(v) => Some(v),
            _ => None,
        }
    }

    /// The identifier, if this is a variable node.
    pub fn as_id(&self) -> Option<Id> {
        match self.node {
            Node::Id(id) => Some(id),
            _ => None,
        }
    }

    /// The argument, if this node applies the given unary operator.
    pub fn as_unary(&self, op: UnaryOp) -> Option<&Rc<Expr>> {
        match &self.node {
            Node::Unary(o, arg) if *o == op => Some(arg),
            _ => None,
        }
    }

    /// The operands, if this node applies the given binary operator.
    pub fn as_binary(&self, op: BinaryOp) -> Option<(&Rc<Expr>, &Rc<Expr>)> {
        match &self.node {
            Node::Binary(o, lhs, rhs) if *o == op => Some((lhs, rhs)),
            _ => None,
        }
    }

    /// The three children, if this is an `if0` node.
    pub fn as_if0(&self) -> Option<(&Rc<Expr>, &Rc<Expr>, &Rc<Expr>)> {
        match &self.node {
            Node::If0 {
                cond,
                then_body,
                else_body,
            } => Some((cond, then_body, else_body)),
            _ => None,
        }
    }

    /// True if the memoized canonical form is this node itself.
    pub(crate) fn is_canonical(&self) -> bool {
        self.canonical.get()
    }

    pub(crate) fn set_canonical(&self) {
        self.canonical.set(true);
    }

    pub(crate) fn cached_rewrite(&self) -> Option<Rc<Expr>> {
        self.rewritten.borrow().clone()
    }

    pub(crate) fn store_rewrite(&self, rewrite: Rc<Expr>) {
        *self.rewritten.borrow_mut() = Some(rewrite);
    }

    /// Total order used to pick a canonical operand order for the
    /// commutative operators: kind rank first, then fields, then
    /// children lexicographically.
    pub fn compare(&self, other: &Expr) -> Ordering {
        if std::ptr::eq(self, other) {
            return Ordering::Equal;
        }
        match self.op.cmp(&other.op) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (&self.node, &other.node) {
            (Node::Const(a), Node::Const(b)) => a.cmp(b),
            (Node::Id(a), Node::Id(b)) => a.cmp(b),
            (Node::Lambda(a), Node::Lambda(b)) => a.compare(b),
            (
                Node::If0 {
                    cond: c1,
                    then_body: t1,
                    else_body: e1,
                },
                Node::If0 {
                    cond: c2,
                    then_body: t2,
                    else_body: e2,
                },
            ) => c1
                .compare(c2)
                .then_with(|| t1.compare(t2))
                .then_with(|| e1.compare(e2)),
            (
                Node::Fold {
                    value: v1,
                    init: i1,
                    body: b1,
                    ..
                },
                Node::Fold {
                    value: v2,
                    init: i2,
                    body: b2,
                    ..
                },
            ) => v1
                .compare(v2)
                .then_with(|| i1.compare(i2))
                .then_with(|| b1.compare(b2)),
            (Node::Unary(o1, a1), Node::Unary(o2, a2)) => {
                debug_assert_eq!(o1, o2);
                a1.compare(a2)
            }
            (Node::Binary(o1, l1, r1), Node::Binary(o2, l2, r2)) => {
                debug_assert_eq!(o1, o2);
                l1.compare(l2).then_with(|| r1.compare(r2))
            }
            // Kinds are equal, so the shapes must match.
            _ => unreachable!("node shape mismatch for equal kinds"),
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.op != other.op {
            return false;
        }
        match (&self.node, &other.node) {
            (Node::Const(a), Node::Const(b)) => a == b,
            (Node::Id(a), Node::Id(b)) => a == b,
            (Node::Lambda(a), Node::Lambda(b)) => a == b,
            (
                Node::If0 {
                    cond: c1,
                    then_body: t1,
                    else_body: e1,
                },
                Node::If0 {
                    cond: c2,
                    then_body: t2,
                    else_body: e2,
                },
            ) => c1 == c2 && t1 == t2 && e1 == e2,
            (
                Node::Fold {
                    value: v1,
                    init: i1,
                    body: b1,
                    ..
                },
                Node::Fold {
                    value: v2,
                    init: i2,
                    body: b2,
                    ..
                },
            ) => v1 == v2 && i1 == i2 && b1 == b2,
            (Node::Unary(o1, a1), Node::Unary(o2, a2)) => o1 == o2 && a1 == a2,
            (Node::Binary(o1, l1, r1), Node::Binary(o2, l2, r2)) => {
                o1 == o2 && l1 == l2 && r1 == r2
            }
            _ => false,
        }
    }
}

impl Eq for Expr {}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Const(v) => write!(f, "{}", v),
            Node::Id(id) => f.write_str(id.name()),
            Node::Lambda(body) => write!(f, "(lambda (x) {})", body),
            Node::If0 {
                cond,
                then_body,
                else_body,
            } => write!(f, "(if0 {} {} {})", cond, then_body, else_body),
            Node::Fold { value, init, body, .. } => {
                write!(f, "(fold {} {} (lambda (y z) {}))", value, init, body)
            }
            Node::Unary(op, arg) => write!(f, "({} {})", op.name(), arg),
            Node::Binary(op, lhs, rhs) => write!(f, "({} {} {})", op.name(), lhs, rhs),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr[{}]({})", self.size, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_attributes() {
        let zero = Expr::constant(0);
        assert_eq!(zero.size(), 1);
        assert!(zero.op_set().is_empty());
        assert!(!zero.has_x() && !zero.in_fold());

        let x = Expr::id(Id::X);
        assert!(x.has_x());
        assert!(!x.in_fold());

        let y = Expr::id(Id::Y);
        assert!(y.in_fold());
    }

    #[test]
    fn size_accounting_is_additive() {
        let x = Expr::id(Id::X);
        let not_x = Expr::unary(UnaryOp::Not, x.clone());
        assert_eq!(not_x.size(), 2);

        let plus = Expr::binary(BinaryOp::Plus, not_x.clone(), x.clone());
        assert_eq!(plus.size(), 4);

        let if0 = Expr::if0(x.clone(), plus.clone(), Expr::constant(1));
        assert_eq!(if0.size(), 1 + 1 + 4 + 1);

        let body = Expr::binary(BinaryOp::Or, Expr::id(Id::Y), Expr::id(Id::Z));
        let fold = Expr::fold(x.clone(), Expr::constant(0), body.clone());
        assert_eq!(fold.size(), 2 + 1 + 1 + 3);

        let tfold = Expr::tfold(body);
        assert_eq!(tfold.size(), 4 + 3);

        assert_eq!(Expr::lambda(x).size(), 2);
    }

    #[test]
    fn fold_binds_y_and_z() {
        let body = Expr::binary(BinaryOp::Xor, Expr::id(Id::Y), Expr::id(Id::Z));
        assert!(body.in_fold());
        let fold = Expr::fold(Expr::id(Id::X), Expr::constant(0), body);
        assert!(!fold.in_fold());
        assert!(fold.has_fold());
    }

    #[test]
    fn op_set_collects_descendants() {
        let e = Expr::binary(
            BinaryOp::And,
            Expr::unary(UnaryOp::Shr4, Expr::id(Id::X)),
            Expr::constant(1),
        );
        assert!(e.op_set().contains(OpKind::And));
        assert!(e.op_set().contains(OpKind::Shr4));
        assert!(!e.op_set().contains(OpKind::Or));
    }

    #[test]
    fn tfold_contributes_tfold_not_fold() {
        let tf = Expr::tfold(Expr::id(Id::Y));
        assert!(tf.op_set().contains(OpKind::TFold));
        assert!(!tf.op_set().contains(OpKind::Fold));
    }

    #[test]
    fn display_prints_surface_syntax() {
        let body = Expr::binary(BinaryOp::Xor, Expr::id(Id::Y), Expr::id(Id::Z));
        let prog = Expr::lambda(Expr::tfold(body));
        assert_eq!(
            prog.to_string(),
            "(lambda (x) (fold x 0 (lambda (y z) (xor y z))))"
        );
    }

    #[test]
    fn structural_equality_ignores_sharing() {
        let a = Expr::unary(UnaryOp::Not, Expr::id(Id::X));
        let b = Expr::unary(UnaryOp::Not, Expr::id(Id::X));
        assert_eq!(*a, *b);
        assert_ne!(*a, *Expr::unary(UnaryOp::Shl1, Expr::id(Id::X)));
    }

    #[test]
    fn compare_ranks_constants_below_ids() {
        let zero = Expr::constant(0);
        let x = Expr::id(Id::X);
        assert_eq!(zero.compare(&x), Ordering::Less);
        assert_eq!(x.compare(&zero), Ordering::Greater);
        assert_eq!(x.compare(&Expr::id(Id::X)), Ordering::Equal);
    }

    #[test]
    fn compare_ranks_operators_before_leaves() {
        let not_x = Expr::unary(UnaryOp::Not, Expr::id(Id::X));
        let one = Expr::constant(1);
        assert_eq!(not_x.compare(&one), Ordering::Less);
    }

    #[test]
    fn compare_orders_constants_by_value() {
        let small = Expr::constant(3);
        let big = Expr::constant(0xFFFF_0000_0000_0000);
        assert_eq!(small.compare(&big), Ordering::Less);
    }
}
