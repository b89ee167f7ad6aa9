//! Operator kinds and operator sets.
//!
//! A BV problem constrains which operators a program may use. The
//! constraint arrives as a comma-separated list of names and is kept
//! as an [`OpSet`] bitset so membership tests and unions are single
//! instructions during enumeration and search.
//!
//! `Lambda`, `Const` and `Id` are structural kinds: they name node
//! shapes but never contribute bits to an operator set.

use std::fmt;

/// The five unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Shl1,
    Shr1,
    Shr4,
    Shr16,
}

/// All unary operators, in canonical order.
pub const ALL_UNARY: [UnaryOp; 5] = [
    UnaryOp::Not,
    UnaryOp::Shl1,
    UnaryOp::Shr1,
    UnaryOp::Shr4,
    UnaryOp::Shr16,
];

impl UnaryOp {
    /// The surface-syntax name of this operator.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Shl1 => "shl1",
            UnaryOp::Shr1 => "shr1",
            UnaryOp::Shr4 => "shr4",
            UnaryOp::Shr16 => "shr16",
        }
    }

    /// The operator kind for this operator.
    pub fn kind(self) -> OpKind {
        match self {
            UnaryOp::Not => OpKind::Not,
            UnaryOp::Shl1 => OpKind::Shl1,
            UnaryOp::Shr1 => OpKind::Shr1,
            UnaryOp::Shr4 => OpKind::Shr4,
            UnaryOp::Shr16 => OpKind::Shr16,
        }
    }

    /// Applies this operator to a value.
    pub fn apply(self, v: u64) -> u64 {
        match self {
            UnaryOp::Not => !v,
            UnaryOp::Shl1 => v << 1,
            UnaryOp::Shr1 => v >> 1,
            UnaryOp::Shr4 => v >> 4,
            UnaryOp::Shr16 => v >> 16,
        }
    }
}

/// The four binary operators. All are commutative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Plus,
}

/// All binary operators, in canonical order.
pub const ALL_BINARY: [BinaryOp; 4] = [
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
    BinaryOp::Plus,
];

impl BinaryOp {
    /// The surface-syntax name of this operator.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Plus => "plus",
        }
    }

    /// The operator kind for this operator.
    pub fn kind(self) -> OpKind {
        match self {
            BinaryOp::And => OpKind::And,
            BinaryOp::Or => OpKind::Or,
            BinaryOp::Xor => OpKind::Xor,
            BinaryOp::Plus => OpKind::Plus,
        }
    }

    /// Applies this operator to two values. `Plus` wraps.
    pub fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
            BinaryOp::Plus => a.wrapping_add(b),
        }
    }
}

/// Every node kind, ordered.
///
/// The declaration order is the ranking used by the total order on
/// expressions: operator kinds first, structural kinds last. Do not
/// reorder variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    Not,
    Shl1,
    Shr1,
    Shr4,
    Shr16,
    And,
    Or,
    Xor,
    Plus,
    If0,
    Fold,
    TFold,
    Lambda,
    Const,
    Id,
}

impl OpKind {
    /// Parses a surface operator name. Structural kinds have no names.
    pub fn from_name(s: &str) -> Option<OpKind> {
        Some(match s {
            "not" => OpKind::Not,
            "shl1" => OpKind::Shl1,
            "shr1" => OpKind::Shr1,
            "shr4" => OpKind::Shr4,
            "shr16" => OpKind::Shr16,
            "and" => OpKind::And,
            "or" => OpKind::Or,
            "xor" => OpKind::Xor,
            "plus" => OpKind::Plus,
            "if0" => OpKind::If0,
            "fold" => OpKind::Fold,
            "tfold" => OpKind::TFold,
            _ => return None,
        })
    }

    fn bit(self) -> u16 {
        match self {
            OpKind::Lambda | OpKind::Const | OpKind::Id => 0,
            op => 1 << (op as u16),
        }
    }
}

/// A set of operator kinds, stored as a bitset.
///
/// Structural kinds (`Lambda`, `Const`, `Id`) are never members; they
/// are silently dropped on insertion so that `op_set` comparisons see
/// only real operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpSet(u16);

impl OpSet {
    /// The empty set.
    pub const EMPTY: OpSet = OpSet(0);

    /// A set containing a single kind.
    pub fn only(op: OpKind) -> OpSet {
        OpSet(op.bit())
    }

    /// Union with a single kind.
    pub fn with(self, op: OpKind) -> OpSet {
        OpSet(self.0 | op.bit())
    }

    /// Union with another set.
    pub fn union(self, other: OpSet) -> OpSet {
        OpSet(self.0 | other.0)
    }

    /// Set difference.
    pub fn without(self, op: OpKind) -> OpSet {
        OpSet(self.0 & !op.bit())
    }

    /// Membership test. Always false for structural kinds.
    pub fn contains(self, op: OpKind) -> bool {
        op.bit() != 0 && self.0 & op.bit() != 0
    }

    /// Returns `true` if any of the given kinds is a member.
    pub fn contains_any(self, ops: &[OpKind]) -> bool {
        ops.iter().any(|&op| self.contains(op))
    }

    /// Returns `true` if no operator is a member.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a comma- or whitespace-separated list of operator names.
    pub fn parse(s: &str) -> Result<OpSet, UnknownOp> {
        let mut set = OpSet::EMPTY;
        for name in s.split(|c: char| c == ',' || c.is_whitespace()) {
            if name.is_empty() {
                continue;
            }
            match OpKind::from_name(name) {
                Some(op) => set = set.with(op),
                None => return Err(UnknownOp(name.to_string())),
            }
        }
        Ok(set)
    }
}

impl fmt::Debug for OpSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMED: [OpKind; 12] = [
            OpKind::Not,
            OpKind::Shl1,
            OpKind::Shr1,
            OpKind::Shr4,
            OpKind::Shr16,
            OpKind::And,
            OpKind::Or,
            OpKind::Xor,
            OpKind::Plus,
            OpKind::If0,
            OpKind::Fold,
            OpKind::TFold,
        ];
        let mut set = f.debug_set();
        for op in NAMED {
            if self.contains(op) {
                set.entry(&op);
            }
        }
        set.finish()
    }
}

/// Error returned by [`OpSet::parse`] for an unrecognized name.
#[derive(Debug, Clone)]
pub struct UnknownOp(pub String);

impl fmt::Display for UnknownOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator: '{}'", self.0)
    }
}

impl std::error::Error for UnknownOp {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_comma_separated_names() {
        let set = OpSet::parse("not,shl1,fold").unwrap();
        assert!(set.contains(OpKind::Not));
        assert!(set.contains(OpKind::Shl1));
        assert!(set.contains(OpKind::Fold));
        assert!(!set.contains(OpKind::And));
    }

    #[test]
    fn parse_rejects_unknown_name() {
        let err = OpSet::parse("not,quux").unwrap_err();
        assert!(err.to_string().contains("quux"));
    }

    #[test]
    fn structural_kinds_carry_no_bits() {
        let set = OpSet::EMPTY
            .with(OpKind::Const)
            .with(OpKind::Id)
            .with(OpKind::Lambda);
        assert!(set.is_empty());
        assert!(!set.contains(OpKind::Const));
    }

    #[test]
    fn without_removes_member() {
        let set = OpSet::parse("tfold,xor").unwrap().without(OpKind::TFold);
        assert_eq!(set, OpSet::only(OpKind::Xor));
    }

    #[test]
    fn unary_apply_matches_semantics() {
        assert_eq!(UnaryOp::Not.apply(0), !0);
        assert_eq!(UnaryOp::Shl1.apply(1), 2);
        assert_eq!(UnaryOp::Shr1.apply(2), 1);
        assert_eq!(UnaryOp::Shr4.apply(0x10), 1);
        assert_eq!(UnaryOp::Shr16.apply(0x1_0000), 1);
    }

    #[test]
    fn plus_wraps() {
        assert_eq!(BinaryOp::Plus.apply(u64::MAX, 1), 0);
    }
}
