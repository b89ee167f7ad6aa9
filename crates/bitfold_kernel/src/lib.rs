//! # bitfold-kernel
//!
//! The BV expression kernel: the immutable expression tree, the
//! 64-bit evaluator, and the canonicalizing simplifier.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  simplify                     │
//! │  canonical rewriting, memoized per node       │
//! └───────────────────────────────────────────────┘
//!        │                │               │
//!        ▼                ▼               ▼
//! ┌─────────────┐  ┌─────────────┐  ┌───────────┐
//! │    subst    │  │  analysis   │  │   eval    │
//! │ x/y/z :=  c │  │ known bits  │  │ BV value  │
//! └─────────────┘  └─────────────┘  └───────────┘
//!        │                │               │
//!        └────────────────┼───────────────┘
//!                         ▼
//!               ┌───────────────────┐
//!               │    expr / ops     │
//!               │ tree + attributes │
//!               └───────────────────┘
//! ```
//!
//! # Public API
//!
//! - [`Expr`], [`Node`], [`Id`] — the expression tree
//! - [`OpKind`], [`OpSet`], [`UnaryOp`], [`BinaryOp`] — operators
//! - [`eval`], [`eval_program`], [`eval_fold_body`], [`Env`] — evaluation
//! - [`simplify`] — canonicalization
//! - [`substitute`] — constant substitution with a change signal
//! - [`analysis`] — conservative known-bit masks

pub mod analysis;
pub mod eval;
pub mod expr;
pub mod ops;
pub mod simplify;
pub mod subst;

pub use eval::{eval, eval_fold_body, eval_program, Env};
pub use expr::{Expr, Id, Node};
pub use ops::{BinaryOp, OpKind, OpSet, UnaryOp, UnknownOp, ALL_BINARY, ALL_UNARY};
pub use simplify::simplify;
pub use subst::substitute;
