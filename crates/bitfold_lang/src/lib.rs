//! # bitfold-lang
//!
//! Surface syntax for BV programs:
//!
//! ```text
//! program := (lambda (<id>) <expr>)
//! expr    := <number> | <id>
//!          | (not e) | (shl1 e) | (shr1 e) | (shr4 e) | (shr16 e)
//!          | (and a b) | (or a b) | (xor a b) | (plus a b)
//!          | (if0 c t e)
//!          | (fold v i (lambda (<id> <id>) e))
//! ```
//!
//! [`parse`] accepts any expression; [`parse_program`] additionally
//! requires the top-level lambda wrapper. Identifier spellings are
//! free: each binder introduces whatever name it declares, mapped to
//! the kernel's X/Y/Z slots. Numbers are decimal or `0x`-prefixed;
//! programs written by hand only contain `0` and `1`, but simplified
//! output carries folded constants.

pub mod parser;
pub mod token;

pub use parser::{parse, parse_program};
