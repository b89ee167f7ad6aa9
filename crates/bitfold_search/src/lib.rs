//! # bitfold-search
//!
//! The synthesis engine. Given input/output examples, an operator
//! constraint and a size budget, find a BV program agreeing with every
//! example.
//!
//! The pieces, bottom up:
//!
//! - [`enumerate`] — per-size tables of all candidate expressions
//!   under an operator set, with optional canonical-form dedup;
//! - [`fold_bodies`] — a precomputed catalog of useful fold bodies,
//!   so the driver can bolt a fold around non-fold contexts without
//!   re-enumerating bodies;
//! - [`cluster`] — grouping of expressions by their outputs on a
//!   fixed 256-input probe vector, with an on-disk cache format;
//! - [`driver`] — the central bottom-up, size-indexed,
//!   output-indexed search;
//! - [`solver`] — request-level assembly: plain problems, refinement
//!   problems with a learned discriminator, bonus problems, and the
//!   tfold fast path.

pub mod cache;
pub mod cluster;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod fold_bodies;
pub mod solver;

pub use driver::{search, SearchMode};
pub use error::SearchError;
pub use fold_bodies::FoldBodyCatalog;
pub use solver::{Request, Solver};
