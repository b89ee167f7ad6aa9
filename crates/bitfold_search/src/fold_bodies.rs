//! Precomputed catalog of fold bodies.
//!
//! The search driver bolts folds around non-fold contexts; it needs
//! candidate bodies, not a fresh enumeration per request. The catalog
//! lists, per size, every fold-free body over the leaves `0`, `1`,
//! `y`, `z` that
//!
//! - is the canonical representative of its function, and
//! - references both `y` and `z`.
//!
//! Bodies missing one of the fold variables collapse away under the
//! fold rules of the simplifier (`y`-free bodies ignore the value,
//! `z`-free bodies ignore the accumulator), so a fold around them is
//! never the smallest witness and the driver need not try them.
//!
//! The catalog is built once per process and read-only afterwards.

use std::rc::Rc;

use bitfold_kernel::{simplify, Expr, Id};
use std::collections::HashSet;
use tracing::debug;

/// Default upper bound on catalog body sizes.
pub const DEFAULT_BODY_MAX: usize = 9;

/// Fold bodies indexed by BV-size.
pub struct FoldBodyCatalog {
    by_size: Vec<Vec<Rc<Expr>>>,
}

impl FoldBodyCatalog {
    /// Builds the catalog for body sizes `1..=body_max`.
    pub fn build(body_max: usize) -> FoldBodyCatalog {
        // Unfiltered slices feed the recursion; the filtered ones are
        // what the driver consumes.
        let mut table: Vec<Vec<Rc<Expr>>> = vec![Vec::new()];
        let mut filtered: Vec<Vec<Rc<Expr>>> = vec![Vec::new()];
        let mut seen = HashSet::new();

        for size in 1..=body_max {
            let candidates = candidates(&table, size);

            let mut slice = Vec::new();
            for body in candidates {
                if seen.insert(simplify(&body).to_string()) {
                    slice.push(body);
                }
            }

            let kept: Vec<_> = slice
                .iter()
                .filter(|body| body.has_y() && body.has_z())
                .cloned()
                .collect();
            debug!(
                size,
                distinct = slice.len(),
                kept = kept.len(),
                "fold bodies computed"
            );
            table.push(slice);
            filtered.push(kept);
        }

        FoldBodyCatalog { by_size: filtered }
    }

    /// The bodies of exactly the given size. Empty above the bound.
    pub fn bodies(&self, size: usize) -> &[Rc<Expr>] {
        self.by_size.get(size).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The largest body size the catalog covers.
    pub fn max_size(&self) -> usize {
        self.by_size.len().saturating_sub(1)
    }

    /// All bodies, smallest sizes first.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Expr>> {
        self.by_size.iter().flatten()
    }
}

/// Raw candidates of the given size over fold-body leaves.
fn candidates(table: &[Vec<Rc<Expr>>], size: usize) -> Vec<Rc<Expr>> {
    if size == 1 {
        return vec![
            Expr::constant(0),
            Expr::constant(1),
            Expr::id(Id::Y),
            Expr::id(Id::Z),
        ];
    }

    let mut result = Vec::new();

    for arg in &table[size - 1] {
        for op in bitfold_kernel::ALL_UNARY {
            result.push(Expr::unary(op, arg.clone()));
        }
    }

    if size >= 3 {
        for lhs_size in 1..size - 1 {
            // The operators are commutative and the slices are
            // canonical, so each unordered pair is enough.
            if lhs_size > size - 1 - lhs_size {
                continue;
            }
            for lhs in &table[lhs_size] {
                for rhs in &table[size - 1 - lhs_size] {
                    for op in bitfold_kernel::ALL_BINARY {
                        result.push(Expr::binary(op, lhs.clone(), rhs.clone()));
                    }
                }
            }
        }
    }

    if size >= 4 {
        for cond_size in 1..size - 2 {
            for then_size in 1..size - 1 - cond_size {
                let else_size = size - 1 - cond_size - then_size;
                for cond in &table[cond_size] {
                    for then_body in &table[then_size] {
                        for else_body in &table[else_size] {
                            result.push(Expr::if0(
                                cond.clone(),
                                then_body.clone(),
                                else_body.clone(),
                            ));
                        }
                    }
                }
            }
        }
    }

    result
}
