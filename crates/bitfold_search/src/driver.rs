//! The bottom-up, output-indexed search.
//!
//! The search never stores candidate expressions. It stores
//! *fingerprints*: the vector of outputs a candidate produces on the
//! problem's argument vector, tagged with whether the candidate
//! contains a fold. One fingerprint stands for every expression with
//! that behavior, and a back-pointer record remembers one way to build
//! it, so a matching fingerprint reconstructs to a witness on demand.
//!
//! Per size step, phase A closes the non-fold fingerprints under the
//! enabled unary, binary and `if0` operators. Phase B (only when fold
//! is enabled) lifts derivations with fold-carrying children and then
//! derives new folds by combining two non-fold fingerprints with a
//! body from the precomputed catalog. A fingerprint reachable without
//! a fold is never re-admitted with one — the non-fold witness is
//! smaller and composes more freely.
//!
//! The first fingerprint inserted for an output vector wins; later
//! derivations of the same outputs are dropped, which keeps the
//! smallest-size witness. Operator order is shuffled per size step
//! from the caller's seeded RNG, diversifying which witness gets
//! recorded without affecting solvability.
//!
//! Wall-clock is polled every 16384 insertions.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use bitfold_kernel::{eval_fold_body, BinaryOp, Expr, Id, OpKind, OpSet, UnaryOp};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::SearchError;
use crate::fold_bodies::FoldBodyCatalog;

/// Deepest size slice the tables keep.
const MAX_TABLE_SIZE: usize = 29;

/// How many insertions between wall-clock polls.
const TIMEOUT_POLL_MASK: u64 = 0x3FFF;

/// What counts as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Outputs must equal the expected vector.
    Solve,
    /// Outputs must be zero exactly where the expected vector is zero.
    Condition,
    /// The low bit of each output must equal the expected value.
    BonusCondition,
}

/// A candidate's observable behavior: its outputs on the argument
/// vector, tagged with fold usage. Non-fold fingerprints order first,
/// so phase A can stop at the first fold entry of a sorted table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fingerprint {
    pub has_fold: bool,
    pub outputs: Vec<u64>,
}

/// One recorded way to build a fingerprint.
enum Back {
    /// The constant `outputs[0]` (only 0 and 1 are seeded).
    Const,
    /// The program argument `x`.
    Arg,
    Unary(UnaryOp, Rc<Fingerprint>),
    Binary(BinaryOp, Rc<Fingerprint>, Rc<Fingerprint>),
    If0(Rc<Fingerprint>, Rc<Fingerprint>, Rc<Fingerprint>),
    Fold(Rc<Fingerprint>, Rc<Fingerprint>, Rc<Expr>),
}

struct TimedOut;

/// The smallest-size-wins fingerprint index.
struct SizeDict {
    smallest: BTreeMap<Rc<Fingerprint>, usize>,
    insertions: u64,
    deadline: Instant,
}

impl SizeDict {
    /// Records a fingerprint at `size` unless it is already known.
    /// Returns whether it was new; errs when the time budget lapses.
    fn admit(
        &mut self,
        table: &mut BTreeMap<Rc<Fingerprint>, Back>,
        size: usize,
        fingerprint: Fingerprint,
        back: Back,
    ) -> Result<bool, TimedOut> {
        if self.smallest.contains_key(&fingerprint) {
            return Ok(false);
        }
        let fingerprint = Rc::new(fingerprint);
        self.smallest.insert(fingerprint.clone(), size);
        table.insert(fingerprint, back);

        self.insertions += 1;
        if self.insertions & TIMEOUT_POLL_MASK == 0 && Instant::now() > self.deadline {
            return Err(TimedOut);
        }
        Ok(true)
    }

    /// True when the same outputs are already reachable without fold.
    fn reachable_without_fold(&self, outputs: &[u64]) -> bool {
        self.smallest.contains_key(&Fingerprint {
            has_fold: false,
            outputs: outputs.to_vec(),
        })
    }
}

fn apply_unary(op: UnaryOp, input: &Fingerprint) -> Fingerprint {
    Fingerprint {
        has_fold: input.has_fold,
        outputs: input.outputs.iter().map(|&v| op.apply(v)).collect(),
    }
}

fn apply_binary(op: BinaryOp, lhs: &Fingerprint, rhs: &Fingerprint) -> Fingerprint {
    Fingerprint {
        has_fold: lhs.has_fold || rhs.has_fold,
        outputs: lhs
            .outputs
            .iter()
            .zip(&rhs.outputs)
            .map(|(&a, &b)| op.apply(a, b))
            .collect(),
    }
}

fn apply_if0(cond: &Fingerprint, then: &Fingerprint, els: &Fingerprint) -> Fingerprint {
    Fingerprint {
        has_fold: cond.has_fold || then.has_fold || els.has_fold,
        outputs: cond
            .outputs
            .iter()
            .zip(then.outputs.iter().zip(&els.outputs))
            .map(|(&c, (&t, &e))| if c == 0 { t } else { e })
            .collect(),
    }
}

fn apply_fold(args: &[u64], value: &Fingerprint, init: &Fingerprint, body: &Expr) -> Fingerprint {
    Fingerprint {
        has_fold: true,
        outputs: args
            .iter()
            .zip(value.outputs.iter().zip(&init.outputs))
            .map(|(&x, (&v, &i))| eval_fold_body(body, x, v, i))
            .collect(),
    }
}

/// Searches for an expression of BV-size at most `max_size` whose
/// behavior on `args` satisfies `mode` against `expected`.
///
/// The returned expression contains no free `y`/`z` and is exact on
/// the argument vector — callers still verify against any examples
/// that were not part of `args`.
#[allow(clippy::too_many_arguments)]
pub fn search(
    args: &[u64],
    expected: &[u64],
    max_size: usize,
    ops: OpSet,
    mode: SearchMode,
    timeout: Duration,
    rng: &mut StdRng,
    catalog: &FoldBodyCatalog,
) -> Result<Rc<Expr>, SearchError> {
    if args.is_empty() || args.len() != expected.len() {
        return Err(SearchError::Request(format!(
            "argument/expectation length mismatch: {} vs {}",
            args.len(),
            expected.len()
        )));
    }

    let max_size = max_size.min(MAX_TABLE_SIZE);
    let fold_enabled = ops.contains(OpKind::Fold);

    let mut unary_ops: Vec<UnaryOp> = bitfold_kernel::ALL_UNARY
        .into_iter()
        .filter(|op| ops.contains(op.kind()))
        .collect();
    let mut binary_ops: Vec<BinaryOp> = bitfold_kernel::ALL_BINARY
        .into_iter()
        .filter(|op| ops.contains(op.kind()))
        .collect();

    let mut dict = SizeDict {
        smallest: BTreeMap::new(),
        insertions: 0,
        deadline: Instant::now() + timeout,
    };
    let mut tables: Vec<BTreeMap<Rc<Fingerprint>, Back>> =
        (0..=max_size.max(1)).map(|_| BTreeMap::new()).collect();

    // Size-1 seeds: the two constants and the argument itself.
    let seed = |outputs: Vec<u64>| Fingerprint {
        has_fold: false,
        outputs,
    };
    let _ = dict.admit(&mut tables[1], 1, seed(vec![0; args.len()]), Back::Const);
    let _ = dict.admit(&mut tables[1], 1, seed(vec![1; args.len()]), Back::Const);
    let _ = dict.admit(&mut tables[1], 1, seed(args.to_vec()), Back::Arg);

    // A seed may already be the answer (identity, constant problems).
    if let Some(hit) = find_hit(&dict, &tables, expected, mode, 1) {
        return Ok(reconstruct(&dict, &tables, &hit));
    }

    for size in 2..=max_size {
        // Shuffle which operator gets to claim contested fingerprints
        // this step.
        unary_ops.shuffle(rng);
        binary_ops.shuffle(rng);

        let result = grow_size(
            args,
            size,
            &mut dict,
            &mut tables,
            &unary_ops,
            &binary_ops,
            ops,
            fold_enabled,
            catalog,
        );
        if result.is_err() {
            return Err(SearchError::Timeout(timeout));
        }

        debug!(
            size,
            fingerprints = dict.smallest.len(),
            fresh = tables[size].len(),
            "size step closed"
        );

        if let Some(hit) = find_hit(&dict, &tables, expected, mode, size) {
            return Ok(reconstruct(&dict, &tables, &hit));
        }
    }

    Err(SearchError::NotFound)
}

/// Runs one size step: phase A over non-fold fingerprints, phase B
/// fold lifting and fold derivation.
#[allow(clippy::too_many_arguments)]
fn grow_size(
    args: &[u64],
    size: usize,
    dict: &mut SizeDict,
    tables: &mut [BTreeMap<Rc<Fingerprint>, Back>],
    unary_ops: &[UnaryOp],
    binary_ops: &[BinaryOp],
    ops: OpSet,
    fold_enabled: bool,
    catalog: &FoldBodyCatalog,
) -> Result<(), TimedOut> {
    let (lower, rest) = tables.split_at_mut(size);
    let current = &mut rest[0];

    // Phase A: unary closure over non-fold fingerprints.
    for (input, _) in &lower[size - 1] {
        if input.has_fold {
            break;
        }
        for &op in unary_ops {
            let out = apply_unary(op, input);
            dict.admit(current, size, out, Back::Unary(op, input.clone()))?;
        }
    }

    // Phase A: binary closure.
    for lhs_size in 1..size.saturating_sub(1) {
        let rhs_size = size - 1 - lhs_size;
        for (lhs, _) in &lower[lhs_size] {
            if lhs.has_fold {
                break;
            }
            for (rhs, _) in &lower[rhs_size] {
                if rhs.has_fold {
                    break;
                }
                for &op in binary_ops {
                    let out = apply_binary(op, lhs, rhs);
                    dict.admit(current, size, out, Back::Binary(op, lhs.clone(), rhs.clone()))?;
                }
            }
        }
    }

    // Phase A: if0 closure.
    if ops.contains(OpKind::If0) {
        for cond_size in 1..size.saturating_sub(2) {
            for then_size in 1..size - 1 - cond_size {
                let else_size = size - 1 - cond_size - then_size;
                for (cond, _) in &lower[cond_size] {
                    if cond.has_fold {
                        break;
                    }
                    for (then, _) in &lower[then_size] {
                        if then.has_fold {
                            break;
                        }
                        for (els, _) in &lower[else_size] {
                            if els.has_fold {
                                break;
                            }
                            let out = apply_if0(cond, then, els);
                            dict.admit(
                                current,
                                size,
                                out,
                                Back::If0(cond.clone(), then.clone(), els.clone()),
                            )?;
                        }
                    }
                }
            }
        }
    }

    if !fold_enabled {
        return Ok(());
    }

    // Phase B: lift unary derivations over fold-carrying children.
    for (input, _) in lower[size - 1].iter() {
        if !input.has_fold {
            continue;
        }
        for &op in unary_ops {
            let out = apply_unary(op, input);
            if dict.reachable_without_fold(&out.outputs) {
                continue;
            }
            dict.admit(current, size, out, Back::Unary(op, input.clone()))?;
        }
    }

    // Phase B: binary derivations with at least one fold child.
    for lhs_size in 1..size.saturating_sub(1) {
        let rhs_size = size - 1 - lhs_size;
        for (lhs, _) in &lower[lhs_size] {
            for (rhs, _) in &lower[rhs_size] {
                if !(lhs.has_fold || rhs.has_fold) {
                    continue;
                }
                for &op in binary_ops {
                    let out = apply_binary(op, lhs, rhs);
                    if dict.reachable_without_fold(&out.outputs) {
                        continue;
                    }
                    dict.admit(current, size, out, Back::Binary(op, lhs.clone(), rhs.clone()))?;
                }
            }
        }
    }

    // Phase B: if0 derivations with at least one fold child.
    if ops.contains(OpKind::If0) {
        for cond_size in 1..size.saturating_sub(2) {
            for then_size in 1..size - 1 - cond_size {
                let else_size = size - 1 - cond_size - then_size;
                for (cond, _) in &lower[cond_size] {
                    for (then, _) in &lower[then_size] {
                        for (els, _) in &lower[else_size] {
                            if !(cond.has_fold || then.has_fold || els.has_fold) {
                                continue;
                            }
                            let out = apply_if0(cond, then, els);
                            if dict.reachable_without_fold(&out.outputs) {
                                continue;
                            }
                            dict.admit(
                                current,
                                size,
                                out,
                                Back::If0(cond.clone(), then.clone(), els.clone()),
                            )?;
                        }
                    }
                }
            }
        }
    }

    // Phase B: new folds around catalog bodies.
    for body_size in 1..=catalog.max_size().min(size.saturating_sub(3)) {
        for value_size in 1..size - 1 - body_size {
            let init_size = size - 1 - body_size - value_size;
            for (value, _) in &lower[value_size] {
                if value.has_fold {
                    break;
                }
                for (init, _) in &lower[init_size] {
                    if init.has_fold {
                        break;
                    }
                    for body in catalog.bodies(body_size) {
                        let out = apply_fold(args, value, init, body);
                        if dict.reachable_without_fold(&out.outputs) {
                            continue;
                        }
                        dict.admit(
                            current,
                            size,
                            out,
                            Back::Fold(value.clone(), init.clone(), body.clone()),
                        )?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Checks for a satisfying fingerprint after the given size step.
fn find_hit(
    dict: &SizeDict,
    tables: &[BTreeMap<Rc<Fingerprint>, Back>],
    expected: &[u64],
    mode: SearchMode,
    size: usize,
) -> Option<Fingerprint> {
    match mode {
        SearchMode::Solve => {
            // Any size qualifies: the index keeps the smallest witness.
            for has_fold in [false, true] {
                let key = Fingerprint {
                    has_fold,
                    outputs: expected.to_vec(),
                };
                if dict.smallest.contains_key(&key) {
                    return Some(key);
                }
            }
            None
        }
        SearchMode::Condition => tables[size]
            .keys()
            .find(|fp| {
                fp.outputs
                    .iter()
                    .zip(expected)
                    .all(|(&out, &want)| (out == 0) == (want == 0))
            })
            .map(|fp| (**fp).clone()),
        SearchMode::BonusCondition => tables[size]
            .keys()
            .find(|fp| {
                fp.outputs
                    .iter()
                    .zip(expected)
                    .all(|(&out, &want)| out & 1 == want)
            })
            .map(|fp| (**fp).clone()),
    }
}

/// Rebuilds a witness expression by following back-pointers.
///
/// Every fingerprint reached here was inserted with a back record, so
/// a miss is a table-corruption bug, not an input condition.
fn reconstruct(
    dict: &SizeDict,
    tables: &[BTreeMap<Rc<Fingerprint>, Back>],
    fingerprint: &Fingerprint,
) -> Rc<Expr> {
    let size = *dict
        .smallest
        .get(fingerprint)
        .expect("fingerprint missing from size index");
    let back = tables[size]
        .get(fingerprint)
        .expect("fingerprint missing from its size table");
    match back {
        Back::Const => Expr::constant(fingerprint.outputs[0]),
        Back::Arg => Expr::id(Id::X),
        Back::Unary(op, arg) => Expr::unary(*op, reconstruct(dict, tables, arg)),
        Back::Binary(op, lhs, rhs) => Expr::binary(
            *op,
            reconstruct(dict, tables, lhs),
            reconstruct(dict, tables, rhs),
        ),
        Back::If0(cond, then, els) => Expr::if0(
            reconstruct(dict, tables, cond),
            reconstruct(dict, tables, then),
            reconstruct(dict, tables, els),
        ),
        Back::Fold(value, init, body) => Expr::fold(
            reconstruct(dict, tables, value),
            reconstruct(dict, tables, init),
            body.clone(),
        ),
    }
}
