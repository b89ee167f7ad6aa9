//! Probe-vector fingerprinting.
//!
//! Two expressions that agree on 256 probe inputs are treated as the
//! same function for search purposes. False positives are possible in
//! principle, so callers verify any candidate against the actual
//! required examples before emitting it; in practice the probe vector
//! separates everything the enumerator produces.
//!
//! The probe inputs mix the adversarial with the arbitrary: small
//! signed values, every single-bit mask and its complement, and a
//! fixed-seed pseudo-random tail. The seed never changes, so
//! fingerprints are stable across runs and processes — the cluster
//! cache on disk depends on that.

use std::collections::BTreeMap;
use std::rc::Rc;

use bitfold_kernel::{eval_program, Expr};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of probe inputs in the key.
pub const PROBE_COUNT: usize = 256;

/// Fixed seed for the pseudo-random tail of the probe key.
const PROBE_SEED: u64 = 178;

/// Builds the fixed probe vector: −7..=7, then `1 << i` and
/// `!(1 << i)` for every bit position, then seeded random values up
/// to [`PROBE_COUNT`].
pub fn probe_key() -> Vec<u64> {
    let mut key = Vec::with_capacity(PROBE_COUNT);
    for i in -7i64..=7 {
        key.push(i as u64);
    }
    for i in 0..64 {
        key.push(1u64 << i);
        key.push(!(1u64 << i));
    }
    let mut rng = StdRng::seed_from_u64(PROBE_SEED);
    while key.len() < PROBE_COUNT {
        key.push(rng.gen());
    }
    key
}

/// The outputs of one expression over a probe vector.
pub fn fingerprint(key: &[u64], expr: &Expr) -> Vec<u64> {
    key.iter().map(|&x| eval_program(expr, x)).collect()
}

/// Groups expressions by their fingerprint over `key`. The map is
/// ordered so callers iterate clusters deterministically.
pub fn cluster(key: &[u64], exprs: &[Rc<Expr>]) -> BTreeMap<Vec<u64>, Vec<Rc<Expr>>> {
    let mut result: BTreeMap<Vec<u64>, Vec<Rc<Expr>>> = BTreeMap::new();
    for expr in exprs {
        result
            .entry(fingerprint(key, expr))
            .or_default()
            .push(expr.clone());
    }
    result
}
