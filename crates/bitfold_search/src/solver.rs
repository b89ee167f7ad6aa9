//! Request-level program assembly.
//!
//! A request carries examples, an operator constraint, a size budget,
//! a timeout and a seed. Assembly picks the strategy:
//!
//! - **tfold**: try every catalog body as `(fold x 0 body)` against
//!   all examples first — the wrapper is forced, so only the body is
//!   unknown. On a miss, fall back to an ordinary search with `fold`
//!   enabled in place of `tfold`.
//! - **refinement** (two example sets): learn a discriminator that
//!   separates the sets, then solve each set independently and join
//!   with `if0`. The discriminator search runs without `fold`.
//! - **bonus**: a refinement whose discriminator is a single bit; the
//!   emitted condition is wrapped as `(and cond 1)`.
//! - otherwise: a single search, with one size unit reserved for the
//!   lambda wrapper.

use std::rc::Rc;
use std::time::Duration;

use bitfold_kernel::{eval_fold_body, BinaryOp, Expr, OpKind, OpSet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::driver::{search, SearchMode};
use crate::error::SearchError;
use crate::fold_bodies::{FoldBodyCatalog, DEFAULT_BODY_MAX};

/// One synthesis problem, as delivered by the wire protocol.
#[derive(Debug, Clone)]
pub struct Request {
    /// True when this request starts a new problem; false for a
    /// continuation carrying counterexamples to an earlier answer.
    pub fresh_problem: bool,
    /// Wall-clock budget for each internal search.
    pub timeout: Duration,
    /// BV-size budget for the whole program.
    pub size: usize,
    /// The operator constraint.
    pub ops: OpSet,
    /// Bonus problem: the discriminator is a single bit.
    pub bonus: bool,
    /// Primary examples.
    pub args: Vec<u64>,
    pub expected: Vec<u64>,
    /// Refinement examples delineating a subdomain, possibly empty.
    pub refinement_args: Vec<u64>,
    pub refinement_expected: Vec<u64>,
    /// Seed for the operator-order shuffles of this request.
    pub seed: u64,
}

/// The synthesis engine with its process-lifetime fold-body catalog.
pub struct Solver {
    catalog: FoldBodyCatalog,
}

impl Solver {
    /// Builds a solver whose catalog covers bodies up to `body_max`.
    pub fn new(body_max: usize) -> Solver {
        Solver {
            catalog: FoldBodyCatalog::build(body_max),
        }
    }

    /// A solver with the default catalog bound.
    pub fn with_defaults() -> Solver {
        Solver::new(DEFAULT_BODY_MAX)
    }

    /// Synthesizes a program for one request.
    pub fn synthesize(&self, request: &Request) -> Result<Rc<Expr>, SearchError> {
        info!(
            size = request.size,
            ops = ?request.ops,
            examples = request.args.len(),
            refinements = request.refinement_args.len(),
            fresh = request.fresh_problem,
            "synthesizing"
        );
        let mut rng = StdRng::seed_from_u64(request.seed);

        let mut ops = request.ops;
        if ops.contains(OpKind::TFold) {
            if let Some(program) = self.try_tfold_catalog(request) {
                return Ok(program);
            }
            // No catalog body fits; search for the fold placement too.
            ops = ops.without(OpKind::TFold).with(OpKind::Fold);
        }

        if request.refinement_args.is_empty() {
            let body = search(
                &request.args,
                &request.expected,
                request.size.saturating_sub(1),
                ops,
                SearchMode::Solve,
                request.timeout,
                &mut rng,
                &self.catalog,
            )?;
            return Ok(Expr::lambda(body));
        }

        self.solve_refinement(request, ops, &mut rng)
    }

    /// The tfold fast path: the program shape is fixed, so test every
    /// catalog body against the merged examples directly.
    fn try_tfold_catalog(&self, request: &Request) -> Option<Rc<Expr>> {
        if request.args.is_empty() && request.refinement_args.is_empty() {
            return None;
        }
        let examples = request
            .args
            .iter()
            .zip(&request.expected)
            .chain(request.refinement_args.iter().zip(&request.refinement_expected));

        let mut bodies = self.catalog.iter();
        bodies.find_map(|body| {
            let mut examples = examples.clone();
            let fits = examples.all(|(&x, &want)| eval_fold_body(body, x, x, 0) == want);
            if fits {
                debug!(body = %body, "catalog body matches all examples");
                Some(Expr::lambda(Expr::tfold(body.clone())))
            } else {
                None
            }
        })
    }

    /// Refinement problems: discriminator plus one branch per example
    /// set, joined by `if0`. The condition must hold zero exactly on
    /// the refinement set, so that set becomes the then branch.
    fn solve_refinement(
        &self,
        request: &Request,
        ops: OpSet,
        rng: &mut StdRng,
    ) -> Result<Rc<Expr>, SearchError> {
        let mut cond_args = request.args.clone();
        cond_args.extend_from_slice(&request.refinement_args);
        let mut cond_expected = vec![1u64; request.args.len()];
        cond_expected.extend(std::iter::repeat(0).take(request.refinement_args.len()));

        let cond_mode = if request.bonus {
            SearchMode::BonusCondition
        } else {
            SearchMode::Condition
        };
        let cond = search(
            &cond_args,
            &cond_expected,
            request.size,
            ops.without(OpKind::Fold),
            cond_mode,
            request.timeout,
            rng,
            &self.catalog,
        )?;

        let then_body = search(
            &request.refinement_args,
            &request.refinement_expected,
            request.size,
            ops,
            SearchMode::Solve,
            request.timeout,
            rng,
            &self.catalog,
        )?;
        let else_body = search(
            &request.args,
            &request.expected,
            request.size,
            ops,
            SearchMode::Solve,
            request.timeout,
            rng,
            &self.catalog,
        )?;

        // In bonus mode only bit 0 of the condition is meaningful.
        let cond = if request.bonus {
            Expr::binary(BinaryOp::And, cond, Expr::constant(1))
        } else {
            cond
        };
        Ok(Expr::lambda(Expr::if0(cond, then_body, else_body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitfold_kernel::eval_program;

    fn request(size: usize, ops: &str, args: &[u64], expected: &[u64]) -> Request {
        Request {
            fresh_problem: true,
            timeout: Duration::from_secs(20),
            size,
            ops: OpSet::parse(ops).unwrap(),
            bonus: false,
            args: args.to_vec(),
            expected: expected.to_vec(),
            refinement_args: Vec::new(),
            refinement_expected: Vec::new(),
            seed: 42,
        }
    }

    #[track_caller]
    fn assert_program(solver: &Solver, req: &Request) -> Rc<Expr> {
        let program = solver.synthesize(req).unwrap();
        assert!(matches!(program.node(), bitfold_kernel::Node::Lambda(_)));
        for (&x, &want) in req.args.iter().zip(&req.expected) {
            assert_eq!(eval_program(&program, x), want, "{} at {:#x}", program, x);
        }
        for (&x, &want) in req.refinement_args.iter().zip(&req.refinement_expected) {
            assert_eq!(eval_program(&program, x), want, "{} at {:#x}", program, x);
        }
        program
    }

    #[test]
    fn plain_problem_reserves_the_lambda_unit() {
        let solver = Solver::new(3);
        let req = request(3, "shr4", &[0x10, 0xFF], &[1, 0x0F]);
        let program = assert_program(&solver, &req);
        assert_eq!(program.to_string(), "(lambda (x) (shr4 x))");
        assert!(program.size() <= req.size);
    }

    #[test]
    fn tfold_catalog_answers_byte_xor() {
        let solver = Solver::new(4);
        let req = request(
            9,
            "tfold,xor",
            &[0x0807_0605_0403_0201],
            &[0x08 ^ 0x07 ^ 0x06 ^ 0x05 ^ 0x04 ^ 0x03 ^ 0x02 ^ 0x01],
        );
        let program = assert_program(&solver, &req);
        assert_eq!(
            program.to_string(),
            "(lambda (x) (fold x 0 (lambda (y z) (xor y z))))"
        );
    }

    #[test]
    fn tfold_falls_back_to_fold_search() {
        // None of the size-3 catalog bodies inverts its input, so the
        // fallback search (with fold in place of tfold) must answer.
        let solver = Solver::new(3);
        let req = request(6, "tfold,not", &[5, 9], &[!5, !9]);
        let program = assert_program(&solver, &req);
        assert_eq!(program.to_string(), "(lambda (x) (not x))");
    }

    #[test]
    fn refinement_problem_joins_branches_with_if0() {
        let solver = Solver::new(3);
        let mut req = request(10, "shl1,shr4,and,if0", &[1, 2], &[2, 4]);
        req.refinement_args = vec![0x10, 0x20];
        req.refinement_expected = vec![1, 2];
        let program = assert_program(&solver, &req);
        assert!(program.op_set().contains(OpKind::If0), "{}", program);
    }

    #[test]
    fn bonus_problem_masks_the_condition() {
        let solver = Solver::new(3);
        let mut req = request(8, "shl1,and,if0", &[3, 5], &[6, 10]);
        req.bonus = true;
        req.refinement_args = vec![2, 4];
        req.refinement_expected = vec![0, 0];
        let program = assert_program(&solver, &req);
        assert!(program.to_string().contains("(and"), "{}", program);
    }

    #[test]
    fn failures_surface_as_errors() {
        let solver = Solver::new(3);
        // 5 is unreachable from {0, 1, x} with not alone at size 3.
        let req = request(3, "not", &[1], &[5]);
        assert!(matches!(
            solver.synthesize(&req),
            Err(SearchError::NotFound)
        ));
    }
}
