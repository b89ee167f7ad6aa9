//! End-to-end synthesis scenarios through the assembly layer.

use std::time::Duration;

use bitfold_kernel::{eval_program, OpSet};
use bitfold_search::{Request, SearchError, Solver};

fn request(size: usize, ops: &str, args: &[u64], expected: &[u64]) -> Request {
    Request {
        fresh_problem: true,
        timeout: Duration::from_secs(30),
        size,
        ops: OpSet::parse(ops).unwrap(),
        bonus: false,
        args: args.to_vec(),
        expected: expected.to_vec(),
        refinement_args: Vec::new(),
        refinement_expected: Vec::new(),
        seed: 7,
    }
}

#[track_caller]
fn solve_and_check(solver: &Solver, req: &Request) -> String {
    let program = solver.synthesize(req).expect("no program found");
    for (&x, &want) in req
        .args
        .iter()
        .zip(&req.expected)
        .chain(req.refinement_args.iter().zip(&req.refinement_expected))
    {
        assert_eq!(
            eval_program(&program, x),
            want,
            "{} wrong at {:#x}",
            program,
            x
        );
    }
    program.to_string()
}

#[test]
fn identity_under_a_negation_constraint() {
    let solver = Solver::new(3);
    let args = [0x01u64, 0x02, 0xDEAD_BEEF];
    let req = request(5, "not", &args, &args);
    solve_and_check(&solver, &req);
}

#[test]
fn shift_right_by_four() {
    let solver = Solver::new(3);
    let req = request(3, "shr4", &[0x10, 0xFF], &[1, 0x0F]);
    assert_eq!(solve_and_check(&solver, &req), "(lambda (x) (shr4 x))");
}

#[test]
fn plus_doubles() {
    let solver = Solver::new(3);
    let req = request(4, "plus", &[5, 7], &[10, 14]);
    solve_and_check(&solver, &req);
}

#[test]
fn if0_and_alone_cannot_reach_large_branch_constants() {
    // Under if0 and and, every value expressible at input x is a
    // selection among 0, 1 and and-masks of x: neither operator ever
    // sets a bit its operands lack. 10 and 20 are therefore
    // unconstructible at any size, and the engine must report
    // exhaustion instead of fabricating a program.
    let solver = Solver::new(3);
    let req = request(7, "if0,and", &[0, 1, 2, 3], &[10, 20, 20, 20]);
    assert!(matches!(
        solver.synthesize(&req),
        Err(SearchError::NotFound)
    ));
}

#[test]
fn if0_discriminator_splits_the_zero_input() {
    // The same discriminator shape with branch values the operator
    // set can actually build: f(0) = 1, everything else 2.
    let solver = Solver::new(3);
    let req = request(7, "if0,shl1", &[0, 1, 2, 3], &[1, 2, 2, 2]);
    let text = solve_and_check(&solver, &req);
    assert!(text.contains("if0"), "{}", text);
}

#[test]
fn tfold_xor_accumulates_bytes() {
    let solver = Solver::new(4);
    let req = request(
        5,
        "tfold,xor",
        &[0x0807_0605_0403_0201],
        &[0x08 ^ 0x07 ^ 0x06 ^ 0x05 ^ 0x04 ^ 0x03 ^ 0x02 ^ 0x01],
    );
    assert_eq!(
        solve_and_check(&solver, &req),
        "(lambda (x) (fold x 0 (lambda (y z) (xor y z))))"
    );
}

#[test]
fn constant_zero_on_all_inputs() {
    let solver = Solver::new(3);
    let req = request(3, "and", &[0xAA, 0x55], &[0, 0]);
    solve_and_check(&solver, &req);
}

#[test]
fn refinement_emits_a_guarded_program() {
    let solver = Solver::new(3);
    let mut req = request(10, "shl1,shr4,and,if0", &[1, 2], &[2, 4]);
    req.refinement_args = vec![0x10, 0x20];
    req.refinement_expected = vec![1, 2];
    let text = solve_and_check(&solver, &req);
    assert!(text.starts_with("(lambda (x) (if0 "), "{}", text);
}

#[test]
fn bonus_wraps_the_discriminator_in_a_mask() {
    let solver = Solver::new(3);
    let mut req = request(9, "shl1,and,if0", &[3, 5], &[6, 10]);
    req.bonus = true;
    req.refinement_args = vec![2, 4];
    req.refinement_expected = vec![0, 0];
    let text = solve_and_check(&solver, &req);
    assert!(text.contains("(and "), "{}", text);
}

#[test]
fn repeated_requests_are_reproducible_for_a_seed() {
    let solver = Solver::new(3);
    let req = request(6, "not,shl1,plus", &[1, 2, 3], &[4, 8, 12]);
    let first = solve_and_check(&solver, &req);
    let second = solve_and_check(&solver, &req);
    assert_eq!(first, second);
}
