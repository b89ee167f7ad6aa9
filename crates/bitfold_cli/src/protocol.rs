//! The solver's line protocol.
//!
//! Requests arrive as blocks on standard input:
//!
//! ```text
//! request1                  marker
//! <is_continuation>         "0" starts a fresh problem
//! <timeout_sec>
//! <expr_size>
//! <operators>               comma-separated, may include "bonus"
//! <args>                    comma-separated u64, decimal or 0x-hex
//! <expecteds>
//! <refinement_args>         possibly empty
//! <refinement_expecteds>
//! <seed>
//! ```
//!
//! Each block earns exactly one response line: the synthesized
//! program, or an empty line when anything went wrong. Failures never
//! kill the loop; the next block is read regardless. A malformed
//! block surfaces as [`SearchError::Protocol`], the same recoverable
//! family as a failed search.

use std::io::{BufRead, Write};
use std::time::Duration;

use bitfold_base::{Span, SpannedError};
use bitfold_kernel::OpSet;
use bitfold_search::{Request, SearchError, Solver};
use tracing::{info, warn};

/// Reads the next request block, scanning forward to the marker.
///
/// Returns `Ok(None)` at end of input.
pub fn read_request(input: &mut impl BufRead) -> Result<Option<Request>, SearchError> {
    read_block(input).map_err(SearchError::Protocol)
}

fn read_block(input: &mut impl BufRead) -> Result<Option<Request>, SpannedError> {
    // Tolerate garbage between blocks: resynchronize on the marker.
    loop {
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        if line.trim_end() == "request1" {
            break;
        }
    }

    let continuation = required_line(input, "is_continuation")?;
    let fresh_problem = continuation.trim() == "0";

    let timeout_sec = parse_u64(&required_line(input, "timeout_sec")?, "timeout_sec")?;
    let size = parse_u64(&required_line(input, "expr_size")?, "expr_size")? as usize;

    let operator_line = required_line(input, "operators")?;
    let (ops, bonus) = parse_operators(&operator_line)?;

    let args = parse_u64_list(&required_line(input, "args")?, "args")?;
    let expected = parse_u64_list(&required_line(input, "expecteds")?, "expecteds")?;
    let refinement_args = parse_u64_list(&required_line(input, "refinement_args")?, "refinement_args")?;
    let refinement_expected = parse_u64_list(
        &required_line(input, "refinement_expecteds")?,
        "refinement_expecteds",
    )?;
    let seed = parse_u64(&required_line(input, "seed")?, "seed")?;

    Ok(Some(Request {
        fresh_problem,
        timeout: Duration::from_secs(timeout_sec),
        size,
        ops,
        bonus,
        args,
        expected,
        refinement_args,
        refinement_expected,
        seed,
    }))
}

/// Serves requests until end of input, one response line each.
pub fn serve(solver: &Solver, input: &mut impl BufRead, output: &mut impl Write) -> std::io::Result<()> {
    loop {
        let request = match read_request(input) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(%err, "malformed request block");
                writeln!(output)?;
                output.flush()?;
                continue;
            }
        };

        match solver.synthesize(&request) {
            Ok(program) => {
                info!(%program, "synthesized");
                writeln!(output, "{}", program)?;
            }
            Err(err) => {
                warn!(%err, "request failed");
                writeln!(output)?;
            }
        }
        output.flush()?;
    }
}

fn read_line(input: &mut impl BufRead) -> Result<Option<String>, SpannedError> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|err| SpannedError::new(format!("read failed: {}", err), Span::default()))?;
    if read == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn required_line(input: &mut impl BufRead, field: &str) -> Result<String, SpannedError> {
    read_line(input)?.ok_or_else(|| {
        SpannedError::new(
            format!("request truncated before '{}'", field),
            Span::default(),
        )
    })
}

/// Parses a u64 in decimal or `0x` hexadecimal.
pub fn parse_u64(text: &str, field: &str) -> Result<u64, SpannedError> {
    let trimmed = text.trim();
    let parsed = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        trimmed.parse()
    };
    parsed.map_err(|_| {
        SpannedError::new(
            format!("invalid {}: '{}'", field, trimmed),
            Span::new(0, text.len()),
        )
    })
}

fn parse_u64_list(text: &str, field: &str) -> Result<Vec<u64>, SpannedError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| parse_u64(part, field))
        .collect()
}

/// Splits the operator line into the operator set and the bonus flag.
fn parse_operators(text: &str) -> Result<(OpSet, bool), SpannedError> {
    let mut bonus = false;
    let mut names = Vec::new();
    for part in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        if part == "bonus" {
            bonus = true;
        } else {
            names.push(part);
        }
    }
    let ops = OpSet::parse(&names.join(","))
        .map_err(|err| SpannedError::new(err.to_string(), Span::new(0, text.len())))?;
    Ok((ops, bonus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitfold_kernel::OpKind;
    use std::io::Cursor;

    const BLOCK: &str = "request1\n0\n10\n5\nnot,shl1\n1,2,0xFF\n2,4,0x1FE\n\n\n42\n";

    #[test]
    fn reads_a_full_block() {
        let mut input = Cursor::new(BLOCK);
        let request = read_request(&mut input).unwrap().unwrap();
        assert!(request.fresh_problem);
        assert_eq!(request.timeout, Duration::from_secs(10));
        assert_eq!(request.size, 5);
        assert!(request.ops.contains(OpKind::Not));
        assert!(request.ops.contains(OpKind::Shl1));
        assert!(!request.bonus);
        assert_eq!(request.args, vec![1, 2, 0xFF]);
        assert_eq!(request.expected, vec![2, 4, 0x1FE]);
        assert!(request.refinement_args.is_empty());
        assert!(request.refinement_expected.is_empty());
        assert_eq!(request.seed, 42);
    }

    #[test]
    fn end_of_input_is_none() {
        let mut input = Cursor::new("");
        assert!(read_request(&mut input).unwrap().is_none());
    }

    #[test]
    fn continuation_blocks_are_flagged() {
        let block = BLOCK.replacen("request1\n0\n", "request1\n1\n", 1);
        let mut input = Cursor::new(block);
        let request = read_request(&mut input).unwrap().unwrap();
        assert!(!request.fresh_problem);
    }

    #[test]
    fn bonus_is_split_from_the_operator_set() {
        let block = BLOCK.replacen("not,shl1", "not,bonus,shl1", 1);
        let mut input = Cursor::new(block);
        let request = read_request(&mut input).unwrap().unwrap();
        assert!(request.bonus);
        assert!(request.ops.contains(OpKind::Not));
        assert!(!request.ops.contains(OpKind::TFold));
    }

    #[test]
    fn resynchronizes_on_the_marker() {
        let noisy = format!("\ngarbage\n{}", BLOCK);
        let mut input = Cursor::new(noisy);
        assert!(read_request(&mut input).unwrap().is_some());
    }

    #[test]
    fn truncated_blocks_are_protocol_errors() {
        let mut input = Cursor::new("request1\n0\n10\n");
        let err = read_request(&mut input).unwrap_err();
        assert!(matches!(err, SearchError::Protocol(_)));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn unknown_operators_are_protocol_errors() {
        let block = BLOCK.replacen("not,shl1", "not,frob", 1);
        let mut input = Cursor::new(block);
        let err = read_request(&mut input).unwrap_err();
        assert!(matches!(err, SearchError::Protocol(_)));
        assert!(err.to_string().contains("frob"));
    }

    #[test]
    fn serve_answers_each_block_on_one_line() {
        let solver = Solver::new(3);
        let mut input = Cursor::new(
            "request1\n0\n10\n3\nshr4\n0x10,0xFF\n1,0xF\n\n\n1\n\
             request1\n0\n10\n2\nnot\n1\n12345\n\n\n1\n",
        );
        let mut output = Vec::new();
        serve(&solver, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.split('\n').collect();
        assert_eq!(lines[0], "(lambda (x) (shr4 x))");
        // The second request is unsolvable within its budget.
        assert_eq!(lines[1], "");
    }

    #[test]
    fn serve_handles_refinement_blocks() {
        let solver = Solver::new(3);
        let mut input = Cursor::new(
            "request1\n0\n20\n10\nshl1,shr4,and,if0\n1,2\n2,4\n0x10,0x20\n1,2\n7\n",
        );
        let mut output = Vec::new();
        serve(&solver, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("(lambda (x) (if0 "), "{}", first);
    }

    #[test]
    fn serve_recovers_after_a_malformed_block() {
        let solver = Solver::new(3);
        let mut input = Cursor::new(
            "request1\n0\n10\nnot-a-number\nshr4\n1\n1\n\n\n1\n\
             request1\n0\n10\n3\nshr4\n0x10,0x20\n1,2\n\n\n1\n",
        );
        let mut output = Vec::new();
        serve(&solver, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.split('\n').collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "(lambda (x) (shr4 x))");
    }
}
