//! The `bitfold` binary: the solver loop plus the enumeration,
//! clustering, evaluation and canonicalization tools around it.

mod protocol;

use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use bitfold_kernel::{eval_program, simplify, OpSet};
use bitfold_lang::{parse, parse_program};
use bitfold_search::enumerate::{list_programs, Dedup};
use bitfold_search::fold_bodies::DEFAULT_BODY_MAX;
use bitfold_search::{cache, cluster, Solver};

#[derive(Parser)]
#[command(name = "bitfold", version, about = "BV program synthesizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve synthesis requests on stdin/stdout.
    Solve {
        /// Largest fold-body size to precompute.
        #[arg(long, default_value_t = DEFAULT_BODY_MAX)]
        body_max: usize,
    },
    /// Print every program of the given size under the operator set.
    Gen {
        #[arg(long)]
        size: usize,
        /// Comma-separated operator names.
        #[arg(long)]
        operators: String,
        #[arg(long, value_enum, default_value = "none")]
        dedup: DedupArg,
    },
    /// Group enumerated programs by their probe-vector fingerprint.
    Cluster {
        #[arg(long)]
        size: usize,
        #[arg(long)]
        operators: String,
        #[arg(long, value_enum, default_value = "global")]
        dedup: DedupArg,
        /// Persist clusters under this directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Suppress stdout listing.
        #[arg(long)]
        quiet: bool,
    },
    /// Evaluate programs read line by line against one argument.
    Eval {
        /// Input value, decimal or 0x-hex.
        #[arg(long, value_parser = parse_argument)]
        argument: u64,
    },
    /// Canonicalize programs read line by line.
    Simplify,
}

#[derive(Clone, Copy, ValueEnum)]
enum DedupArg {
    /// Keep every structurally distinct program.
    None,
    /// Deduplicate canonical forms within each size.
    Step,
    /// Deduplicate canonical forms across all sizes.
    Global,
}

impl From<DedupArg> for Dedup {
    fn from(arg: DedupArg) -> Dedup {
        match arg {
            DedupArg::None => Dedup::None,
            DedupArg::Step => Dedup::EachStep,
            DedupArg::Global => Dedup::Global,
        }
    }
}

fn parse_argument(text: &str) -> Result<u64, String> {
    protocol::parse_u64(text, "argument").map_err(|err| err.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve { body_max } => solve(body_max),
        Command::Gen {
            size,
            operators,
            dedup,
        } => gen(size, &operators, dedup.into()),
        Command::Cluster {
            size,
            operators,
            dedup,
            cache_dir,
            quiet,
        } => run_cluster(size, &operators, dedup.into(), cache_dir.as_deref(), quiet),
        Command::Eval { argument } => eval_lines(argument),
        Command::Simplify => simplify_lines(),
    }
}

fn solve(body_max: usize) -> Result<(), Box<dyn std::error::Error>> {
    let solver = Solver::new(body_max);

    // Announce readiness only after the catalog is built, so drivers
    // know requests will be answered promptly.
    let stdout = io::stdout();
    let mut output = stdout.lock();
    writeln!(output, "ready")?;
    output.flush()?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    protocol::serve(&solver, &mut input, &mut output)?;
    Ok(())
}

fn gen(size: usize, operators: &str, dedup: Dedup) -> Result<(), Box<dyn std::error::Error>> {
    let ops = OpSet::parse(operators)?;
    let stdout = io::stdout();
    let mut output = stdout.lock();
    for program in list_programs(size, ops, dedup) {
        writeln!(output, "{}", program)?;
    }
    Ok(())
}

fn run_cluster(
    size: usize,
    operators: &str,
    dedup: Dedup,
    cache_dir: Option<&std::path::Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ops = OpSet::parse(operators)?;
    let mut programs = list_programs(size, ops, dedup);
    if dedup == Dedup::None {
        // Clustering duplicates is pointless; fall back to a final
        // canonical-form pass.
        let mut seen = HashSet::new();
        programs.retain(|p| seen.insert(simplify(p).to_string()));
    }

    let key = cluster::probe_key();
    let clusters = cluster::cluster(&key, &programs);

    let stdout = io::stdout();
    let mut output = stdout.lock();
    if !quiet {
        writeln!(output, "argument: {}", join(&key))?;
        for (outputs, members) in &clusters {
            writeln!(output, "expected: {}", join(outputs))?;
            for member in members {
                writeln!(output, "{}", member)?;
            }
        }
    }

    if let Some(dir) = cache_dir {
        for (outputs, members) in &clusters {
            cache::store_cluster(dir, outputs, members)?;
        }
    }
    Ok(())
}

fn eval_lines(argument: u64) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let program = parse_program(&line)?;
        writeln!(output, "{}", eval_program(&program, argument))?;
    }
    Ok(())
}

fn simplify_lines() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let expr = parse(&line)?;
        writeln!(output, "{}", simplify(&expr))?;
    }
    Ok(())
}

fn join(values: &[u64]) -> String {
    values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
