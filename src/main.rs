//! Veriloop CLI
//!
//! Command-line interface for the veriloop verifier

use clap::Parser;
use num_bigint::BigInt;
use std::path::PathBuf;
use std::process;
use veriloop::error::VerifierError;
use veriloop::pipeline::{Pipeline, VerifyOptions};

#[derive(Parser)]
#[command(name = "veriloop")]
#[command(about = "Verifier for annotated while-programs", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Run the program with the concrete interpreter
    #[arg(short, long)]
    run: bool,

    /// Type-check only
    #[arg(short, long)]
    typecheck: bool,

    /// Discharge the annotations through the WPC proof system
    #[arg(short, long)]
    proof: bool,

    /// Bounded model checking up to BOUND unrollings (e.g. --bmc=20)
    #[arg(
        short,
        long,
        value_name = "BOUND",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "10"
    )]
    bmc: Option<u32>,

    /// k-induction up to depth BOUND (e.g. --kind=20)
    #[arg(
        short,
        long,
        value_name = "BOUND",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "10"
    )]
    kind: Option<u32>,

    /// k-induction interleaved with BMC up to depth BOUND
    #[arg(
        long,
        value_name = "BOUND",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "10"
    )]
    kind_bmc: Option<u32>,

    /// Reachability analysis
    #[arg(long, visible_alias = "ra")]
    reachability: bool,

    /// Live-variables analysis
    #[arg(short, long)]
    liveness: bool,

    /// Reaching-definitions analysis
    #[arg(long, visible_alias = "rd")]
    reachingdefinitions: bool,

    /// Taint analysis
    #[arg(long, visible_alias = "ta")]
    taint: bool,

    /// Comma-separated external inputs for the interpreter
    #[arg(short, long, value_name = "VALUES")]
    input: Option<String>,

    /// Assume loop invariants at the loop head while encoding
    #[arg(long = "kind-inv", visible_alias = "kInd-inv")]
    kind_inv: bool,

    /// Source file
    file: PathBuf,
}

fn parse_inputs(text: &str) -> Result<Vec<BigInt>, VerifierError> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<BigInt>().map_err(|_| {
                VerifierError::Config(format!("invalid input value '{}'", part))
            })
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            if cli.verbose {
                eprintln!("{:?}", e);
            }
            1
        }
    };
    process::exit(code);
}

fn run(cli: &Cli) -> Result<i32, VerifierError> {
    let input = match &cli.input {
        Some(text) => Some(parse_inputs(text)?),
        None => None,
    };
    let options = VerifyOptions {
        verbose: cli.verbose,
        run: cli.run,
        typecheck: cli.typecheck,
        proof: cli.proof,
        bmc: cli.bmc,
        kind: cli.kind,
        kind_bmc: cli.kind_bmc,
        reachability: cli.reachability,
        liveness: cli.liveness,
        reaching_definitions: cli.reachingdefinitions,
        taint: cli.taint,
        input,
        assume_invariant: cli.kind_inv,
    };
    Pipeline::new(options).process_file(&cli.file)
}
