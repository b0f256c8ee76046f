// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Verification pipeline
//!
//! Parses and type-checks a source file, then dispatches the requested
//! actions: concrete execution, the WPC proof system, the inductive
//! checkers, and the dataflow analyses. Every action runs on the same
//! parsed context; the type check always runs first.

use crate::dataflow::analyses::{
    LiveVariables, Reachability, ReachingDefinitions, TaintAnalysis,
};
use crate::dataflow::cfg::Cfg;
use crate::dataflow::{run_check, DataflowAnalysis, Fact};
use crate::error::VerifierError;
use crate::interp::Executor;
use crate::output::Output;
use crate::parser::{parse_program, Context};
use crate::semantic::check_context;
use crate::verification::encoder::EncoderOptions;
use crate::verification::wpc::VcOptions;
use crate::verification::{
    Approach, BmcApproach, CheckOutcome, KIndBmcApproach, KInductionApproach, WpcApproach,
};
use num_bigint::BigInt;
use std::path::Path;
use tracing::info;

/// Which actions to run, mirroring the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub verbose: bool,
    pub run: bool,
    pub typecheck: bool,
    pub proof: bool,
    pub bmc: Option<u32>,
    pub kind: Option<u32>,
    pub kind_bmc: Option<u32>,
    pub reachability: bool,
    pub liveness: bool,
    pub reaching_definitions: bool,
    pub taint: bool,
    pub input: Option<Vec<BigInt>>,
    /// Assume the user loop invariant on loop entry while encoding
    /// (`--kind-inv`).
    pub assume_invariant: bool,
}

impl VerifyOptions {
    fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            assume_invariant: self.assume_invariant,
            ..EncoderOptions::default()
        }
    }
}

/// The pipeline driver.
pub struct Pipeline {
    options: VerifyOptions,
}

impl Pipeline {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    /// Process one source file; the result is the process exit code.
    pub fn process_file(&self, path: &Path) -> Result<i32, VerifierError> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.process_source(&source, &name)
    }

    pub fn process_source(&self, source: &str, name: &str) -> Result<i32, VerifierError> {
        let mut ctx = parse_program(source, name)?;
        if let Some(input) = &self.options.input {
            ctx = ctx.with_input(input.clone());
        }

        // The type check gates everything else.
        let proof = check_context(&ctx)?;
        if self.options.typecheck {
            println!("Type check passed ({} judgments).", proof.size());
        }

        let mut exit_code = 0;

        if self.options.run {
            let mut executor = Executor::for_context(&ctx);
            let mut out = Output::new();
            let final_config = executor.run(&ctx, &mut out)?;
            if final_config.error.is_some() {
                exit_code = 1;
            }
        }

        if self.options.proof {
            let mut approach = WpcApproach::new(VcOptions::default());
            exit_code = exit_code.max(self.report(&mut approach, &ctx));
        }
        if let Some(bound) = self.options.bmc {
            let mut approach = BmcApproach::new(bound);
            approach.encoder_options = self.options.encoder_options();
            exit_code = exit_code.max(self.report(&mut approach, &ctx));
        }
        if let Some(bound) = self.options.kind {
            let mut approach = KInductionApproach::new(bound, self.options.encoder_options());
            exit_code = exit_code.max(self.report(&mut approach, &ctx));
        }
        if let Some(bound) = self.options.kind_bmc {
            let mut approach = KIndBmcApproach::new(bound, self.options.encoder_options());
            exit_code = exit_code.max(self.report(&mut approach, &ctx));
        }

        exit_code = exit_code.max(self.run_analyses(&ctx));
        Ok(exit_code)
    }

    fn report(&self, approach: &mut dyn Approach, ctx: &Context) -> i32 {
        info!(approach = approach.name(), "running approach");
        let outcome = approach.run(ctx);
        println!(
            "[{}] {} ({} solver calls)",
            approach.name(),
            outcome,
            approach.smt_calls()
        );
        match outcome {
            CheckOutcome::Proof | CheckOutcome::NoResult(_) => 0,
            CheckOutcome::Counterexample(_) | CheckOutcome::Crash(_) => 1,
        }
    }

    fn run_analyses(&self, ctx: &Context) -> i32 {
        let mut requested: Vec<&dyn DataflowAnalysis> = Vec::new();
        if self.options.reachability {
            requested.push(&Reachability);
        }
        if self.options.liveness {
            requested.push(&LiveVariables);
        }
        if self.options.reaching_definitions {
            requested.push(&ReachingDefinitions);
        }
        if self.options.taint {
            requested.push(&TaintAnalysis);
        }
        if requested.is_empty() {
            return 0;
        }

        let cfg = Cfg::build(&ctx.program);
        let mut exit_code = 0;
        for analysis in requested {
            let (marking, findings) = run_check(&cfg, &ctx.scope, analysis);
            println!("[{}]", analysis.name());
            if self.options.verbose || findings.is_empty() {
                for node in cfg.nodes() {
                    println!(
                        "  {:>3}: {}  in={}  out={}",
                        node.id,
                        node.stmt.summary(),
                        render_facts(&marking.entry[node.id]),
                        render_facts(&marking.exit[node.id]),
                    );
                }
            }
            for finding in &findings {
                println!("  node {}: {}", finding.node, finding.message);
            }
            if !findings.is_empty() {
                exit_code = 1;
            }
        }
        exit_code
    }
}

fn render_facts(facts: &std::collections::BTreeSet<Fact>) -> String {
    let rendered: Vec<String> = facts
        .iter()
        .map(|fact| match fact {
            Fact::Reachable => "reachable".to_string(),
            Fact::Live(name) => name.clone(),
            Fact::Init(name) => format!("init({})", name),
            Fact::Write(name, node) => format!("{}@{}", name, node),
            Fact::Tainted(name) => format!("tainted({})", name),
        })
        .collect();
    format!("{{{}}}", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_and_analyses_exit_codes() {
        let options = VerifyOptions {
            run: true,
            reachability: true,
            input: Some(vec![BigInt::from(2)]),
            ..VerifyOptions::default()
        };
        let pipeline = Pipeline::new(options);
        let code = pipeline
            .process_source(
                "vars: int x; code: extern x 0..5; x := x + 1;",
                "ok.wl",
            )
            .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_unreachable_code_fails_exit_code() {
        let options = VerifyOptions {
            reachability: true,
            ..VerifyOptions::default()
        };
        let pipeline = Pipeline::new(options);
        let code = pipeline
            .process_source("vars: int x; code: fail \"x\"; x := 1;", "bad.wl")
            .unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn test_type_error_propagates() {
        let pipeline = Pipeline::new(VerifyOptions::default());
        let err = pipeline
            .process_source("vars: int x; code: *x := 1;", "bad.wl")
            .unwrap_err();
        assert!(matches!(err, VerifierError::Type(_)));
    }

    #[test]
    fn test_runtime_error_sets_exit_code() {
        let options = VerifyOptions {
            run: true,
            ..VerifyOptions::default()
        };
        let pipeline = Pipeline::new(options);
        let code = pipeline
            .process_source("vars: int x; code: assert (x = 1);", "bad.wl")
            .unwrap();
        assert_eq!(code, 1);
    }
}
