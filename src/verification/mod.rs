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

//! Verification approaches and their common result contract
//!
//! Every checker returns a `CheckOutcome`; outcomes are values, never
//! errors. Each approach owns its SMT session, so declaration sets and
//! blocked models are isolated between checkers.

pub mod bmc;
pub mod encoder;
pub mod kinduction;
pub mod wpc;

use crate::parser::Context;
use crate::smt::{Smt, SolveStatus};
use encoder::EncoderOptions;
use serde::Serialize;
use tracing::info;
use wpc::VcOptions;

/// The outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CheckOutcome {
    /// The program satisfies its annotations for all executions.
    Proof,
    /// A witness violating the annotations, as `name = literal` text.
    Counterexample(String),
    /// Nothing was established either way (bound exhausted, not
    /// inductive, or shorter than the induction depth).
    NoResult(String),
    /// The checker itself failed (solver missing, unknown verdict,
    /// refused program).
    Crash(String),
}

impl CheckOutcome {
    pub fn is_conclusive(&self) -> bool {
        matches!(self, CheckOutcome::Proof | CheckOutcome::Counterexample(_))
    }

    /// Short classification label used by reports.
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Proof => "Proof",
            CheckOutcome::Counterexample(_) => "Counterexample",
            CheckOutcome::NoResult(_) => "NoResult",
            CheckOutcome::Crash(_) => "Crash",
        }
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Proof => write!(f, "Proof"),
            CheckOutcome::Counterexample(model) => write!(f, "Counterexample: {}", model),
            CheckOutcome::NoResult(text) => write!(f, "NoResult: {}", text),
            CheckOutcome::Crash(text) => write!(f, "Crash: {}", text),
        }
    }
}

/// A verification approach over annotated programs.
pub trait Approach {
    fn name(&self) -> &'static str;

    /// Run the approach. The context is assumed type-correct.
    fn run(&mut self, ctx: &Context) -> CheckOutcome;

    /// Solver queries issued by the last `run`.
    fn smt_calls(&self) -> usize;
}

/// Deductive verification through the weakest-precondition calculus.
pub struct WpcApproach {
    pub options: VcOptions,
    smt_calls: usize,
}

impl WpcApproach {
    pub fn new(options: VcOptions) -> Self {
        Self {
            options,
            smt_calls: 0,
        }
    }
}

impl Default for WpcApproach {
    fn default() -> Self {
        Self::new(VcOptions::default())
    }
}

impl Approach for WpcApproach {
    fn name(&self) -> &'static str {
        "wpc"
    }

    fn run(&mut self, ctx: &Context) -> CheckOutcome {
        let mut smt = Smt::new();
        let outcome = self.run_with(ctx, &mut smt);
        self.smt_calls = smt.solve_calls();
        outcome
    }

    fn smt_calls(&self) -> usize {
        self.smt_calls
    }
}

impl WpcApproach {
    fn run_with(&self, ctx: &Context, smt: &mut Smt) -> CheckOutcome {
        let vcs = match wpc::generate_vcs(ctx, &self.options) {
            Ok(vcs) => vcs,
            Err(e) => return CheckOutcome::Crash(e.to_string()),
        };
        info!(count = vcs.len(), "discharging verification conditions");
        for vc in &vcs {
            let solution = smt.solve(&vc.smt_test());
            match solution.status {
                SolveStatus::Unsat => continue,
                SolveStatus::Sat => {
                    return CheckOutcome::Counterexample(format!(
                        "{} refuted: {}",
                        vc.explanation,
                        solution.model_text()
                    ));
                }
                SolveStatus::Unknown => {
                    return CheckOutcome::NoResult(format!(
                        "solver could not decide: {}",
                        vc.explanation
                    ));
                }
                SolveStatus::Error(message) => return CheckOutcome::Crash(message),
            }
        }
        CheckOutcome::Proof
    }
}

/// Bounded model checking.
pub struct BmcApproach {
    pub max_bound: u32,
    pub encoder_options: EncoderOptions,
    smt_calls: usize,
}

impl BmcApproach {
    pub fn new(max_bound: u32) -> Self {
        Self {
            max_bound,
            encoder_options: EncoderOptions::default(),
            smt_calls: 0,
        }
    }
}

impl Approach for BmcApproach {
    fn name(&self) -> &'static str {
        "bmc"
    }

    fn run(&mut self, ctx: &Context) -> CheckOutcome {
        let ts = encoder::encode(ctx, &self.encoder_options);
        let mut smt = Smt::new();
        let outcome = bmc::bmc(&ts, &mut smt, self.max_bound);
        self.smt_calls = smt.solve_calls();
        outcome
    }

    fn smt_calls(&self) -> usize {
        self.smt_calls
    }
}

/// Plain k-induction.
pub struct KInductionApproach {
    pub k_bound: u32,
    pub encoder_options: EncoderOptions,
    smt_calls: usize,
}

impl KInductionApproach {
    pub fn new(k_bound: u32, encoder_options: EncoderOptions) -> Self {
        Self {
            k_bound,
            encoder_options,
            smt_calls: 0,
        }
    }
}

impl Approach for KInductionApproach {
    fn name(&self) -> &'static str {
        "k-induction"
    }

    fn run(&mut self, ctx: &Context) -> CheckOutcome {
        let ts = encoder::encode(ctx, &self.encoder_options);
        let mut smt = Smt::new();
        let outcome = kinduction::k_induction(&ts, &mut smt, self.k_bound);
        self.smt_calls = smt.solve_calls();
        outcome
    }

    fn smt_calls(&self) -> usize {
        self.smt_calls
    }
}

/// k-induction interleaved with BMC.
pub struct KIndBmcApproach {
    pub k_bound: u32,
    pub encoder_options: EncoderOptions,
    smt_calls: usize,
}

impl KIndBmcApproach {
    pub fn new(k_bound: u32, encoder_options: EncoderOptions) -> Self {
        Self {
            k_bound,
            encoder_options,
            smt_calls: 0,
        }
    }
}

impl Approach for KIndBmcApproach {
    fn name(&self) -> &'static str {
        "k-induction+bmc"
    }

    fn run(&mut self, ctx: &Context) -> CheckOutcome {
        let ts = encoder::encode(ctx, &self.encoder_options);
        let mut smt = Smt::new();
        let outcome = kinduction::k_induction_with_bmc(&ts, &mut smt, self.k_bound);
        self.smt_calls = smt.solve_calls();
        outcome
    }

    fn smt_calls(&self) -> usize {
        self.smt_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CheckOutcome::Proof.label(), "Proof");
        assert_eq!(
            CheckOutcome::Counterexample("x = 1".to_string()).label(),
            "Counterexample"
        );
        assert!(CheckOutcome::Proof.is_conclusive());
        assert!(!CheckOutcome::NoResult("bound".to_string()).is_conclusive());
    }

    #[test]
    fn test_wpc_refusal_is_crash() {
        let ctx = parse_program("vars: int x; int* p; code: *p := 1;", "t.wl").unwrap();
        let mut approach = WpcApproach::default();
        match approach.run(&ctx) {
            CheckOutcome::Crash(message) => assert!(message.contains("plain variables")),
            other => panic!("expected crash, got {:?}", other),
        }
    }

    #[test]
    fn test_gauss_wpc_proof() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ctx = parse_program(
            r#"vars: int n; int i; int sum;
               pre: (n = 0 and (i = 0 and sum = 1))
               code: extern n 0..100; i := 0; sum := 0;
                     while (i < n) invariant ((sum = ((i*(i+1))/2)) and not (n < i)) {
                       i := i+1; sum := sum + i; assert (i <= n);
                     }; assert (n = i);
               post: (sum = ((n*(n+1))/2))"#,
            "gauss.wl",
        )
        .unwrap();
        let mut approach = WpcApproach::default();
        match approach.run(&ctx) {
            CheckOutcome::Proof => {}
            other => panic!("expected proof, got {}", other),
        }
        assert_eq!(approach.smt_calls(), 4);
    }

    #[test]
    fn test_outcome_serializes() {
        let json = serde_json::to_string(&CheckOutcome::Proof).unwrap();
        assert!(json.contains("Proof"));
    }
}
