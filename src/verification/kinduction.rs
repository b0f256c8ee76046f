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

//! k-induction, plain and interleaved with bounded model checking
//!
//! The inductive step quantifies over arbitrary runs of length k: if every
//! k-step run satisfying the invariant k times also satisfies it at step
//! k, the invariant holds for all lengths. The base case is discharged
//! against the real initial condition; the depth check stops early on
//! programs shorter than the induction depth.

use super::encoder::TransitionSystem;
use super::CheckOutcome;
use crate::smt::{Smt, SolveStatus};
use tracing::info;

/// Plain k-induction with depths 1..=`k_bound`.
pub fn k_induction(ts: &TransitionSystem, smt: &mut Smt, k_bound: u32) -> CheckOutcome {
    for k in 1..=k_bound {
        info!(depth = k, "k-induction round");

        // 1. Depth check: the program has a run of length k − 1.
        let mut depth = ts.zeroed_initial();
        for i in 2..=k {
            depth = depth.and(ts.numbered_transitions(i - 2, i - 1));
        }
        match smt.solve(&depth).status {
            SolveStatus::Sat => {}
            SolveStatus::Unsat => {
                return CheckOutcome::NoResult(format!(
                    "program has no run of length {}; it may be shorter than the induction depth",
                    k - 1
                ));
            }
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!("solver returned unknown at depth check {}", k))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }

        // 2. Base case: the invariant holds along every prefix of length
        // k − 1 from the initial states.
        let mut base_safety = ts.numbered_invariant(0);
        for i in 1..k {
            base_safety = base_safety.and(ts.numbered_invariant(i));
        }
        let base = depth.clone().and(base_safety.not());
        let solution = smt.solve(&base);
        match solution.status {
            SolveStatus::Unsat => {}
            SolveStatus::Sat => {
                return CheckOutcome::Counterexample(solution.model_text());
            }
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!("solver returned unknown at base case {}", k))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }

        // 3. Inductive step: k invariant-satisfying transitions imply the
        // invariant after the k-th.
        let mut antecedent = ts.numbered_invariant(0);
        for i in 1..=k {
            antecedent = antecedent
                .and(ts.numbered_transitions(i - 1, i))
                .and(ts.numbered_invariant(i - 1));
        }
        let step = antecedent.and(ts.numbered_invariant(k).not());
        match smt.solve(&step).status {
            SolveStatus::Unsat => return CheckOutcome::Proof,
            SolveStatus::Sat => continue,
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!(
                    "solver returned unknown at inductive step {}",
                    k
                ))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }
    }
    CheckOutcome::NoResult(format!("not inductive up to depth {}", k_bound))
}

/// k-induction interleaved with BMC: each round first looks for a real
/// counterexample of exactly that length, then tries to close the proof
/// inductively. The accumulated antecedent is shared between the two.
pub fn k_induction_with_bmc(
    ts: &TransitionSystem,
    smt: &mut Smt,
    k_bound: u32,
) -> CheckOutcome {
    // Initial states violating the invariant outright.
    let immediate = ts.zeroed_initial().and(ts.numbered_invariant(0).not());
    let solution = smt.solve(&immediate);
    match solution.status {
        SolveStatus::Sat => {
            return CheckOutcome::Counterexample(solution.model_text());
        }
        SolveStatus::Unsat => {}
        SolveStatus::Unknown => {
            return CheckOutcome::Crash("solver returned unknown at the initial check".to_string())
        }
        SolveStatus::Error(message) => return CheckOutcome::Crash(message),
    }

    let mut accumulated = crate::ast::BoolExpr::True;
    for k in 1..=k_bound {
        info!(depth = k, "k-induction+bmc round");
        accumulated = accumulated
            .and(ts.numbered_transitions(k - 1, k))
            .and(ts.numbered_invariant(k - 1));
        let violated = ts.numbered_invariant(k).not();

        // Bounded search for a real counterexample of length k.
        let bounded = ts
            .zeroed_initial()
            .and(accumulated.clone())
            .and(violated.clone());
        let solution = smt.solve(&bounded);
        match solution.status {
            SolveStatus::Sat => {
                return CheckOutcome::Counterexample(solution.model_text());
            }
            SolveStatus::Unsat => {}
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!(
                    "solver returned unknown at bounded check {}",
                    k
                ))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }

        // Depth check, as in plain k-induction.
        let mut depth = ts.zeroed_initial();
        for i in 2..=k {
            depth = depth.and(ts.numbered_transitions(i - 2, i - 1));
        }
        match smt.solve(&depth).status {
            SolveStatus::Sat => {}
            SolveStatus::Unsat => {
                return CheckOutcome::NoResult(format!(
                    "program has no run of length {}; it may be shorter than the induction depth",
                    k - 1
                ));
            }
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!("solver returned unknown at depth check {}", k))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }

        // Inductive step over the shared antecedent.
        let step = accumulated.clone().and(violated);
        match smt.solve(&step).status {
            SolveStatus::Unsat => return CheckOutcome::Proof,
            SolveStatus::Sat => continue,
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!(
                    "solver returned unknown at inductive step {}",
                    k
                ))
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }
    }
    CheckOutcome::NoResult(format!("not inductive up to depth {}", k_bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::verification::encoder::{encode, EncoderOptions};

    fn system(source: &str) -> TransitionSystem {
        let ctx = parse_program(source, "t.wl").unwrap();
        encode(&ctx, &EncoderOptions::default())
    }

    #[test]
    fn test_straight_line_proof() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: int x; code: x := 1; post: (x = 1)");
        let mut smt = smt;
        // A 3-step induction covers the 1-statement program.
        match k_induction(&ts, &mut smt, 4) {
            CheckOutcome::Proof | CheckOutcome::NoResult(_) => {}
            other => panic!("straight-line program must not refute, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_safe_havoc_proved() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: int x; code: extern x 0..5; assert (x < 10);");
        let mut smt = smt;
        match k_induction_with_bmc(&ts, &mut smt, 6) {
            CheckOutcome::Proof => {}
            other => panic!("expected proof, got {:?}", other),
        }
    }

    #[test]
    fn test_unsafe_havoc_refuted() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: int x; code: extern x 0..20; assert (x < 10);");
        let mut smt = smt;
        match k_induction_with_bmc(&ts, &mut smt, 6) {
            CheckOutcome::Counterexample(_) => {}
            other => panic!("expected counterexample, got {:?}", other),
        }
    }

    #[test]
    fn test_solver_missing_is_crash() {
        let backend = crate::smt::process::SolverBackend::with_command(
            "definitely-not-a-solver-binary",
            &[],
        );
        let mut smt = Smt::with_backend(backend);
        let ts = system("vars: int x; code: x := 1;");
        match k_induction(&ts, &mut smt, 2) {
            CheckOutcome::Crash(_) => {}
            other => panic!("expected crash, got {:?}", other),
        }
    }
}
