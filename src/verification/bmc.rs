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

//! Bounded model checking
//!
//! Unrolls the transition relation step by step and asks the solver for a
//! state sequence violating the safety invariant. A satisfying assignment
//! is a concrete counterexample trace; exhausting the bound establishes
//! safety only within the bound and reports `NoResult`.

use super::encoder::TransitionSystem;
use super::CheckOutcome;
use crate::ast::BoolExpr;
use crate::smt::{Smt, SolveStatus};
use tracing::info;

/// Run BMC up to `max_bound` unrollings.
pub fn bmc(ts: &TransitionSystem, smt: &mut Smt, max_bound: u32) -> CheckOutcome {
    let mut unrolled = ts.zeroed_initial();
    let mut safety = ts.numbered_invariant(0);
    for k in 0..=max_bound {
        if k > 0 {
            unrolled = unrolled.and(ts.numbered_transitions(k - 1, k));
            safety = safety.and(ts.numbered_invariant(k));
        }
        let query = unrolled.clone().and(safety.clone().not());
        info!(bound = k, "bmc query");
        let solution = smt.solve(&query);
        match solution.status {
            SolveStatus::Sat => {
                return CheckOutcome::Counterexample(solution.model_text());
            }
            SolveStatus::Unsat => continue,
            SolveStatus::Unknown => {
                return CheckOutcome::Crash(format!("solver returned unknown at bound {}", k));
            }
            SolveStatus::Error(message) => return CheckOutcome::Crash(message),
        }
    }
    CheckOutcome::NoResult(format!(
        "no counterexample within {} unrollings",
        max_bound
    ))
}

/// The BMC query at one exact bound, exposed for the combined checker and
/// for tests: `I₀ ∧ T₀₁ ∧ … ∧ T_{k−1,k} ∧ ¬(Inv₀ ∧ … ∧ Inv_k)`.
pub fn query_at(ts: &TransitionSystem, k: u32) -> BoolExpr {
    let mut unrolled = ts.zeroed_initial();
    for i in 1..=k {
        unrolled = unrolled.and(ts.numbered_transitions(i - 1, i));
    }
    let mut safety = ts.numbered_invariant(0);
    for i in 1..=k {
        safety = safety.and(ts.numbered_invariant(i));
    }
    unrolled.and(safety.not())
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
    fn test_query_mentions_all_steps() {
        let ts = system("vars: int x; code: x := 1; x := 2;");
        let query = query_at(&ts, 2);
        let symbols = query.free_symbols();
        for name in ["loc_0", "loc_1", "loc_2", "x_0", "x_1", "x_2"] {
            assert!(symbols.contains(name), "missing {}", name);
        }
        assert!(!query.has_temporal_markers());
    }

    #[test]
    fn test_fail_program_has_counterexample() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: code: if (true) { fail \"x\"; } else { };");
        let mut smt = smt;
        match bmc(&ts, &mut smt, 3) {
            CheckOutcome::Counterexample(_) => {}
            other => panic!("expected counterexample, got {:?}", other),
        }
        assert!(smt.solve_calls() >= 1);
    }

    #[test]
    fn test_safe_havoc_reaches_bound() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: int x; code: extern x 0..5; assert (x < 10);");
        let mut smt = smt;
        match bmc(&ts, &mut smt, 4) {
            CheckOutcome::NoResult(_) => {}
            other => panic!("expected no result within bound, got {:?}", other),
        }
    }

    #[test]
    fn test_unsafe_havoc_found() {
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ts = system("vars: int x; code: extern x 0..20; assert (x < 10);");
        let mut smt = smt;
        match bmc(&ts, &mut smt, 4) {
            CheckOutcome::Counterexample(model) => {
                // The havoc unknown must witness a value of at least 10.
                let witness = model
                    .split(", ")
                    .find(|part| part.starts_with("extern_0_1 ="))
                    .and_then(|part| part.rsplit(' ').next())
                    .and_then(|text| text.parse::<i64>().ok());
                if let Some(value) = witness {
                    assert!(value >= 10, "witness {} should violate x < 10", value);
                }
            }
            other => panic!("expected counterexample, got {:?}", other),
        }
    }
}
