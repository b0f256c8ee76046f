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

//! SMT facade
//!
//! Translates verification formulas to the solver theory of integers plus
//! arrays, runs the solver, and lifts models back as name → literal maps.
//! Each facade instance is one session: models returned earlier in the
//! session are blocked in later queries so enumeration explores distinct
//! witnesses. Sessions are not shared between checkers.

pub mod process;
pub mod translate;

use crate::ast::{ArithExpr, BoolExpr};
use num_bigint::BigInt;
use num_traits::Zero;
use process::{SolverBackend, Verdict};
use std::collections::BTreeMap;
use tracing::debug;

/// Status of one `solve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Sat,
    Unsat,
    Unknown,
    Error(String),
}

/// Result of one `solve` call. The model is non-empty only for `Sat`.
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolveStatus,
    pub model: BTreeMap<String, String>,
}

impl Solution {
    fn of(status: SolveStatus) -> Self {
        Self {
            status,
            model: BTreeMap::new(),
        }
    }

    pub fn is_sat(&self) -> bool {
        self.status == SolveStatus::Sat
    }

    pub fn is_unsat(&self) -> bool {
        self.status == SolveStatus::Unsat
    }

    /// Render the model as `name = literal` lines in name order.
    pub fn model_text(&self) -> String {
        self.model
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One SMT session with call counters.
pub struct Smt {
    backend: SolverBackend,
    blocked: Vec<BTreeMap<String, String>>,
    bool_evaluation: bool,
    solve_calls: usize,
    simplify_calls: usize,
    interpolant_calls: usize,
}

impl Smt {
    pub fn new() -> Self {
        Self::with_backend(SolverBackend::z3())
    }

    pub fn with_backend(backend: SolverBackend) -> Self {
        Self {
            backend,
            blocked: Vec::new(),
            bool_evaluation: false,
            solve_calls: 0,
            simplify_calls: 0,
            interpolant_calls: 0,
        }
    }

    /// Enable the 0/1-sentinel fallback used when interpolation is not
    /// available from the backend.
    pub fn bool_evaluation(mut self, on: bool) -> Self {
        self.bool_evaluation = on;
        self
    }

    /// Whether the configured solver binary can be spawned.
    pub fn available(&self) -> bool {
        self.backend.available()
    }

    /// Check satisfiability of `formula`, conjoined with the negation of
    /// every model previously returned by this session.
    pub fn solve(&mut self, formula: &BoolExpr) -> Solution {
        self.solve_calls += 1;
        let (script, _decls) =
            match translate::script(formula, &self.blocked, self.bool_evaluation) {
                Ok(script) => script,
                Err(e) => return Solution::of(SolveStatus::Error(e.to_string())),
            };
        debug!(query = self.solve_calls, "smt solve");
        let output = match self.backend.run(&script) {
            Ok(output) => output,
            Err(e) => return Solution::of(SolveStatus::Error(e.to_string())),
        };
        match process::parse_verdict(&output) {
            Ok(Verdict::Sat) => {
                let model = process::parse_model(&output);
                self.blocked.push(model.clone());
                Solution {
                    status: SolveStatus::Sat,
                    model,
                }
            }
            Ok(Verdict::Unsat) => Solution::of(SolveStatus::Unsat),
            Ok(Verdict::Unknown) => Solution::of(SolveStatus::Unknown),
            Err(e) => Solution::of(SolveStatus::Error(e.to_string())),
        }
    }

    /// Structural simplification: constant folding and boolean absorption.
    pub fn simplify(&mut self, formula: &BoolExpr) -> BoolExpr {
        self.simplify_calls += 1;
        simplify_bool(formula)
    }

    /// An interpolant I with `A ⇒ I` and `I ∧ B` unsat, when the backend
    /// supports interpolation. The process backend does not; callers fall
    /// back to boolean-evaluation mode.
    pub fn interpolant(&mut self, _a: &BoolExpr, _b: &BoolExpr) -> Option<BoolExpr> {
        self.interpolant_calls += 1;
        None
    }

    pub fn solve_calls(&self) -> usize {
        self.solve_calls
    }

    pub fn simplify_calls(&self) -> usize {
        self.simplify_calls
    }

    pub fn interpolant_calls(&self) -> usize {
        self.interpolant_calls
    }

    pub fn reset(&mut self) {
        self.solve_calls = 0;
        self.simplify_calls = 0;
        self.interpolant_calls = 0;
    }
}

impl Default for Smt {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold constants and absorb boolean identities, bottom up.
pub fn simplify_bool(expr: &BoolExpr) -> BoolExpr {
    use BoolExpr::*;
    match expr {
        True | False => expr.clone(),
        Not(inner) => match simplify_bool(inner) {
            True => False,
            False => True,
            Not(doubled) => *doubled,
            simplified => Not(Box::new(simplified)),
        },
        And(l, r) => match (simplify_bool(l), simplify_bool(r)) {
            (False, _) | (_, False) => False,
            (True, other) | (other, True) => other,
            (sl, sr) => And(Box::new(sl), Box::new(sr)),
        },
        Or(l, r) => match (simplify_bool(l), simplify_bool(r)) {
            (True, _) | (_, True) => True,
            (False, other) | (other, False) => other,
            (sl, sr) => Or(Box::new(sl), Box::new(sr)),
        },
        Imply(l, r) => match (simplify_bool(l), simplify_bool(r)) {
            (False, _) => True,
            (_, True) => True,
            (True, other) => other,
            (sl, False) => simplify_bool(&sl.not()),
            (sl, sr) => Imply(Box::new(sl), Box::new(sr)),
        },
        Equiv(l, r) => match (simplify_bool(l), simplify_bool(r)) {
            (True, other) | (other, True) => other,
            (False, other) | (other, False) => simplify_bool(&other.not()),
            (sl, sr) => Equiv(Box::new(sl), Box::new(sr)),
        },
        Eq {
            left,
            right,
            nesting,
        } => {
            let sl = simplify_arith(left);
            let sr = simplify_arith(right);
            match (sl.as_number(), sr.as_number()) {
                (Some(a), Some(b)) => {
                    if a == b {
                        True
                    } else {
                        False
                    }
                }
                _ => Eq {
                    left: Box::new(sl),
                    right: Box::new(sr),
                    nesting: *nesting,
                },
            }
        }
        Lt(l, r) => fold_comparison(l, r, |a, b| a < b, |sl, sr| Lt(sl, sr)),
        Lte(l, r) => fold_comparison(l, r, |a, b| a <= b, |sl, sr| Lte(sl, sr)),
        Gt(l, r) => fold_comparison(l, r, |a, b| a > b, |sl, sr| Gt(sl, sr)),
        Gte(l, r) => fold_comparison(l, r, |a, b| a >= b, |sl, sr| Gte(sl, sr)),
        Forall { bound, body } => match simplify_bool(body) {
            True => True,
            simplified => Forall {
                bound: bound.clone(),
                body: Box::new(simplified),
            },
        },
        ArrayEq(l, r) => {
            if l == r {
                True
            } else {
                expr.clone()
            }
        }
    }
}

fn fold_comparison(
    l: &ArithExpr,
    r: &ArithExpr,
    decide: impl Fn(&BigInt, &BigInt) -> bool,
    rebuild: impl Fn(Box<ArithExpr>, Box<ArithExpr>) -> BoolExpr,
) -> BoolExpr {
    let sl = simplify_arith(l);
    let sr = simplify_arith(r);
    match (sl.as_number(), sr.as_number()) {
        (Some(a), Some(b)) => {
            if decide(a, b) {
                BoolExpr::True
            } else {
                BoolExpr::False
            }
        }
        _ => rebuild(Box::new(sl), Box::new(sr)),
    }
}

/// Constant-fold arithmetic. Division and remainder by a literal zero are
/// left untouched so the error surfaces at evaluation time.
pub fn simplify_arith(expr: &ArithExpr) -> ArithExpr {
    use ArithExpr::*;
    match expr {
        Num(_) | ValAt(_) | AddressOf(_) => expr.clone(),
        Add(l, r) => fold_binary(l, r, |a, b| a + b, |sl, sr| Add(sl, sr)),
        Sub(l, r) => fold_binary(l, r, |a, b| a - b, |sl, sr| Sub(sl, sr)),
        Mul(l, r) => fold_binary(l, r, |a, b| a * b, |sl, sr| Mul(sl, sr)),
        Div(l, r) => {
            let sl = simplify_arith(l);
            let sr = simplify_arith(r);
            match (sl.as_number(), sr.as_number()) {
                (Some(a), Some(b)) if !b.is_zero() => Num(a / b),
                _ => Div(Box::new(sl), Box::new(sr)),
            }
        }
        Rem(l, r) => {
            let sl = simplify_arith(l);
            let sr = simplify_arith(r);
            match (sl.as_number(), sr.as_number()) {
                (Some(a), Some(b)) if !b.is_zero() => Num(a % b),
                _ => Rem(Box::new(sl), Box::new(sr)),
            }
        }
        Neg(inner) => match simplify_arith(inner) {
            Num(n) => Num(-n),
            simplified => Neg(Box::new(simplified)),
        },
        Select(arr, idx) => Select(arr.clone(), Box::new(simplify_arith(idx))),
    }
}

fn fold_binary(
    l: &ArithExpr,
    r: &ArithExpr,
    combine: impl Fn(&BigInt, &BigInt) -> BigInt,
    rebuild: impl Fn(Box<ArithExpr>, Box<ArithExpr>) -> ArithExpr,
) -> ArithExpr {
    let sl = simplify_arith(l);
    let sr = simplify_arith(r);
    match (sl.as_number(), sr.as_number()) {
        (Some(a), Some(b)) => ArithExpr::Num(combine(a, b)),
        _ => rebuild(Box::new(sl), Box::new(sr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_boolean_absorption() {
        let phi = BoolExpr::True.and(BoolExpr::lt(ArithExpr::symbol("x"), ArithExpr::num(3)));
        assert_eq!(
            simplify_bool(&phi),
            BoolExpr::lt(ArithExpr::symbol("x"), ArithExpr::num(3))
        );
        assert_eq!(simplify_bool(&BoolExpr::False.and(BoolExpr::True)), BoolExpr::False);
        assert_eq!(
            simplify_bool(&BoolExpr::False.imply(BoolExpr::False)),
            BoolExpr::True
        );
    }

    #[test]
    fn test_simplify_implication_to_true() {
        // (c => true) and (not c => true)  simplifies to  true
        let c = BoolExpr::lt(ArithExpr::symbol("x"), ArithExpr::num(0));
        let phi = c.clone().imply(BoolExpr::True).and(c.not().imply(BoolExpr::True));
        assert_eq!(simplify_bool(&phi), BoolExpr::True);
    }

    #[test]
    fn test_simplify_constant_comparison() {
        let phi = BoolExpr::lt(ArithExpr::num(2).add(ArithExpr::num(3)), ArithExpr::num(10));
        assert_eq!(simplify_bool(&phi), BoolExpr::True);
        let phi = BoolExpr::eq(ArithExpr::num(4), ArithExpr::num(5));
        assert_eq!(simplify_bool(&phi), BoolExpr::False);
    }

    #[test]
    fn test_simplify_keeps_division_by_zero() {
        let e = ArithExpr::Div(Box::new(ArithExpr::num(1)), Box::new(ArithExpr::num(0)));
        assert_eq!(simplify_arith(&e), e);
    }

    #[test]
    fn test_simplify_forall_of_true() {
        let phi = BoolExpr::forall("v", BoolExpr::True.or(BoolExpr::False));
        assert_eq!(simplify_bool(&phi), BoolExpr::True);
    }

    #[test]
    fn test_counters_and_reset() {
        let mut smt = Smt::new();
        smt.simplify(&BoolExpr::True);
        smt.simplify(&BoolExpr::False);
        smt.interpolant(&BoolExpr::True, &BoolExpr::False);
        assert_eq!(smt.simplify_calls(), 2);
        assert_eq!(smt.interpolant_calls(), 1);
        assert_eq!(smt.solve_calls(), 0);
        smt.reset();
        assert_eq!(smt.simplify_calls(), 0);
        assert_eq!(smt.interpolant_calls(), 0);
    }
}
