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

//! Translation of verification formulas to SMT-LIB2 text
//!
//! Integers map to the solver's `Int` sort, memory terms to
//! `(Array Int Int)`, `Forall` to universal quantification over `Int`.
//! Only symbol reads (`ValAtAddr` of a plain variable), array terms, and
//! the boolean/arithmetic connectives are translatable; anything else is
//! rejected so executor-only expressions can never leak into a query.

use crate::ast::{ArithExpr, ArrayExpr, BoolExpr};
use crate::error::SmtError;
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Names the unnumbered memory arrays translate to.
pub const ANY_ARRAY_NAME: &str = "M_";
pub const ANY_ARRAY_PRIMED_NAME: &str = "M_p";

/// Declarations collected while translating one query.
#[derive(Debug, Default)]
pub struct Declarations {
    /// Integer constants.
    pub consts: BTreeSet<String>,
    /// Array constants.
    pub arrays: BTreeSet<String>,
}

impl Declarations {
    pub fn is_declared_const(&self, name: &str) -> bool {
        self.consts.contains(name)
    }
}

/// A complete `check-sat` script for one formula.
pub fn script(
    formula: &BoolExpr,
    blocked_models: &[BTreeMap<String, String>],
    bool_evaluation: bool,
) -> Result<(String, Declarations), SmtError> {
    let mut decls = Declarations::default();
    let body = translate_bool(formula, &mut decls, &BTreeSet::new())?;

    let mut text = String::new();
    for name in &decls.consts {
        writeln!(text, "(declare-const {} Int)", quote(name)).expect("write to string");
    }
    for name in &decls.arrays {
        writeln!(text, "(declare-const {} (Array Int Int))", quote(name)).expect("write to string");
    }
    writeln!(text, "(assert {})", body).expect("write to string");

    // Block every model previously returned by this session so repeated
    // queries enumerate distinct witnesses.
    for model in blocked_models {
        let mut parts = Vec::new();
        for (name, literal) in model {
            if decls.is_declared_const(name) && literal.parse::<i64>().is_ok() {
                parts.push(format!("(= {} {})", quote(name), number_text(literal)));
            }
        }
        if !parts.is_empty() {
            writeln!(text, "(assert (not (and {})))", parts.join(" ")).expect("write to string");
        }
    }

    // Boolean-evaluation mode: every integer constant except the memory
    // array and the location counters is a 0/1 sentinel.
    if bool_evaluation {
        for name in &decls.consts {
            if name.starts_with("loc") {
                continue;
            }
            writeln!(
                text,
                "(assert (or (= {n} 0) (= {n} 1)))",
                n = quote(name)
            )
            .expect("write to string");
        }
    }

    writeln!(text, "(check-sat)").expect("write to string");
    writeln!(text, "(get-model)").expect("write to string");
    Ok((text, decls))
}

fn number_text(literal: &str) -> String {
    match literal.strip_prefix('-') {
        Some(abs) => format!("(- {})", abs),
        None => literal.to_string(),
    }
}

/// Quote a symbol when it is not a plain SMT-LIB simple symbol.
fn quote(name: &str) -> String {
    let simple = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '!');
    if simple && !name.is_empty() {
        name.to_string()
    } else {
        format!("|{}|", name)
    }
}

pub fn translate_bool(
    expr: &BoolExpr,
    decls: &mut Declarations,
    bound: &BTreeSet<String>,
) -> Result<String, SmtError> {
    let text = match expr {
        BoolExpr::True => "true".to_string(),
        BoolExpr::False => "false".to_string(),
        BoolExpr::Not(inner) => format!("(not {})", translate_bool(inner, decls, bound)?),
        BoolExpr::And(l, r) => format!(
            "(and {} {})",
            translate_bool(l, decls, bound)?,
            translate_bool(r, decls, bound)?
        ),
        BoolExpr::Or(l, r) => format!(
            "(or {} {})",
            translate_bool(l, decls, bound)?,
            translate_bool(r, decls, bound)?
        ),
        BoolExpr::Imply(l, r) => format!(
            "(=> {} {})",
            translate_bool(l, decls, bound)?,
            translate_bool(r, decls, bound)?
        ),
        BoolExpr::Equiv(l, r) => format!(
            "(= {} {})",
            translate_bool(l, decls, bound)?,
            translate_bool(r, decls, bound)?
        ),
        BoolExpr::Eq { left, right, .. } => format!(
            "(= {} {})",
            translate_arith(left, decls, bound)?,
            translate_arith(right, decls, bound)?
        ),
        BoolExpr::Lt(l, r) => format!(
            "(< {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        BoolExpr::Lte(l, r) => format!(
            "(<= {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        BoolExpr::Gt(l, r) => format!(
            "(> {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        BoolExpr::Gte(l, r) => format!(
            "(>= {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        BoolExpr::Forall { bound: name, body } => {
            let mut inner_bound = bound.clone();
            inner_bound.insert(name.clone());
            format!(
                "(forall (({} Int)) {})",
                quote(name),
                translate_bool(body, decls, &inner_bound)?
            )
        }
        BoolExpr::ArrayEq(l, r) => format!(
            "(= {} {})",
            translate_array(l, decls, bound)?,
            translate_array(r, decls, bound)?
        ),
    };
    Ok(text)
}

pub fn translate_arith(
    expr: &ArithExpr,
    decls: &mut Declarations,
    bound: &BTreeSet<String>,
) -> Result<String, SmtError> {
    let text = match expr {
        ArithExpr::Num(n) => bigint_text(n),
        ArithExpr::Add(l, r) => format!(
            "(+ {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        ArithExpr::Sub(l, r) => format!(
            "(- {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        ArithExpr::Mul(l, r) => format!(
            "(* {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        ArithExpr::Div(l, r) => format!(
            "(div {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        ArithExpr::Rem(l, r) => format!(
            "(mod {} {})",
            translate_arith(l, decls, bound)?,
            translate_arith(r, decls, bound)?
        ),
        ArithExpr::Neg(inner) => format!("(- {})", translate_arith(inner, decls, bound)?),
        ArithExpr::ValAt(addr) => match addr.as_variable() {
            Some(name) => {
                if !bound.contains(name) {
                    decls.consts.insert(name.to_string());
                }
                quote(name)
            }
            None => {
                return Err(SmtError::Untranslatable {
                    expr: expr.to_string(),
                })
            }
        },
        ArithExpr::AddressOf(_) => {
            return Err(SmtError::Untranslatable {
                expr: expr.to_string(),
            })
        }
        ArithExpr::Select(arr, idx) => format!(
            "(select {} {})",
            translate_array(arr, decls, bound)?,
            translate_arith(idx, decls, bound)?
        ),
    };
    Ok(text)
}

fn translate_array(
    expr: &ArrayExpr,
    decls: &mut Declarations,
    bound: &BTreeSet<String>,
) -> Result<String, SmtError> {
    let text = match expr {
        ArrayExpr::AnyArray => {
            decls.arrays.insert(ANY_ARRAY_NAME.to_string());
            ANY_ARRAY_NAME.to_string()
        }
        ArrayExpr::AnyArrayPrimed => {
            decls.arrays.insert(ANY_ARRAY_PRIMED_NAME.to_string());
            ANY_ARRAY_PRIMED_NAME.to_string()
        }
        ArrayExpr::Named(name) => {
            decls.arrays.insert(name.clone());
            quote(name)
        }
        ArrayExpr::Store(arr, idx, val) => format!(
            "(store {} {} {})",
            translate_array(arr, decls, bound)?,
            translate_arith(idx, decls, bound)?,
            translate_arith(val, decls, bound)?
        ),
    };
    Ok(text)
}

fn bigint_text(n: &BigInt) -> String {
    if n < &BigInt::zero() {
        format!("(- {})", -n)
    } else {
        n.to_string()
    }
}
