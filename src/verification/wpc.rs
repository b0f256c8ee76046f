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

//! Weakest-precondition proof system
//!
//! Backward predicate transformer and verification-condition generator.
//! Assertions are check-and-continue: their condition is conjoined onto
//! the transformed postcondition, and asserts inside a loop body also get
//! a dedicated condition under the invariant-and-guard antecedent. VCs
//! are emitted in program source order with human-readable explanations.

use crate::ast::{ArithExpr, BoolExpr, Statement, StmtSequence};
use crate::error::VcError;
use crate::parser::Context;
use crate::types::Type;
use num_bigint::BigInt;

/// An entailment `left ⇒ right` that must hold for the program to be
/// correct.
#[derive(Debug, Clone)]
pub struct Vc {
    pub left: BoolExpr,
    pub right: BoolExpr,
    pub explanation: String,
}

impl Vc {
    /// The satisfiability test: the entailment holds iff this formula is
    /// unsatisfiable.
    pub fn smt_test(&self) -> BoolExpr {
        self.left.clone().and(self.right.clone().not())
    }
}

/// Options of the VC generator.
#[derive(Debug, Clone)]
pub struct VcOptions {
    /// Augment the precondition with `x = 0` for every scalar integer
    /// variable, matching the zeroed initial memory.
    pub pin_scalars_to_zero: bool,
}

impl Default for VcOptions {
    fn default() -> Self {
        Self {
            pin_scalars_to_zero: true,
        }
    }
}

/// The weakest precondition of a single statement, with no condition
/// emission. Loop bodies are summarised by their invariant.
pub fn wpc(stmt: &Statement, post: &BoolExpr) -> Result<BoolExpr, VcError> {
    let mut generator = VcGenerator::new(VcOptions::default());
    let mut sink = Vec::new();
    generator.emit_vcs = false;
    generator.transform_statement(stmt, post.clone(), &mut sink)
}

/// The weakest precondition of a sequence.
pub fn wpc_sequence(seq: &StmtSequence, post: &BoolExpr) -> Result<BoolExpr, VcError> {
    let mut generator = VcGenerator::new(VcOptions::default());
    let mut sink = Vec::new();
    generator.emit_vcs = false;
    generator.transform_sequence(seq, post.clone(), &mut sink)
}

/// Generate all verification conditions of an annotated program.
pub fn generate_vcs(ctx: &Context, options: &VcOptions) -> Result<Vec<Vc>, VcError> {
    let mut generator = VcGenerator::new(options.clone());
    generator.generate(ctx)
}

struct VcGenerator {
    options: VcOptions,
    fresh_counter: usize,
    emit_vcs: bool,
}

impl VcGenerator {
    fn new(options: VcOptions) -> Self {
        Self {
            options,
            fresh_counter: 0,
            emit_vcs: true,
        }
    }

    fn generate(&mut self, ctx: &Context) -> Result<Vec<Vc>, VcError> {
        reject_address_of(&ctx.pre)?;
        reject_address_of(&ctx.post)?;

        let mut vcs = Vec::new();
        let weakest = self.transform_sequence(&ctx.program, ctx.post.clone(), &mut vcs)?;

        let mut antecedent = ctx.pre.clone();
        if self.options.pin_scalars_to_zero {
            for name in ctx.scope.names() {
                let info = ctx.scope.lookup(name).expect("declared name");
                if info.ty == Type::Int && info.array_length.is_none() {
                    antecedent = antecedent.and(BoolExpr::eq(
                        ArithExpr::symbol(name),
                        ArithExpr::num(0),
                    ));
                }
            }
        }
        let entry = Vc {
            left: antecedent,
            right: weakest,
            explanation: "precondition establishes the weakest precondition of the program"
                .to_string(),
        };

        let mut ordered = vec![entry];
        ordered.extend(vcs);
        Ok(ordered)
    }

    fn transform_sequence(
        &mut self,
        seq: &StmtSequence,
        post: BoolExpr,
        vcs: &mut Vec<Vc>,
    ) -> Result<BoolExpr, VcError> {
        let stmts: Vec<&Statement> = seq.iter().collect();
        self.transform_slice(&stmts, post, vcs)
    }

    fn transform_slice(
        &mut self,
        stmts: &[&Statement],
        post: BoolExpr,
        vcs: &mut Vec<Vc>,
    ) -> Result<BoolExpr, VcError> {
        let Some((head, rest)) = stmts.split_first() else {
            return Ok(post);
        };
        let mut rest_vcs = Vec::new();
        let after = self.transform_slice(rest, post, &mut rest_vcs)?;
        let weakest = self.transform_statement(head, after, vcs)?;
        vcs.extend(rest_vcs);
        Ok(weakest)
    }

    fn transform_statement(
        &mut self,
        stmt: &Statement,
        post: BoolExpr,
        vcs: &mut Vec<Vc>,
    ) -> Result<BoolExpr, VcError> {
        match stmt {
            Statement::Assign { target, value } => {
                let name = plain_variable(target, "assignment")?;
                reject_address_of_arith(value)?;
                Ok(post.replace(name, value))
            }
            Statement::Swap { left, right } => {
                let left = plain_variable(left, "swap")?;
                let right = plain_variable(right, "swap")?;
                // Simultaneous substitution through a fresh placeholder.
                let placeholder = self.fresh("tmp");
                let step1 = post.replace(left, &ArithExpr::symbol(&placeholder));
                let step2 = step1.replace(right, &ArithExpr::symbol(left));
                Ok(step2.replace(&placeholder, &ArithExpr::symbol(right)))
            }
            Statement::Extern {
                target,
                lower,
                upper,
            } => {
                let name = plain_variable(target, "extern")?;
                let bound = self.fresh("bound");
                let symbol = ArithExpr::symbol(&bound);
                let below = BoolExpr::lt(symbol.clone(), ArithExpr::Num(lower.clone()));
                let above = BoolExpr::gte(
                    symbol.clone(),
                    ArithExpr::Num(upper.clone() + BigInt::from(1)),
                );
                let body = below.or(above).or(post.replace(name, &symbol));
                Ok(BoolExpr::forall(&bound, body))
            }
            Statement::Assert { condition } => {
                reject_address_of(condition)?;
                Ok(condition.clone().and(post))
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                reject_address_of(condition)?;
                let then_wpc = self.transform_sequence(then_branch, post.clone(), vcs)?;
                let else_wpc = self.transform_sequence(else_branch, post, vcs)?;
                let then_arm = condition.clone().imply(then_wpc);
                let else_arm = condition.clone().not().imply(else_wpc);
                Ok(then_arm.and(else_arm))
            }
            Statement::While {
                condition,
                invariant,
                body,
            } => {
                reject_address_of(condition)?;
                let invariant = invariant.clone().unwrap_or(BoolExpr::True);
                reject_address_of(&invariant)?;
                let antecedent = invariant.clone().and(condition.clone());

                let mut body_vcs = Vec::new();
                let body_wpc =
                    self.transform_sequence(body, invariant.clone(), &mut body_vcs)?;

                if self.emit_vcs {
                    vcs.push(Vc {
                        left: antecedent.clone(),
                        right: body_wpc,
                        explanation: format!(
                            "loop entry: invariant ({}) is preserved by the body",
                            invariant
                        ),
                    });
                    // Each assert in the body is also discharged under the
                    // invariant and guard, over the body prefix before it.
                    let body_stmts: Vec<&Statement> = body.iter().collect();
                    for (position, body_stmt) in body_stmts.iter().enumerate() {
                        let Statement::Assert { condition: asserted } = body_stmt else {
                            continue;
                        };
                        let mut scratch = Vec::new();
                        let saved = self.emit_vcs;
                        self.emit_vcs = false;
                        let prefix_wpc = self.transform_slice(
                            &body_stmts[..position],
                            asserted.clone(),
                            &mut scratch,
                        )?;
                        self.emit_vcs = saved;
                        vcs.push(Vc {
                            left: antecedent.clone(),
                            right: prefix_wpc,
                            explanation: format!("assertion ({}) holds in the loop body", asserted),
                        });
                    }
                    vcs.extend(body_vcs);
                    vcs.push(Vc {
                        left: invariant.clone().and(condition.clone().not()),
                        right: post,
                        explanation: format!(
                            "loop exit: invariant ({}) and exit condition establish what follows",
                            invariant
                        ),
                    });
                }
                Ok(invariant)
            }
            Statement::Print { .. } => Ok(post),
            Statement::Fail { .. } => Ok(BoolExpr::True),
        }
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.fresh_counter);
        self.fresh_counter += 1;
        name
    }
}

fn plain_variable<'a>(
    target: &'a crate::ast::AddressExpr,
    construct: &str,
) -> Result<&'a str, VcError> {
    target
        .as_variable()
        .ok_or_else(|| VcError::NonVariableTarget {
            construct: construct.to_string(),
            expr: target.to_string(),
        })
}

fn reject_address_of(expr: &BoolExpr) -> Result<(), VcError> {
    match expr {
        BoolExpr::True | BoolExpr::False => Ok(()),
        BoolExpr::Not(inner) => reject_address_of(inner),
        BoolExpr::And(l, r)
        | BoolExpr::Or(l, r)
        | BoolExpr::Imply(l, r)
        | BoolExpr::Equiv(l, r) => {
            reject_address_of(l)?;
            reject_address_of(r)
        }
        BoolExpr::Eq { left, right, .. } => {
            reject_address_of_arith(left)?;
            reject_address_of_arith(right)
        }
        BoolExpr::Lt(l, r) | BoolExpr::Lte(l, r) | BoolExpr::Gt(l, r) | BoolExpr::Gte(l, r) => {
            reject_address_of_arith(l)?;
            reject_address_of_arith(r)
        }
        BoolExpr::Forall { body, .. } => reject_address_of(body),
        BoolExpr::ArrayEq(..) => Ok(()),
    }
}

fn reject_address_of_arith(expr: &ArithExpr) -> Result<(), VcError> {
    match expr {
        ArithExpr::Num(_) | ArithExpr::ValAt(_) => Ok(()),
        ArithExpr::AddressOf(_) => Err(VcError::VarAddressUnsupported {
            expr: expr.to_string(),
        }),
        ArithExpr::Add(l, r)
        | ArithExpr::Sub(l, r)
        | ArithExpr::Mul(l, r)
        | ArithExpr::Div(l, r)
        | ArithExpr::Rem(l, r) => {
            reject_address_of_arith(l)?;
            reject_address_of_arith(r)
        }
        ArithExpr::Neg(inner) => reject_address_of_arith(inner),
        ArithExpr::Select(_, idx) => reject_address_of_arith(idx),
    }
}
