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

//! Type checking
//!
//! Checks the annotated program against the declared scope before any
//! analysis runs, and again after IR transformations. Produces a proof
//! tree of the judgments so callers can render the derivation.

use crate::ast::{AddressExpr, ArithExpr, ArrayExpr, BoolExpr, Statement, StmtSequence};
use crate::error::{SourceLocation, TypeError};
use crate::parser::Context;
use crate::types::{Scope, Type};
use std::collections::BTreeSet;

/// One node of the typing derivation.
#[derive(Debug, Clone)]
pub struct TypeProof {
    pub judgment: String,
    pub children: Vec<TypeProof>,
}

impl TypeProof {
    fn leaf(judgment: String) -> Self {
        Self {
            judgment,
            children: Vec::new(),
        }
    }

    /// Total number of judgments in the derivation.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}

/// Type checker for annotated programs.
pub struct TypeChecker<'a> {
    scope: &'a Scope,
    /// Quantifier-bound names, typed as integers.
    bound: BTreeSet<String>,
}

/// Check a whole context: precondition, program, postcondition.
pub fn check_context(ctx: &Context) -> Result<TypeProof, TypeError> {
    let mut checker = TypeChecker::new(&ctx.scope);
    let mut children = Vec::new();
    children.push(checker.check_bool(&ctx.pre)?);
    children.push(checker.check_sequence(&ctx.program)?);
    children.push(checker.check_bool(&ctx.post)?);
    Ok(TypeProof {
        judgment: "⊢ context".to_string(),
        children,
    })
}

impl<'a> TypeChecker<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            bound: BTreeSet::new(),
        }
    }

    pub fn check_sequence(&mut self, seq: &StmtSequence) -> Result<TypeProof, TypeError> {
        let mut children = Vec::new();
        for stmt in seq.iter() {
            children.push(self.check_statement(stmt)?);
        }
        Ok(TypeProof {
            judgment: "⊢ sequence : unit".to_string(),
            children,
        })
    }

    pub fn check_statement(&mut self, stmt: &Statement) -> Result<TypeProof, TypeError> {
        let mut children = Vec::new();
        match stmt {
            Statement::Assign { target, value } => {
                let target_ty = self.type_of_address(target)?;
                let value_ty = self.check_arith(value, &mut children)?;
                if !target_ty.compatible_with(&value_ty) {
                    return Err(TypeError::Mismatch {
                        expected: target_ty.to_string(),
                        found: value_ty.to_string(),
                        context: stmt.summary(),
                    });
                }
            }
            Statement::Swap { left, right } => {
                let left_ty = self.type_of_address(left)?;
                let right_ty = self.type_of_address(right)?;
                if !left_ty.compatible_with(&right_ty) {
                    return Err(TypeError::Mismatch {
                        expected: left_ty.to_string(),
                        found: right_ty.to_string(),
                        context: stmt.summary(),
                    });
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                children.push(self.check_bool(condition)?);
                children.push(self.check_sequence(then_branch)?);
                children.push(self.check_sequence(else_branch)?);
            }
            Statement::While {
                condition,
                invariant,
                body,
            } => {
                children.push(self.check_bool(condition)?);
                if let Some(inv) = invariant {
                    children.push(self.check_bool(inv)?);
                }
                children.push(self.check_sequence(body)?);
            }
            Statement::Print { args, .. } => {
                for arg in args {
                    self.check_arith(arg, &mut children)?;
                }
            }
            Statement::Extern { target, .. } => {
                let target_ty = self.type_of_address(target)?;
                if target_ty != Type::Int {
                    return Err(TypeError::Mismatch {
                        expected: Type::Int.to_string(),
                        found: target_ty.to_string(),
                        context: stmt.summary(),
                    });
                }
            }
            Statement::Assert { condition } => {
                children.push(self.check_bool(condition)?);
            }
            Statement::Fail { .. } => {}
        }
        Ok(TypeProof {
            judgment: format!("⊢ {} : unit", stmt.summary()),
            children,
        })
    }

    /// Type of the value stored at the given address.
    pub fn type_of_address(&self, addr: &AddressExpr) -> Result<Type, TypeError> {
        match addr {
            AddressExpr::Variable(name) => {
                if self.bound.contains(name) {
                    return Ok(Type::Int);
                }
                self.scope
                    .lookup(name)
                    .map(|info| info.ty.clone())
                    .ok_or_else(|| TypeError::UndefinedVariable {
                        name: name.clone(),
                        location: SourceLocation::unknown(),
                    })
            }
            AddressExpr::DeRef(inner) => {
                let inner_ty = self.type_of_address(inner)?;
                inner_ty
                    .deref()
                    .cloned()
                    .ok_or_else(|| TypeError::DerefNonPointer {
                        found: inner_ty.to_string(),
                    })
            }
            AddressExpr::ArrayAccess { base, index } => {
                let base_ty = self.type_of_address(base)?;
                let element = base_ty
                    .deref()
                    .cloned()
                    .ok_or_else(|| TypeError::ArrayBaseNotPointer {
                        found: base_ty.to_string(),
                    })?;
                let mut scratch = Vec::new();
                let index_ty = self.check_arith(index, &mut scratch)?;
                if index_ty != Type::Int {
                    return Err(TypeError::Mismatch {
                        expected: Type::Int.to_string(),
                        found: index_ty.to_string(),
                        context: format!("index of {}", addr),
                    });
                }
                Ok(element)
            }
        }
    }

    pub fn check_arith(
        &self,
        expr: &ArithExpr,
        proofs: &mut Vec<TypeProof>,
    ) -> Result<Type, TypeError> {
        let ty = self.arith_type(expr)?;
        proofs.push(TypeProof::leaf(format!("⊢ {} : {}", expr, ty)));
        Ok(ty)
    }

    fn arith_type(&self, expr: &ArithExpr) -> Result<Type, TypeError> {
        match expr {
            ArithExpr::Num(_) => Ok(Type::Int),
            ArithExpr::Add(l, r)
            | ArithExpr::Sub(l, r)
            | ArithExpr::Mul(l, r)
            | ArithExpr::Div(l, r)
            | ArithExpr::Rem(l, r) => {
                self.require_int(l, expr)?;
                self.require_int(r, expr)?;
                Ok(Type::Int)
            }
            ArithExpr::Neg(inner) => {
                self.require_int(inner, expr)?;
                Ok(Type::Int)
            }
            ArithExpr::ValAt(addr) => self.type_of_address(addr),
            ArithExpr::AddressOf(name) => {
                let info =
                    self.scope
                        .lookup(name)
                        .ok_or_else(|| TypeError::UndefinedVariable {
                            name: name.clone(),
                            location: SourceLocation::unknown(),
                        })?;
                Ok(info.ty.clone().pointer_to())
            }
            // Verification-only terms: integer reads out of memory arrays.
            ArithExpr::Select(arr, idx) => {
                self.check_array(arr)?;
                self.require_int(idx, expr)?;
                Ok(Type::Int)
            }
        }
    }

    fn require_int(&self, operand: &ArithExpr, context: &ArithExpr) -> Result<(), TypeError> {
        let ty = self.arith_type(operand)?;
        if ty != Type::Int {
            return Err(TypeError::Mismatch {
                expected: Type::Int.to_string(),
                found: ty.to_string(),
                context: context.to_string(),
            });
        }
        Ok(())
    }

    fn check_array(&self, arr: &ArrayExpr) -> Result<(), TypeError> {
        if let ArrayExpr::Store(inner, idx, val) = arr {
            self.check_array(inner)?;
            let mut scratch = Vec::new();
            self.check_arith(idx, &mut scratch)?;
            self.check_arith(val, &mut scratch)?;
        }
        Ok(())
    }

    pub fn check_bool(&mut self, expr: &BoolExpr) -> Result<TypeProof, TypeError> {
        let mut children = Vec::new();
        match expr {
            BoolExpr::True | BoolExpr::False => {}
            BoolExpr::Not(inner) => children.push(self.check_bool(inner)?),
            BoolExpr::And(l, r)
            | BoolExpr::Or(l, r)
            | BoolExpr::Imply(l, r)
            | BoolExpr::Equiv(l, r) => {
                children.push(self.check_bool(l)?);
                children.push(self.check_bool(r)?);
            }
            BoolExpr::Eq {
                left,
                right,
                nesting,
            } => {
                let left_ty = self.check_arith(left, &mut children)?;
                let right_ty = self.check_arith(right, &mut children)?;
                if !left_ty.compatible_with(&right_ty) {
                    return Err(TypeError::Mismatch {
                        expected: left_ty.to_string(),
                        found: right_ty.to_string(),
                        context: expr.to_string(),
                    });
                }
                let depth = left_ty.pointer_depth();
                if *nesting != depth {
                    return Err(TypeError::NestingMismatch {
                        nesting: *nesting,
                        depth,
                        ty: left_ty.to_string(),
                    });
                }
            }
            BoolExpr::Lt(l, r) | BoolExpr::Lte(l, r) | BoolExpr::Gt(l, r) | BoolExpr::Gte(l, r) => {
                let left_ty = self.check_arith(l, &mut children)?;
                let right_ty = self.check_arith(r, &mut children)?;
                for ty in [&left_ty, &right_ty] {
                    if *ty != Type::Int {
                        return Err(TypeError::Mismatch {
                            expected: Type::Int.to_string(),
                            found: ty.to_string(),
                            context: expr.to_string(),
                        });
                    }
                }
            }
            BoolExpr::Forall { bound, body } => {
                let fresh = self.bound.insert(bound.clone());
                let proof = self.check_bool(body);
                if fresh {
                    self.bound.remove(bound);
                }
                children.push(proof?);
            }
            BoolExpr::ArrayEq(l, r) => {
                self.check_array(l)?;
                self.check_array(r)?;
            }
        }
        Ok(TypeProof {
            judgment: format!("⊢ {} : bool", expr),
            children,
        })
    }
}
