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

//! Expression evaluation
//!
//! Addresses always evaluate to concrete cell indices; values evaluate to
//! integer literals under concrete execution and to residual arithmetic
//! trees under symbolic execution. Verification-only expressions are never
//! evaluable. Boolean operands are both evaluated even when one side would
//! decide the result, so the first error is always surfaced.

use crate::ast::{AddressExpr, ArithExpr, BoolExpr};
use crate::error::{ExecError, ExecErrorKind};
use crate::memory::Memory;
use crate::types::Scope;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Evaluate an address expression to a concrete cell index.
pub fn eval_address(
    addr: &AddressExpr,
    scope: &Scope,
    memory: &Memory,
) -> Result<usize, ExecError> {
    match addr {
        AddressExpr::Variable(name) => scope
            .lookup(name)
            .map(|info| info.address)
            .ok_or_else(|| ExecError::new(ExecErrorKind::VarUndefined, addr)),
        AddressExpr::DeRef(inner) => {
            let cell = eval_address(inner, scope, memory)?;
            let stored = memory
                .read(cell)
                .map_err(|e| ExecError::with_cause(ExecErrorKind::InvalidAddress, addr, e))?;
            concrete_address(stored, memory, addr)
        }
        AddressExpr::ArrayAccess { base, index } => {
            let base_cell = eval_address(base, scope, memory)?;
            let stored = memory
                .read(base_cell)
                .map_err(|e| ExecError::with_cause(ExecErrorKind::InvalidAddress, addr, e))?;
            let data = concrete_address(stored, memory, addr)?;
            let index_value = eval_arith(index, scope, memory)
                .map_err(|e| ExecError::with_cause(ExecErrorKind::InvalidAddress, addr, e))?;
            let Some(offset) = index_value.as_number() else {
                return Err(ExecError::new(ExecErrorKind::InvalidAddress, addr));
            };
            let target = BigInt::from(data) + offset;
            bigint_address(&target, memory, addr)
        }
    }
}

/// A stored cell value interpreted as an address: it must be a concrete
/// integer within the memory bounds.
fn concrete_address(
    stored: &ArithExpr,
    memory: &Memory,
    origin: &AddressExpr,
) -> Result<usize, ExecError> {
    let Some(value) = stored.as_number() else {
        return Err(ExecError::new(ExecErrorKind::InvalidAddress, origin));
    };
    bigint_address(value, memory, origin)
}

fn bigint_address(
    value: &BigInt,
    memory: &Memory,
    origin: &AddressExpr,
) -> Result<usize, ExecError> {
    if value.is_negative() {
        return Err(ExecError::new(ExecErrorKind::InvalidAddress, origin));
    }
    match value.to_usize() {
        Some(addr) if addr < memory.size() => Ok(addr),
        _ => Err(ExecError::new(ExecErrorKind::InvalidAddress, origin)),
    }
}

/// Evaluate an arithmetic expression. Concrete operands fold to literals;
/// a symbolic operand makes the result the residual expression tree.
pub fn eval_arith(
    expr: &ArithExpr,
    scope: &Scope,
    memory: &Memory,
) -> Result<ArithExpr, ExecError> {
    match expr {
        ArithExpr::Num(_) => Ok(expr.clone()),
        ArithExpr::Add(l, r) => {
            binary(expr, l, r, scope, memory, |a, b| Ok(a + b), ArithExpr::Add)
        }
        ArithExpr::Sub(l, r) => {
            binary(expr, l, r, scope, memory, |a, b| Ok(a - b), ArithExpr::Sub)
        }
        ArithExpr::Mul(l, r) => {
            binary(expr, l, r, scope, memory, |a, b| Ok(a * b), ArithExpr::Mul)
        }
        ArithExpr::Div(l, r) => binary(
            expr,
            l,
            r,
            scope,
            memory,
            |a, b| {
                if b.is_zero() {
                    Err(ExecErrorKind::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            },
            ArithExpr::Div,
        ),
        ArithExpr::Rem(l, r) => binary(
            expr,
            l,
            r,
            scope,
            memory,
            |a, b| {
                if b.is_zero() {
                    Err(ExecErrorKind::DivisionByZero)
                } else {
                    Ok(a % b)
                }
            },
            ArithExpr::Rem,
        ),
        ArithExpr::Neg(inner) => {
            let value = eval_arith(inner, scope, memory)
                .map_err(|e| ExecError::with_cause(e.kind, expr, e.clone()))?;
            Ok(match value.as_number() {
                Some(n) => ArithExpr::Num(-n),
                None => ArithExpr::Neg(Box::new(value)),
            })
        }
        ArithExpr::ValAt(addr) => {
            let cell = eval_address(addr, scope, memory)
                .map_err(|e| ExecError::with_cause(e.kind, expr, e.clone()))?;
            let stored = memory
                .read(cell)
                .map_err(|e| ExecError::with_cause(ExecErrorKind::SegmentationFault, expr, e))?;
            Ok(stored.clone())
        }
        ArithExpr::AddressOf(name) => scope
            .lookup(name)
            .map(|info| ArithExpr::Num(BigInt::from(info.address)))
            .ok_or_else(|| ExecError::new(ExecErrorKind::VarUndefined, expr)),
        ArithExpr::Select(..) => Err(ExecError::new(ExecErrorKind::NotExecutable, expr)),
    }
}

#[allow(clippy::too_many_arguments)]
fn binary(
    origin: &ArithExpr,
    l: &ArithExpr,
    r: &ArithExpr,
    scope: &Scope,
    memory: &Memory,
    fold: impl Fn(&BigInt, &BigInt) -> Result<BigInt, ExecErrorKind>,
    rebuild: impl Fn(Box<ArithExpr>, Box<ArithExpr>) -> ArithExpr,
) -> Result<ArithExpr, ExecError> {
    // Evaluate both operands before deciding anything; the left error wins.
    let left = eval_arith(l, scope, memory);
    let right = eval_arith(r, scope, memory);
    let left = left.map_err(|e| ExecError::with_cause(e.kind, origin, e.clone()))?;
    let right = right.map_err(|e| ExecError::with_cause(e.kind, origin, e.clone()))?;

    // Division and remainder by a concrete zero fail regardless of the
    // other operand being symbolic.
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return match fold(a, b) {
            Ok(n) => Ok(ArithExpr::Num(n)),
            Err(kind) => Err(ExecError::new(kind, origin)),
        };
    }
    if let Some(b) = right.as_number() {
        if b.is_zero() {
            if let ArithExpr::Div(..) | ArithExpr::Rem(..) = origin {
                return Err(ExecError::new(ExecErrorKind::DivisionByZero, origin));
            }
        }
    }
    Ok(rebuild(Box::new(left), Box::new(right)))
}

/// The result of evaluating a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    Concrete(bool),
    Symbolic(BoolExpr),
}

impl CondValue {
    /// The condition as a formula over the residual symbols.
    pub fn as_formula(&self) -> BoolExpr {
        match self {
            CondValue::Concrete(true) => BoolExpr::True,
            CondValue::Concrete(false) => BoolExpr::False,
            CondValue::Symbolic(phi) => phi.clone(),
        }
    }

    pub fn negated_formula(&self) -> BoolExpr {
        match self {
            CondValue::Concrete(true) => BoolExpr::False,
            CondValue::Concrete(false) => BoolExpr::True,
            CondValue::Symbolic(phi) => phi.clone().not(),
        }
    }
}

/// Evaluate a condition. Both operand sides are always evaluated; the
/// first error is surfaced even when the other side would short-circuit
/// the truth value.
pub fn eval_bool(
    expr: &BoolExpr,
    scope: &Scope,
    memory: &Memory,
) -> Result<CondValue, ExecError> {
    match expr {
        BoolExpr::True => Ok(CondValue::Concrete(true)),
        BoolExpr::False => Ok(CondValue::Concrete(false)),
        BoolExpr::Not(inner) => Ok(match eval_bool(inner, scope, memory)? {
            CondValue::Concrete(b) => CondValue::Concrete(!b),
            CondValue::Symbolic(phi) => CondValue::Symbolic(phi.not()),
        }),
        BoolExpr::And(l, r) => connective(l, r, scope, memory, |a, b| a && b, BoolExpr::And),
        BoolExpr::Or(l, r) => connective(l, r, scope, memory, |a, b| a || b, BoolExpr::Or),
        BoolExpr::Imply(l, r) => connective(l, r, scope, memory, |a, b| !a || b, BoolExpr::Imply),
        BoolExpr::Equiv(l, r) => connective(l, r, scope, memory, |a, b| a == b, BoolExpr::Equiv),
        BoolExpr::Eq { left, right, nesting } => {
            comparison(expr, left, right, scope, memory, |a, b| a == b, |sl, sr| {
                BoolExpr::Eq {
                    left: sl,
                    right: sr,
                    nesting: *nesting,
                }
            })
        }
        BoolExpr::Lt(l, r) => comparison(expr, l, r, scope, memory, |a, b| a < b, BoolExpr::Lt),
        BoolExpr::Lte(l, r) => comparison(expr, l, r, scope, memory, |a, b| a <= b, BoolExpr::Lte),
        BoolExpr::Gt(l, r) => comparison(expr, l, r, scope, memory, |a, b| a > b, BoolExpr::Gt),
        BoolExpr::Gte(l, r) => comparison(expr, l, r, scope, memory, |a, b| a >= b, BoolExpr::Gte),
        BoolExpr::Forall { .. } | BoolExpr::ArrayEq(..) => {
            Err(ExecError::new(ExecErrorKind::NotExecutable, expr))
        }
    }
}

fn connective(
    l: &BoolExpr,
    r: &BoolExpr,
    scope: &Scope,
    memory: &Memory,
    fold: impl Fn(bool, bool) -> bool,
    rebuild: impl Fn(Box<BoolExpr>, Box<BoolExpr>) -> BoolExpr,
) -> Result<CondValue, ExecError> {
    let left = eval_bool(l, scope, memory);
    let right = eval_bool(r, scope, memory);
    let left = left?;
    let right = right?;
    match (&left, &right) {
        (CondValue::Concrete(a), CondValue::Concrete(b)) => Ok(CondValue::Concrete(fold(*a, *b))),
        _ => Ok(CondValue::Symbolic(rebuild(
            Box::new(left.as_formula()),
            Box::new(right.as_formula()),
        ))),
    }
}

#[allow(clippy::too_many_arguments)]
fn comparison(
    origin: &BoolExpr,
    l: &ArithExpr,
    r: &ArithExpr,
    scope: &Scope,
    memory: &Memory,
    fold: impl Fn(&BigInt, &BigInt) -> bool,
    rebuild: impl Fn(Box<ArithExpr>, Box<ArithExpr>) -> BoolExpr,
) -> Result<CondValue, ExecError> {
    let left = eval_arith(l, scope, memory);
    let right = eval_arith(r, scope, memory);
    let left = left.map_err(|e| ExecError::with_cause(e.kind, origin, e.clone()))?;
    let right = right.map_err(|e| ExecError::with_cause(e.kind, origin, e.clone()))?;
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok(CondValue::Concrete(fold(a, b))),
        _ => Ok(CondValue::Symbolic(rebuild(Box::new(left), Box::new(right)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn setup() -> (Scope, Memory) {
        let mut scope = Scope::new();
        scope.declare("x", Type::Int);
        scope.declare("y", Type::Int);
        scope.declare("p", Type::Int.pointer_to());
        scope.declare_array("a", 3);
        let memory = Memory::new(scope.total_size());
        // Array base cell points at its first element.
        let base = scope.lookup("a").unwrap().address;
        let memory = memory
            .write(base, ArithExpr::Num(BigInt::from(base + 1)))
            .unwrap();
        (scope, memory)
    }

    #[test]
    fn test_variable_evaluates_to_its_address() {
        let (scope, memory) = setup();
        assert_eq!(eval_address(&AddressExpr::var("x"), &scope, &memory).unwrap(), 0);
        assert_eq!(eval_address(&AddressExpr::var("y"), &scope, &memory).unwrap(), 1);
        let err = eval_address(&AddressExpr::var("zz"), &scope, &memory).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::VarUndefined);
    }

    #[test]
    fn test_deref_reads_pointer_cell() {
        let (scope, memory) = setup();
        // p (cell 2) holds 1, the address of y.
        let memory = memory.write(2, ArithExpr::num(1)).unwrap();
        let addr = eval_address(&AddressExpr::var("p").deref(), &scope, &memory).unwrap();
        assert_eq!(addr, 1);
    }

    #[test]
    fn test_deref_invalid_address() {
        let (scope, memory) = setup();
        let memory = memory.write(2, ArithExpr::num(99)).unwrap();
        let err = eval_address(&AddressExpr::var("p").deref(), &scope, &memory).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::InvalidAddress);
        // A symbolic pointer cell is not a valid address either.
        let memory = memory.write(2, ArithExpr::symbol("extern_0")).unwrap();
        let err = eval_address(&AddressExpr::var("p").deref(), &scope, &memory).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::InvalidAddress);
    }

    #[test]
    fn test_array_access_goes_through_base_pointer() {
        let (scope, memory) = setup();
        let addr =
            eval_address(&AddressExpr::var("a").index(ArithExpr::num(2)), &scope, &memory)
                .unwrap();
        // a is at 3, data starts at 4, element 2 is cell 6.
        assert_eq!(addr, 6);
        let err =
            eval_address(&AddressExpr::var("a").index(ArithExpr::num(3)), &scope, &memory)
                .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::InvalidAddress);
    }

    #[test]
    fn test_arith_folding_and_division() {
        let (scope, memory) = setup();
        let memory = memory.write(0, ArithExpr::num(7)).unwrap();
        let e = ArithExpr::symbol("x").add(ArithExpr::num(5));
        assert_eq!(eval_arith(&e, &scope, &memory).unwrap(), ArithExpr::num(12));

        // Truncation towards zero.
        let e = ArithExpr::Div(Box::new(ArithExpr::num(-7)), Box::new(ArithExpr::num(2)));
        assert_eq!(eval_arith(&e, &scope, &memory).unwrap(), ArithExpr::num(-3));
        let e = ArithExpr::Rem(Box::new(ArithExpr::num(-7)), Box::new(ArithExpr::num(2)));
        assert_eq!(eval_arith(&e, &scope, &memory).unwrap(), ArithExpr::num(-1));

        let e = ArithExpr::Div(Box::new(ArithExpr::num(1)), Box::new(ArithExpr::num(0)));
        let err = eval_arith(&e, &scope, &memory).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::DivisionByZero);
    }

    #[test]
    fn test_symbolic_operand_produces_residual_tree() {
        let (scope, memory) = setup();
        let memory = memory.write(0, ArithExpr::symbol("extern_0")).unwrap();
        let e = ArithExpr::symbol("x").add(ArithExpr::num(1));
        let value = eval_arith(&e, &scope, &memory).unwrap();
        assert_eq!(value, ArithExpr::symbol("extern_0").add(ArithExpr::num(1)));
    }

    #[test]
    fn test_address_of_is_concrete() {
        let (scope, memory) = setup();
        let value = eval_arith(&ArithExpr::AddressOf("y".to_string()), &scope, &memory).unwrap();
        assert_eq!(value, ArithExpr::num(1));
    }

    #[test]
    fn test_bool_concrete_and_symbolic() {
        let (scope, memory) = setup();
        let memory = memory.write(0, ArithExpr::num(3)).unwrap();
        let cond = BoolExpr::lt(ArithExpr::symbol("x"), ArithExpr::num(5));
        assert_eq!(
            eval_bool(&cond, &scope, &memory).unwrap(),
            CondValue::Concrete(true)
        );
        let memory = memory.write(0, ArithExpr::symbol("extern_0")).unwrap();
        match eval_bool(&cond, &scope, &memory).unwrap() {
            CondValue::Symbolic(phi) => {
                assert_eq!(
                    phi,
                    BoolExpr::lt(ArithExpr::symbol("extern_0"), ArithExpr::num(5))
                );
            }
            other => panic!("expected symbolic, got {:?}", other),
        }
    }

    #[test]
    fn test_bool_surfaces_first_error() {
        let (scope, memory) = setup();
        // Left side divides by zero even though the right side is false.
        let cond = BoolExpr::And(
            Box::new(BoolExpr::eq(
                ArithExpr::Div(Box::new(ArithExpr::num(1)), Box::new(ArithExpr::num(0))),
                ArithExpr::num(0),
            )),
            Box::new(BoolExpr::False),
        );
        let err = eval_bool(&cond, &scope, &memory).unwrap_err();
        assert_eq!(err.root_cause().kind, ExecErrorKind::DivisionByZero);
    }

    #[test]
    fn test_verification_only_expressions_fatal() {
        let (scope, memory) = setup();
        let err = eval_bool(
            &BoolExpr::forall("v", BoolExpr::True),
            &scope,
            &memory,
        )
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::NotExecutable);
    }
}
