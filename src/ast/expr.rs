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

//! Expression trees
//!
//! Address expressions denote memory cells and only ever hold addresses;
//! arithmetic expressions denote unbounded integers; boolean expressions
//! denote conditions and verification formulas. Array expressions exist
//! only for verification: they model whole-memory terms with `select` /
//! `store` semantics and are never evaluated by the executor.

use num_bigint::BigInt;
use std::collections::BTreeSet;
use std::fmt;

/// An expression denoting a memory address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddressExpr {
    Variable(String),
    DeRef(Box<AddressExpr>),
    ArrayAccess {
        base: Box<AddressExpr>,
        index: Box<ArithExpr>,
    },
}

impl AddressExpr {
    pub fn var(name: &str) -> Self {
        AddressExpr::Variable(name.to_string())
    }

    pub fn deref(self) -> Self {
        AddressExpr::DeRef(Box::new(self))
    }

    pub fn index(self, index: ArithExpr) -> Self {
        AddressExpr::ArrayAccess {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    /// The variable this address is rooted at, when it is a plain variable.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            AddressExpr::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Variables whose values must be read to resolve this address.
    ///
    /// Resolving a plain variable reads nothing; a dereference reads the
    /// pointer cell; an array access reads the base-pointer cell and the
    /// index operands.
    pub fn read_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            AddressExpr::Variable(_) => {}
            AddressExpr::DeRef(inner) => {
                if let Some(name) = inner.as_variable() {
                    out.insert(name.to_string());
                }
                inner.read_vars(out);
            }
            AddressExpr::ArrayAccess { base, index } => {
                if let Some(name) = base.as_variable() {
                    out.insert(name.to_string());
                }
                base.read_vars(out);
                index.read_vars(out);
            }
        }
    }
}

impl fmt::Display for AddressExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressExpr::Variable(name) => write!(f, "{}", name),
            AddressExpr::DeRef(inner) => write!(f, "*{}", inner),
            AddressExpr::ArrayAccess { base, index } => write!(f, "{}[{}]", base, index),
        }
    }
}

/// An expression denoting an unbounded integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArithExpr {
    Num(BigInt),
    Add(Box<ArithExpr>, Box<ArithExpr>),
    Sub(Box<ArithExpr>, Box<ArithExpr>),
    Mul(Box<ArithExpr>, Box<ArithExpr>),
    Div(Box<ArithExpr>, Box<ArithExpr>),
    Rem(Box<ArithExpr>, Box<ArithExpr>),
    Neg(Box<ArithExpr>),
    /// The value stored at an address.
    ValAt(Box<AddressExpr>),
    /// The address of a variable.
    AddressOf(String),
    /// Verification only: a read out of an array term.
    Select(Box<ArrayExpr>, Box<ArithExpr>),
}

impl ArithExpr {
    pub fn num(n: i64) -> Self {
        ArithExpr::Num(BigInt::from(n))
    }

    /// A named integer symbol: the value of a variable, an SMT constant,
    /// or a fresh unknown introduced by havoc or quantification.
    pub fn symbol(name: &str) -> Self {
        ArithExpr::ValAt(Box::new(AddressExpr::Variable(name.to_string())))
    }

    pub fn add(self, rhs: ArithExpr) -> Self {
        ArithExpr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: ArithExpr) -> Self {
        ArithExpr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: ArithExpr) -> Self {
        ArithExpr::Mul(Box::new(self), Box::new(rhs))
    }

    /// The concrete integer, when this is a literal.
    pub fn as_number(&self) -> Option<&BigInt> {
        match self {
            ArithExpr::Num(n) => Some(n),
            _ => None,
        }
    }

    /// The symbol name, when this is a bare `ValAt(Variable _)`.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            ArithExpr::ValAt(addr) => addr.as_variable(),
            _ => None,
        }
    }

    /// Replace every occurrence of the symbol `var` (that is, of
    /// `ValAt(Variable(var))`) with `replacement`.
    pub fn replace(&self, var: &str, replacement: &ArithExpr) -> ArithExpr {
        match self {
            ArithExpr::Num(_) | ArithExpr::AddressOf(_) => self.clone(),
            ArithExpr::Add(l, r) => ArithExpr::Add(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            ArithExpr::Sub(l, r) => ArithExpr::Sub(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            ArithExpr::Mul(l, r) => ArithExpr::Mul(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            ArithExpr::Div(l, r) => ArithExpr::Div(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            ArithExpr::Rem(l, r) => ArithExpr::Rem(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            ArithExpr::Neg(inner) => ArithExpr::Neg(Box::new(inner.replace(var, replacement))),
            ArithExpr::ValAt(addr) => {
                if addr.as_variable() == Some(var) {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            ArithExpr::Select(arr, idx) => ArithExpr::Select(
                Box::new(arr.replace(var, replacement)),
                Box::new(idx.replace(var, replacement)),
            ),
        }
    }

    /// Rename symbols and array leaves. `symbols` maps a symbol name to its
    /// replacement name; `arrays` maps an array leaf to its replacement.
    /// Names bound by an enclosing `Forall` are never renamed.
    pub fn rename(
        &self,
        symbols: &dyn Fn(&str) -> Option<String>,
        arrays: &dyn Fn(&ArrayExpr) -> Option<ArrayExpr>,
        bound: &BTreeSet<String>,
    ) -> ArithExpr {
        match self {
            ArithExpr::Num(_) | ArithExpr::AddressOf(_) => self.clone(),
            ArithExpr::Add(l, r) => ArithExpr::Add(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            ArithExpr::Sub(l, r) => ArithExpr::Sub(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            ArithExpr::Mul(l, r) => ArithExpr::Mul(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            ArithExpr::Div(l, r) => ArithExpr::Div(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            ArithExpr::Rem(l, r) => ArithExpr::Rem(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            ArithExpr::Neg(inner) => {
                ArithExpr::Neg(Box::new(inner.rename(symbols, arrays, bound)))
            }
            ArithExpr::ValAt(addr) => match addr.as_variable() {
                Some(name) if !bound.contains(name) => match symbols(name) {
                    Some(renamed) => ArithExpr::symbol(&renamed),
                    None => self.clone(),
                },
                _ => self.clone(),
            },
            ArithExpr::Select(arr, idx) => ArithExpr::Select(
                Box::new(arr.rename(symbols, arrays, bound)),
                Box::new(idx.rename(symbols, arrays, bound)),
            ),
        }
    }

    /// Variables whose values are read when evaluating this expression.
    pub fn read_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            ArithExpr::Num(_) | ArithExpr::AddressOf(_) => {}
            ArithExpr::Add(l, r)
            | ArithExpr::Sub(l, r)
            | ArithExpr::Mul(l, r)
            | ArithExpr::Div(l, r)
            | ArithExpr::Rem(l, r) => {
                l.read_vars(out);
                r.read_vars(out);
            }
            ArithExpr::Neg(inner) => inner.read_vars(out),
            ArithExpr::ValAt(addr) => {
                if let Some(name) = addr.as_variable() {
                    out.insert(name.to_string());
                }
                addr.read_vars(out);
            }
            ArithExpr::Select(arr, idx) => {
                arr.read_vars(out);
                idx.read_vars(out);
            }
        }
    }

    /// Free symbol names (bare `ValAt(Variable _)` leaves not bound by an
    /// enclosing quantifier).
    pub fn free_symbols(&self, out: &mut BTreeSet<String>, bound: &BTreeSet<String>) {
        match self {
            ArithExpr::Num(_) | ArithExpr::AddressOf(_) => {}
            ArithExpr::Add(l, r)
            | ArithExpr::Sub(l, r)
            | ArithExpr::Mul(l, r)
            | ArithExpr::Div(l, r)
            | ArithExpr::Rem(l, r) => {
                l.free_symbols(out, bound);
                r.free_symbols(out, bound);
            }
            ArithExpr::Neg(inner) => inner.free_symbols(out, bound),
            ArithExpr::ValAt(addr) => {
                if let Some(name) = addr.as_variable() {
                    if !bound.contains(name) {
                        out.insert(name.to_string());
                    }
                }
            }
            ArithExpr::Select(arr, idx) => {
                arr.free_symbols(out, bound);
                idx.free_symbols(out, bound);
            }
        }
    }

    /// Array leaves appearing anywhere below this expression.
    pub fn array_leaves(&self, out: &mut Vec<ArrayExpr>) {
        match self {
            ArithExpr::Num(_) | ArithExpr::AddressOf(_) | ArithExpr::ValAt(_) => {}
            ArithExpr::Add(l, r)
            | ArithExpr::Sub(l, r)
            | ArithExpr::Mul(l, r)
            | ArithExpr::Div(l, r)
            | ArithExpr::Rem(l, r) => {
                l.array_leaves(out);
                r.array_leaves(out);
            }
            ArithExpr::Neg(inner) => inner.array_leaves(out),
            ArithExpr::Select(arr, idx) => {
                arr.array_leaves(out);
                idx.array_leaves(out);
            }
        }
    }
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithExpr::Num(n) => write!(f, "{}", n),
            ArithExpr::Add(l, r) => write!(f, "({} + {})", l, r),
            ArithExpr::Sub(l, r) => write!(f, "({} - {})", l, r),
            ArithExpr::Mul(l, r) => write!(f, "({} * {})", l, r),
            ArithExpr::Div(l, r) => write!(f, "({} / {})", l, r),
            ArithExpr::Rem(l, r) => write!(f, "({} % {})", l, r),
            ArithExpr::Neg(inner) => write!(f, "-{}", inner),
            ArithExpr::ValAt(addr) => write!(f, "{}", addr),
            ArithExpr::AddressOf(name) => write!(f, "&{}", name),
            ArithExpr::Select(arr, idx) => write!(f, "{}[{}]", arr, idx),
        }
    }
}

/// Verification-only array terms over the whole memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayExpr {
    /// The pre-step memory `M`.
    AnyArray,
    /// The post-step memory `M'`.
    AnyArrayPrimed,
    /// A numbered copy produced by temporal renaming.
    Named(String),
    /// `store(array, index, value)`.
    Store(Box<ArrayExpr>, Box<ArithExpr>, Box<ArithExpr>),
}

impl ArrayExpr {
    pub fn store(self, index: ArithExpr, value: ArithExpr) -> Self {
        ArrayExpr::Store(Box::new(self), Box::new(index), Box::new(value))
    }

    pub fn select(self, index: ArithExpr) -> ArithExpr {
        ArithExpr::Select(Box::new(self), Box::new(index))
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, ArrayExpr::Store(..))
    }

    fn replace(&self, var: &str, replacement: &ArithExpr) -> ArrayExpr {
        match self {
            ArrayExpr::AnyArray | ArrayExpr::AnyArrayPrimed | ArrayExpr::Named(_) => self.clone(),
            ArrayExpr::Store(arr, idx, val) => ArrayExpr::Store(
                Box::new(arr.replace(var, replacement)),
                Box::new(idx.replace(var, replacement)),
                Box::new(val.replace(var, replacement)),
            ),
        }
    }

    fn rename(
        &self,
        symbols: &dyn Fn(&str) -> Option<String>,
        arrays: &dyn Fn(&ArrayExpr) -> Option<ArrayExpr>,
        bound: &BTreeSet<String>,
    ) -> ArrayExpr {
        match self {
            ArrayExpr::AnyArray | ArrayExpr::AnyArrayPrimed | ArrayExpr::Named(_) => {
                arrays(self).unwrap_or_else(|| self.clone())
            }
            ArrayExpr::Store(arr, idx, val) => ArrayExpr::Store(
                Box::new(arr.rename(symbols, arrays, bound)),
                Box::new(idx.rename(symbols, arrays, bound)),
                Box::new(val.rename(symbols, arrays, bound)),
            ),
        }
    }

    fn read_vars(&self, out: &mut BTreeSet<String>) {
        if let ArrayExpr::Store(arr, idx, val) = self {
            arr.read_vars(out);
            idx.read_vars(out);
            val.read_vars(out);
        }
    }

    fn free_symbols(&self, out: &mut BTreeSet<String>, bound: &BTreeSet<String>) {
        if let ArrayExpr::Store(arr, idx, val) = self {
            arr.free_symbols(out, bound);
            idx.free_symbols(out, bound);
            val.free_symbols(out, bound);
        }
    }

    fn array_leaves(&self, out: &mut Vec<ArrayExpr>) {
        match self {
            ArrayExpr::Store(arr, idx, val) => {
                arr.array_leaves(out);
                idx.array_leaves(out);
                val.array_leaves(out);
            }
            leaf => {
                if !out.contains(leaf) {
                    out.push(leaf.clone());
                }
            }
        }
    }
}

impl fmt::Display for ArrayExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayExpr::AnyArray => write!(f, "M"),
            ArrayExpr::AnyArrayPrimed => write!(f, "M'"),
            ArrayExpr::Named(name) => write!(f, "{}", name),
            ArrayExpr::Store(arr, idx, val) => write!(f, "store({}, {}, {})", arr, idx, val),
        }
    }
}

/// An expression denoting a truth value or a verification formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoolExpr {
    True,
    False,
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Imply(Box<BoolExpr>, Box<BoolExpr>),
    Equiv(Box<BoolExpr>, Box<BoolExpr>),
    /// Equality with a pointer-nesting count checked by the type checker.
    Eq {
        left: Box<ArithExpr>,
        right: Box<ArithExpr>,
        nesting: u32,
    },
    Lt(Box<ArithExpr>, Box<ArithExpr>),
    Lte(Box<ArithExpr>, Box<ArithExpr>),
    Gt(Box<ArithExpr>, Box<ArithExpr>),
    Gte(Box<ArithExpr>, Box<ArithExpr>),
    /// Verification only: universal quantification over the integers.
    Forall {
        bound: String,
        body: Box<BoolExpr>,
    },
    /// Verification only: equality of two whole-memory terms.
    ArrayEq(Box<ArrayExpr>, Box<ArrayExpr>),
}

impl BoolExpr {
    pub fn not(self) -> Self {
        BoolExpr::Not(Box::new(self))
    }

    pub fn and(self, rhs: BoolExpr) -> Self {
        BoolExpr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: BoolExpr) -> Self {
        BoolExpr::Or(Box::new(self), Box::new(rhs))
    }

    pub fn imply(self, rhs: BoolExpr) -> Self {
        BoolExpr::Imply(Box::new(self), Box::new(rhs))
    }

    pub fn eq(left: ArithExpr, right: ArithExpr) -> Self {
        BoolExpr::Eq {
            left: Box::new(left),
            right: Box::new(right),
            nesting: 0,
        }
    }

    pub fn lt(left: ArithExpr, right: ArithExpr) -> Self {
        BoolExpr::Lt(Box::new(left), Box::new(right))
    }

    pub fn lte(left: ArithExpr, right: ArithExpr) -> Self {
        BoolExpr::Lte(Box::new(left), Box::new(right))
    }

    pub fn gte(left: ArithExpr, right: ArithExpr) -> Self {
        BoolExpr::Gte(Box::new(left), Box::new(right))
    }

    pub fn forall(bound: &str, body: BoolExpr) -> Self {
        BoolExpr::Forall {
            bound: bound.to_string(),
            body: Box::new(body),
        }
    }

    pub fn array_eq(left: ArrayExpr, right: ArrayExpr) -> Self {
        BoolExpr::ArrayEq(Box::new(left), Box::new(right))
    }

    /// Conjunction of a list of formulas; `True` for the empty list.
    pub fn conjoin(parts: impl IntoIterator<Item = BoolExpr>) -> BoolExpr {
        let mut iter = parts.into_iter();
        match iter.next() {
            None => BoolExpr::True,
            Some(first) => iter.fold(first, |acc, part| acc.and(part)),
        }
    }

    /// Disjunction of a list of formulas; `False` for the empty list.
    pub fn disjoin(parts: impl IntoIterator<Item = BoolExpr>) -> BoolExpr {
        let mut iter = parts.into_iter();
        match iter.next() {
            None => BoolExpr::False,
            Some(first) => iter.fold(first, |acc, part| acc.or(part)),
        }
    }

    /// Replace every free occurrence of the symbol `var` with `replacement`.
    /// Bound variables shadow: substitution does not descend past a binder
    /// of the same name.
    pub fn replace(&self, var: &str, replacement: &ArithExpr) -> BoolExpr {
        match self {
            BoolExpr::True | BoolExpr::False => self.clone(),
            BoolExpr::Not(inner) => BoolExpr::Not(Box::new(inner.replace(var, replacement))),
            BoolExpr::And(l, r) => BoolExpr::And(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Or(l, r) => BoolExpr::Or(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Imply(l, r) => BoolExpr::Imply(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Equiv(l, r) => BoolExpr::Equiv(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Eq { left, right, nesting } => BoolExpr::Eq {
                left: Box::new(left.replace(var, replacement)),
                right: Box::new(right.replace(var, replacement)),
                nesting: *nesting,
            },
            BoolExpr::Lt(l, r) => BoolExpr::Lt(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Lte(l, r) => BoolExpr::Lte(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Gt(l, r) => BoolExpr::Gt(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Gte(l, r) => BoolExpr::Gte(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
            BoolExpr::Forall { bound, body } => {
                if bound == var {
                    self.clone()
                } else {
                    BoolExpr::Forall {
                        bound: bound.clone(),
                        body: Box::new(body.replace(var, replacement)),
                    }
                }
            }
            BoolExpr::ArrayEq(l, r) => BoolExpr::ArrayEq(
                Box::new(l.replace(var, replacement)),
                Box::new(r.replace(var, replacement)),
            ),
        }
    }

    /// Rename symbols and array leaves, capture-avoiding with respect to
    /// `Forall` binders.
    pub fn rename(
        &self,
        symbols: &dyn Fn(&str) -> Option<String>,
        arrays: &dyn Fn(&ArrayExpr) -> Option<ArrayExpr>,
    ) -> BoolExpr {
        self.rename_under(symbols, arrays, &BTreeSet::new())
    }

    fn rename_under(
        &self,
        symbols: &dyn Fn(&str) -> Option<String>,
        arrays: &dyn Fn(&ArrayExpr) -> Option<ArrayExpr>,
        bound: &BTreeSet<String>,
    ) -> BoolExpr {
        match self {
            BoolExpr::True | BoolExpr::False => self.clone(),
            BoolExpr::Not(inner) => {
                BoolExpr::Not(Box::new(inner.rename_under(symbols, arrays, bound)))
            }
            BoolExpr::And(l, r) => BoolExpr::And(
                Box::new(l.rename_under(symbols, arrays, bound)),
                Box::new(r.rename_under(symbols, arrays, bound)),
            ),
            BoolExpr::Or(l, r) => BoolExpr::Or(
                Box::new(l.rename_under(symbols, arrays, bound)),
                Box::new(r.rename_under(symbols, arrays, bound)),
            ),
            BoolExpr::Imply(l, r) => BoolExpr::Imply(
                Box::new(l.rename_under(symbols, arrays, bound)),
                Box::new(r.rename_under(symbols, arrays, bound)),
            ),
            BoolExpr::Equiv(l, r) => BoolExpr::Equiv(
                Box::new(l.rename_under(symbols, arrays, bound)),
                Box::new(r.rename_under(symbols, arrays, bound)),
            ),
            BoolExpr::Eq { left, right, nesting } => BoolExpr::Eq {
                left: Box::new(left.rename(symbols, arrays, bound)),
                right: Box::new(right.rename(symbols, arrays, bound)),
                nesting: *nesting,
            },
            BoolExpr::Lt(l, r) => BoolExpr::Lt(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            BoolExpr::Lte(l, r) => BoolExpr::Lte(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            BoolExpr::Gt(l, r) => BoolExpr::Gt(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            BoolExpr::Gte(l, r) => BoolExpr::Gte(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
            BoolExpr::Forall { bound: b, body } => {
                let mut inner_bound = bound.clone();
                inner_bound.insert(b.clone());
                BoolExpr::Forall {
                    bound: b.clone(),
                    body: Box::new(body.rename_under(symbols, arrays, &inner_bound)),
                }
            }
            BoolExpr::ArrayEq(l, r) => BoolExpr::ArrayEq(
                Box::new(l.rename(symbols, arrays, bound)),
                Box::new(r.rename(symbols, arrays, bound)),
            ),
        }
    }

    /// Variables whose values are read when evaluating this condition.
    pub fn read_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            BoolExpr::True | BoolExpr::False => {}
            BoolExpr::Not(inner) => inner.read_vars(out),
            BoolExpr::And(l, r)
            | BoolExpr::Or(l, r)
            | BoolExpr::Imply(l, r)
            | BoolExpr::Equiv(l, r) => {
                l.read_vars(out);
                r.read_vars(out);
            }
            BoolExpr::Eq { left, right, .. } => {
                left.read_vars(out);
                right.read_vars(out);
            }
            BoolExpr::Lt(l, r) | BoolExpr::Lte(l, r) | BoolExpr::Gt(l, r) | BoolExpr::Gte(l, r) => {
                l.read_vars(out);
                r.read_vars(out);
            }
            BoolExpr::Forall { body, .. } => body.read_vars(out),
            BoolExpr::ArrayEq(l, r) => {
                l.read_vars(out);
                r.read_vars(out);
            }
        }
    }

    /// Free symbol names, excluding quantifier-bound names.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.free_symbols_under(&mut out, &BTreeSet::new());
        out
    }

    fn free_symbols_under(&self, out: &mut BTreeSet<String>, bound: &BTreeSet<String>) {
        match self {
            BoolExpr::True | BoolExpr::False => {}
            BoolExpr::Not(inner) => inner.free_symbols_under(out, bound),
            BoolExpr::And(l, r)
            | BoolExpr::Or(l, r)
            | BoolExpr::Imply(l, r)
            | BoolExpr::Equiv(l, r) => {
                l.free_symbols_under(out, bound);
                r.free_symbols_under(out, bound);
            }
            BoolExpr::Eq { left, right, .. } => {
                left.free_symbols(out, bound);
                right.free_symbols(out, bound);
            }
            BoolExpr::Lt(l, r) | BoolExpr::Lte(l, r) | BoolExpr::Gt(l, r) | BoolExpr::Gte(l, r) => {
                l.free_symbols(out, bound);
                r.free_symbols(out, bound);
            }
            BoolExpr::Forall { bound: b, body } => {
                let mut inner = bound.clone();
                inner.insert(b.clone());
                body.free_symbols_under(out, &inner);
            }
            BoolExpr::ArrayEq(l, r) => {
                l.free_symbols(out, bound);
                r.free_symbols(out, bound);
            }
        }
    }

    /// Array leaves appearing anywhere in the formula.
    pub fn array_leaves(&self) -> Vec<ArrayExpr> {
        let mut out = Vec::new();
        self.collect_array_leaves(&mut out);
        out
    }

    fn collect_array_leaves(&self, out: &mut Vec<ArrayExpr>) {
        match self {
            BoolExpr::True | BoolExpr::False => {}
            BoolExpr::Not(inner) => inner.collect_array_leaves(out),
            BoolExpr::And(l, r)
            | BoolExpr::Or(l, r)
            | BoolExpr::Imply(l, r)
            | BoolExpr::Equiv(l, r) => {
                l.collect_array_leaves(out);
                r.collect_array_leaves(out);
            }
            BoolExpr::Eq { left, right, .. } => {
                left.array_leaves(out);
                right.array_leaves(out);
            }
            BoolExpr::Lt(l, r) | BoolExpr::Lte(l, r) | BoolExpr::Gt(l, r) | BoolExpr::Gte(l, r) => {
                l.array_leaves(out);
                r.array_leaves(out);
            }
            BoolExpr::Forall { body, .. } => body.collect_array_leaves(out),
            BoolExpr::ArrayEq(l, r) => {
                l.array_leaves(out);
                r.array_leaves(out);
            }
        }
    }

    /// True when the formula still mentions an unnumbered or primed state
    /// marker (`M`, `M'`, or a symbol ending in a prime).
    pub fn has_temporal_markers(&self) -> bool {
        let leaves = self.array_leaves();
        if leaves.contains(&ArrayExpr::AnyArray) || leaves.contains(&ArrayExpr::AnyArrayPrimed) {
            return true;
        }
        self.free_symbols().iter().any(|name| name.ends_with('\''))
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::True => write!(f, "true"),
            BoolExpr::False => write!(f, "false"),
            BoolExpr::Not(inner) => write!(f, "not {}", inner),
            BoolExpr::And(l, r) => write!(f, "({} and {})", l, r),
            BoolExpr::Or(l, r) => write!(f, "({} or {})", l, r),
            BoolExpr::Imply(l, r) => write!(f, "({} implies {})", l, r),
            BoolExpr::Equiv(l, r) => write!(f, "({} iff {})", l, r),
            BoolExpr::Eq { left, right, .. } => write!(f, "({} = {})", left, right),
            BoolExpr::Lt(l, r) => write!(f, "({} < {})", l, r),
            BoolExpr::Lte(l, r) => write!(f, "({} <= {})", l, r),
            BoolExpr::Gt(l, r) => write!(f, "({} > {})", l, r),
            BoolExpr::Gte(l, r) => write!(f, "({} >= {})", l, r),
            BoolExpr::Forall { bound, body } => write!(f, "(forall {}. {})", bound, body),
            BoolExpr::ArrayEq(l, r) => write!(f, "({} = {})", l, r),
        }
    }
}
