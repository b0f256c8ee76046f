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

//! Statements and statement sequences
//!
//! `StmtSequence` is a persistent ordered list: `tail` and `prepend` share
//! structure with the original so the executor can fork configurations
//! cheaply.

use super::expr::{AddressExpr, ArithExpr, BoolExpr};
use num_bigint::BigInt;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        target: AddressExpr,
        value: ArithExpr,
    },
    Swap {
        left: AddressExpr,
        right: AddressExpr,
    },
    If {
        condition: BoolExpr,
        then_branch: StmtSequence,
        else_branch: StmtSequence,
    },
    While {
        condition: BoolExpr,
        invariant: Option<BoolExpr>,
        body: StmtSequence,
    },
    Print {
        message: String,
        args: Vec<ArithExpr>,
    },
    /// External input into `target`, drawn from the inclusive range
    /// `[lower, upper]`.
    Extern {
        target: AddressExpr,
        lower: BigInt,
        upper: BigInt,
    },
    Assert {
        condition: BoolExpr,
    },
    Fail {
        message: String,
    },
}

impl Statement {
    /// Variables whose values this statement reads directly (conditions of
    /// `if`/`while` count; bodies and branches do not).
    pub fn read_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match self {
            Statement::Assign { target, value } => {
                target.read_vars(&mut out);
                value.read_vars(&mut out);
            }
            Statement::Swap { left, right } => {
                left.read_vars(&mut out);
                if let Some(name) = left.as_variable() {
                    out.insert(name.to_string());
                }
                right.read_vars(&mut out);
                if let Some(name) = right.as_variable() {
                    out.insert(name.to_string());
                }
            }
            Statement::If { condition, .. }
            | Statement::While { condition, .. }
            | Statement::Assert { condition } => condition.read_vars(&mut out),
            Statement::Print { args, .. } => {
                for arg in args {
                    arg.read_vars(&mut out);
                }
            }
            Statement::Extern { target, .. } => target.read_vars(&mut out),
            Statement::Fail { .. } => {}
        }
        out
    }

    /// Variables this statement definitely writes (plain-variable targets
    /// only; writes through pointers or array cells are not attributed).
    pub fn written_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match self {
            Statement::Assign { target, .. } | Statement::Extern { target, .. } => {
                if let Some(name) = target.as_variable() {
                    out.insert(name.to_string());
                }
            }
            Statement::Swap { left, right } => {
                if let Some(name) = left.as_variable() {
                    out.insert(name.to_string());
                }
                if let Some(name) = right.as_variable() {
                    out.insert(name.to_string());
                }
            }
            _ => {}
        }
        out
    }

    /// Short single-line rendering used by CFG dumps and error messages.
    pub fn summary(&self) -> String {
        match self {
            Statement::Assign { target, value } => format!("{} := {}", target, value),
            Statement::Swap { left, right } => format!("swap {} and {}", left, right),
            Statement::If { condition, .. } => format!("if ({})", condition),
            Statement::While { condition, .. } => format!("while ({})", condition),
            Statement::Print { message, args } => {
                if args.is_empty() {
                    format!("print {:?}", message)
                } else {
                    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    format!("print {:?}, {}", message, rendered.join(", "))
                }
            }
            Statement::Extern { target, lower, upper } => {
                format!("extern {} {}..{}", target, lower, upper)
            }
            Statement::Assert { condition } => format!("assert ({})", condition),
            Statement::Fail { message } => format!("fail {:?}", message),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// An ordered, persistent sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StmtSequence {
    items: Vec<Arc<Statement>>,
}

impl StmtSequence {
    pub fn new(stmts: Vec<Statement>) -> Self {
        Self {
            items: stmts.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_exhausted(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The first statement, if any.
    pub fn head(&self) -> Option<&Statement> {
        self.items.first().map(|arc| arc.as_ref())
    }

    /// Everything after the first statement.
    pub fn tail(&self) -> StmtSequence {
        Self {
            items: self.items.iter().skip(1).cloned().collect(),
        }
    }

    /// Everything before the last statement.
    pub fn front(&self) -> StmtSequence {
        let keep = self.items.len().saturating_sub(1);
        Self {
            items: self.items.iter().take(keep).cloned().collect(),
        }
    }

    /// The last statement, if any.
    pub fn end(&self) -> Option<&Statement> {
        self.items.last().map(|arc| arc.as_ref())
    }

    /// A new sequence with `prefix` in front of this one. Used by loop
    /// unrolling: the loop body is prepended while the loop statement
    /// itself stays in the remainder.
    pub fn prepend(&self, prefix: &StmtSequence) -> StmtSequence {
        let mut items = prefix.items.clone();
        items.extend(self.items.iter().cloned());
        Self { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.items.iter().map(|arc| arc.as_ref())
    }
}

impl FromIterator<Statement> for StmtSequence {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(name: &str, value: i64) -> Statement {
        Statement::Assign {
            target: AddressExpr::var(name),
            value: ArithExpr::num(value),
        }
    }

    #[test]
    fn test_sequence_operations() {
        let seq = StmtSequence::new(vec![assign("x", 1), assign("y", 2), assign("z", 3)]);
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_exhausted());
        assert_eq!(seq.head().unwrap().summary(), "x := 1");
        assert_eq!(seq.end().unwrap().summary(), "z := 3");
        assert_eq!(seq.tail().len(), 2);
        assert_eq!(seq.front().len(), 2);
        assert_eq!(seq.tail().head().unwrap().summary(), "y := 2");
        assert!(StmtSequence::empty().is_exhausted());
    }

    #[test]
    fn test_prepend_keeps_original() {
        let rest = StmtSequence::new(vec![assign("x", 1)]);
        let body = StmtSequence::new(vec![assign("y", 2), assign("z", 3)]);
        let unrolled = rest.prepend(&body);
        assert_eq!(unrolled.len(), 3);
        assert_eq!(unrolled.head().unwrap().summary(), "y := 2");
        // The original sequence is untouched.
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_read_and_written_vars() {
        let stmt = Statement::Assign {
            target: AddressExpr::var("x"),
            value: ArithExpr::symbol("y").add(ArithExpr::symbol("k")),
        };
        let reads = stmt.read_vars();
        assert!(reads.contains("y") && reads.contains("k") && !reads.contains("x"));
        assert!(stmt.written_vars().contains("x"));

        let through_pointer = Statement::Assign {
            target: AddressExpr::var("p").deref(),
            value: ArithExpr::num(0),
        };
        assert!(through_pointer.read_vars().contains("p"));
        assert!(through_pointer.written_vars().is_empty());
    }

    #[test]
    fn test_swap_reads_and_writes_both() {
        let stmt = Statement::Swap {
            left: AddressExpr::var("a"),
            right: AddressExpr::var("b"),
        };
        let reads = stmt.read_vars();
        let writes = stmt.written_vars();
        assert!(reads.contains("a") && reads.contains("b"));
        assert!(writes.contains("a") && writes.contains("b"));
    }
}
