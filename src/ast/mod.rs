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

//! Intermediate representation of the source language
//!
//! Closed tagged sums for address, arithmetic, boolean, and array
//! expressions, and for statements. Dispatch is by pattern match; the
//! "visit every subexpression" operations (substitution, renaming, symbol
//! collection) are folds over the sums.

pub mod expr;
pub mod stmt;

pub use expr::{AddressExpr, ArithExpr, ArrayExpr, BoolExpr};
pub use stmt::{Statement, StmtSequence};
