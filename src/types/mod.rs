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

//! Type system and symbol table
//!
//! Types of the source language and the scope mapping variable names to
//! their declared type, address, and allocation size.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A source-language type. Booleans exist only at the condition level
/// (represented by 0/1 sentinels in memory); variables are integers,
/// pointers, or arrays of integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Bool,
    Unit,
    Pointer(Box<Type>),
}

impl Type {
    /// Number of `Pointer` layers wrapped around the base type.
    pub fn pointer_depth(&self) -> u32 {
        match self {
            Type::Pointer(inner) => 1 + inner.pointer_depth(),
            _ => 0,
        }
    }

    /// Peel one pointer layer, if there is one.
    pub fn deref(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Wrap this type in one pointer layer.
    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }

    /// Structural compatibility: two types are compatible iff equal.
    pub fn compatible_with(&self, other: &Type) -> bool {
        self == other
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Unit => write!(f, "unit"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
        }
    }
}

/// Declared properties of one variable: its type, the address of its first
/// cell, and the number of cells it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarInfo {
    pub ty: Type,
    pub address: usize,
    pub size: usize,
    /// For arrays, the declared element count N (allocation is N + 1 cells:
    /// the base-pointer cell followed by the data cells).
    pub array_length: Option<usize>,
}

/// Symbol table with sequential address layout.
///
/// Addresses are assigned in declaration order starting at 0 and never
/// overlap. Scalars and pointers occupy one cell; an array of length N
/// occupies N + 1 cells, the first of which stores the base pointer value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scope {
    vars: HashMap<String, VarInfo>,
    order: Vec<String>,
    total: usize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scalar or pointer variable (one cell).
    pub fn declare(&mut self, name: &str, ty: Type) -> bool {
        self.declare_sized(name, ty, 1, None)
    }

    /// Declare an array of `length` integer elements (length + 1 cells).
    pub fn declare_array(&mut self, name: &str, length: usize) -> bool {
        self.declare_sized(name, Type::Int.pointer_to(), length + 1, Some(length))
    }

    fn declare_sized(
        &mut self,
        name: &str,
        ty: Type,
        size: usize,
        array_length: Option<usize>,
    ) -> bool {
        if self.vars.contains_key(name) {
            return false;
        }
        let info = VarInfo {
            ty,
            address: self.total,
            size,
            array_length,
        };
        self.total += size;
        self.vars.insert(name.to_string(), info);
        self.order.push(name.to_string());
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&VarInfo> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Total number of memory cells allocated by this scope.
    pub fn total_size(&self) -> usize {
        self.total
    }

    /// Variable names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// A name not colliding with any declared variable, derived from
    /// `prefix` and `counter`. The counter is advanced past collisions.
    pub fn fresh_name(&self, prefix: &str, counter: &mut usize) -> String {
        loop {
            let candidate = format!("{}_{}", prefix, *counter);
            *counter += 1;
            if !self.vars.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_depth() {
        let t = Type::Int.pointer_to().pointer_to();
        assert_eq!(t.pointer_depth(), 2);
        assert_eq!(t.deref().unwrap().pointer_depth(), 1);
        assert_eq!(Type::Int.pointer_depth(), 0);
    }

    #[test]
    fn test_sequential_layout() {
        let mut scope = Scope::new();
        assert!(scope.declare("x", Type::Int));
        assert!(scope.declare_array("a", 3));
        assert!(scope.declare("p", Type::Int.pointer_to()));

        let x = scope.lookup("x").unwrap();
        assert_eq!((x.address, x.size), (0, 1));
        let a = scope.lookup("a").unwrap();
        assert_eq!((a.address, a.size), (1, 4));
        assert_eq!(a.array_length, Some(3));
        let p = scope.lookup("p").unwrap();
        assert_eq!((p.address, p.size), (5, 1));
        assert_eq!(scope.total_size(), 6);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut scope = Scope::new();
        assert!(scope.declare("x", Type::Int));
        assert!(!scope.declare("x", Type::Int));
        assert_eq!(scope.total_size(), 1);
    }

    #[test]
    fn test_fresh_name_avoids_declared() {
        let mut scope = Scope::new();
        scope.declare("extern_0", Type::Int);
        let mut counter = 0;
        let fresh = scope.fresh_name("extern", &mut counter);
        assert_eq!(fresh, "extern_1");
        assert_eq!(counter, 2);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let mut scope = Scope::new();
        scope.declare("n", Type::Int);
        scope.declare("i", Type::Int);
        scope.declare("sum", Type::Int);
        let names: Vec<_> = scope.names().collect();
        assert_eq!(names, vec!["n", "i", "sum"]);
    }
}
