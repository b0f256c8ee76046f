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

//! Error handling for the veriloop verifier
//!
//! Phase-split error types: static errors (lexing, parsing, typing, VC
//! generation) are fatal and surface to the caller; runtime errors terminate
//! the executing path but are retained in the execution tree. Verification
//! outcomes are a separate axis and are returned, never raised.

use std::fmt;
use thiserror::Error;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(file: String, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            offset: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Lexical analysis errors
#[derive(Error, Debug, Clone)]
pub enum LexerError {
    #[error("Unexpected character '{character}' at {location}")]
    UnexpectedCharacter {
        character: char,
        location: SourceLocation,
    },

    #[error("Unterminated string literal at {location}")]
    UnterminatedString { location: SourceLocation },

    #[error("Invalid number format '{value}' at {location}")]
    InvalidNumber {
        value: String,
        location: SourceLocation,
    },
}

/// Parsing errors
#[derive(Error, Debug, Clone)]
pub enum ParserError {
    #[error("Unexpected token {found}, expected {expected} at {location}")]
    UnexpectedToken {
        found: String,
        expected: String,
        location: SourceLocation,
    },

    #[error("Unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Duplicate variable '{name}' at {location}")]
    DuplicateVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("Array length {length} exceeds the maximum of 255 at {location}")]
    ArrayTooLarge {
        length: u64,
        location: SourceLocation,
    },

    #[error("Lexer error: {source}")]
    LexerError {
        #[from]
        source: LexerError,
    },
}

/// Type checking errors
#[derive(Error, Debug, Clone)]
pub enum TypeError {
    #[error("Undefined variable '{name}' at {location}")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("Type mismatch: expected {expected}, found {found} in {context}")]
    Mismatch {
        expected: String,
        found: String,
        context: String,
    },

    #[error("Cannot dereference non-pointer type {found}")]
    DerefNonPointer { found: String },

    #[error("Array access requires a pointer base, found {found}")]
    ArrayBaseNotPointer { found: String },

    #[error("Equality nesting {nesting} does not match pointer depth {depth} of {ty}")]
    NestingMismatch {
        nesting: u32,
        depth: u32,
        ty: String,
    },
}

/// Refusals of the weakest-precondition proof system.
///
/// These abort the current proof run only; other analyses over the same
/// program are unaffected.
#[derive(Error, Debug, Clone)]
pub enum VcError {
    #[error("Address-of expressions are not supported by the proof system: {expr}")]
    VarAddressUnsupported { expr: String },

    #[error("Only plain variables may be the target of {construct} in the proof system, found {expr}")]
    NonVariableTarget { construct: String, expr: String },
}

/// Runtime errors raised during concrete or symbolic execution.
///
/// The nested cause chain preserves the originating sub-expression so the
/// execution tree can report exactly where a path died.
#[derive(Error, Debug, Clone)]
#[error("{kind} in '{expr}'")]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub expr: String,
    #[source]
    pub cause: Option<Box<ExecError>>,
}

impl ExecError {
    pub fn new(kind: ExecErrorKind, expr: impl fmt::Display) -> Self {
        Self {
            kind,
            expr: expr.to_string(),
            cause: None,
        }
    }

    pub fn with_cause(kind: ExecErrorKind, expr: impl fmt::Display, cause: ExecError) -> Self {
        Self {
            kind,
            expr: expr.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    /// The innermost error of the cause chain.
    pub fn root_cause(&self) -> &ExecError {
        match &self.cause {
            Some(inner) => inner.root_cause(),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    VarUndefined,
    InvalidAddress,
    DivisionByZero,
    SegmentationFault,
    AssertionViolated,
    InvariantViolated,
    InputOutOfRange,
    Failure,
    /// Verification-only expression reached by the executor.
    NotExecutable,
}

impl fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExecErrorKind::VarUndefined => "undefined variable",
            ExecErrorKind::InvalidAddress => "invalid address",
            ExecErrorKind::DivisionByZero => "division by zero",
            ExecErrorKind::SegmentationFault => "segmentation fault",
            ExecErrorKind::AssertionViolated => "assertion violated",
            ExecErrorKind::InvariantViolated => "loop invariant violated",
            ExecErrorKind::InputOutOfRange => "external input out of range",
            ExecErrorKind::Failure => "explicit failure",
            ExecErrorKind::NotExecutable => "verification-only expression reached at runtime",
        };
        write!(f, "{}", text)
    }
}

/// SMT facade errors: solver process failures and untranslatable formulas
#[derive(Error, Debug, Clone)]
pub enum SmtError {
    #[error("Solver process failed: {message}")]
    SolverUnavailable { message: String },

    #[error("Formula is not translatable to the solver theory: {expr}")]
    Untranslatable { expr: String },

    #[error("Malformed solver response: {response}")]
    MalformedResponse { response: String },
}

/// Top-level error type unifying all phases
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    #[error("Proof system error: {0}")]
    Vc(#[from] VcError),

    #[error("Runtime error: {0}")]
    Exec(#[from] ExecError),

    #[error("SMT error: {0}")]
    Smt(#[from] SmtError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
