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

//! Veriloop verification engine
//!
//! A deductive and model-checking verifier for a small annotated
//! imperative language: weakest preconditions, bounded model checking,
//! k-induction, and a monotone dataflow framework, over an SMT facade.

pub mod ast;
pub mod bench;
pub mod dataflow;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod memory;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod semantic;
pub mod smt;
pub mod types;
pub mod verification;

use crate::error::VerifierError;
use crate::pipeline::{Pipeline, VerifyOptions};
use std::path::PathBuf;

/// The main verifier interface.
pub struct Verifier {
    options: VerifyOptions,
}

impl Verifier {
    /// Create a new verifier instance
    pub fn new() -> Self {
        Self {
            options: VerifyOptions::default(),
        }
    }

    /// Create a verifier with custom options
    pub fn with_options(options: VerifyOptions) -> Self {
        Self { options }
    }

    /// Run the concrete interpreter on the program.
    pub fn run(mut self, enable: bool) -> Self {
        self.options.run = enable;
        self
    }

    /// Discharge the program through the WPC proof system.
    pub fn proof(mut self, enable: bool) -> Self {
        self.options.proof = enable;
        self
    }

    /// Run bounded model checking up to the bound.
    pub fn bmc(mut self, bound: u32) -> Self {
        self.options.bmc = Some(bound);
        self
    }

    /// Run k-induction up to the depth.
    pub fn k_induction(mut self, bound: u32) -> Self {
        self.options.kind = Some(bound);
        self
    }

    /// Process a source file; the result is the process exit code.
    pub fn process_file(&self, input: PathBuf) -> Result<i32, VerifierError> {
        Pipeline::new(self.options.clone()).process_file(&input)
    }

    /// Process in-memory source text.
    pub fn process_source(&self, source: &str, name: &str) -> Result<i32, VerifierError> {
        Pipeline::new(self.options.clone()).process_source(source, name)
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}
