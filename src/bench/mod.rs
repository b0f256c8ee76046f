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

//! Benchmarking contract
//!
//! Records one approach run against one example: wall-clock time, resident
//! memory, the classification of the outcome against the expected verdict,
//! and the solver-call count. Records render to the CSV artefact.

use crate::parser::Context;
use crate::verification::{Approach, CheckOutcome};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Outcome classification against the expected verdict. "Positive" is a
/// reported defect: a counterexample on an unsafe example is a true
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
    NoResult,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Classification::TruePositive => "True Positive",
            Classification::TrueNegative => "True Negative",
            Classification::FalsePositive => "False Positive",
            Classification::FalseNegative => "False Negative",
            Classification::NoResult => "No Result",
        };
        write!(f, "{}", text)
    }
}

/// Classify an outcome against whether the example is expected safe.
pub fn classify(expected_safe: bool, outcome: &CheckOutcome) -> Classification {
    match outcome {
        CheckOutcome::Proof => {
            if expected_safe {
                Classification::TrueNegative
            } else {
                Classification::FalseNegative
            }
        }
        CheckOutcome::Counterexample(_) => {
            if expected_safe {
                Classification::FalsePositive
            } else {
                Classification::TruePositive
            }
        }
        CheckOutcome::NoResult(_) | CheckOutcome::Crash(_) => Classification::NoResult,
    }
}

/// One CSV row of the benchmark artefact.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRecord {
    pub example: String,
    pub approach: String,
    pub time_ms: u128,
    pub memory_bytes: u64,
    pub classification: Classification,
    pub smt_calls: usize,
}

pub const CSV_HEADER: &str =
    "Example, Approach, Time(ms), Memory(bytes), Classification, #SMTCalls";

impl BenchmarkRecord {
    /// JSON rendering for machine consumers.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("record serializes")
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}",
            self.example,
            self.approach,
            self.time_ms,
            self.memory_bytes,
            self.classification,
            self.smt_calls
        )
    }
}

/// Run one approach against one context and record the measurements.
pub fn measure(
    example: &str,
    approach: &mut dyn Approach,
    ctx: &Context,
    expected_safe: bool,
) -> BenchmarkRecord {
    let started = Instant::now();
    let outcome = approach.run(ctx);
    let time_ms = started.elapsed().as_millis();
    BenchmarkRecord {
        example: example.to_string(),
        approach: approach.name().to_string(),
        time_ms,
        memory_bytes: resident_memory_bytes(),
        classification: classify(expected_safe, &outcome),
        smt_calls: approach.smt_calls(),
    }
}

/// Render records as the CSV artefact, header first.
pub fn render_csv(records: &[BenchmarkRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&record.csv_row());
        out.push('\n');
    }
    out
}

/// Resident set size of the current process, from procfs. Zero when the
/// platform does not expose it.
pub fn resident_memory_bytes() -> u64 {
    let Ok(statm) = std::fs::read_to_string("/proc/self/statm") else {
        return 0;
    };
    let resident_pages: u64 = statm
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse().ok())
        .unwrap_or(0);
    resident_pages * 4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_matrix() {
        let proof = CheckOutcome::Proof;
        let cex = CheckOutcome::Counterexample("x = 1".to_string());
        let none = CheckOutcome::NoResult("bound".to_string());
        assert_eq!(classify(true, &proof), Classification::TrueNegative);
        assert_eq!(classify(false, &proof), Classification::FalseNegative);
        assert_eq!(classify(false, &cex), Classification::TruePositive);
        assert_eq!(classify(true, &cex), Classification::FalsePositive);
        assert_eq!(classify(true, &none), Classification::NoResult);
    }

    #[test]
    fn test_csv_rendering() {
        let record = BenchmarkRecord {
            example: "gauss.wl".to_string(),
            approach: "wpc".to_string(),
            time_ms: 12,
            memory_bytes: 4096,
            classification: Classification::TrueNegative,
            smt_calls: 4,
        };
        let csv = render_csv(std::slice::from_ref(&record));
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("gauss.wl, wpc, 12, 4096, True Negative, 4")
        );
        assert!(record.to_json().contains("\"smt_calls\":4"));
    }
}
