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

//! The four bundled dataflow analyses

use super::cfg::{Cfg, CfgNode};
use super::{Combining, DataflowAnalysis, Direction, Fact, FactSet, Finding, Marking};
use crate::ast::Statement;
use crate::types::Scope;

/// Live variables: backward may-analysis. A read generates liveness, a
/// definite write kills it.
pub struct LiveVariables;

impl DataflowAnalysis for LiveVariables {
    fn name(&self) -> &'static str {
        "liveness"
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn combining(&self) -> Combining {
        Combining::May
    }

    fn gen(&self, node: &CfgNode, _inflow: &FactSet) -> FactSet {
        node.stmt
            .read_vars()
            .into_iter()
            .map(Fact::Live)
            .collect()
    }

    fn kill(&self, node: &CfgNode, _inflow: &FactSet) -> FactSet {
        node.stmt
            .written_vars()
            .into_iter()
            .map(Fact::Live)
            .collect()
    }
}

/// Reaching definitions: forward may-analysis. The program entry carries
/// an `Init` pseudo-definition for every variable; the check reports reads
/// that may still observe one.
pub struct ReachingDefinitions;

fn fact_variable(fact: &Fact) -> Option<&str> {
    match fact {
        Fact::Init(name) | Fact::Write(name, _) => Some(name),
        _ => None,
    }
}

impl DataflowAnalysis for ReachingDefinitions {
    fn name(&self) -> &'static str {
        "reaching-definitions"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn combining(&self) -> Combining {
        Combining::May
    }

    fn boundary(&self, _cfg: &Cfg, scope: &Scope) -> FactSet {
        scope
            .names()
            .map(|name| Fact::Init(name.to_string()))
            .collect()
    }

    fn gen(&self, node: &CfgNode, _inflow: &FactSet) -> FactSet {
        node.stmt
            .written_vars()
            .into_iter()
            .map(|name| Fact::Write(name, node.id))
            .collect()
    }

    fn kill(&self, node: &CfgNode, inflow: &FactSet) -> FactSet {
        let written = node.stmt.written_vars();
        inflow
            .iter()
            .filter(|fact| matches!(fact_variable(fact), Some(name) if written.contains(name)))
            .cloned()
            .collect()
    }

    fn check(&self, cfg: &Cfg, marking: &Marking) -> Vec<Finding> {
        let mut findings = Vec::new();
        for node in cfg.nodes() {
            for name in node.stmt.read_vars() {
                if marking.entry[node.id].contains(&Fact::Init(name.clone())) {
                    findings.push(Finding {
                        node: node.id,
                        message: format!(
                            "read of '{}' may observe its initial value at: {}",
                            name,
                            node.stmt.summary()
                        ),
                    });
                }
            }
        }
        findings
    }
}

/// Reachability: forward may-analysis with the single `Reachable` fact.
/// `fail` kills it; the check reports nodes whose in-set is empty.
pub struct Reachability;

impl DataflowAnalysis for Reachability {
    fn name(&self) -> &'static str {
        "reachability"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn combining(&self) -> Combining {
        Combining::May
    }

    fn boundary(&self, _cfg: &Cfg, _scope: &Scope) -> FactSet {
        [Fact::Reachable].into_iter().collect()
    }

    fn gen(&self, _node: &CfgNode, _inflow: &FactSet) -> FactSet {
        FactSet::new()
    }

    fn kill(&self, node: &CfgNode, _inflow: &FactSet) -> FactSet {
        match node.stmt {
            Statement::Fail { .. } => [Fact::Reachable].into_iter().collect(),
            _ => FactSet::new(),
        }
    }

    fn check(&self, cfg: &Cfg, marking: &Marking) -> Vec<Finding> {
        cfg.nodes()
            .iter()
            .filter(|node| marking.entry[node.id].is_empty())
            .map(|node| Finding {
                node: node.id,
                message: format!("unreachable statement: {}", node.stmt.summary()),
            })
            .collect()
    }
}

/// Taint: forward may-analysis. External input taints its target;
/// assignments propagate taint from the right-hand side; swap carries
/// taint across the two locations. The check reports prints that can see
/// any tainted state.
pub struct TaintAnalysis;

impl DataflowAnalysis for TaintAnalysis {
    fn name(&self) -> &'static str {
        "taint"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn combining(&self) -> Combining {
        Combining::May
    }

    fn gen(&self, node: &CfgNode, inflow: &FactSet) -> FactSet {
        match &node.stmt {
            Statement::Extern { .. } => node
                .stmt
                .written_vars()
                .into_iter()
                .map(Fact::Tainted)
                .collect(),
            Statement::Assign { .. } => {
                let reads_tainted = node
                    .stmt
                    .read_vars()
                    .iter()
                    .any(|name| inflow.contains(&Fact::Tainted(name.clone())));
                if reads_tainted {
                    node.stmt
                        .written_vars()
                        .into_iter()
                        .map(Fact::Tainted)
                        .collect()
                } else {
                    FactSet::new()
                }
            }
            Statement::Swap { left, right } => {
                let mut out = FactSet::new();
                if let (Some(l), Some(r)) = (left.as_variable(), right.as_variable()) {
                    if inflow.contains(&Fact::Tainted(l.to_string())) {
                        out.insert(Fact::Tainted(r.to_string()));
                    }
                    if inflow.contains(&Fact::Tainted(r.to_string())) {
                        out.insert(Fact::Tainted(l.to_string()));
                    }
                }
                out
            }
            _ => FactSet::new(),
        }
    }

    fn kill(&self, node: &CfgNode, inflow: &FactSet) -> FactSet {
        match &node.stmt {
            Statement::Assign { .. } => {
                let reads_tainted = node
                    .stmt
                    .read_vars()
                    .iter()
                    .any(|name| inflow.contains(&Fact::Tainted(name.clone())));
                if reads_tainted {
                    FactSet::new()
                } else {
                    // An untainted value overwrites the target.
                    node.stmt
                        .written_vars()
                        .into_iter()
                        .map(Fact::Tainted)
                        .collect()
                }
            }
            Statement::Swap { left, right } => {
                let mut out = FactSet::new();
                if let (Some(l), Some(r)) = (left.as_variable(), right.as_variable()) {
                    if !inflow.contains(&Fact::Tainted(r.to_string())) {
                        out.insert(Fact::Tainted(l.to_string()));
                    }
                    if !inflow.contains(&Fact::Tainted(l.to_string())) {
                        out.insert(Fact::Tainted(r.to_string()));
                    }
                }
                out
            }
            _ => FactSet::new(),
        }
    }

    fn check(&self, cfg: &Cfg, marking: &Marking) -> Vec<Finding> {
        cfg.nodes()
            .iter()
            .filter(|node| matches!(node.stmt, Statement::Print { .. }))
            .filter(|node| !marking.entry[node.id].is_empty())
            .map(|node| Finding {
                node: node.id,
                message: format!(
                    "print may observe external input: {}",
                    node.stmt.summary()
                ),
            })
            .collect()
    }
}
