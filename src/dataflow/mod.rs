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

//! Monotone dataflow framework
//!
//! Facts flow forward or backward over the CFG; combining is union for
//! may-analyses and intersection for must-analyses, with the empty set
//! when there is nothing to combine. Iteration runs `next` until the
//! marking reaches its fixpoint, which monotone gen/kill on the finite
//! fact lattice guarantees.

pub mod analyses;
pub mod cfg;

use cfg::{Cfg, CfgNode, NodeId};
use crate::types::Scope;
use std::collections::BTreeSet;

/// One dataflow fact. A single closed sum serves all bundled analyses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fact {
    /// Control can reach this point.
    Reachable,
    /// The variable may be read later (live variables).
    Live(String),
    /// The initial pseudo-definition of a variable (reaching definitions).
    Init(String),
    /// A write to a variable at a node (reaching definitions).
    Write(String, NodeId),
    /// The variable may carry external input (taint).
    Tainted(String),
}

pub type FactSet = BTreeSet<Fact>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combining {
    /// Union over the combined sets.
    May,
    /// Intersection over the combined sets.
    Must,
}

/// Entry and exit fact sets for every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marking {
    pub entry: Vec<FactSet>,
    pub exit: Vec<FactSet>,
}

impl Marking {
    pub fn empty(size: usize) -> Self {
        Self {
            entry: vec![FactSet::new(); size],
            exit: vec![FactSet::new(); size],
        }
    }
}

/// A problem report produced by an analysis check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub node: NodeId,
    pub message: String,
}

/// A dataflow analysis descriptor: direction, combining operator, boundary
/// facts, per-statement gen/kill, and an optional check over the fixpoint.
pub trait DataflowAnalysis {
    fn name(&self) -> &'static str;

    fn direction(&self) -> Direction;

    fn combining(&self) -> Combining;

    /// Facts seeded at the program boundary (entry nodes for forward
    /// analyses, exit nodes for backward ones).
    fn boundary(&self, _cfg: &Cfg, _scope: &Scope) -> FactSet {
        FactSet::new()
    }

    fn gen(&self, node: &CfgNode, inflow: &FactSet) -> FactSet;

    fn kill(&self, node: &CfgNode, inflow: &FactSet) -> FactSet;

    /// Report problems visible in the fixpoint marking.
    fn check(&self, _cfg: &Cfg, _marking: &Marking) -> Vec<Finding> {
        Vec::new()
    }
}

/// Iterate to the fixpoint.
pub fn analyze(cfg: &Cfg, scope: &Scope, analysis: &dyn DataflowAnalysis) -> Marking {
    let mut marking = Marking::empty(cfg.len());
    loop {
        let stepped = next(cfg, scope, analysis, &marking);
        if stepped == marking {
            return marking;
        }
        marking = stepped;
    }
}

/// One simultaneous update of every node.
pub fn next(
    cfg: &Cfg,
    scope: &Scope,
    analysis: &dyn DataflowAnalysis,
    marking: &Marking,
) -> Marking {
    let boundary_nodes: &[NodeId] = match analysis.direction() {
        Direction::Forward => cfg.entries(),
        Direction::Backward => cfg.exits(),
    };
    let boundary = analysis.boundary(cfg, scope);

    let mut stepped = Marking::empty(cfg.len());
    for node in cfg.nodes() {
        let neighbours = match analysis.direction() {
            Direction::Forward => cfg.predecessors(node.id),
            Direction::Backward => cfg.successors(node.id),
        };
        let neighbour_flows: Vec<&FactSet> = neighbours
            .iter()
            .map(|&n| match analysis.direction() {
                Direction::Forward => &marking.exit[n],
                Direction::Backward => &marking.entry[n],
            })
            .collect();
        let mut inflow = combine(analysis.combining(), &neighbour_flows);
        if boundary_nodes.contains(&node.id) {
            inflow.extend(boundary.iter().cloned());
        }

        let kill = analysis.kill(node, &inflow);
        let gen = analysis.gen(node, &inflow);
        let mut outflow: FactSet = inflow.difference(&kill).cloned().collect();
        outflow.extend(gen);

        match analysis.direction() {
            Direction::Forward => {
                stepped.entry[node.id] = inflow;
                stepped.exit[node.id] = outflow;
            }
            Direction::Backward => {
                stepped.exit[node.id] = inflow;
                stepped.entry[node.id] = outflow;
            }
        }
    }
    stepped
}

fn combine(combining: Combining, flows: &[&FactSet]) -> FactSet {
    match combining {
        Combining::May => {
            let mut out = FactSet::new();
            for flow in flows {
                out.extend((*flow).iter().cloned());
            }
            out
        }
        Combining::Must => match flows.split_first() {
            None => FactSet::new(),
            Some((first, rest)) => {
                let mut out = (*first).clone();
                for flow in rest {
                    out = out.intersection(flow).cloned().collect();
                }
                out
            }
        },
    }
}

/// Run an analysis and its check in one call.
pub fn run_check(
    cfg: &Cfg,
    scope: &Scope,
    analysis: &dyn DataflowAnalysis,
) -> (Marking, Vec<Finding>) {
    let marking = analyze(cfg, scope, analysis);
    let findings = analysis.check(cfg, &marking);
    (marking, findings)
}
