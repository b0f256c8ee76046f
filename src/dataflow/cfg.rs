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

//! Control-flow graph
//!
//! Nodes live in an arena with stable insertion-order ids; edges are an
//! explicit `(from, to, label)` list so the loop back-edge never forms a
//! pointer cycle. Predecessors and successors are computed by filtering
//! the edge list.

use crate::ast::{Statement, StmtSequence};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabel {
    True,
    False,
}

/// One CFG node: a simple statement, or the condition of an `if`/`while`.
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub id: NodeId,
    pub stmt: Statement,
}

#[derive(Debug, Clone)]
pub struct Cfg {
    nodes: Vec<CfgNode>,
    edges: Vec<(NodeId, NodeId, Option<EdgeLabel>)>,
    entries: Vec<NodeId>,
    exits: Vec<NodeId>,
}

/// Dangling exits of a partially built region, with the label their
/// outgoing edge will carry.
type Pending = Vec<(NodeId, Option<EdgeLabel>)>;

impl Cfg {
    pub fn build(program: &StmtSequence) -> Cfg {
        let mut cfg = Cfg {
            nodes: Vec::new(),
            edges: Vec::new(),
            entries: Vec::new(),
            exits: Vec::new(),
        };
        let (entries, exits) = cfg.build_sequence(program);
        cfg.entries = entries;
        cfg.exits = exits.into_iter().map(|(id, _)| id).collect();
        cfg
    }

    fn add_node(&mut self, stmt: &Statement) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(CfgNode {
            id,
            stmt: stmt.clone(),
        });
        id
    }

    fn connect(&mut self, pending: &[(NodeId, Option<EdgeLabel>)], targets: &[NodeId]) {
        for &(from, label) in pending {
            for &to in targets {
                self.edges.push((from, to, label));
            }
        }
    }

    /// Build a sequence; returns its initial nodes and dangling exits.
    /// An empty sequence contributes nothing.
    fn build_sequence(&mut self, seq: &StmtSequence) -> (Vec<NodeId>, Pending) {
        let mut initials: Vec<NodeId> = Vec::new();
        let mut pending: Pending = Vec::new();
        for stmt in seq.iter() {
            let (stmt_initials, stmt_pending) = self.build_statement(stmt);
            if initials.is_empty() {
                initials = stmt_initials.clone();
            }
            self.connect(&pending, &stmt_initials);
            pending = stmt_pending;
        }
        (initials, pending)
    }

    fn build_statement(&mut self, stmt: &Statement) -> (Vec<NodeId>, Pending) {
        match stmt {
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.add_node(stmt);
                let mut pending: Pending = Vec::new();

                let (then_initials, then_pending) = self.build_sequence(then_branch);
                if then_initials.is_empty() {
                    pending.push((cond, Some(EdgeLabel::True)));
                } else {
                    self.connect(&[(cond, Some(EdgeLabel::True))], &then_initials);
                    pending.extend(then_pending);
                }

                let (else_initials, else_pending) = self.build_sequence(else_branch);
                if else_initials.is_empty() {
                    pending.push((cond, Some(EdgeLabel::False)));
                } else {
                    self.connect(&[(cond, Some(EdgeLabel::False))], &else_initials);
                    pending.extend(else_pending);
                }

                (vec![cond], pending)
            }
            Statement::While { body, .. } => {
                let header = self.add_node(stmt);
                let (body_initials, body_pending) = self.build_sequence(body);
                if body_initials.is_empty() {
                    // Empty body: the header loops on itself.
                    self.edges.push((header, header, Some(EdgeLabel::True)));
                } else {
                    self.connect(&[(header, Some(EdgeLabel::True))], &body_initials);
                    self.connect(&body_pending, &[header]);
                }
                (vec![header], vec![(header, Some(EdgeLabel::False))])
            }
            _ => {
                let id = self.add_node(stmt);
                (vec![id], vec![(id, None)])
            }
        }
    }

    pub fn nodes(&self) -> &[CfgNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &CfgNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[(NodeId, NodeId, Option<EdgeLabel>)] {
        &self.edges
    }

    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(from, _, _)| *from == id)
            .map(|(_, to, _)| *to)
            .collect()
    }

    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(_, to, _)| *to == id)
            .map(|(from, _, _)| *from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn build(source: &str) -> Cfg {
        let ctx = parse_program(source, "t.wl").unwrap();
        Cfg::build(&ctx.program)
    }

    #[test]
    fn test_straight_line() {
        let cfg = build("vars: int x; code: x := 1; x := 2; x := 3;");
        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.entries(), &[0]);
        assert_eq!(cfg.exits(), &[2]);
        assert_eq!(cfg.successors(0), vec![1]);
        assert_eq!(cfg.predecessors(2), vec![1]);
    }

    #[test]
    fn test_if_fans_out_and_joins() {
        let cfg = build(
            "vars: int x; code: if (x < 1) { x := 1; } else { x := 2; }; x := 3;",
        );
        // Nodes: if, then-assign, else-assign, join-assign.
        assert_eq!(cfg.len(), 4);
        let mut successors = cfg.successors(0);
        successors.sort_unstable();
        assert_eq!(successors, vec![1, 2]);
        let mut joiners = cfg.predecessors(3);
        joiners.sort_unstable();
        assert_eq!(joiners, vec![1, 2]);
        let labels: Vec<_> = cfg
            .edges()
            .iter()
            .filter(|(from, _, _)| *from == 0)
            .map(|(_, _, label)| *label)
            .collect();
        assert!(labels.contains(&Some(EdgeLabel::True)));
        assert!(labels.contains(&Some(EdgeLabel::False)));
    }

    #[test]
    fn test_empty_else_falls_through() {
        let cfg = build("vars: int x; code: if (x < 1) { x := 1; } else { }; x := 3;");
        // The false edge of the condition goes straight to the successor.
        assert!(cfg
            .edges()
            .contains(&(0, 2, Some(EdgeLabel::False))));
    }

    #[test]
    fn test_while_loops_back() {
        let cfg = build("vars: int i; code: while (i < 5) { i := i + 1; }; i := 0;");
        // Nodes: while, body-assign, successor-assign.
        assert_eq!(cfg.len(), 3);
        assert!(cfg.edges().contains(&(0, 1, Some(EdgeLabel::True))));
        assert!(cfg.edges().contains(&(1, 0, None)));
        assert!(cfg.edges().contains(&(0, 2, Some(EdgeLabel::False))));
    }

    #[test]
    fn test_empty_program() {
        let cfg = build("vars: code:");
        assert!(cfg.is_empty());
        assert!(cfg.entries().is_empty());
    }

    #[test]
    fn test_stable_insertion_order_ids() {
        let cfg = build("vars: int x; code: x := 1; while (x > 0) { x := x - 1; }; fail \"end\";");
        let kinds: Vec<String> = cfg.nodes().iter().map(|n| n.stmt.summary()).collect();
        assert_eq!(kinds[0], "x := 1");
        assert!(kinds[1].starts_with("while"));
        assert_eq!(kinds[2], "x := (x - 1)");
        assert!(kinds[3].starts_with("fail"));
    }
}
