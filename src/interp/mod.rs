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

//! Small-step execution
//!
//! A configuration bundles the remaining statements, the scope, a memory
//! snapshot, the error flag, and the accumulated path constraint. One step
//! of a statement yields a list of successor transitions: exactly one
//! under concrete execution, up to one per feasible branch under symbolic
//! execution. Snapshots are immutable, so a fork never disturbs its
//! parent.

pub mod eval;

use crate::ast::{ArithExpr, BoolExpr, Statement, StmtSequence};
use crate::error::{ExecError, ExecErrorKind};
use crate::memory::Memory;
use crate::output::Output;
use crate::parser::Context;
use crate::smt::Smt;
use crate::types::Scope;
use eval::{eval_address, eval_arith, eval_bool, CondValue};
use num_bigint::BigInt;
use rand::Rng;
use tracing::debug;

/// The semantic rule that produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTag {
    Assign,
    Swap,
    AssertOk,
    AssertViolation,
    IfTrue,
    IfFalse,
    LoopEnter,
    LoopExit,
    LoopInvariantViolation,
    Print,
    Havoc,
    Fail,
}

/// A machine configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub remaining: StmtSequence,
    pub scope: Scope,
    pub memory: Memory,
    pub error: Option<ExecError>,
    pub path: BoolExpr,
}

impl Configuration {
    pub fn is_terminal(&self) -> bool {
        self.remaining.is_exhausted() || self.error.is_some()
    }

    fn advance(&self, memory: Memory, path: BoolExpr) -> Configuration {
        Configuration {
            remaining: self.remaining.tail(),
            scope: self.scope.clone(),
            memory,
            error: None,
            path,
        }
    }

    /// The failing successor: error flag set, empty tail.
    fn die(&self, error: ExecError) -> Configuration {
        Configuration {
            remaining: StmtSequence::empty(),
            scope: self.scope.clone(),
            memory: self.memory.clone(),
            error: Some(error),
            path: self.path.clone(),
        }
    }
}

/// One execution step: source, optional output line, optional consumed
/// input, destination, the rule applied, and the contributing constraint.
#[derive(Debug, Clone)]
pub struct Transition {
    pub source: Configuration,
    pub output: Option<String>,
    pub input: Option<BigInt>,
    pub target: Configuration,
    pub rule: RuleTag,
    pub constraint: BoolExpr,
}

impl Transition {
    fn plain(source: &Configuration, target: Configuration, rule: RuleTag) -> Self {
        Self {
            source: source.clone(),
            output: None,
            input: None,
            target,
            rule,
            constraint: BoolExpr::True,
        }
    }
}

/// A node of the execution tree: the configuration, the number of steps
/// taken to reach it, the output it produced, and one child per applied
/// rule.
#[derive(Debug)]
pub struct ExecutionTree {
    pub config: Configuration,
    pub step: usize,
    pub output: Option<String>,
    pub children: Vec<(RuleTag, ExecutionTree)>,
}

impl ExecutionTree {
    /// All leaf configurations of the tree.
    pub fn leaves(&self) -> Vec<&Configuration> {
        if self.children.is_empty() {
            return vec![&self.config];
        }
        self.children
            .iter()
            .flat_map(|(_, child)| child.leaves())
            .collect()
    }

    /// Whether some path reaches a terminal, non-erroneous configuration.
    pub fn has_normal_termination(&self) -> bool {
        self.leaves()
            .iter()
            .any(|c| c.remaining.is_exhausted() && c.error.is_none())
    }
}

/// Source of concrete values for `extern` statements.
pub trait InputSource {
    fn next(&mut self, lower: &BigInt, upper: &BigInt) -> Result<BigInt, ExecError>;
}

/// Uniform draws from the inclusive range.
pub struct RandomInput;

impl InputSource for RandomInput {
    fn next(&mut self, lower: &BigInt, upper: &BigInt) -> Result<BigInt, ExecError> {
        let span: BigInt = upper - lower + BigInt::from(1);
        if span <= BigInt::from(0) {
            return Err(ExecError::new(
                ExecErrorKind::InputOutOfRange,
                format!("empty range {}..{}", lower, upper),
            ));
        }
        // Ranges are small (declared literals); draw through u64.
        let span = span.to_string().parse::<u128>().unwrap_or(u128::MAX);
        let offset = rand::thread_rng().gen_range(0..span);
        Ok(lower + BigInt::from(offset))
    }
}

/// A fixed stream of inputs for deterministic runs. Values outside the
/// declared range are fatal, as is exhausting the stream.
pub struct FixedInput {
    values: Vec<BigInt>,
    position: usize,
}

impl FixedInput {
    pub fn new(values: Vec<BigInt>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl InputSource for FixedInput {
    fn next(&mut self, lower: &BigInt, upper: &BigInt) -> Result<BigInt, ExecError> {
        let Some(value) = self.values.get(self.position) else {
            return Err(ExecError::new(
                ExecErrorKind::InputOutOfRange,
                "input stream exhausted",
            ));
        };
        self.position += 1;
        if value < lower || value > upper {
            return Err(ExecError::new(
                ExecErrorKind::InputOutOfRange,
                format!("{} outside {}..{}", value, lower, upper),
            ));
        }
        Ok(value.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Concrete,
    Symbolic,
}

/// The small-step executor.
pub struct Executor {
    mode: Mode,
    smt: Smt,
    input: Box<dyn InputSource>,
    extern_counter: usize,
}

impl Executor {
    pub fn concrete(input: Box<dyn InputSource>) -> Self {
        Self {
            mode: Mode::Concrete,
            smt: Smt::new(),
            input,
            extern_counter: 0,
        }
    }

    pub fn symbolic(smt: Smt) -> Self {
        Self {
            mode: Mode::Symbolic,
            smt,
            input: Box::new(RandomInput),
            extern_counter: 0,
        }
    }

    /// Build the executor matching a parsed context.
    pub fn for_context(ctx: &Context) -> Self {
        if ctx.symbolic {
            Self::symbolic(Smt::new())
        } else {
            match &ctx.input {
                Some(values) => Self::concrete(Box::new(FixedInput::new(values.clone()))),
                None => Self::concrete(Box::new(RandomInput)),
            }
        }
    }

    /// The initial configuration: every cell zero except array base cells,
    /// which point at their first element.
    pub fn initial_configuration(ctx: &Context) -> Result<Configuration, ExecError> {
        let mut memory = Memory::new(ctx.scope.total_size());
        for name in ctx.scope.names() {
            let info = ctx.scope.lookup(name).expect("declared name");
            if info.array_length.is_some() {
                memory = memory.write(
                    info.address,
                    ArithExpr::Num(BigInt::from(info.address + 1)),
                )?;
            }
        }
        Ok(Configuration {
            remaining: ctx.program.clone(),
            scope: ctx.scope.clone(),
            memory,
            error: None,
            path: BoolExpr::True,
        })
    }

    /// Execute one statement. Terminal configurations yield no
    /// transitions.
    pub fn step(&mut self, config: &Configuration) -> Vec<Transition> {
        if config.is_terminal() {
            return Vec::new();
        }
        let stmt = config.remaining.head().expect("non-terminal").clone();
        match &stmt {
            Statement::Assign { target, value } => self.step_assign(config, target, value),
            Statement::Swap { left, right } => self.step_swap(config, left, right),
            Statement::Assert { condition } => self.step_assert(config, condition),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => self.step_if(config, condition, then_branch, else_branch),
            Statement::While {
                condition,
                invariant,
                body,
            } => self.step_while(config, condition, invariant.as_ref(), body),
            Statement::Print { message, args } => self.step_print(config, message, args),
            Statement::Extern {
                target,
                lower,
                upper,
            } => self.step_extern(config, target, lower, upper),
            Statement::Fail { message } => {
                let error = ExecError::new(ExecErrorKind::Failure, message);
                vec![Transition::plain(config, config.die(error), RuleTag::Fail)]
            }
        }
    }

    fn step_assign(
        &mut self,
        config: &Configuration,
        target: &crate::ast::AddressExpr,
        value: &ArithExpr,
    ) -> Vec<Transition> {
        let result = eval_address(target, &config.scope, &config.memory).and_then(|addr| {
            let v = eval_arith(value, &config.scope, &config.memory)?;
            config.memory.write(addr, v)
        });
        match result {
            Ok(memory) => vec![Transition::plain(
                config,
                config.advance(memory, config.path.clone()),
                RuleTag::Assign,
            )],
            Err(e) => vec![Transition::plain(config, config.die(e), RuleTag::Assign)],
        }
    }

    fn step_swap(
        &mut self,
        config: &Configuration,
        left: &crate::ast::AddressExpr,
        right: &crate::ast::AddressExpr,
    ) -> Vec<Transition> {
        let result = (|| {
            let left_addr = eval_address(left, &config.scope, &config.memory)?;
            let right_addr = eval_address(right, &config.scope, &config.memory)?;
            let left_value = config.memory.read(left_addr)?.clone();
            let right_value = config.memory.read(right_addr)?.clone();
            config
                .memory
                .write(left_addr, right_value)?
                .write(right_addr, left_value)
        })();
        match result {
            Ok(memory) => vec![Transition::plain(
                config,
                config.advance(memory, config.path.clone()),
                RuleTag::Swap,
            )],
            Err(e) => vec![Transition::plain(config, config.die(e), RuleTag::Swap)],
        }
    }

    fn step_assert(&mut self, config: &Configuration, condition: &BoolExpr) -> Vec<Transition> {
        let value = match eval_bool(condition, &config.scope, &config.memory) {
            Ok(value) => value,
            Err(e) => {
                return vec![Transition::plain(config, config.die(e), RuleTag::AssertViolation)]
            }
        };
        match value {
            CondValue::Concrete(true) => vec![Transition::plain(
                config,
                config.advance(config.memory.clone(), config.path.clone()),
                RuleTag::AssertOk,
            )],
            CondValue::Concrete(false) => {
                let error = ExecError::new(ExecErrorKind::AssertionViolated, condition);
                vec![Transition::plain(config, config.die(error), RuleTag::AssertViolation)]
            }
            CondValue::Symbolic(phi) => {
                // Holds along this path iff path ∧ ¬φ is unsatisfiable.
                let query = config.path.clone().and(phi.clone().not());
                let solution = self.smt.solve(&query);
                if solution.is_unsat() {
                    vec![Transition::plain(
                        config,
                        config.advance(config.memory.clone(), config.path.clone()),
                        RuleTag::AssertOk,
                    )]
                } else {
                    let error = ExecError::new(ExecErrorKind::AssertionViolated, condition);
                    vec![Transition::plain(config, config.die(error), RuleTag::AssertViolation)]
                }
            }
        }
    }

    fn step_if(
        &mut self,
        config: &Configuration,
        condition: &BoolExpr,
        then_branch: &StmtSequence,
        else_branch: &StmtSequence,
    ) -> Vec<Transition> {
        let value = match eval_bool(condition, &config.scope, &config.memory) {
            Ok(value) => value,
            Err(e) => return vec![Transition::plain(config, config.die(e), RuleTag::IfTrue)],
        };
        let branch_to = |branch: &StmtSequence, path: BoolExpr| Configuration {
            remaining: config.remaining.tail().prepend(branch),
            scope: config.scope.clone(),
            memory: config.memory.clone(),
            error: None,
            path,
        };
        match value {
            CondValue::Concrete(true) => {
                vec![Transition::plain(
                    config,
                    branch_to(then_branch, config.path.clone()),
                    RuleTag::IfTrue,
                )]
            }
            CondValue::Concrete(false) => {
                vec![Transition::plain(
                    config,
                    branch_to(else_branch, config.path.clone()),
                    RuleTag::IfFalse,
                )]
            }
            CondValue::Symbolic(phi) => {
                let mut transitions = Vec::new();
                let then_path = config.path.clone().and(phi.clone());
                if self.feasible(&then_path) {
                    let mut t = Transition::plain(
                        config,
                        branch_to(then_branch, then_path),
                        RuleTag::IfTrue,
                    );
                    t.constraint = phi.clone();
                    transitions.push(t);
                }
                let else_path = config.path.clone().and(phi.clone().not());
                if self.feasible(&else_path) {
                    let mut t = Transition::plain(
                        config,
                        branch_to(else_branch, else_path),
                        RuleTag::IfFalse,
                    );
                    t.constraint = phi.not();
                    transitions.push(t);
                }
                transitions
            }
        }
    }

    fn step_while(
        &mut self,
        config: &Configuration,
        condition: &BoolExpr,
        invariant: Option<&BoolExpr>,
        body: &StmtSequence,
    ) -> Vec<Transition> {
        let cond = match eval_bool(condition, &config.scope, &config.memory) {
            Ok(value) => value,
            Err(e) => return vec![Transition::plain(config, config.die(e), RuleTag::LoopEnter)],
        };
        let inv = match invariant {
            None => CondValue::Concrete(true),
            Some(inv) => match eval_bool(inv, &config.scope, &config.memory) {
                Ok(value) => value,
                Err(e) => {
                    return vec![Transition::plain(
                        config,
                        config.die(e),
                        RuleTag::LoopInvariantViolation,
                    )]
                }
            },
        };

        if let (CondValue::Concrete(c), CondValue::Concrete(i)) = (&cond, &inv) {
            let transition = match (c, i) {
                (_, false) => {
                    let error = ExecError::new(
                        ExecErrorKind::InvariantViolated,
                        invariant.expect("violated invariant exists"),
                    );
                    Transition::plain(config, config.die(error), RuleTag::LoopInvariantViolation)
                }
                (true, true) => Transition::plain(
                    config,
                    Configuration {
                        // The loop itself stays in the remainder and will
                        // re-execute after the body.
                        remaining: config.remaining.prepend(body),
                        scope: config.scope.clone(),
                        memory: config.memory.clone(),
                        error: None,
                        path: config.path.clone(),
                    },
                    RuleTag::LoopEnter,
                ),
                (false, true) => Transition::plain(
                    config,
                    config.advance(config.memory.clone(), config.path.clone()),
                    RuleTag::LoopExit,
                ),
            };
            return vec![transition];
        }

        // At least one of the guards is symbolic: fork per feasible rule.
        let mut transitions = Vec::new();
        let cases = [
            (true, true, RuleTag::LoopEnter),
            (false, true, RuleTag::LoopExit),
            (true, false, RuleTag::LoopInvariantViolation),
            (false, false, RuleTag::LoopInvariantViolation),
        ];
        for (cond_truth, inv_truth, rule) in cases {
            let cond_part = if cond_truth {
                cond.as_formula()
            } else {
                cond.negated_formula()
            };
            let inv_part = if inv_truth {
                inv.as_formula()
            } else {
                inv.negated_formula()
            };
            let refinement = cond_part.and(inv_part);
            let path = config.path.clone().and(refinement.clone());
            if !self.feasible(&path) {
                continue;
            }
            let target = match rule {
                RuleTag::LoopEnter => Configuration {
                    remaining: config.remaining.prepend(body),
                    scope: config.scope.clone(),
                    memory: config.memory.clone(),
                    error: None,
                    path,
                },
                RuleTag::LoopExit => config.advance(config.memory.clone(), path),
                _ => {
                    let error = ExecError::new(
                        ExecErrorKind::InvariantViolated,
                        invariant.map(|i| i.to_string()).unwrap_or_default(),
                    );
                    let mut dead = config.die(error);
                    dead.path = path;
                    dead
                }
            };
            let mut t = Transition::plain(config, target, rule);
            t.constraint = refinement;
            transitions.push(t);
        }
        transitions
    }

    fn step_print(
        &mut self,
        config: &Configuration,
        message: &str,
        args: &[ArithExpr],
    ) -> Vec<Transition> {
        let mut rendered = Vec::new();
        for arg in args {
            match eval_arith(arg, &config.scope, &config.memory) {
                Ok(value) => rendered.push(value.to_string()),
                Err(e) => {
                    return vec![Transition::plain(config, config.die(e), RuleTag::Print)]
                }
            }
        }
        let line = if rendered.is_empty() {
            message.to_string()
        } else {
            format!("{} [{}]", message, rendered.join(", "))
        };
        let mut t = Transition::plain(
            config,
            config.advance(config.memory.clone(), config.path.clone()),
            RuleTag::Print,
        );
        t.output = Some(line);
        vec![t]
    }

    fn step_extern(
        &mut self,
        config: &Configuration,
        target: &crate::ast::AddressExpr,
        lower: &BigInt,
        upper: &BigInt,
    ) -> Vec<Transition> {
        let addr = match eval_address(target, &config.scope, &config.memory) {
            Ok(addr) => addr,
            Err(e) => return vec![Transition::plain(config, config.die(e), RuleTag::Havoc)],
        };
        match self.mode {
            Mode::Concrete => {
                let drawn = match self.input.next(lower, upper) {
                    Ok(value) => value,
                    Err(e) => {
                        return vec![Transition::plain(config, config.die(e), RuleTag::Havoc)]
                    }
                };
                match config.memory.write(addr, ArithExpr::Num(drawn.clone())) {
                    Ok(memory) => {
                        let mut t = Transition::plain(
                            config,
                            config.advance(memory, config.path.clone()),
                            RuleTag::Havoc,
                        );
                        t.input = Some(drawn);
                        vec![t]
                    }
                    Err(e) => vec![Transition::plain(config, config.die(e), RuleTag::Havoc)],
                }
            }
            Mode::Symbolic => {
                let name = config
                    .scope
                    .fresh_name("extern", &mut self.extern_counter);
                let symbol = ArithExpr::symbol(&name);
                // lower <= v < upper + 1
                let range = BoolExpr::lte(ArithExpr::Num(lower.clone()), symbol.clone()).and(
                    BoolExpr::lt(
                        symbol.clone(),
                        ArithExpr::Num(upper.clone() + 1),
                    ),
                );
                match config.memory.write(addr, symbol) {
                    Ok(memory) => {
                        let path = config.path.clone().and(range.clone());
                        let mut t = Transition::plain(
                            config,
                            config.advance(memory, path),
                            RuleTag::Havoc,
                        );
                        t.constraint = range;
                        vec![t]
                    }
                    Err(e) => vec![Transition::plain(config, config.die(e), RuleTag::Havoc)],
                }
            }
        }
    }

    /// A path is kept unless the solver proves it unsatisfiable; an
    /// unknown verdict keeps the branch.
    fn feasible(&mut self, path: &BoolExpr) -> bool {
        match self.mode {
            Mode::Concrete => true,
            Mode::Symbolic => !self.smt.solve(path).is_unsat(),
        }
    }

    /// Build the execution tree to the given depth.
    pub fn tree(&mut self, config: Configuration, max_depth: usize) -> ExecutionTree {
        self.tree_from(config, 0, None, max_depth)
    }

    fn tree_from(
        &mut self,
        config: Configuration,
        step: usize,
        output: Option<String>,
        max_depth: usize,
    ) -> ExecutionTree {
        let mut children = Vec::new();
        if step < max_depth {
            for transition in self.step(&config) {
                let child = self.tree_from(
                    transition.target,
                    step + 1,
                    transition.output,
                    max_depth,
                );
                children.push((transition.rule, child));
            }
        }
        ExecutionTree {
            config,
            step,
            output,
            children,
        }
    }

    /// Run a concrete program to termination, sending program output and
    /// the trailing `Terminated …` line to `out`.
    pub fn run(&mut self, ctx: &Context, out: &mut Output) -> Result<Configuration, ExecError> {
        let mut config = Self::initial_configuration(ctx)?;
        let mut steps = 0usize;
        while !config.is_terminal() {
            let mut transitions = self.step(&config);
            debug!(step = steps, transitions = transitions.len(), "exec step");
            if transitions.is_empty() {
                break;
            }
            // Concrete execution is deterministic: one successor.
            let transition = transitions.remove(0);
            if let Some(line) = &transition.output {
                out.println(line);
            }
            config = transition.target;
            steps += 1;
        }
        match &config.error {
            None => out.println(&format!("Terminated after {} steps.", steps)),
            Some(e) => out.println(&format!("Terminated with error: {}", e)),
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn run_with_inputs(source: &str, inputs: Vec<i64>) -> (Configuration, Output) {
        let ctx = parse_program(source, "t.wl").unwrap();
        let inputs = inputs.into_iter().map(BigInt::from).collect();
        let mut executor = Executor::concrete(Box::new(FixedInput::new(inputs)));
        let mut out = Output::silent();
        let config = executor.run(&ctx, &mut out).unwrap();
        (config, out)
    }

    #[test]
    fn test_gauss_concrete_run() {
        let (config, out) = run_with_inputs(
            "vars: int n; int i; int sum;
             code: extern n 0..100; i := 0; sum := 0;
                   while (i < n) { i := i + 1; sum := sum + i; };
                   print \"sum\", sum;",
            vec![5],
        );
        assert!(config.error.is_none());
        // sum cell is address 2.
        assert_eq!(config.memory.read(2).unwrap(), &ArithExpr::num(15));
        let lines = out.lines();
        assert_eq!(lines[0], "sum [15]");
        assert!(lines[1].starts_with("Terminated after"));
    }

    #[test]
    fn test_output_precedes_terminated_line() {
        let (_, out) = run_with_inputs(
            "vars: int x; code: print \"a\"; print \"b\";",
            vec![],
        );
        let lines = out.lines();
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "b");
        assert!(lines[2].starts_with("Terminated"));
    }

    #[test]
    fn test_assert_violation_halts() {
        let (config, out) = run_with_inputs(
            "vars: int x; code: x := 3; assert (x < 2); x := 99;",
            vec![],
        );
        let error = config.error.expect("assertion should fail");
        assert_eq!(error.kind, ExecErrorKind::AssertionViolated);
        // The statement after the assert never ran.
        assert_eq!(config.memory.read(0).unwrap(), &ArithExpr::num(3));
        assert!(out.contents().contains("Terminated with error"));
    }

    #[test]
    fn test_fail_statement() {
        let (config, _) = run_with_inputs("vars: code: fail \"boom\";", vec![]);
        assert_eq!(config.error.unwrap().kind, ExecErrorKind::Failure);
    }

    #[test]
    fn test_swap_concrete() {
        let (config, _) = run_with_inputs(
            "vars: int a; int b; code: a := 1; b := 2; swap a and b;",
            vec![],
        );
        assert_eq!(config.memory.read(0).unwrap(), &ArithExpr::num(2));
        assert_eq!(config.memory.read(1).unwrap(), &ArithExpr::num(1));
    }

    #[test]
    fn test_extern_out_of_range_input_fatal() {
        let (config, _) = run_with_inputs("vars: int x; code: extern x 0..5;", vec![9]);
        assert_eq!(config.error.unwrap().kind, ExecErrorKind::InputOutOfRange);
    }

    #[test]
    fn test_invariant_violation_concrete() {
        let (config, _) = run_with_inputs(
            "vars: int i; code: i := 5; while (i > 0) invariant (i < 3) { i := i - 1; };",
            vec![],
        );
        assert_eq!(config.error.unwrap().kind, ExecErrorKind::InvariantViolated);
    }

    #[test]
    fn test_loop_unroll_keeps_loop_statement() {
        let ctx = parse_program(
            "vars: int i; code: i := 2; while (i > 0) { i := i - 1; };",
            "t.wl",
        )
        .unwrap();
        let mut executor = Executor::concrete(Box::new(RandomInput));
        let mut config = Executor::initial_configuration(&ctx).unwrap();
        // Step over i := 2.
        config = executor.step(&config).remove(0).target;
        // Loop head with true condition: body is prepended, loop remains.
        let unrolled = executor.step(&config).remove(0);
        assert_eq!(unrolled.rule, RuleTag::LoopEnter);
        assert_eq!(unrolled.target.remaining.len(), 2);
    }

    #[test]
    fn test_array_program() {
        let (config, _) = run_with_inputs(
            "vars: int[3] a; code: a[0] := 30; a[1] := 20; a[2] := 10;
             swap a[0] and a[2];
             assert (a[0] < a[2]);",
            vec![],
        );
        assert!(config.error.is_none());
        assert_eq!(config.memory.read(1).unwrap(), &ArithExpr::num(10));
        assert_eq!(config.memory.read(3).unwrap(), &ArithExpr::num(30));
    }

    #[test]
    fn test_pointer_write() {
        let (config, _) = run_with_inputs(
            "vars: int x; int* p; code: p := &x; *p := 7;",
            vec![],
        );
        assert!(config.error.is_none());
        assert_eq!(config.memory.read(0).unwrap(), &ArithExpr::num(7));
    }

    #[test]
    fn test_division_by_zero_kills_path() {
        let (config, _) = run_with_inputs(
            "vars: int x; int y; code: y := 0; x := 1 / y;",
            vec![],
        );
        let error = config.error.unwrap();
        assert_eq!(error.root_cause().kind, ExecErrorKind::DivisionByZero);
    }

    #[test]
    fn test_if_branches() {
        let (config, _) = run_with_inputs(
            "vars: int x; int y; code: x := 5;
             if (x > 3) { y := 1; } else { y := 2; };",
            vec![],
        );
        assert_eq!(config.memory.read(1).unwrap(), &ArithExpr::num(1));
    }

    #[test]
    fn test_symbolic_tree_requires_solver() {
        // Symbolic branching goes through the SMT facade; skip without it.
        let smt = Smt::new();
        if !smt.available() {
            return;
        }
        let ctx = parse_program(
            "vars: int x; code: extern x 0..10;
             if (x > 5) { x := 1; } else { x := 2; };",
            "t.wl",
        )
        .unwrap();
        let mut executor = Executor::symbolic(smt);
        let initial = Executor::initial_configuration(&ctx).unwrap();
        let tree = executor.tree(initial, 10);
        // extern then a feasible fork on both sides.
        let havoc = &tree.children;
        assert_eq!(havoc.len(), 1);
        assert_eq!(havoc[0].0, RuleTag::Havoc);
        let fork = &havoc[0].1.children;
        assert_eq!(fork.len(), 2);
        assert!(tree.has_normal_termination());
    }

    #[test]
    fn test_symbolic_extern_constrains_path() {
        let ctx = parse_program("vars: int x; code: extern x 2..4;", "t.wl").unwrap();
        let mut executor = Executor::symbolic(Smt::new());
        let initial = Executor::initial_configuration(&ctx).unwrap();
        let transitions = executor.step(&initial);
        assert_eq!(transitions.len(), 1);
        let t = &transitions[0];
        assert_eq!(t.rule, RuleTag::Havoc);
        // The written cell is the fresh symbol, constrained to [2, 5).
        let cell = t.target.memory.read(0).unwrap();
        assert_eq!(cell, &ArithExpr::symbol("extern_0"));
        let expected = BoolExpr::lte(ArithExpr::num(2), ArithExpr::symbol("extern_0")).and(
            BoolExpr::lt(ArithExpr::symbol("extern_0"), ArithExpr::num(5)),
        );
        assert_eq!(t.constraint, expected);
    }
}
