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

//! Symbolic transition-system encoder
//!
//! Encodes an annotated program as a labelled transition relation over the
//! state `(loc, M, v̄)`: a location counter, a whole-memory array, and one
//! integer constant per user variable holding its address. Values live in
//! `M`; conditions are rewritten to on-memory form. The error location is
//! `-1` and the safety invariant demands the postcondition at the exit
//! location.

use crate::ast::{AddressExpr, ArithExpr, ArrayExpr, BoolExpr, Statement, StmtSequence};
use crate::parser::Context;
use num_bigint::BigInt;
use std::collections::BTreeSet;

/// The distinguished error location.
pub const ERROR_LOCATION: i64 = -1;

const LOC: &str = "loc";

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Conjoin the user loop invariant onto the loop-entry guard.
    pub assume_invariant: bool,
    /// Encode `print` as a memory-unchanged step. When disabled the print
    /// transition contributes `false`, cutting every path through it.
    pub encode_print: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            assume_invariant: false,
            encode_print: true,
        }
    }
}

/// One encoded transition: source and destination locations plus the
/// data constraint relating `M`/`M'` and any havocked variable.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTransition {
    pub from: i64,
    pub to: i64,
    pub constraint: BoolExpr,
    /// Variables whose primed copy is written by this transition; every
    /// other state variable is framed.
    writes: BTreeSet<String>,
}

/// The encoded system `(vars, initial, transitions, invariant,
/// nextLocationId)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSystem {
    /// User variables plus the havoc unknowns, in declaration order.
    pub vars: Vec<String>,
    initial: BoolExpr,
    transitions: Vec<EncodedTransition>,
    invariant: BoolExpr,
    next_location: i64,
    exit_location: i64,
}

impl TransitionSystem {
    pub fn initial(&self) -> &BoolExpr {
        &self.initial
    }

    pub fn invariant(&self) -> &BoolExpr {
        &self.invariant
    }

    pub fn transitions(&self) -> &[EncodedTransition] {
        &self.transitions
    }

    pub fn next_location_id(&self) -> i64 {
        self.next_location
    }

    pub fn exit_location(&self) -> i64 {
        self.exit_location
    }

    /// The whole transition relation as one formula over `loc`/`loc'`,
    /// `M`/`M'`, and the (un)primed state variables.
    pub fn transition_relation(&self) -> BoolExpr {
        BoolExpr::disjoin(self.transitions.iter().map(|t| self.single_relation(t)))
    }

    fn single_relation(&self, t: &EncodedTransition) -> BoolExpr {
        let mut formula = BoolExpr::eq(
            ArithExpr::symbol(LOC),
            ArithExpr::Num(BigInt::from(t.from)),
        )
        .and(BoolExpr::eq(
            ArithExpr::symbol(&primed(LOC)),
            ArithExpr::Num(BigInt::from(t.to)),
        ))
        .and(t.constraint.clone());
        for var in &self.vars {
            if !t.writes.contains(var) {
                formula = formula.and(BoolExpr::eq(
                    ArithExpr::symbol(var),
                    ArithExpr::symbol(&primed(var)),
                ));
            }
        }
        formula
    }

    /// The transition relation with unprimed state renamed to suffix
    /// `from` and primed state to suffix `to`. No temporal marker
    /// survives the renaming.
    pub fn numbered_transitions(&self, from: u32, to: u32) -> BoolExpr {
        self.rename_states(&self.transition_relation(), from, to)
    }

    /// The initial condition at time step 0.
    pub fn zeroed_initial(&self) -> BoolExpr {
        self.rename_states(&self.initial, 0, 0)
    }

    /// The safety invariant at time step `k`.
    pub fn numbered_invariant(&self, k: u32) -> BoolExpr {
        self.rename_states(&self.invariant, k, k)
    }

    fn rename_states(&self, formula: &BoolExpr, from: u32, to: u32) -> BoolExpr {
        let vars: BTreeSet<&str> = self.vars.iter().map(String::as_str).collect();
        formula.rename(
            &|name: &str| {
                let (base, is_primed) = match name.strip_suffix('\'') {
                    Some(base) => (base, true),
                    None => (name, false),
                };
                if base != LOC && !vars.contains(base) {
                    return None;
                }
                let suffix = if is_primed { to } else { from };
                Some(format!("{}_{}", base, suffix))
            },
            &|leaf: &ArrayExpr| match leaf {
                ArrayExpr::AnyArray => Some(ArrayExpr::Named(format!("M_{}", from))),
                ArrayExpr::AnyArrayPrimed => Some(ArrayExpr::Named(format!("M_{}", to))),
                ArrayExpr::Named(_) => None,
                ArrayExpr::Store(..) => None,
            },
        )
    }
}

fn primed(name: &str) -> String {
    format!("{}'", name)
}

/// Encode a context into a transition system.
pub fn encode(ctx: &Context, options: &EncoderOptions) -> TransitionSystem {
    let mut encoder = Encoder {
        options: options.clone(),
        transitions: Vec::new(),
        location: 0,
        vars: ctx.scope.names().map(str::to_string).collect(),
        extern_counter: 0,
    };
    encoder.encode_sequence(&ctx.program);
    let exit_location = encoder.location;

    let initial = encoder.initial_condition(ctx);
    let invariant = encoder.safety_invariant(ctx, exit_location);

    TransitionSystem {
        vars: encoder.vars,
        initial,
        transitions: encoder.transitions,
        invariant,
        next_location: exit_location,
        exit_location,
    }
}

struct Encoder {
    options: EncoderOptions,
    transitions: Vec<EncodedTransition>,
    location: i64,
    vars: Vec<String>,
    extern_counter: usize,
}

impl Encoder {
    fn push(&mut self, from: i64, to: i64, constraint: BoolExpr, writes: BTreeSet<String>) {
        self.transitions.push(EncodedTransition {
            from,
            to,
            constraint,
            writes,
        });
    }

    fn memory_unchanged() -> BoolExpr {
        BoolExpr::array_eq(ArrayExpr::AnyArrayPrimed, ArrayExpr::AnyArray)
    }

    fn encode_sequence(&mut self, seq: &StmtSequence) {
        for stmt in seq.iter() {
            self.encode_statement(stmt);
        }
    }

    fn encode_statement(&mut self, stmt: &Statement) {
        let entry = self.location;
        match stmt {
            Statement::Assign { target, value } => {
                let update = BoolExpr::array_eq(
                    ArrayExpr::AnyArrayPrimed,
                    ArrayExpr::AnyArray
                        .store(address_form(target), value_form(value)),
                );
                self.location += 1;
                self.push(entry, self.location, update, BTreeSet::new());
            }
            Statement::Swap { left, right } => {
                let left_addr = address_form(left);
                let right_addr = address_form(right);
                let left_value = ArrayExpr::AnyArray.select(left_addr.clone());
                let right_value = ArrayExpr::AnyArray.select(right_addr.clone());
                let update = BoolExpr::array_eq(
                    ArrayExpr::AnyArrayPrimed,
                    ArrayExpr::AnyArray
                        .store(left_addr, right_value)
                        .store(right_addr, left_value),
                );
                self.location += 1;
                self.push(entry, self.location, update, BTreeSet::new());
            }
            Statement::Print { .. } => {
                let constraint = if self.options.encode_print {
                    Self::memory_unchanged()
                } else {
                    BoolExpr::False
                };
                self.location += 1;
                self.push(entry, self.location, constraint, BTreeSet::new());
            }
            Statement::Extern {
                target,
                lower,
                upper,
            } => {
                let name = self.fresh_extern();
                let next = ArithExpr::symbol(&primed(&name));
                let range = BoolExpr::lte(ArithExpr::Num(lower.clone()), next.clone()).and(
                    BoolExpr::lt(
                        next.clone(),
                        ArithExpr::Num(upper.clone() + BigInt::from(1)),
                    ),
                );
                let update = BoolExpr::array_eq(
                    ArrayExpr::AnyArrayPrimed,
                    ArrayExpr::AnyArray.store(address_form(target), next),
                );
                let mut writes = BTreeSet::new();
                writes.insert(name);
                self.location += 1;
                self.push(entry, self.location, range.and(update), writes);
            }
            Statement::Assert { condition } => {
                let guard = bool_form(condition);
                self.location += 1;
                self.push(
                    entry,
                    self.location,
                    guard.clone().and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
                self.push(
                    entry,
                    ERROR_LOCATION,
                    guard.not().and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
            }
            Statement::Fail { .. } => {
                self.location += 1;
                self.push(
                    entry,
                    ERROR_LOCATION,
                    Self::memory_unchanged(),
                    BTreeSet::new(),
                );
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let guard = bool_form(condition);
                self.location += 1;
                let then_entry = self.location;
                self.push(
                    entry,
                    then_entry,
                    guard.clone().and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
                self.encode_sequence(then_branch);
                let then_final = self.location;

                self.location += 1;
                let else_entry = self.location;
                self.push(
                    entry,
                    else_entry,
                    guard.not().and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
                self.encode_sequence(else_branch);
                let else_final = self.location;

                // Unify the join point: the then-block now ends where the
                // else-block ends.
                self.rename_location(then_final, else_final);
            }
            Statement::While {
                condition,
                invariant,
                body,
            } => {
                let header = entry;
                let mut guard = bool_form(condition);
                if self.options.assume_invariant {
                    if let Some(inv) = invariant {
                        guard = guard.and(bool_form(inv));
                    }
                }
                self.location += 1;
                let body_entry = self.location;
                self.push(
                    header,
                    body_entry,
                    guard.and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
                self.encode_sequence(body);
                let body_final = self.location;
                // The body flows back to the header; its final label is
                // recycled as the loop exit.
                self.rename_location(body_final, header);
                self.push(
                    header,
                    body_final,
                    bool_form(condition).not().and(Self::memory_unchanged()),
                    BTreeSet::new(),
                );
            }
        }
    }

    fn rename_location(&mut self, old: i64, new: i64) {
        if old == new {
            return;
        }
        for t in &mut self.transitions {
            if t.from == old {
                t.from = new;
            }
            if t.to == old {
                t.to = new;
            }
        }
    }

    fn fresh_extern(&mut self) -> String {
        loop {
            let candidate = format!("extern_{}", self.extern_counter);
            self.extern_counter += 1;
            if !self.vars.iter().any(|v| v == &candidate) {
                self.vars.push(candidate.clone());
                return candidate;
            }
        }
    }

    fn initial_condition(&self, ctx: &Context) -> BoolExpr {
        let mut parts = vec![BoolExpr::eq(ArithExpr::symbol(LOC), ArithExpr::num(0))];
        for name in ctx.scope.names() {
            let info = ctx.scope.lookup(name).expect("declared name");
            parts.push(BoolExpr::eq(
                ArithExpr::symbol(name),
                ArithExpr::Num(BigInt::from(info.address)),
            ));
            match info.array_length {
                None => {
                    parts.push(BoolExpr::eq(
                        ArrayExpr::AnyArray.select(ArithExpr::Num(BigInt::from(info.address))),
                        ArithExpr::num(0),
                    ));
                }
                Some(length) => {
                    // The base cell holds the data pointer, the data
                    // cells start at zero.
                    parts.push(BoolExpr::eq(
                        ArrayExpr::AnyArray.select(ArithExpr::Num(BigInt::from(info.address))),
                        ArithExpr::Num(BigInt::from(info.address + 1)),
                    ));
                    for offset in 1..=length {
                        parts.push(BoolExpr::eq(
                            ArrayExpr::AnyArray
                                .select(ArithExpr::Num(BigInt::from(info.address + offset))),
                            ArithExpr::num(0),
                        ));
                    }
                }
            }
        }
        parts.push(bool_form(&ctx.pre));
        BoolExpr::conjoin(parts)
    }

    fn safety_invariant(&self, ctx: &Context, exit_location: i64) -> BoolExpr {
        let loc = ArithExpr::symbol(LOC);
        let not_at_error = BoolExpr::gte(loc.clone(), ArithExpr::num(0));
        let at_exit = BoolExpr::eq(loc, ArithExpr::Num(BigInt::from(exit_location)));
        not_at_error.and(at_exit.not().or(bool_form(&ctx.post)))
    }
}

/// The memory index an lvalue denotes: `addr(v) = v`,
/// `addr(*r) = M[addr(r)]`, `addr(b[i]) = M[addr(b)] + value(i)`.
pub fn address_form(addr: &AddressExpr) -> ArithExpr {
    match addr {
        AddressExpr::Variable(name) => ArithExpr::symbol(name),
        AddressExpr::DeRef(inner) => ArrayExpr::AnyArray.select(address_form(inner)),
        AddressExpr::ArrayAccess { base, index } => ArrayExpr::AnyArray
            .select(address_form(base))
            .add(value_form(index)),
    }
}

/// The on-memory form of a value: reads become selects out of `M`,
/// address-of becomes the address constant.
pub fn value_form(expr: &ArithExpr) -> ArithExpr {
    match expr {
        ArithExpr::Num(_) => expr.clone(),
        ArithExpr::Add(l, r) => value_form(l).add(value_form(r)),
        ArithExpr::Sub(l, r) => value_form(l).sub(value_form(r)),
        ArithExpr::Mul(l, r) => value_form(l).mul(value_form(r)),
        ArithExpr::Div(l, r) => {
            ArithExpr::Div(Box::new(value_form(l)), Box::new(value_form(r)))
        }
        ArithExpr::Rem(l, r) => {
            ArithExpr::Rem(Box::new(value_form(l)), Box::new(value_form(r)))
        }
        ArithExpr::Neg(inner) => ArithExpr::Neg(Box::new(value_form(inner))),
        ArithExpr::ValAt(addr) => ArrayExpr::AnyArray.select(address_form(addr)),
        ArithExpr::AddressOf(name) => ArithExpr::symbol(name),
        ArithExpr::Select(arr, idx) => ArithExpr::Select(
            arr.clone(),
            Box::new(value_form(idx)),
        ),
    }
}

/// The on-memory form of a condition.
pub fn bool_form(expr: &BoolExpr) -> BoolExpr {
    match expr {
        BoolExpr::True | BoolExpr::False => expr.clone(),
        BoolExpr::Not(inner) => bool_form(inner).not(),
        BoolExpr::And(l, r) => bool_form(l).and(bool_form(r)),
        BoolExpr::Or(l, r) => bool_form(l).or(bool_form(r)),
        BoolExpr::Imply(l, r) => bool_form(l).imply(bool_form(r)),
        BoolExpr::Equiv(l, r) => BoolExpr::Equiv(Box::new(bool_form(l)), Box::new(bool_form(r))),
        BoolExpr::Eq {
            left,
            right,
            nesting,
        } => BoolExpr::Eq {
            left: Box::new(value_form(left)),
            right: Box::new(value_form(right)),
            nesting: *nesting,
        },
        BoolExpr::Lt(l, r) => BoolExpr::lt(value_form(l), value_form(r)),
        BoolExpr::Lte(l, r) => BoolExpr::lte(value_form(l), value_form(r)),
        BoolExpr::Gt(l, r) => BoolExpr::Gt(Box::new(value_form(l)), Box::new(value_form(r))),
        BoolExpr::Gte(l, r) => BoolExpr::gte(value_form(l), value_form(r)),
        BoolExpr::Forall { bound, body } => BoolExpr::Forall {
            bound: bound.clone(),
            body: Box::new(bool_form(body)),
        },
        BoolExpr::ArrayEq(l, r) => BoolExpr::ArrayEq(l.clone(), r.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn encode_source(source: &str) -> TransitionSystem {
        let ctx = parse_program(source, "t.wl").unwrap();
        encode(&ctx, &EncoderOptions::default())
    }

    #[test]
    fn test_straight_line_locations() {
        let ts = encode_source("vars: int x; int y; code: x := 1; y := 2;");
        assert_eq!(ts.transitions().len(), 2);
        assert_eq!(ts.transitions()[0].from, 0);
        assert_eq!(ts.transitions()[0].to, 1);
        assert_eq!(ts.transitions()[1].from, 1);
        assert_eq!(ts.transitions()[1].to, 2);
        assert_eq!(ts.exit_location(), 2);
        assert_eq!(ts.next_location_id(), 2);
    }

    #[test]
    fn test_assert_branches_to_error_location() {
        let ts = encode_source("vars: int x; code: assert (x < 1);");
        let targets: Vec<i64> = ts.transitions().iter().map(|t| t.to).collect();
        assert!(targets.contains(&ERROR_LOCATION));
        assert!(targets.contains(&1));
    }

    #[test]
    fn test_fail_goes_to_error_location() {
        let ts = encode_source("vars: code: fail \"boom\";");
        assert_eq!(ts.transitions().len(), 1);
        assert_eq!(ts.transitions()[0].to, ERROR_LOCATION);
    }

    #[test]
    fn test_if_join_point_unified() {
        let ts = encode_source(
            "vars: int x; code: if (x < 1) { x := 1; } else { x := 2; }; x := 3;",
        );
        // Branch arms both end at the join; the trailing assignment leaves
        // from it.
        let join = ts.transitions().last().unwrap().from;
        let enders: Vec<&EncodedTransition> =
            ts.transitions().iter().filter(|t| t.to == join).collect();
        assert_eq!(enders.len(), 2);
    }

    #[test]
    fn test_while_loops_back_to_header() {
        let ts = encode_source("vars: int i; code: while (i < 5) { i := i + 1; };");
        // Transitions: header→body (guard), body→header (assignment,
        // renamed), header→exit (negated guard).
        assert_eq!(ts.transitions().len(), 3);
        let back = &ts.transitions()[1];
        assert_eq!(back.to, 0);
        let exit = &ts.transitions()[2];
        assert_eq!(exit.from, 0);
        assert_eq!(exit.to, ts.exit_location());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let source = "vars: int n; int i; code: extern n 0..9;
                      while (i < n) { i := i + 1; }; assert (i >= 0);";
        let first = encode_source(source);
        let second = encode_source(source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_numbered_transitions_have_no_markers() {
        let ts = encode_source(
            "vars: int x; code: extern x 0..5; if (x < 3) { x := 0; } else { }; assert (x >= 0);",
        );
        let numbered = ts.numbered_transitions(3, 4);
        assert!(!numbered.has_temporal_markers());
        assert!(ts.transition_relation().has_temporal_markers());
        let symbols = numbered.free_symbols();
        assert!(symbols.contains("loc_3") && symbols.contains("loc_4"));
        assert!(symbols.contains("x_3") && symbols.contains("x_4"));
    }

    #[test]
    fn test_zeroed_initial_and_invariant() {
        let ts = encode_source("vars: int x; code: x := 1; post: (x = 1)");
        let initial = ts.zeroed_initial();
        assert!(!initial.has_temporal_markers());
        let symbols = initial.free_symbols();
        assert!(symbols.contains("loc_0") && symbols.contains("x_0"));
        let invariant = ts.numbered_invariant(2);
        assert!(invariant.free_symbols().contains("loc_2"));
    }

    #[test]
    fn test_array_initialisation() {
        let ts = encode_source("vars: int[2] a; code: a[0] := 1;");
        let rendered = ts.initial().to_string();
        // Base cell holds the data pointer, data cells are zero.
        assert!(rendered.contains("(M[0] = 1)"));
        assert!(rendered.contains("(M[1] = 0)"));
        assert!(rendered.contains("(M[2] = 0)"));
    }

    #[test]
    fn test_extern_adds_state_variable() {
        let ts = encode_source("vars: int x; code: extern x 0..5;");
        assert!(ts.vars.contains(&"extern_0".to_string()));
        // The havoc transition writes the fresh unknown primed.
        let t = &ts.transitions()[0];
        let relation = ts.transition_relation();
        assert!(relation.free_symbols().contains("extern_0'"));
        assert_eq!(t.from, 0);
    }

    #[test]
    fn test_print_encoding_toggle() {
        let enabled = encode_source("vars: int x; code: print \"v\", x;");
        assert_eq!(
            enabled.transitions()[0].constraint,
            BoolExpr::array_eq(ArrayExpr::AnyArrayPrimed, ArrayExpr::AnyArray)
        );
        let ctx = parse_program("vars: int x; code: print \"v\", x;", "t.wl").unwrap();
        let disabled = encode(
            &ctx,
            &EncoderOptions {
                assume_invariant: false,
                encode_print: false,
            },
        );
        assert_eq!(disabled.transitions()[0].constraint, BoolExpr::False);
    }

    #[test]
    fn test_lvalue_compilation() {
        // *p  →  M[p];  a[i]  →  M[a] + M[i]
        let deref = AddressExpr::var("p").deref();
        assert_eq!(
            address_form(&deref),
            ArrayExpr::AnyArray.select(ArithExpr::symbol("p"))
        );
        let access = AddressExpr::var("a").index(ArithExpr::symbol("i"));
        assert_eq!(
            address_form(&access),
            ArrayExpr::AnyArray
                .select(ArithExpr::symbol("a"))
                .add(ArrayExpr::AnyArray.select(ArithExpr::symbol("i")))
        );
    }

    #[test]
    fn test_invariant_shape() {
        let ts = encode_source("vars: int x; code: x := 1; post: (x = 1)");
        let rendered = ts.invariant().to_string();
        assert!(rendered.contains("loc >= 0"));
        assert!(rendered.contains("M[x]"));
    }

    #[test]
    fn test_assume_invariant_option() {
        let source = "vars: int i; code: while (i < 3) invariant (i >= 0) { i := i + 1; };";
        let ctx = parse_program(source, "t.wl").unwrap();
        let without = encode(&ctx, &EncoderOptions::default());
        let with = encode(
            &ctx,
            &EncoderOptions {
                assume_invariant: true,
                encode_print: true,
            },
        );
        let entry_without = without.transitions()[0].constraint.to_string();
        let entry_with = with.transitions()[0].constraint.to_string();
        assert!(!entry_without.contains(">= 0"));
        assert!(entry_with.contains(">= 0"));
    }
}
