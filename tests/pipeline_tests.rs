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

//! End-to-end scenarios over the whole verification pipeline.

use num_bigint::BigInt;
use veriloop::ast::{ArithExpr, BoolExpr};
use veriloop::interp::eval::{eval_bool, CondValue};
use veriloop::interp::{Executor, FixedInput};
use veriloop::output::Output;
use veriloop::parser::parse_program;
use veriloop::semantic::check_context;
use veriloop::smt::Smt;
use veriloop::verification::encoder::{encode, EncoderOptions};
use veriloop::verification::wpc::{generate_vcs, wpc, VcOptions};
use veriloop::verification::{
    Approach, BmcApproach, CheckOutcome, KIndBmcApproach, WpcApproach,
};

const GAUSS: &str = r#"
    vars: int n; int i; int sum;
    pre: (n = 0 and (i = 0 and sum = 1))
    code: extern n 0..100; i := 0; sum := 0;
          while (i < n) invariant ((sum = ((i*(i+1))/2)) and not (n < i)) {
            i := i+1; sum := sum + i; assert (i <= n);
          }; assert (n = i);
    post: (sum = ((n*(n+1))/2))
"#;

fn solver_available() -> bool {
    Smt::new().available()
}

#[test]
fn gauss_parses_typechecks_and_yields_four_vcs() {
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    check_context(&ctx).unwrap();
    let vcs = generate_vcs(&ctx, &VcOptions::default()).unwrap();
    assert_eq!(vcs.len(), 4);
}

#[test]
fn gauss_wpc_proof() {
    if !solver_available() {
        return;
    }
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    let mut approach = WpcApproach::default();
    assert_eq!(approach.run(&ctx), CheckOutcome::Proof);
    assert_eq!(approach.smt_calls(), 4);
}

#[test]
fn sort_of_three_via_swap_proof() {
    if !solver_available() {
        return;
    }
    // A three-element sorting network over an array; the adjacent-order
    // assertions at the end must discharge.
    let source = r#"
        vars: int[3] a;
        code: extern a[0] 0..9; extern a[1] 0..9; extern a[2] 0..9;
              if (a[1] < a[0]) { swap a[0] and a[1]; } else { };
              if (a[2] < a[1]) { swap a[1] and a[2]; } else { };
              if (a[1] < a[0]) { swap a[0] and a[1]; } else { };
              assert (a[0] <= a[1]); assert (a[1] <= a[2]);
    "#;
    let ctx = parse_program(source, "sort3.wl").unwrap();
    check_context(&ctx).unwrap();
    let mut approach = KIndBmcApproach::new(14, EncoderOptions::default());
    match approach.run(&ctx) {
        CheckOutcome::Proof => {}
        other => panic!("expected proof, got {}", other),
    }
}

#[test]
fn fail_path_has_bmc_counterexample() {
    if !solver_available() {
        return;
    }
    let ctx = parse_program(
        "vars: code: if (true) { fail \"x\"; } else { };",
        "fail.wl",
    )
    .unwrap();
    let mut approach = BmcApproach::new(3);
    match approach.run(&ctx) {
        CheckOutcome::Counterexample(witness) => {
            assert!(!witness.is_empty());
        }
        other => panic!("expected counterexample, got {}", other),
    }
}

#[test]
fn bounded_havoc_safe_and_unsafe() {
    if !solver_available() {
        return;
    }
    let safe = parse_program(
        "vars: int x; code: extern x 0..5; assert (x < 10);",
        "safe.wl",
    )
    .unwrap();
    let mut kind = KIndBmcApproach::new(6, EncoderOptions::default());
    assert_eq!(kind.run(&safe), CheckOutcome::Proof);

    let unsafe_ctx = parse_program(
        "vars: int x; code: extern x 0..20; assert (x < 10);",
        "unsafe.wl",
    )
    .unwrap();
    let mut bmc = BmcApproach::new(6);
    match bmc.run(&unsafe_ctx) {
        CheckOutcome::Counterexample(_) => {}
        other => panic!("expected counterexample, got {}", other),
    }
}

#[test]
fn wpc_assignment_soundness() {
    // Any state satisfying wpc(x := e, φ) steps into a state satisfying
    // φ. Exercised concretely: wpc(x := x + 1, x = 5) is x + 1 = 5, so
    // start from x = 4.
    let ctx = parse_program("vars: int x; code: x := x + 1;", "t.wl").unwrap();
    let stmt = ctx.program.head().unwrap().clone();
    let post = BoolExpr::eq(ArithExpr::symbol("x"), ArithExpr::num(5));
    let weakest = wpc(&stmt, &post).unwrap();

    let mut executor = Executor::concrete(Box::new(FixedInput::new(vec![])));
    let initial = Executor::initial_configuration(&ctx).unwrap();
    let seeded = veriloop::interp::Configuration {
        memory: initial.memory.write(0, ArithExpr::num(4)).unwrap(),
        ..initial
    };
    assert_eq!(
        eval_bool(&weakest, &seeded.scope, &seeded.memory).unwrap(),
        CondValue::Concrete(true)
    );
    let after = executor.step(&seeded).remove(0).target;
    assert_eq!(
        eval_bool(&post, &after.scope, &after.memory).unwrap(),
        CondValue::Concrete(true)
    );
}

#[test]
fn concrete_and_tree_agree_on_final_memory() {
    // The same external input drives the straight-run and the tree; the
    // terminal memory must agree.
    let source = "vars: int n; int s; code: extern n 1..9;
                  while (n > 0) { s := s + n; n := n - 1; };";
    let ctx = parse_program(source, "t.wl")
        .unwrap()
        .with_input(vec![BigInt::from(3)]);
    let mut straight = Executor::for_context(&ctx);
    let mut out = Output::silent();
    let final_config = straight.run(&ctx, &mut out).unwrap();

    let mut tree_exec = Executor::concrete(Box::new(FixedInput::new(vec![BigInt::from(3)])));
    let tree = tree_exec.tree(Executor::initial_configuration(&ctx).unwrap(), 64);
    let leaves = tree.leaves();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].remaining.is_exhausted());
    assert_eq!(leaves[0].memory, final_config.memory);
    // 3 + 2 + 1
    assert_eq!(final_config.memory.read(1).unwrap(), &ArithExpr::num(6));
}

#[test]
fn encoder_is_deterministic_across_runs() {
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    let first = encode(&ctx, &EncoderOptions::default());
    let second = encode(&ctx, &EncoderOptions::default());
    assert_eq!(first, second);
    assert!(!first.numbered_transitions(0, 1).has_temporal_markers());
}
