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

//! Benchmarks of the solver-free pipeline stages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use veriloop::dataflow::analyses::LiveVariables;
use veriloop::dataflow::cfg::Cfg;
use veriloop::dataflow::analyze;
use veriloop::parser::parse_program;
use veriloop::verification::encoder::{encode, EncoderOptions};
use veriloop::verification::wpc::{generate_vcs, VcOptions};

const GAUSS: &str = r#"
    vars: int n; int i; int sum;
    pre: (n = 0 and (i = 0 and sum = 1))
    code: extern n 0..100; i := 0; sum := 0;
          while (i < n) invariant ((sum = ((i*(i+1))/2)) and not (n < i)) {
            i := i+1; sum := sum + i; assert (i <= n);
          }; assert (n = i);
    post: (sum = ((n*(n+1))/2))
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_gauss", |b| {
        b.iter(|| parse_program(black_box(GAUSS), "gauss.wl").unwrap())
    });
}

fn bench_vcgen(c: &mut Criterion) {
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    c.bench_function("wpc_vcs_gauss", |b| {
        b.iter(|| generate_vcs(black_box(&ctx), &VcOptions::default()).unwrap())
    });
}

fn bench_encode(c: &mut Criterion) {
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    let options = EncoderOptions::default();
    c.bench_function("encode_gauss", |b| {
        b.iter(|| encode(black_box(&ctx), &options))
    });
    let ts = encode(&ctx, &options);
    c.bench_function("numbered_transitions", |b| {
        b.iter(|| ts.numbered_transitions(black_box(3), black_box(4)))
    });
}

fn bench_dataflow(c: &mut Criterion) {
    let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
    let cfg = Cfg::build(&ctx.program);
    c.bench_function("liveness_gauss", |b| {
        b.iter(|| analyze(black_box(&cfg), &ctx.scope, &LiveVariables))
    });
}

criterion_group!(benches, bench_parse, bench_vcgen, bench_encode, bench_dataflow);
criterion_main!(benches);
