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

//! CLI behaviour: flags, exit codes, and the ERROR contract.

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_veriloop"))
        .args(args)
        .output()
        .expect("failed to execute veriloop");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn source_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write source");
    file
}

#[test]
fn test_help_lists_the_flag_surface() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for flag in [
        "--verbose",
        "--run",
        "--typecheck",
        "--proof",
        "--bmc",
        "--kind",
        "--reachability",
        "--liveness",
        "--reachingdefinitions",
        "--taint",
        "--input",
        "--kind-inv",
    ] {
        assert!(stdout.contains(flag), "help is missing {}", flag);
    }
}

#[test]
fn test_run_with_input_prints_and_exits_zero() {
    let file = source_file(
        "vars: int x; code: extern x 0..9; print \"got\", x;",
    );
    let (stdout, _, code) = run_cli(&[
        "--run",
        "--input",
        "4",
        file.path().to_str().unwrap(),
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("got [4]"));
    assert!(stdout.contains("Terminated after"));
}

#[test]
fn test_typecheck_flag_reports() {
    let file = source_file("vars: int x; code: x := 1;");
    let (stdout, _, code) = run_cli(&["--typecheck", file.path().to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Type check passed"));
}

#[test]
fn test_type_error_prints_error_and_exits_one() {
    let file = source_file("vars: int x; code: *x := 1;");
    let (_, stderr, code) = run_cli(&["--typecheck", file.path().to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("ERROR:"));
}

#[test]
fn test_missing_file_is_configuration_error() {
    let (_, stderr, code) = run_cli(&["--run", "/no/such/file.wl"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("ERROR:"));
}

#[test]
fn test_reachability_alias_and_exit_code() {
    let file = source_file("vars: int x; code: fail \"stop\"; x := 1;");
    let (stdout, _, code) = run_cli(&["--ra", file.path().to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stdout.contains("unreachable"));
}

#[test]
fn test_assert_failure_exit_code() {
    let file = source_file("vars: int x; code: assert (x = 1);");
    let (stdout, _, code) = run_cli(&["--run", file.path().to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Terminated with error"));
}

#[test]
fn test_bad_input_list_rejected() {
    let file = source_file("vars: int x; code: extern x 0..9;");
    let (_, stderr, code) = run_cli(&[
        "--run",
        "--input",
        "4,oops",
        file.path().to_str().unwrap(),
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid input value"));
}
