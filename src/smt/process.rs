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

//! External SMT solver process
//!
//! One solver invocation per query keeps declaration sets isolated between
//! sessions. The process may block; cancellation is the caller's concern
//! (there is no implicit wall-clock timeout).

use crate::error::SmtError;
use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

/// Configuration of the external solver binary.
#[derive(Debug, Clone)]
pub struct SolverBackend {
    command: String,
    args: Vec<String>,
}

impl SolverBackend {
    /// The default backend: `z3` reading SMT-LIB2 from stdin.
    pub fn z3() -> Self {
        Self {
            command: "z3".to_string(),
            args: vec!["-in".to_string()],
        }
    }

    pub fn with_command(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether the solver binary can be spawned at all.
    pub fn available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Run one script through the solver and return its raw output.
    pub fn run(&self, script: &str) -> Result<String, SmtError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SmtError::SolverUnavailable {
                message: format!("{}: {}", self.command, e),
            })?;

        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(script.as_bytes())
            .map_err(|e| SmtError::SolverUnavailable {
                message: format!("writing to {}: {}", self.command, e),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| SmtError::SolverUnavailable {
                message: format!("waiting for {}: {}", self.command, e),
            })?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The solver's verdict line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown,
}

/// Extract the sat/unsat/unknown verdict from raw solver output.
pub fn parse_verdict(output: &str) -> Result<Verdict, SmtError> {
    for line in output.lines() {
        match line.trim() {
            "sat" => return Ok(Verdict::Sat),
            "unsat" => return Ok(Verdict::Unsat),
            "unknown" => return Ok(Verdict::Unknown),
            _ => continue,
        }
    }
    Err(SmtError::MalformedResponse {
        response: output.chars().take(200).collect(),
    })
}

/// Parse `(define-fun name () Sort value)` entries out of a `(get-model)`
/// response into a name → literal map. Values are kept as literal text;
/// negative integers are normalised from `(- n)` to `-n`.
pub fn parse_model(output: &str) -> BTreeMap<String, String> {
    let tokens = tokenize(output);
    let mut model = BTreeMap::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "define-fun" && i + 1 < tokens.len() {
            let name = unquote(&tokens[i + 1]);
            // Skip the (possibly empty) argument list.
            let mut j = i + 2;
            if tokens.get(j).map(String::as_str) == Some("(") {
                let mut depth = 0;
                while j < tokens.len() {
                    match tokens[j].as_str() {
                        "(" => depth += 1,
                        ")" => {
                            depth -= 1;
                            if depth == 0 {
                                j += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
            }
            // Skip the sort (an atom or a parenthesized sort).
            j = skip_sexpr(&tokens, j);
            // The value runs to the define-fun's closing paren.
            let value_end = skip_sexpr(&tokens, j);
            let value = render(&tokens[j..value_end]);
            if !name.is_empty() && !value.is_empty() {
                model.insert(name, value);
            }
            i = value_end;
        } else {
            i += 1;
        }
    }
    model
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            '|' => {
                // Quoted symbol: read through the closing pipe.
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let mut quoted = String::from("|");
                for inner in chars.by_ref() {
                    quoted.push(inner);
                    if inner == '|' {
                        break;
                    }
                }
                tokens.push(quoted);
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(token: &str) -> String {
    token.trim_matches('|').to_string()
}

/// Index one past the s-expression starting at `start`.
fn skip_sexpr(tokens: &[String], start: usize) -> usize {
    if start >= tokens.len() {
        return start;
    }
    if tokens[start] != "(" {
        return start + 1;
    }
    let mut depth = 0;
    let mut i = start;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

fn render(tokens: &[String]) -> String {
    // Normalise the common negative-integer shape.
    if tokens.len() == 4
        && tokens[0] == "("
        && tokens[1] == "-"
        && tokens[3] == ")"
        && tokens[2].chars().all(|c| c.is_ascii_digit())
    {
        return format!("-{}", tokens[2]);
    }
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let glue = !(i == 0
            || token == ")"
            || out.ends_with('(')
            || out.is_empty());
        if glue {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdicts() {
        assert_eq!(parse_verdict("sat\n(model)").unwrap(), Verdict::Sat);
        assert_eq!(parse_verdict("unsat\n").unwrap(), Verdict::Unsat);
        assert_eq!(parse_verdict("unknown\n").unwrap(), Verdict::Unknown);
        assert!(parse_verdict("(error \"bad\")").is_err());
    }

    #[test]
    fn test_parse_flat_model() {
        let output = r#"sat
(
  (define-fun x () Int 5)
  (define-fun loc_0 () Int 0)
)"#;
        let model = parse_model(output);
        assert_eq!(model.get("x").map(String::as_str), Some("5"));
        assert_eq!(model.get("loc_0").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_parse_negative_value() {
        let output = "sat\n((define-fun x () Int (- 7)))";
        let model = parse_model(output);
        assert_eq!(model.get("x").map(String::as_str), Some("-7"));
    }

    #[test]
    fn test_parse_model_keyword_wrapper() {
        // Older solvers wrap entries in (model ...).
        let output = "sat\n(model (define-fun n () Int 12))";
        let model = parse_model(output);
        assert_eq!(model.get("n").map(String::as_str), Some("12"));
    }

    #[test]
    fn test_parse_array_value_kept_as_text() {
        let output =
            "sat\n((define-fun M_0 () (Array Int Int) ((as const (Array Int Int)) 0)))";
        let model = parse_model(output);
        let value = model.get("M_0").unwrap();
        assert!(value.contains("const"));
    }

    #[test]
    fn test_parse_quoted_symbol() {
        let output = "sat\n((define-fun |x'| () Int 3))";
        let model = parse_model(output);
        assert_eq!(model.get("x'").map(String::as_str), Some("3"));
    }
}
