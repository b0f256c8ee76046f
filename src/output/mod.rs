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

//! Program output collaborator
//!
//! Captures everything the interpreted program prints into a buffer the
//! caller can retrieve. Logging (echo to stdout) is on by default and
//! switched off by tests.

#[derive(Debug)]
pub struct Output {
    buffer: String,
    log: bool,
}

impl Output {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            log: true,
        }
    }

    /// An output sink that only buffers.
    pub fn silent() -> Self {
        Self {
            buffer: String::new(),
            log: false,
        }
    }

    pub fn print(&mut self, text: &str) {
        if self.log {
            print!("{}", text);
        }
        self.buffer.push_str(text);
    }

    pub fn println(&mut self, text: &str) {
        if self.log {
            println!("{}", text);
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Everything printed so far.
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Buffered lines, without trailing newlines.
    pub fn lines(&self) -> Vec<&str> {
        self.buffer.lines().collect()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
