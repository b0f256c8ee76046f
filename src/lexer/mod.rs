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

//! Lexical analysis for annotated while-programs

use crate::error::{LexerError, SourceLocation};
use num_bigint::BigInt;
use std::fmt;

/// Token types of the source language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Structural tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Colon,
    Comma,

    // Operators
    Assign,    // :=
    Star,      // * (deref, pointer suffix, multiplication)
    Ampersand, // & (address-of)
    Plus,
    Minus,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,  // =
    DotDot, // ..

    // Literals
    Number(BigInt),
    StringLiteral(String),
    Identifier(String),
    Keyword(Keyword),

    // End of file
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Vars,
    Pre,
    Code,
    Post,
    Int,
    Swap,
    Extern,
    If,
    Else,
    While,
    Invariant,
    Print,
    Fail,
    Assert,
    And,
    Or,
    Not,
    Implies,
    Iff,
    True,
    False,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word {
            "vars" => Keyword::Vars,
            "pre" => Keyword::Pre,
            "code" => Keyword::Code,
            "post" => Keyword::Post,
            "int" => Keyword::Int,
            "swap" => Keyword::Swap,
            "extern" => Keyword::Extern,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "invariant" => Keyword::Invariant,
            "print" => Keyword::Print,
            "fail" => Keyword::Fail,
            "assert" => Keyword::Assert,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "implies" => Keyword::Implies,
            "iff" => Keyword::Iff,
            "true" => Keyword::True,
            "false" => Keyword::False,
            _ => return None,
        };
        Some(kw)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Number(n) => write!(f, "number {}", n),
            TokenType::StringLiteral(s) => write!(f, "string {:?}", s),
            TokenType::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenType::Keyword(kw) => write!(f, "keyword '{:?}'", kw),
            TokenType::Eof => write!(f, "end of file"),
            other => write!(f, "'{}'", symbol_lexeme(other)),
        }
    }
}

fn symbol_lexeme(token_type: &TokenType) -> &'static str {
    match token_type {
        TokenType::LeftParen => "(",
        TokenType::RightParen => ")",
        TokenType::LeftBrace => "{",
        TokenType::RightBrace => "}",
        TokenType::LeftBracket => "[",
        TokenType::RightBracket => "]",
        TokenType::Semicolon => ";",
        TokenType::Colon => ":",
        TokenType::Comma => ",",
        TokenType::Assign => ":=",
        TokenType::Star => "*",
        TokenType::Ampersand => "&",
        TokenType::Plus => "+",
        TokenType::Minus => "-",
        TokenType::Slash => "/",
        TokenType::Percent => "%",
        TokenType::Less => "<",
        TokenType::LessEqual => "<=",
        TokenType::Greater => ">",
        TokenType::GreaterEqual => ">=",
        TokenType::Equal => "=",
        TokenType::DotDot => "..",
        _ => "",
    }
}

/// A token with its type and location information
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(token_type: TokenType, location: SourceLocation) -> Self {
        Self {
            token_type,
            location,
        }
    }
}

/// Lexer for annotated while-program source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    file_name: String,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str, file_name: String) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            file_name,
        }
    }

    /// Tokenize the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file_name.clone(), self.line, self.column, self.position)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let current = self.peek()?;
        self.position += 1;
        if current == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(current)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();
        let location = self.location();

        let Some(current) = self.peek() else {
            return Ok(Token::new(TokenType::Eof, location));
        };

        if current.is_ascii_digit() {
            return self.lex_number(location);
        }
        if current.is_ascii_alphabetic() {
            return Ok(self.lex_word(location));
        }
        if current == '"' {
            return self.lex_string(location);
        }

        self.advance();
        let token_type = match current {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            '[' => TokenType::LeftBracket,
            ']' => TokenType::RightBracket,
            ';' => TokenType::Semicolon,
            ',' => TokenType::Comma,
            '*' => TokenType::Star,
            '&' => TokenType::Ampersand,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '/' => TokenType::Slash,
            '%' => TokenType::Percent,
            '=' => TokenType::Equal,
            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::Assign
                } else {
                    TokenType::Colon
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    TokenType::DotDot
                } else {
                    return Err(LexerError::UnexpectedCharacter {
                        character: '.',
                        location,
                    });
                }
            }
            other => {
                return Err(LexerError::UnexpectedCharacter {
                    character: other,
                    location,
                });
            }
        };
        Ok(Token::new(token_type, location))
    }

    fn lex_number(&mut self, location: SourceLocation) -> Result<Token, LexerError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // A trailing letter glued onto a number is a malformed literal,
        // not two tokens.
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            let mut bad = digits;
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() {
                    bad.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Err(LexerError::InvalidNumber {
                value: bad,
                location,
            });
        }
        let value: BigInt = digits.parse().map_err(|_| LexerError::InvalidNumber {
            value: digits.clone(),
            location: location.clone(),
        })?;
        Ok(Token::new(TokenType::Number(value), location))
    }

    fn lex_word(&mut self, location: SourceLocation) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let token_type = match Keyword::from_word(&word) {
            Some(kw) => TokenType::Keyword(kw),
            None => TokenType::Identifier(word),
        };
        Token::new(token_type, location)
    }

    fn lex_string(&mut self, location: SourceLocation) -> Result<Token, LexerError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(Token::new(TokenType::StringLiteral(text), location)),
                Some(c) => text.push(c),
                None => return Err(LexerError::UnterminatedString { location }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<TokenType> {
        Lexer::new(input, "test".to_string())
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        let tokens = lex("vars: int n; int[3] a; int* p;");
        assert_eq!(tokens[0], TokenType::Keyword(Keyword::Vars));
        assert_eq!(tokens[1], TokenType::Colon);
        assert_eq!(tokens[2], TokenType::Keyword(Keyword::Int));
        assert_eq!(tokens[3], TokenType::Identifier("n".to_string()));
        assert!(tokens.contains(&TokenType::LeftBracket));
        assert!(tokens.contains(&TokenType::Star));
        assert_eq!(tokens.last(), Some(&TokenType::Eof));
    }

    #[test]
    fn test_assignment_and_range() {
        let tokens = lex("x := 10; extern x 0..100;");
        assert!(tokens.contains(&TokenType::Assign));
        assert!(tokens.contains(&TokenType::DotDot));
        assert!(tokens.contains(&TokenType::Number(BigInt::from(100))));
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = lex("< <= > >= =");
        assert_eq!(
            tokens,
            vec![
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Equal,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex("print \"sum is\", s;");
        assert_eq!(tokens[1], TokenType::StringLiteral("sum is".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("fail \"oops", "test".to_string())
            .tokenize()
            .unwrap_err();
        assert!(matches!(err, LexerError::UnterminatedString { .. }));
    }

    #[test]
    fn test_line_comment_skipped() {
        let tokens = lex("x := 1; // trailing note\ny := 2;");
        assert_eq!(tokens.len(), 9);
    }

    #[test]
    fn test_glued_letter_is_invalid_number() {
        let err = Lexer::new("x := 12abc;", "test".to_string())
            .tokenize()
            .unwrap_err();
        assert!(matches!(err, LexerError::InvalidNumber { .. }));
    }

    #[test]
    fn test_locations_track_lines() {
        let tokens = Lexer::new("x := 1;\ny := 2;", "test".to_string())
            .tokenize()
            .unwrap();
        let y = tokens
            .iter()
            .find(|t| t.token_type == TokenType::Identifier("y".to_string()))
            .unwrap();
        assert_eq!(y.location.line, 2);
        assert_eq!(y.location.column, 1);
    }
}
