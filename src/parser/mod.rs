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

//! Recursive-descent parser for annotated while-programs
//!
//! Produces a `Context` bundling the declared scope, the program body, and
//! the pre/postcondition annotations. Missing annotations default to
//! `true`.

use crate::ast::{AddressExpr, ArithExpr, BoolExpr, Statement, StmtSequence};
use crate::error::{ParserError, SourceLocation};
use crate::lexer::{Keyword, Lexer, Token, TokenType};
use crate::types::{Scope, Type};
use num_bigint::BigInt;

/// Everything the verifier needs about one annotated program.
#[derive(Debug, Clone)]
pub struct Context {
    pub scope: Scope,
    pub program: StmtSequence,
    pub pre: BoolExpr,
    pub post: BoolExpr,
    /// Deterministic external-input stream, when supplied by the caller.
    pub input: Option<Vec<BigInt>>,
    /// Whether statement execution should fork symbolically.
    pub symbolic: bool,
}

impl Context {
    pub fn with_input(mut self, input: Vec<BigInt>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn symbolic(mut self) -> Self {
        self.symbolic = true;
        self
    }
}

/// Parse a complete annotated program.
pub fn parse_program(source: &str, file_name: &str) -> Result<Context, ParserError> {
    let tokens = Lexer::new(source, file_name.to_string()).tokenize()?;
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse(mut self) -> Result<Context, ParserError> {
        self.expect_keyword(Keyword::Vars)?;
        self.expect(TokenType::Colon)?;
        let scope = self.parse_declarations()?;

        let pre = if self.eat_keyword(Keyword::Pre) {
            self.expect(TokenType::Colon)?;
            self.expect(TokenType::LeftParen)?;
            let pre = self.parse_bool()?;
            self.expect(TokenType::RightParen)?;
            pre
        } else {
            BoolExpr::True
        };

        self.expect_keyword(Keyword::Code)?;
        self.expect(TokenType::Colon)?;
        let program = self.parse_statements_until(|t| {
            matches!(t, TokenType::Keyword(Keyword::Post) | TokenType::Eof)
        })?;

        let post = if self.eat_keyword(Keyword::Post) {
            self.expect(TokenType::Colon)?;
            self.expect(TokenType::LeftParen)?;
            let post = self.parse_bool()?;
            self.expect(TokenType::RightParen)?;
            post
        } else {
            BoolExpr::True
        };

        self.expect(TokenType::Eof)?;
        Ok(Context {
            scope,
            program,
            pre,
            post,
            input: None,
            symbolic: false,
        })
    }

    // ---- declarations ----

    fn parse_declarations(&mut self) -> Result<Scope, ParserError> {
        let mut scope = Scope::new();
        while self.peek_is_keyword(Keyword::Int) {
            self.advance();
            if self.eat(TokenType::LeftBracket) {
                let (length, loc) = self.expect_number()?;
                let length: u64 =
                    length
                        .try_into()
                        .map_err(|_| ParserError::ArrayTooLarge {
                            length: u64::MAX,
                            location: loc.clone(),
                        })?;
                if length > 255 {
                    return Err(ParserError::ArrayTooLarge {
                        length,
                        location: loc,
                    });
                }
                self.expect(TokenType::RightBracket)?;
                let (name, name_loc) = self.expect_identifier()?;
                if !scope.declare_array(&name, length as usize) {
                    return Err(ParserError::DuplicateVariable {
                        name,
                        location: name_loc,
                    });
                }
            } else {
                let mut ty = Type::Int;
                while self.eat(TokenType::Star) {
                    ty = ty.pointer_to();
                }
                let (name, name_loc) = self.expect_identifier()?;
                if !scope.declare(&name, ty) {
                    return Err(ParserError::DuplicateVariable {
                        name,
                        location: name_loc,
                    });
                }
            }
            self.expect(TokenType::Semicolon)?;
        }
        Ok(scope)
    }

    // ---- statements ----

    fn parse_statements_until(
        &mut self,
        stop: impl Fn(&TokenType) -> bool,
    ) -> Result<StmtSequence, ParserError> {
        let mut stmts = Vec::new();
        while !stop(self.peek_type()) {
            stmts.push(self.parse_statement()?);
        }
        Ok(StmtSequence::new(stmts))
    }

    fn parse_block(&mut self) -> Result<StmtSequence, ParserError> {
        self.expect(TokenType::LeftBrace)?;
        let body = self.parse_statements_until(|t| matches!(t, TokenType::RightBrace | TokenType::Eof))?;
        self.expect(TokenType::RightBrace)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        match self.peek_type().clone() {
            TokenType::Keyword(Keyword::Swap) => {
                self.advance();
                let left = self.parse_address()?;
                self.expect_keyword(Keyword::And)?;
                let right = self.parse_address()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Swap { left, right })
            }
            TokenType::Keyword(Keyword::Extern) => {
                self.advance();
                let target = self.parse_address()?;
                let lower = self.parse_signed_number()?;
                self.expect(TokenType::DotDot)?;
                let upper = self.parse_signed_number()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Extern {
                    target,
                    lower,
                    upper,
                })
            }
            TokenType::Keyword(Keyword::If) => {
                self.advance();
                self.expect(TokenType::LeftParen)?;
                let condition = self.parse_bool()?;
                self.expect(TokenType::RightParen)?;
                let then_branch = self.parse_block()?;
                let else_branch = if self.eat_keyword(Keyword::Else) {
                    self.parse_block()?
                } else {
                    StmtSequence::empty()
                };
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            TokenType::Keyword(Keyword::While) => {
                self.advance();
                self.expect(TokenType::LeftParen)?;
                let condition = self.parse_bool()?;
                self.expect(TokenType::RightParen)?;
                let invariant = if self.eat_keyword(Keyword::Invariant) {
                    self.expect(TokenType::LeftParen)?;
                    let inv = self.parse_bool()?;
                    self.expect(TokenType::RightParen)?;
                    Some(inv)
                } else {
                    None
                };
                let body = self.parse_block()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::While {
                    condition,
                    invariant,
                    body,
                })
            }
            TokenType::Keyword(Keyword::Print) => {
                self.advance();
                let message = self.expect_string()?;
                let mut args = Vec::new();
                while self.eat(TokenType::Comma) {
                    args.push(self.parse_arith()?);
                }
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Print { message, args })
            }
            TokenType::Keyword(Keyword::Fail) => {
                self.advance();
                let message = self.expect_string()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Fail { message })
            }
            TokenType::Keyword(Keyword::Assert) => {
                self.advance();
                self.expect(TokenType::LeftParen)?;
                let condition = self.parse_bool()?;
                self.expect(TokenType::RightParen)?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Assert { condition })
            }
            TokenType::Identifier(_) | TokenType::Star => {
                let target = self.parse_address()?;
                self.expect(TokenType::Assign)?;
                let value = self.parse_arith()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Assign { target, value })
            }
            other => Err(self.unexpected(&other, "a statement")),
        }
    }

    // ---- addresses ----

    fn parse_address(&mut self) -> Result<AddressExpr, ParserError> {
        if self.eat(TokenType::Star) {
            return Ok(self.parse_address()?.deref());
        }
        let (name, _) = self.expect_identifier()?;
        let mut addr = AddressExpr::Variable(name);
        while self.eat(TokenType::LeftBracket) {
            let index = self.parse_arith()?;
            self.expect(TokenType::RightBracket)?;
            addr = addr.index(index);
        }
        Ok(addr)
    }

    // ---- boolean expressions ----
    //
    // Precedence, loosest first: iff, implies (right associative), or,
    // and, not, atoms.

    fn parse_bool(&mut self) -> Result<BoolExpr, ParserError> {
        let mut left = self.parse_implies()?;
        while self.eat_keyword(Keyword::Iff) {
            let right = self.parse_implies()?;
            left = BoolExpr::Equiv(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_implies(&mut self) -> Result<BoolExpr, ParserError> {
        let left = self.parse_or()?;
        if self.eat_keyword(Keyword::Implies) {
            let right = self.parse_implies()?;
            return Ok(left.imply(right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<BoolExpr, ParserError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<BoolExpr, ParserError> {
        let mut left = self.parse_bool_unary()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_bool_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_bool_unary(&mut self) -> Result<BoolExpr, ParserError> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(self.parse_bool_unary()?.not());
        }
        if self.eat_keyword(Keyword::True) {
            return Ok(BoolExpr::True);
        }
        if self.eat_keyword(Keyword::False) {
            return Ok(BoolExpr::False);
        }
        // '(' is ambiguous between a parenthesized condition and a
        // parenthesized arithmetic operand; try the comparison first and
        // backtrack.
        if self.peek_type() == &TokenType::LeftParen {
            let saved = self.position;
            if let Ok(cmp) = self.parse_comparison() {
                return Ok(cmp);
            }
            self.position = saved;
            self.expect(TokenType::LeftParen)?;
            let inner = self.parse_bool()?;
            self.expect(TokenType::RightParen)?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<BoolExpr, ParserError> {
        let left = self.parse_arith()?;
        let op = self.peek_type().clone();
        let cmp = match op {
            TokenType::Equal => {
                self.advance();
                BoolExpr::eq(left, self.parse_arith()?)
            }
            TokenType::Less => {
                self.advance();
                BoolExpr::lt(left, self.parse_arith()?)
            }
            TokenType::LessEqual => {
                self.advance();
                BoolExpr::lte(left, self.parse_arith()?)
            }
            TokenType::Greater => {
                self.advance();
                let right = self.parse_arith()?;
                BoolExpr::Gt(Box::new(left), Box::new(right))
            }
            TokenType::GreaterEqual => {
                self.advance();
                BoolExpr::gte(left, self.parse_arith()?)
            }
            other => return Err(self.unexpected(&other, "a comparison operator")),
        };
        Ok(cmp)
    }

    // ---- arithmetic expressions ----

    fn parse_arith(&mut self) -> Result<ArithExpr, ParserError> {
        let mut left = self.parse_term()?;
        loop {
            if self.eat(TokenType::Plus) {
                left = left.add(self.parse_term()?);
            } else if self.eat(TokenType::Minus) {
                left = left.sub(self.parse_term()?);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_term(&mut self) -> Result<ArithExpr, ParserError> {
        let mut left = self.parse_factor()?;
        loop {
            if self.eat(TokenType::Star) {
                left = left.mul(self.parse_factor()?);
            } else if self.eat(TokenType::Slash) {
                left = ArithExpr::Div(Box::new(left), Box::new(self.parse_factor()?));
            } else if self.eat(TokenType::Percent) {
                left = ArithExpr::Rem(Box::new(left), Box::new(self.parse_factor()?));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_factor(&mut self) -> Result<ArithExpr, ParserError> {
        match self.peek_type().clone() {
            TokenType::Number(n) => {
                self.advance();
                Ok(ArithExpr::Num(n))
            }
            TokenType::Minus => {
                self.advance();
                Ok(ArithExpr::Neg(Box::new(self.parse_factor()?)))
            }
            TokenType::Ampersand => {
                self.advance();
                let (name, _) = self.expect_identifier()?;
                Ok(ArithExpr::AddressOf(name))
            }
            TokenType::LeftParen => {
                self.advance();
                let inner = self.parse_arith()?;
                self.expect(TokenType::RightParen)?;
                Ok(inner)
            }
            TokenType::Identifier(_) | TokenType::Star => {
                let addr = self.parse_address()?;
                Ok(ArithExpr::ValAt(Box::new(addr)))
            }
            other => Err(self.unexpected(&other, "an arithmetic operand")),
        }
    }

    fn parse_signed_number(&mut self) -> Result<BigInt, ParserError> {
        let negative = self.eat(TokenType::Minus);
        let (value, _) = self.expect_number()?;
        Ok(if negative { -value } else { value })
    }

    // ---- token helpers ----

    fn peek_type(&self) -> &TokenType {
        &self.tokens[self.position].token_type
    }

    fn peek_is_keyword(&self, kw: Keyword) -> bool {
        self.peek_type() == &TokenType::Keyword(kw)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: TokenType) -> bool {
        if self.peek_type() == &expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        self.eat(TokenType::Keyword(kw))
    }

    fn expect(&mut self, expected: TokenType) -> Result<Token, ParserError> {
        if self.peek_type() == &expected {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&self.peek_type().clone(), &expected.to_string()))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParserError> {
        self.expect(TokenType::Keyword(kw)).map(|_| ())
    }

    fn expect_identifier(&mut self) -> Result<(String, SourceLocation), ParserError> {
        match self.peek_type().clone() {
            TokenType::Identifier(name) => {
                let token = self.advance();
                Ok((name, token.location))
            }
            other => Err(self.unexpected(&other, "an identifier")),
        }
    }

    fn expect_number(&mut self) -> Result<(BigInt, SourceLocation), ParserError> {
        match self.peek_type().clone() {
            TokenType::Number(n) => {
                let token = self.advance();
                Ok((n, token.location))
            }
            other => Err(self.unexpected(&other, "a number")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParserError> {
        match self.peek_type().clone() {
            TokenType::StringLiteral(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.unexpected(&other, "a string literal")),
        }
    }

    fn unexpected(&self, found: &TokenType, expected: &str) -> ParserError {
        if found == &TokenType::Eof {
            ParserError::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParserError::UnexpectedToken {
                found: found.to_string(),
                expected: expected.to_string(),
                location: self.tokens[self.position].location.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAUSS: &str = r#"
        vars: int n; int i; int sum;
        pre: (n = 0 and (i = 0 and sum = 1))
        code: extern n 0..100; i := 0; sum := 0;
              while (i < n) invariant ((sum = ((i*(i+1))/2)) and not (n < i)) {
                i := i+1; sum := sum + i; assert (i <= n);
              }; assert (n = i);
        post: (sum = ((n*(n+1))/2))
    "#;

    #[test]
    fn test_parse_gauss() {
        let ctx = parse_program(GAUSS, "gauss.wl").unwrap();
        assert_eq!(ctx.scope.total_size(), 3);
        assert_eq!(ctx.program.len(), 5);
        assert_ne!(ctx.pre, BoolExpr::True);
        assert_ne!(ctx.post, BoolExpr::True);
        let stmts: Vec<_> = ctx.program.iter().collect();
        assert!(matches!(stmts[0], Statement::Extern { .. }));
        assert!(matches!(stmts[3], Statement::While { .. }));
        assert!(matches!(stmts[4], Statement::Assert { .. }));
        if let Statement::While { invariant, body, .. } = stmts[3] {
            assert!(invariant.is_some());
            assert_eq!(body.len(), 3);
        }
    }

    #[test]
    fn test_missing_annotations_default_to_true() {
        let ctx = parse_program("vars: int x; code: x := 1;", "t.wl").unwrap();
        assert_eq!(ctx.pre, BoolExpr::True);
        assert_eq!(ctx.post, BoolExpr::True);
        assert!(!ctx.symbolic);
        assert!(ctx.input.is_none());
    }

    #[test]
    fn test_parse_pointer_and_array_declarations() {
        let ctx = parse_program(
            "vars: int[3] a; int* p; int** q; code: *p := 1;",
            "t.wl",
        )
        .unwrap();
        assert_eq!(ctx.scope.lookup("a").unwrap().size, 4);
        assert_eq!(ctx.scope.lookup("p").unwrap().ty.pointer_depth(), 1);
        assert_eq!(ctx.scope.lookup("q").unwrap().ty.pointer_depth(), 2);
        let stmt = ctx.program.head().unwrap();
        assert!(matches!(
            stmt,
            Statement::Assign {
                target: AddressExpr::DeRef(_),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_if_else_and_fail() {
        let ctx = parse_program(
            "vars: code: if (true) { fail \"x\"; } else { };",
            "t.wl",
        )
        .unwrap();
        let stmt = ctx.program.head().unwrap();
        match stmt {
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                assert_eq!(condition, &BoolExpr::True);
                assert_eq!(then_branch.len(), 1);
                assert!(else_branch.is_empty());
            }
            other => panic!("expected if, got {}", other),
        }
    }

    #[test]
    fn test_parse_swap_and_array_access() {
        let ctx = parse_program(
            "vars: int[3] a; code: swap a[0] and a[1];",
            "t.wl",
        )
        .unwrap();
        match ctx.program.head().unwrap() {
            Statement::Swap { left, right } => {
                assert!(matches!(left, AddressExpr::ArrayAccess { .. }));
                assert!(matches!(right, AddressExpr::ArrayAccess { .. }));
            }
            other => panic!("expected swap, got {}", other),
        }
    }

    #[test]
    fn test_parse_extern_negative_bounds() {
        let ctx = parse_program("vars: int x; code: extern x -5..5;", "t.wl").unwrap();
        match ctx.program.head().unwrap() {
            Statement::Extern { lower, upper, .. } => {
                assert_eq!(lower, &BigInt::from(-5));
                assert_eq!(upper, &BigInt::from(5));
            }
            other => panic!("expected extern, got {}", other),
        }
    }

    #[test]
    fn test_parse_print_with_args() {
        let ctx = parse_program(
            "vars: int x; code: print \"value\", x, x + 1;",
            "t.wl",
        )
        .unwrap();
        match ctx.program.head().unwrap() {
            Statement::Print { message, args } => {
                assert_eq!(message, "value");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected print, got {}", other),
        }
    }

    #[test]
    fn test_parenthesized_condition_backtracking() {
        // '(' opens an arithmetic group on the left of a comparison.
        let ctx = parse_program(
            "vars: int x; int y; code: if ((x + 1) < y) { } else { };",
            "t.wl",
        )
        .unwrap();
        match ctx.program.head().unwrap() {
            Statement::If { condition, .. } => {
                assert!(matches!(condition, BoolExpr::Lt(..)));
            }
            other => panic!("expected if, got {}", other),
        }
    }

    #[test]
    fn test_array_too_large_rejected() {
        let err = parse_program("vars: int[256] a; code:", "t.wl").unwrap_err();
        assert!(matches!(err, ParserError::ArrayTooLarge { length: 256, .. }));
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let err = parse_program("vars: int x; int x; code:", "t.wl").unwrap_err();
        assert!(matches!(err, ParserError::DuplicateVariable { .. }));
    }

    #[test]
    fn test_missing_semicolon_reported() {
        let err = parse_program("vars: int x; code: x := 1", "t.wl").unwrap_err();
        assert!(matches!(err, ParserError::UnexpectedEof { .. }));
    }
}
