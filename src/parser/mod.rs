//! Recursive-descent parser for the output language.

use crate::ast::{
    AssignOp, BinaryOp, Expr, FunctionDecl, LogicalOp, Program, Stmt, Target, UnaryOp,
};
use crate::error::ParseError;
use std::sync::Arc;

mod lexer;

pub use lexer::{Lexer, Token, TokenKind};

/// Deepest nesting of statements and expressions the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 500;

/// Parses a complete source text.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).program()
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|token| token.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |token| token.line);
            tokens.push(Token {
                kind: TokenKind::Eof,
                line,
            });
        }
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    pub fn program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    // Token helpers

    fn peek(&self) -> &Token {
        // `new` guarantees the stream ends with `Eof`.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w == word)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{kind}'")))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Word(word) if !is_keyword(word) => {
                let word = word.clone();
                self.advance();
                Ok(word)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            found: token.kind.to_string(),
            expected: expected.to_string(),
            line: token.line,
        }
    }

    /// Statement terminators are optional before `}` and at end of input.
    fn end_statement(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::Eof)
        {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeeplyNested {
                line: self.peek().line,
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // Statements

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        self.nested(Self::statement_kind)
    }

    fn statement_kind(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(Stmt::Block(Vec::new()));
        }
        if self.check(&TokenKind::LBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.check_word("let") || self.check_word("const") || self.check_word("var") {
            let stmt = self.declaration()?;
            self.end_statement()?;
            return Ok(stmt);
        }
        if self.eat_word("if") {
            return self.if_statement();
        }
        if self.eat_word("while") {
            self.expect(TokenKind::LParen)?;
            let condition = self.expression()?;
            self.expect(TokenKind::RParen)?;
            let body = self.body()?;
            return Ok(Stmt::While { condition, body });
        }
        if self.eat_word("for") {
            return self.for_statement();
        }
        if self.eat_word("break") {
            self.end_statement()?;
            return Ok(Stmt::Break);
        }
        if self.eat_word("continue") {
            self.end_statement()?;
            return Ok(Stmt::Continue);
        }
        if self.eat_word("return") {
            let value = if self.check(&TokenKind::Semicolon)
                || self.check(&TokenKind::RBrace)
                || self.check(&TokenKind::Eof)
            {
                None
            } else {
                Some(self.expression()?)
            };
            self.end_statement()?;
            return Ok(Stmt::Return(value));
        }
        if self.check_word("function") || self.check_word("async") {
            return self.function();
        }

        let stmt = self.simple_statement()?;
        self.end_statement()?;
        Ok(stmt)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    /// A braced block, or a single statement standing in for one.
    fn body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.expect_identifier()?;
        let value = if self.eat(&TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::Let { name, value })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.body()?;
        let else_branch = if self.eat_word("else") {
            if self.eat_word("if") {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.body()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::LParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if self.check_word("let") || self.check_word("const") || self.check_word("var") {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(TokenKind::Semicolon)?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.body()?;
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn function(&mut self) -> Result<Stmt, ParseError> {
        self.eat_word("async");
        if !self.eat_word("function") {
            return Err(self.unexpected("'function'"));
        }
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.block()?;
        Ok(Stmt::Function(Arc::new(FunctionDecl {
            name,
            params,
            body,
        })))
    }

    /// An expression statement, an assignment, or `x++` / `x--`.
    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.peek().line;
        let expr = self.expression()?;

        let op = match self.peek().kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Subtract,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    AssignOp::Add
                } else {
                    AssignOp::Subtract
                };
                return Ok(Stmt::Assign {
                    target: assignment_target(expr, line)?,
                    op,
                    value: Expr::Number(1.0),
                });
            }
            _ => return Ok(Stmt::Expr(expr)),
        };
        self.advance();
        let value = self.expression()?;
        Ok(Stmt::Assign {
            target: assignment_target(expr, line)?,
            op,
            value,
        })
    }

    // Expressions, lowest precedence first

    pub fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::logical_or)
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        operators: &[(TokenKind, BinaryOp)],
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in operators {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::comparison,
            &[
                (TokenKind::EqEqEq, BinaryOp::StrictEqual),
                (TokenKind::BangEqEq, BinaryOp::StrictNotEqual),
                (TokenKind::EqEq, BinaryOp::LooseEqual),
                (TokenKind::BangEq, BinaryOp::LooseNotEqual),
            ],
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::additive,
            &[
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::LessEq, BinaryOp::LessEqual),
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::GreaterEq, BinaryOp::GreaterEqual),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::multiplicative,
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Subtract),
            ],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::unary,
            &[
                (TokenKind::Star, BinaryOp::Multiply),
                (TokenKind::Slash, BinaryOp::Divide),
                (TokenKind::Percent, BinaryOp::Modulo),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Plus => Some(UnaryOp::Plus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.eat_word("await") {
            let inner = self.nested(Self::unary)?;
            return Ok(Expr::Await(Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let property = match self.advance().kind {
                    TokenKind::Word(word) => word,
                    _ => return Err(self.unexpected("a property name")),
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&TokenKind::LParen) {
                let arguments = self.list(TokenKind::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn list(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                Ok(Expr::Array(self.list(TokenKind::RBracket)?))
            }
            TokenKind::LBrace => {
                self.advance();
                self.object()
            }
            TokenKind::Word(word) => {
                let expr = match word.as_str() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" => Expr::Null,
                    "undefined" => Expr::Undefined,
                    w if is_keyword(w) => return Err(self.unexpected("an expression")),
                    _ => Expr::Identifier(word),
                };
                self.advance();
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn object(&mut self) -> Result<Expr, ParseError> {
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.advance().kind {
                TokenKind::Word(word) | TokenKind::Str(word) => word,
                TokenKind::Number(n) => crate::ast::format_number(n),
                _ => return Err(self.unexpected("a property name")),
            };
            self.expect(TokenKind::Colon)?;
            let value = self.expression()?;
            fields.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Object(fields))
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "let" | "const" | "var" | "if" | "else" | "while" | "for" | "break" | "continue"
            | "return" | "function" | "async" | "await" | "true" | "false" | "null"
            | "undefined"
    )
}

fn assignment_target(expr: Expr, line: usize) -> Result<Target, ParseError> {
    match expr {
        Expr::Identifier(name) => Ok(Target::Variable(name)),
        Expr::Index { object, index } => match *object {
            Expr::Identifier(name) => Ok(Target::Element { name, index: *index }),
            _ => Err(ParseError::InvalidAssignmentTarget { line }),
        },
        _ => Err(ParseError::InvalidAssignmentTarget { line }),
    }
}
