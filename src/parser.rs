//! Recursive-descent parser for velox source.
//!
//! Statements and declarations are parsed here, one method per construct;
//! expressions are handed to the precedence-climbing sub-parser in [`expr`].
//! The first structural error aborts the parse.

use tracing::debug;

use crate::ast::{
    AssignOp, Assignment, Block, Call, Conditional, Directive, DirectiveOperand, ElseArm,
    FunctionDecl, Initializer, Item, Param, Program, Stmt, StmtKind, TypeName, VarDecl, WhileLoop,
};
use crate::error::{CompileError, CompileResult};
use crate::token::{Position, Token, TokenKind};

mod expr;

const TYPE_KEYWORDS: [&str; 4] = ["int", "float", "char", "void"];
const DECLARATION_KEYWORDS: [&str; 3] = ["int", "float", "char"];

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a parser over significant tokens (no comments or whitespace).
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse a whole translation unit.
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let mut items = Vec::new();

        while let Some(token) = self.peek().cloned() {
            match token.kind {
                TokenKind::Preprocessor => items.push(Item::Directive(self.parse_directive()?)),
                TokenKind::Keyword if TYPE_KEYWORDS.contains(&token.value.as_str()) => {
                    items.push(Item::Function(self.parse_function()?))
                }
                _ => return Err(self.unexpected()),
            }
        }

        debug!(items = items.len(), "parsed program");
        Ok(Program { items })
    }

    // ---- token cursor ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn check_value(&self, kind: TokenKind, value: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kind, value))
    }

    /// Position used for errors: the current token, or the last token once
    /// input is exhausted.
    fn error_position(&self) -> Option<Position> {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(Token::position)
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn unexpected(&self) -> CompileError {
        match self.peek() {
            Some(token) => {
                CompileError::syntax(Some(token.position()), format!("unexpected {token}"))
            }
            None => CompileError::syntax(self.error_position(), "unexpected end of input"),
        }
    }

    fn expected(&self, what: &str) -> CompileError {
        CompileError::syntax(
            self.error_position(),
            format!("expected {what}, found {}", self.found()),
        )
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(kind) {
            return self.advance().ok_or_else(|| self.unexpected());
        }
        Err(self.expected(kind.name()))
    }

    fn expect_value(&mut self, kind: TokenKind, value: &str) -> CompileResult<Token> {
        if self.check_value(kind, value) {
            return self.advance().ok_or_else(|| self.unexpected());
        }
        Err(self.expected(&format!("{kind}({value})")))
    }

    fn expect_type(&mut self, allowed: &[&str]) -> CompileResult<Token> {
        let is_type = self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Keyword && allowed.contains(&t.value.as_str()));
        if is_type {
            return self.advance().ok_or_else(|| self.unexpected());
        }
        Err(self.expected("type name"))
    }

    // ---- top level ----

    fn parse_directive(&mut self) -> CompileResult<Directive> {
        let keyword = self.expect(TokenKind::Preprocessor)?;
        let target = self.expect(TokenKind::Identifier)?;

        let operand = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Number) => self
                .advance()
                .map(|t| DirectiveOperand::Number(t.value)),
            Some(TokenKind::String) => self
                .advance()
                .map(|t| DirectiveOperand::String(t.value)),
            _ => None,
        };

        Ok(Directive {
            position: keyword.position(),
            name: keyword.value,
            target: target.value,
            operand,
        })
    }

    fn parse_function(&mut self) -> CompileResult<FunctionDecl> {
        let return_type = self.expect_type(&TYPE_KEYWORDS)?;
        let name = self.expect(TokenKind::Identifier)?;

        self.expect_value(TokenKind::Punctuation, "(")?;
        let params = self.parse_parameters()?;
        self.expect_value(TokenKind::Punctuation, ")")?;

        let body = self.parse_block()?;

        Ok(FunctionDecl {
            position: name.position(),
            return_type: TypeName {
                position: return_type.position(),
                name: return_type.value,
                is_array: false,
            },
            name: name.value,
            params,
            body,
        })
    }

    /// `type ident (, type ident)*`, possibly empty. A trailing comma is rejected.
    fn parse_parameters(&mut self) -> CompileResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.check_value(TokenKind::Punctuation, ")") {
            return Ok(params);
        }

        loop {
            let ty = self.expect_type(&TYPE_KEYWORDS)?;
            let name = self.expect(TokenKind::Identifier)?;
            params.push(Param {
                ty: TypeName {
                    position: ty.position(),
                    name: ty.value,
                    is_array: false,
                },
                position: name.position(),
                name: name.value,
            });

            if self.check_value(TokenKind::Punctuation, ",") {
                self.advance();
            } else if self.check_value(TokenKind::Punctuation, ")") {
                return Ok(params);
            } else {
                return Err(self.expected("',' or ')'"));
            }
        }
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        self.expect_value(TokenKind::Punctuation, "{")?;

        let mut statements = Vec::new();
        while !self.check_value(TokenKind::Punctuation, "}") {
            if self.peek().is_none() {
                return Err(CompileError::syntax(
                    self.error_position(),
                    "unexpected end of input while parsing block",
                ));
            }
            statements.push(self.parse_statement()?);
        }

        self.expect_value(TokenKind::Punctuation, "}")?;
        Ok(Block { statements })
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };

        match token.kind {
            TokenKind::Keyword => match token.value.as_str() {
                "return" => self.parse_return(),
                "int" | "float" | "char" => self.parse_declaration(),
                "if" => {
                    let position = token.position();
                    let conditional = self.parse_conditional()?;
                    Ok(Stmt {
                        kind: StmtKind::If(conditional),
                        position,
                    })
                }
                "while" => self.parse_while(),
                "break" | "continue" => self.parse_jump(),
                _ => Err(self.unexpected()),
            },
            TokenKind::Identifier => {
                let next = self.peek_next();
                let is_call = next.is_some_and(|t| t.is(TokenKind::Punctuation, "("));
                let is_assignment = next.is_some_and(|t| {
                    t.kind == TokenKind::Operator && AssignOp::from_symbol(&t.value).is_some()
                });
                if is_call {
                    self.parse_call_statement()
                } else if is_assignment {
                    self.parse_assignment()
                } else {
                    Err(self.unexpected())
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_declaration(&mut self) -> CompileResult<Stmt> {
        let ty = self.expect_type(&DECLARATION_KEYWORDS)?;

        let is_array = self.check_value(TokenKind::Punctuation, "[");
        if is_array {
            self.advance();
            self.expect_value(TokenKind::Punctuation, "]")?;
        }

        let name = self.expect(TokenKind::Identifier)?;

        let init = if self.check_value(TokenKind::Operator, "=") {
            self.advance();
            if is_array {
                Some(Initializer::Array(self.parse_array_initializer()?))
            } else {
                Some(Initializer::Expr(self.parse_expression()?))
            }
        } else {
            None
        };

        self.expect_value(TokenKind::Punctuation, ";")?;

        let position = ty.position();
        Ok(Stmt {
            kind: StmtKind::Declaration(VarDecl {
                ty: TypeName {
                    name: ty.value,
                    is_array,
                    position,
                },
                name: name.value,
                init,
            }),
            position,
        })
    }

    fn parse_array_initializer(&mut self) -> CompileResult<Vec<crate::ast::Expr>> {
        self.expect_value(TokenKind::Punctuation, "{")?;

        let mut elements = Vec::new();
        while !self.check_value(TokenKind::Punctuation, "}") {
            elements.push(self.parse_expression()?);

            if self.check_value(TokenKind::Punctuation, ",") {
                self.advance();
            } else if !self.check_value(TokenKind::Punctuation, "}") {
                return Err(self.expected("',' or '}'"));
            }
        }

        self.expect_value(TokenKind::Punctuation, "}")?;
        Ok(elements)
    }

    fn parse_return(&mut self) -> CompileResult<Stmt> {
        let keyword = self.expect_value(TokenKind::Keyword, "return")?;
        let value = self.parse_expression()?;
        self.expect_value(TokenKind::Punctuation, ";")?;
        Ok(Stmt {
            kind: StmtKind::Return(Some(value)),
            position: keyword.position(),
        })
    }

    /// `if (cond) block [else (if ... | block)]`, right-recursive on `else if`.
    fn parse_conditional(&mut self) -> CompileResult<Conditional> {
        self.expect_value(TokenKind::Keyword, "if")?;
        self.expect_value(TokenKind::Punctuation, "(")?;
        let condition = self.parse_expression()?;
        self.expect_value(TokenKind::Punctuation, ")")?;

        let then_branch = self.parse_block()?;

        let else_branch = if self.check_value(TokenKind::Keyword, "else") {
            self.advance();
            if self.check_value(TokenKind::Keyword, "if") {
                Some(ElseArm::ElseIf(Box::new(self.parse_conditional()?)))
            } else {
                Some(ElseArm::Else(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(Conditional {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> CompileResult<Stmt> {
        let keyword = self.expect_value(TokenKind::Keyword, "while")?;
        self.expect_value(TokenKind::Punctuation, "(")?;
        let condition = self.parse_expression()?;
        self.expect_value(TokenKind::Punctuation, ")")?;
        let body = self.parse_block()?;

        Ok(Stmt {
            kind: StmtKind::While(WhileLoop { condition, body }),
            position: keyword.position(),
        })
    }

    fn parse_jump(&mut self) -> CompileResult<Stmt> {
        let keyword = self.expect(TokenKind::Keyword)?;
        let kind = match keyword.value.as_str() {
            "break" => StmtKind::Break,
            "continue" => StmtKind::Continue,
            _ => {
                return Err(CompileError::syntax(
                    Some(keyword.position()),
                    format!("unexpected {keyword}"),
                ))
            }
        };
        self.expect_value(TokenKind::Punctuation, ";")?;
        Ok(Stmt {
            kind,
            position: keyword.position(),
        })
    }

    fn parse_call_statement(&mut self) -> CompileResult<Stmt> {
        let name = self.expect(TokenKind::Identifier)?;
        self.expect_value(TokenKind::Punctuation, "(")?;
        let args = self.parse_call_arguments()?;
        self.expect_value(TokenKind::Punctuation, ";")?;

        Ok(Stmt {
            position: name.position(),
            kind: StmtKind::Call(Call {
                callee: name.value,
                args,
            }),
        })
    }

    fn parse_assignment(&mut self) -> CompileResult<Stmt> {
        let target = self.expect(TokenKind::Identifier)?;
        let op_token = self.expect(TokenKind::Operator)?;
        let op = AssignOp::from_symbol(&op_token.value).ok_or_else(|| {
            CompileError::syntax(
                Some(op_token.position()),
                format!("expected assignment operator, found {op_token}"),
            )
        })?;
        let value = self.parse_expression()?;
        self.expect_value(TokenKind::Punctuation, ";")?;

        Ok(Stmt {
            position: target.position(),
            kind: StmtKind::Assignment(Assignment {
                target: target.value,
                op,
                value,
            }),
        })
    }
}

/// Parse significant tokens into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
    Parser::new(tokens).parse_program()
}
