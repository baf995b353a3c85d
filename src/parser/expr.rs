// Expression sub-parser (precedence climbing).
//
//   expr    := unary (binop expr)*      binop precedence > threshold
//   unary   := ('-' | '!' | '~') unary | primary
//   primary := NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
//
// operators, tightest first:
//   **            8  right
//   * / %         7  left
//   + -           6  left
//   < > <= >=     5  left
//   == !=         4  left
//   &&            3  left
//   ||            2  left
//
// Assignment operators are not expression operators: assignment is parsed at
// statement level before an expression is ever entered.

use crate::ast::{BinaryOp, Call, Expr, ExprKind, UnaryOp};
use crate::error::CompileResult;
use crate::token::TokenKind;

use super::Parser;

impl Parser {
    /// Parse one expression starting at the current token.
    pub fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary(0)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Operator)
            .and_then(|t| BinaryOp::from_symbol(&t.value))
    }

    fn parse_binary(&mut self, threshold: u8) -> CompileResult<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence <= threshold {
                break;
            }
            let position = self.advance().map(|t| t.position()).unwrap_or(lhs.position);

            // A right-associative operator lets an equal-precedence operator
            // continue inside its right operand.
            let next_threshold = if op.is_right_associative() {
                precedence - 1
            } else {
                precedence
            };
            let rhs = self.parse_binary(next_threshold)?;

            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            );
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let prefix = self
            .peek()
            .filter(|t| t.kind == TokenKind::Operator)
            .and_then(|t| UnaryOp::from_symbol(&t.value).map(|op| (op, t.position())));

        if let Some((op, position)) = prefix {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                position,
            ));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };
        let position = token.position();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(token.value), position))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check_value(TokenKind::Punctuation, "(") {
                    self.advance();
                    let args = self.parse_call_arguments()?;
                    return Ok(Expr::new(
                        ExprKind::Call(Call {
                            callee: token.value,
                            args,
                        }),
                        position,
                    ));
                }
                Ok(Expr::new(ExprKind::Identifier(token.value), position))
            }
            TokenKind::Punctuation if token.value == "(" => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_value(TokenKind::Punctuation, ")")?;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Arguments after an opening `(`, consuming the closing `)`.
    pub(super) fn parse_call_arguments(&mut self) -> CompileResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check_value(TokenKind::Punctuation, ")") {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if self.check_value(TokenKind::Punctuation, ",") {
                self.advance();
            } else if self.check_value(TokenKind::Punctuation, ")") {
                self.advance();
                return Ok(args);
            } else {
                return Err(self.expected("',' or ')'"));
            }
        }
    }
}
