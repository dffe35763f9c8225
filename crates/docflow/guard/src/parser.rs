//! Parser: builds a typed expression tree from tokens
//!
//! Recursive descent with standard precedence: `or` binds loosest,
//! then `and`, `not`, comparisons and `in`, additive, multiplicative,
//! unary minus, and primaries.

use serde::{Deserialize, Serialize};

use crate::errors::{GuardError, GuardResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// A literal value appearing in an expression
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "\"{}\"", s),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        write!(f, "{}", s)
    }
}

/// Expression tree for a parsed guard
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value
    Literal(Literal),
    /// A field reference into the document snapshot
    Field(String),
    /// Logical negation
    Not(Box<Expr>),
    /// Numeric negation
    Neg(Box<Expr>),
    /// A binary operation
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Membership test against a literal list
    InList { needle: Box<Expr>, items: Vec<Literal> },
}

/// Parser for guard expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse a source string into an expression tree
    pub fn parse(input: &str) -> GuardResult<Expr> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.check(TokenKind::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> GuardResult<Expr> {
        if self.check(TokenKind::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> GuardResult<Expr> {
        let lhs = self.parse_additive()?;

        let op = match self.peek().kind {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::In => {
                self.advance();
                let items = self.parse_literal_list()?;
                return Ok(Expr::InList {
                    needle: Box::new(lhs),
                    items,
                });
            }
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_additive()?;
            return Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }

        Ok(lhs)
    }

    fn parse_additive(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> GuardResult<Expr> {
        if self.check(TokenKind::Minus) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> GuardResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::NumberLiteral => {
                self.advance();
                let value = token.text.parse::<f64>().map_err(|_| GuardError::ParseError {
                    line: token.line,
                    col: token.col,
                    message: format!("Invalid number: {}", token.text),
                })?;
                Ok(Expr::Literal(Literal::Number(value)))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Literal(Literal::Text(token.text)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Field(token.text))
            }
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::Eof => Err(GuardError::UnexpectedEof("expression".into())),
            _ => Err(GuardError::UnexpectedToken {
                expected: "expression".into(),
                found: token.text,
            }),
        }
    }

    fn parse_literal_list(&mut self) -> GuardResult<Vec<Literal>> {
        self.expect(TokenKind::OpenBracket)?;
        let mut items = Vec::new();

        if !self.check(TokenKind::CloseBracket) {
            loop {
                items.push(self.parse_literal()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(TokenKind::CloseBracket)?;
        Ok(items)
    }

    fn parse_literal(&mut self) -> GuardResult<Literal> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::NumberLiteral => {
                self.advance();
                let value = token.text.parse::<f64>().map_err(|_| GuardError::ParseError {
                    line: token.line,
                    col: token.col,
                    message: format!("Invalid number: {}", token.text),
                })?;
                Ok(Literal::Number(value))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Literal::Text(token.text))
            }
            TokenKind::True => {
                self.advance();
                Ok(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Literal::Bool(false))
            }
            TokenKind::Eof => Err(GuardError::UnexpectedEof("literal".into())),
            _ => Err(GuardError::UnexpectedToken {
                expected: "literal".into(),
                found: token.text,
            }),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> GuardResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            let token = self.peek();
            if token.kind == TokenKind::Eof {
                Err(GuardError::UnexpectedEof(kind.to_string()))
            } else {
                Err(GuardError::UnexpectedToken {
                    expected: kind.to_string(),
                    found: token.text.clone(),
                })
            }
        }
    }
}
