//! Lexer: tokenizes guard expression source
//!
//! Produces a stream of tokens that the parser consumes. Handles
//! keywords (`and`, `or`, `not`, `in`, `true`, `false`), identifiers
//! (dotted field paths allowed), string and number literals, and
//! operators.

use crate::errors::{GuardError, GuardResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The raw text of the token
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    In,
    True,
    False,

    // Identifiers and literals
    Identifier,
    StringLiteral,
    NumberLiteral,

    // Comparison operators
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,

    // Structural
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,

    // End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::In => write!(f, "in"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Identifier => write!(f, "identifier"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::NumberLiteral => write!(f, "number"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::OpenBracket => write!(f, "["),
            Self::CloseBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for guard expressions
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    /// Create a new lexer from input text
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> GuardResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> GuardResult<Token> {
        let ch = self.input[self.pos];
        let line = self.line;
        let col = self.col;

        match ch {
            '(' => {
                self.advance();
                Ok(Token::new(TokenKind::OpenParen, "(", line, col))
            }
            ')' => {
                self.advance();
                Ok(Token::new(TokenKind::CloseParen, ")", line, col))
            }
            '[' => {
                self.advance();
                Ok(Token::new(TokenKind::OpenBracket, "[", line, col))
            }
            ']' => {
                self.advance();
                Ok(Token::new(TokenKind::CloseBracket, "]", line, col))
            }
            ',' => {
                self.advance();
                Ok(Token::new(TokenKind::Comma, ",", line, col))
            }
            '+' => {
                self.advance();
                Ok(Token::new(TokenKind::Plus, "+", line, col))
            }
            '-' => {
                self.advance();
                Ok(Token::new(TokenKind::Minus, "-", line, col))
            }
            '*' => {
                self.advance();
                Ok(Token::new(TokenKind::Star, "*", line, col))
            }
            '/' => {
                self.advance();
                Ok(Token::new(TokenKind::Slash, "/", line, col))
            }
            '=' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::new(TokenKind::EqEq, "==", line, col))
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::new(TokenKind::NotEq, "!=", line, col))
            }
            '<' => {
                self.advance();
                if self.peek_at(0) == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Le, "<=", line, col))
                } else {
                    Ok(Token::new(TokenKind::Lt, "<", line, col))
                }
            }
            '>' => {
                self.advance();
                if self.peek_at(0) == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Ge, ">=", line, col))
                } else {
                    Ok(Token::new(TokenKind::Gt, ">", line, col))
                }
            }
            '"' => self.read_string_literal(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier_or_keyword(),
            _ => Err(GuardError::ParseError {
                line,
                col,
                message: format!("Unexpected character: '{}'", ch),
            }),
        }
    }

    fn read_string_literal(&mut self) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        self.advance(); // skip opening quote

        let mut text = String::new();
        while self.pos < self.input.len() && self.input[self.pos] != '"' {
            if self.input[self.pos] == '\\' && self.peek_at(1) == Some('"') {
                self.advance();
                text.push('"');
            } else {
                text.push(self.input[self.pos]);
            }
            self.advance();
        }

        if self.pos >= self.input.len() {
            return Err(GuardError::ParseError {
                line,
                col,
                message: "Unterminated string literal".into(),
            });
        }

        self.advance(); // skip closing quote
        Ok(Token::new(TokenKind::StringLiteral, text, line, col))
    }

    fn read_number(&mut self) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            text.push(self.input[self.pos]);
            self.advance();
        }

        // Optional fractional part
        if self.peek_at(0) == Some('.')
            && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            text.push('.');
            self.advance();
            while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
                text.push(self.input[self.pos]);
                self.advance();
            }
        }

        Ok(Token::new(TokenKind::NumberLiteral, text, line, col))
    }

    fn read_identifier_or_keyword(&mut self) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        // Dots allowed inside identifiers for nested field paths
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric()
                || self.input[self.pos] == '_'
                || self.input[self.pos] == '.')
        {
            text.push(self.input[self.pos]);
            self.advance();
        }

        let kind = match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier,
        };

        Ok(Token::new(kind, text, line, col))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}
