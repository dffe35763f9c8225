//! Guard language error types

/// Errors from parsing a guard expression
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Parse error at line {line}, column {col}: {message}")]
    ParseError {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of input: expected {0}")]
    UnexpectedEof(String),
}

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;
