//! Restricted guard expression language
//!
//! Guards gate workflow transitions against a document snapshot:
//! comparisons, `and`/`or`/`not`, arithmetic on numeric fields, field
//! lookups by name, and `in [...]` membership. The grammar reaches no
//! host-language execution of any kind.
//!
//! Evaluation **fails closed**: a missing field, a type mismatch, or a
//! malformed expression evaluates to `false` and logs a warning. An
//! approval must never be silently granted by a broken expression.
//!
//! ```rust
//! use docflow_guard::{evaluate, parse};
//! use docflow_types::DocumentSnapshot;
//!
//! let expr = parse("grand_total <= 5000 and priority == \"High\"").unwrap();
//! let snapshot = DocumentSnapshot::new()
//!     .with_field("grand_total", 3000.0)
//!     .with_field("priority", "High");
//! assert!(evaluate(&expr, &snapshot));
//! ```

#![deny(unsafe_code)]

mod errors;
mod eval;
mod lexer;
mod parser;

pub use errors::{GuardError, GuardResult};
pub use eval::{evaluate, try_evaluate, EvalIssue};
pub use parser::{BinaryOp, Expr, Literal, Parser};

/// Parse a guard expression source into its AST
pub fn parse(source: &str) -> GuardResult<Expr> {
    Parser::parse(source)
}
