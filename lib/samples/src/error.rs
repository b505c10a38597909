//! Errors raised by the sample nodes.

use std::fmt;

/// Errors from building a multiplication expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// There were no terms to multiply.
    NoTerms,
    /// The product does not fit the payload type.
    Overflow { operands: String },
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTerms => write!(f, "no terms to multiply"),
            Self::Overflow { operands } => write!(f, "product of {operands} overflows"),
        }
    }
}

impl std::error::Error for ExpressionError {}
