//! Syntax error types

use thiserror::Error;

/// Result type for parsing operations
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Errors raised while turning formula text into a parse tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A character that cannot start any token
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    /// A token that is not valid where it appears
    #[error("Unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// Input ended while a construct was still open
    #[error("Unexpected end of formula, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// String literal without a closing quote
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    /// A tree handed to the builder breaks the node shape rules
    #[error("Malformed parse tree: {0}")]
    MalformedTree(String),
}
