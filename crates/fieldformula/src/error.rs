//! Formula error types

use fieldformula_syntax::SyntaxError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// Messages are part of the language's observable behavior, so most
/// variants display their payload verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// The formula handed to the entry point was not text
    #[error("Formula should be a string")]
    NotAString,

    #[error("Not enough arguments {actual}/{min}")]
    NotEnoughArguments { actual: usize, min: usize },

    #[error("Too many arguments {actual}/{max}")]
    TooManyArguments { actual: usize, max: usize },

    /// Operand or argument of the wrong type
    #[error("{0}")]
    TypeMismatch(String),

    /// Argument of the right type but outside the accepted domain
    #[error("{0}")]
    Argument(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Operator token the evaluator does not understand
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("{0}")]
    InvalidRegex(String),

    /// Failure raised by a caller-supplied function or context callback
    #[error("{0}")]
    Evaluation(String),

    /// Error raised inside a function call, tagged with the call's source
    #[error("{source} in {snippet}")]
    InCall {
        source: Box<FormulaError>,
        snippet: String,
    },
}

/// Coarse classification of a [`FormulaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Arity,
    TypeMismatch,
    Argument,
    UnknownFunction,
    UnknownOperator,
    InvalidRegex,
    Evaluation,
}

impl FormulaError {
    /// Classify the error, looking through call-site wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Parse(_) => ErrorKind::Parse,
            FormulaError::NotAString | FormulaError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            FormulaError::NotEnoughArguments { .. } | FormulaError::TooManyArguments { .. } => {
                ErrorKind::Arity
            }
            FormulaError::Argument(_) => ErrorKind::Argument,
            FormulaError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            FormulaError::UnknownOperator(_) => ErrorKind::UnknownOperator,
            FormulaError::InvalidRegex(_) => ErrorKind::InvalidRegex,
            FormulaError::Evaluation(_) => ErrorKind::Evaluation,
            FormulaError::InCall { source, .. } => source.kind(),
        }
    }

    /// The innermost error, without any call-site wrappers
    pub fn root_cause(&self) -> &FormulaError {
        match self {
            FormulaError::InCall { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Tag the error with the source text of the call that raised it
    pub fn in_call(self, snippet: impl Into<String>) -> Self {
        FormulaError::InCall {
            source: Box::new(self),
            snippet: snippet.into(),
        }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        FormulaError::TypeMismatch(msg.into())
    }

    pub fn argument(msg: impl Into<String>) -> Self {
        FormulaError::Argument(msg.into())
    }

    /// Convenience for caller-supplied functions
    pub fn evaluation(msg: impl Into<String>) -> Self {
        FormulaError::Evaluation(msg.into())
    }
}

impl From<SyntaxError> for FormulaError {
    fn from(err: SyntaxError) -> Self {
        FormulaError::Parse(err.to_string())
    }
}
