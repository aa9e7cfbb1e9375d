//! # fieldformula
//!
//! Evaluator for record-field formulas such as
//! `IF(Amount > 1000, "Large", "Small")`.
//!
//! This crate provides:
//! - The value model ([`Value`])
//! - Variable resolution against a static record or a callback ([`Context`])
//! - The evaluator with lazily evaluated function arguments
//! - About seventy built-in logical, math, text and date functions
//!
//! ## Example
//!
//! ```rust
//! use fieldformula::{formula_eval, Context, Options, Value};
//! use serde_json::json;
//!
//! let context = Context::from_json(&json!({ "Amount": 1500 })).unwrap();
//! let result = formula_eval(
//!     "IF(Amount > 1000, \"Large\", \"Small\")",
//!     &context,
//!     &Options::default(),
//! )
//! .unwrap();
//! assert_eq!(result, Value::from("Large"));
//! ```

pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod value;

pub use context::{Context, Field, Record};
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{evaluate, Thunk};
pub use fieldformula_syntax::{extract_variables, parse, ParseTree};
pub use functions::{builtins, validate_args, FunctionDef, FunctionRegistry, Options};
pub use value::{format_number, Value};

use tracing::debug;

/// Parse and evaluate a formula
///
/// Parse failures surface as [`FormulaError::Parse`]; everything else comes
/// from evaluation.
pub fn formula_eval(formula: &str, context: &Context, options: &Options) -> FormulaResult<Value> {
    debug!(len = formula.len(), "evaluating formula");
    let tree = parse(formula)?;
    evaluate(&tree, formula, context, options)
}

/// [`formula_eval`] for formulas arriving as untyped JSON
///
/// Anything other than a JSON string fails with [`FormulaError::NotAString`].
pub fn formula_eval_value(
    formula: &serde_json::Value,
    context: &Context,
    options: &Options,
) -> FormulaResult<Value> {
    match formula {
        serde_json::Value::String(text) => formula_eval(text, context, options),
        _ => Err(FormulaError::NotAString),
    }
}
