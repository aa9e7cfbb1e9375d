//! Logical functions
//!
//! Most of these decide which arguments to evaluate, so argument thunks are
//! only forced once the result still depends on them.

use super::{arg, boolean_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Thunk;
use crate::value::Value;

/// IF(condition, then, else?)
pub fn fn_if(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    if boolean_arg(args, 0, "IF")? {
        arg(args, 1)
    } else {
        match args.get(2) {
            Some(otherwise) => otherwise.eval(),
            None => Ok(Value::Undefined),
        }
    }
}

/// CASE(expression, value1, result1, ..., else?)
pub fn fn_case(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let expression = arg(args, 0)?;
    let rest = args.get(1..).unwrap_or_default();

    for pair in rest.chunks_exact(2) {
        if pair[0].eval()? == expression {
            return pair[1].eval();
        }
    }

    // An odd number of arguments after the expression ends with the default
    match rest.chunks_exact(2).remainder() {
        [otherwise] => otherwise.eval(),
        _ => Ok(Value::Null),
    }
}

/// AND(b1, b2, ...)
pub fn fn_and(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    for i in 0..args.len() {
        if !boolean_arg(args, i, "AND")? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// OR(b1, b2, ...)
pub fn fn_or(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    for i in 0..args.len() {
        if boolean_arg(args, i, "OR")? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// NOT(b)
pub fn fn_not(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::Boolean(!boolean_arg(args, 0, "NOT")?))
}

/// ISBLANK(value?), true when called without an argument
pub fn fn_isblank(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    match args.first() {
        Some(value) => Ok(Value::Boolean(value.eval()?.is_blank())),
        None => Ok(Value::Boolean(true)),
    }
}

pub fn fn_isnull(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::Boolean(arg(args, 0)?.is_null()))
}

/// NULLVALUE(value, substitute)
///
/// Only Null and Undefined are substituted; empty strings and zero are kept.
pub fn fn_nullvalue(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let value = arg(args, 0)?;
    if value.is_null() {
        arg(args, 1)
    } else {
        Ok(value)
    }
}

/// BLANKVALUE(v1, v2, ...)
///
/// First non-blank argument, or the last argument when all are blank.
pub fn fn_blankvalue(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let Some((last, leading)) = args.split_last() else {
        return Err(FormulaError::NotEnoughArguments { actual: 0, min: 2 });
    };

    for thunk in leading {
        let value = thunk.eval()?;
        if !value.is_blank() {
            return Ok(value);
        }
    }
    last.eval()
}

/// ISNUMBER(value)
///
/// Finite numbers, and strings holding nothing but a decimal number.
pub fn fn_isnumber(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let result = match arg(args, 0)? {
        Value::Number(n) => n.is_finite(),
        Value::String(s) => parse_numeric_text(&s).map_or(false, f64::is_finite),
        _ => false,
    };
    Ok(Value::Boolean(result))
}

/// Parse text that is a decimal number apart from surrounding whitespace
///
/// Blank text is not a number. Rust's float grammar also accepts words like
/// `inf` and `NaN`, which do not count here.
pub(crate) fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{formula_eval, Context, FormulaError, FormulaResult, Options, Value};
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> FormulaResult<Value> {
        formula_eval(formula, &Context::new(), &Options::default())
    }

    /// Context whose `Boom` variable fails when resolved
    fn tripwire() -> Context {
        Context::dynamic(|path| match path {
            ["Boom"] => Err(FormulaError::evaluation("Boom was evaluated")),
            _ => Ok(Value::Undefined),
        })
    }

    fn eval_tripwire(formula: &str) -> FormulaResult<Value> {
        formula_eval(formula, &tripwire(), &Options::default())
    }

    #[test]
    fn test_if() {
        assert_eq!(eval("IF(1 > 0, \"yes\", \"no\")").unwrap(), Value::from("yes"));
        assert_eq!(eval("IF(1 < 0, \"yes\", \"no\")").unwrap(), Value::from("no"));
        assert_eq!(eval("IF(false, 1)").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_if_requires_boolean() {
        let err = eval("IF(1, 2, 3)").unwrap_err();
        assert_eq!(err.to_string(), "Argument 1 of IF must be a boolean in IF(1, 2, 3)");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        assert_eq!(eval_tripwire("IF(false, Boom, 2)").unwrap(), Value::from(2));
        assert_eq!(eval_tripwire("IF(true, 1, Boom)").unwrap(), Value::from(1));
    }

    #[test]
    fn test_case() {
        assert_eq!(
            eval("CASE(3, 1, \"One\", 2, \"Two\", 3, \"Three\", \"Other\")").unwrap(),
            Value::from("Three")
        );
        assert_eq!(
            eval("CASE(9, 1, \"One\", 2, \"Two\", \"Other\")").unwrap(),
            Value::from("Other")
        );
        assert_eq!(eval("CASE(9, 1, \"One\", 2, \"Two\")").unwrap(), Value::Null);
        // Strict equality, no coercion
        assert_eq!(eval("CASE(\"1\", 1, \"num\", \"str\")").unwrap(), Value::from("str"));
    }

    #[test]
    fn test_case_stops_at_first_match() {
        assert_eq!(
            eval_tripwire("CASE(1, 1, \"one\", Boom, Boom)").unwrap(),
            Value::from("one")
        );
    }

    #[test]
    fn test_case_arity() {
        let err = eval("CASE(1, 2)").unwrap_err();
        assert_eq!(err.to_string(), "Not enough arguments 2/3 in CASE(1, 2)");
    }

    #[test]
    fn test_and_or_functions() {
        assert_eq!(eval("AND(true, true)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("AND(true, false)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("OR(false, true)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("OR(false)").unwrap(), Value::Boolean(false));
        assert_eq!(
            eval("AND(true, 1)").unwrap_err().to_string(),
            "Argument 2 of AND must be a boolean in AND(true, 1)"
        );
        assert_eq!(
            eval("OR(\"x\")").unwrap_err().to_string(),
            "Argument 1 of OR must be a boolean in OR(\"x\")"
        );
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eq!(eval_tripwire("AND(false, Boom)").unwrap(), Value::Boolean(false));
        assert_eq!(eval_tripwire("OR(true, Boom)").unwrap(), Value::Boolean(true));
        assert!(eval_tripwire("AND(true, Boom)").is_err());
    }

    #[test]
    fn test_not() {
        assert_eq!(eval("NOT(true)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("NOT(false)").unwrap(), Value::Boolean(true));
        assert_eq!(
            eval("NOT(0)").unwrap_err().to_string(),
            "Argument 1 of NOT must be a boolean in NOT(0)"
        );
    }

    #[test]
    fn test_isblank() {
        assert_eq!(eval("ISBLANK()").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISBLANK(\"\")").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISBLANK(\"   \")").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISBLANK(null)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISBLANK(Missing)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISBLANK(0)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("ISBLANK(\"a\")").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_isnull_and_nullvalue() {
        assert_eq!(eval("ISNULL(null)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISNULL(undefined)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("ISNULL(\"\")").unwrap(), Value::Boolean(false));
        assert_eq!(eval("NULLVALUE(null, 5)").unwrap(), Value::from(5));
        assert_eq!(eval("NULLVALUE(\"\", 5)").unwrap(), Value::from(""));
        assert_eq!(eval("NULLVALUE(0, 5)").unwrap(), Value::from(0));
        assert_eq!(eval_tripwire("NULLVALUE(1, Boom)").unwrap(), Value::from(1));
    }

    #[test]
    fn test_blankvalue() {
        assert_eq!(eval("BLANKVALUE(\"\", \"Default\")").unwrap(), Value::from("Default"));
        assert_eq!(eval("BLANKVALUE(0, \"Default\")").unwrap(), Value::from(0));
        assert_eq!(eval("BLANKVALUE(null, \" \", \"x\")").unwrap(), Value::from("x"));
        assert_eq!(eval("BLANKVALUE(null, \"\")").unwrap(), Value::from(""));
        assert_eq!(eval_tripwire("BLANKVALUE(\"a\", Boom)").unwrap(), Value::from("a"));
        assert_eq!(
            eval("BLANKVALUE()").unwrap_err().to_string(),
            "Not enough arguments 0/2 in BLANKVALUE()"
        );
    }

    #[test]
    fn test_isnumber() {
        for (formula, expected) in [
            ("ISNUMBER(12)", true),
            ("ISNUMBER(1 / 0)", false),
            ("ISNUMBER(\"12.5\")", true),
            ("ISNUMBER(\"  -3 \")", true),
            ("ISNUMBER(\"1e3\")", true),
            ("ISNUMBER(\"\")", false),
            ("ISNUMBER(\"1,234\")", false),
            ("ISNUMBER(\"12.3.4\")", false),
            ("ISNUMBER(\"12abc\")", false),
            ("ISNUMBER(\"inf\")", false),
            ("ISNUMBER(true)", false),
            ("ISNUMBER(null)", false),
        ] {
            assert_eq!(eval(formula).unwrap(), Value::Boolean(expected), "{}", formula);
        }
    }
}
