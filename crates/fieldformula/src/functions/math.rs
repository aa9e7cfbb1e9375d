//! Math functions

use super::{integer_arg, number_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Thunk;
use crate::value::Value;

fn unary(args: &[Thunk<'_>], name: &str, f: fn(f64) -> f64) -> FormulaResult<Value> {
    let n = number_arg(args, 0, name)?;
    Ok(Value::Number(f(n)))
}

pub fn fn_abs(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "ABS", f64::abs)
}

/// ACOS(n), Null outside [-1, 1]
pub fn fn_acos(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "ACOS")?;
    if !(-1.0..=1.0).contains(&n) {
        return Ok(Value::Null);
    }
    Ok(Value::Number(n.acos()))
}

/// ASIN(n), Null outside [-1, 1]
pub fn fn_asin(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "ASIN")?;
    if !(-1.0..=1.0).contains(&n) {
        return Ok(Value::Null);
    }
    Ok(Value::Number(n.asin()))
}

pub fn fn_atan(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "ATAN", f64::atan)
}

/// ATAN2(y, x)
pub fn fn_atan2(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let y = number_arg(args, 0, "ATAN2")?;
    let x = number_arg(args, 1, "ATAN2")?;
    Ok(Value::Number(y.atan2(x)))
}

pub fn fn_cos(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "COS", f64::cos)
}

pub fn fn_sin(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "SIN", f64::sin)
}

pub fn fn_tan(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "TAN", f64::tan)
}

pub fn fn_exp(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "EXP", f64::exp)
}

fn positive(args: &[Thunk<'_>], name: &str) -> FormulaResult<f64> {
    let n = number_arg(args, 0, name)?;
    if n <= 0.0 {
        return Err(FormulaError::argument(format!(
            "Argument 1 of {} must be a positive number",
            name
        )));
    }
    Ok(n)
}

/// LN(n), natural logarithm
pub fn fn_ln(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::Number(positive(args, "LN")?.ln()))
}

/// LOG(n), base 10
pub fn fn_log(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::Number(positive(args, "LOG")?.log10()))
}

pub fn fn_sqrt(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let n = number_arg(args, 0, "SQRT")?;
    if n < 0.0 {
        return Err(FormulaError::argument(
            "Argument 1 of SQRT must be a non-negative number",
        ));
    }
    Ok(Value::Number(n.sqrt()))
}

fn extreme(args: &[Thunk<'_>], name: &str, pick: fn(f64, f64) -> f64) -> FormulaResult<Value> {
    let mut result: Option<f64> = None;
    for i in 0..args.len() {
        let n = number_arg(args, i, name)?;
        result = Some(match result {
            // NaN poisons the result
            Some(acc) if acc.is_nan() || n.is_nan() => f64::NAN,
            Some(acc) => pick(acc, n),
            None => n,
        });
    }
    result
        .map(Value::Number)
        .ok_or(FormulaError::NotEnoughArguments { actual: 0, min: 1 })
}

pub fn fn_max(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    extreme(args, "MAX", f64::max)
}

pub fn fn_min(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    extreme(args, "MIN", f64::min)
}

/// MOD(number, divisor), sign follows the dividend
pub fn fn_mod(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let number = number_arg(args, 0, "MOD")?;
    let divisor = number_arg(args, 1, "MOD")?;
    if divisor == 0.0 {
        return Err(FormulaError::argument("Argument 2 of MOD cannot be zero"));
    }
    Ok(Value::Number(number % divisor))
}

pub fn fn_pi(_args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

/// ROUND(number, digits), half away from zero
///
/// Negative digit counts round to the left of the decimal point.
pub fn fn_round(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let number = number_arg(args, 0, "ROUND")?;
    let digits = integer_arg(args, 1, "ROUND")?;
    Ok(Value::Number(scaled(number, digits, f64::round)))
}

/// TRUNC(number, digits?), toward zero
pub fn fn_trunc(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let number = number_arg(args, 0, "TRUNC")?;
    let digits = if args.len() > 1 {
        integer_arg(args, 1, "TRUNC")?
    } else {
        0
    };
    Ok(Value::Number(scaled(number, digits, f64::trunc)))
}

fn scaled(number: f64, digits: i64, op: fn(f64) -> f64) -> f64 {
    let exp = digits.clamp(-308, 308) as i32;
    let factor = 10f64.powi(exp.abs());
    match exp {
        0 => op(number),
        e if e > 0 => {
            let shifted = number * factor;
            // Already exact at this precision
            if !shifted.is_finite() {
                return number;
            }
            op(shifted) / factor
        }
        _ => op(number / factor) * factor,
    }
}

pub fn fn_floor(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "FLOOR", f64::floor)
}

pub fn fn_ceiling(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "CEILING", f64::ceil)
}

pub fn fn_mfloor(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "MFLOOR", f64::floor)
}

pub fn fn_mceiling(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    unary(args, "MCEILING", f64::ceil)
}
