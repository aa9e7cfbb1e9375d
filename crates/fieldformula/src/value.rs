//! Formula values

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Value produced by evaluating a formula or one of its sub-expressions
///
/// `Null` and `Undefined` are both blank but never equal to each other.
/// Dates only come out of library functions; the grammar has no date
/// literal.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    #[default]
    Undefined,
    Date(DateTime<Utc>),
}

impl Value {
    /// Undefined, Null, or a string with nothing but whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Null or Undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Truthiness used by the infix logical operators
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null | Value::Undefined)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Date(_) => "date",
        }
    }
}

/// Render a number the way the formula language prints numbers
///
/// Integral values print without a fraction, magnitudes outside
/// `[1e-6, 1e21)` switch to exponent form with an explicit sign.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return s.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    let s = format!("{:e}", n);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// ISO-8601 rendering with millisecond precision and a `Z` suffix
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
            Value::Undefined => f.write_str("undefined"),
            Value::Date(d) => f.write_str(&format_date(d)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Null | Value::Undefined => serializer.serialize_unit(),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_blank() {
        assert!(Value::Undefined.is_blank());
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::from(" \t ").is_blank());
        assert!(!Value::from("a").is_blank());
        assert!(!Value::from(0).is_blank());
        assert!(!Value::from(false).is_blank());
    }

    #[test]
    fn test_truthy() {
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::from(true).is_truthy());
    }

    #[test]
    fn test_null_and_undefined_differ() {
        assert_ne!(Value::Null, Value::Undefined);
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_display_date() {
        let d = Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 0).unwrap();
        assert_eq!(Value::from(d).to_string(), "2024-02-29T13:05:00.000Z");
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(vec![
            Value::from(1.5),
            Value::from("x"),
            Value::Null,
            Value::from(true),
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!([1.5, "x", null, true]));
    }
}
