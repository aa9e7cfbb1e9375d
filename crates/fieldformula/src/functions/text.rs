//! Text functions
//!
//! Positions and lengths count characters and are 1-based, as formula
//! authors write them.

use super::{arg, non_negative_integer_arg, number_arg, positive_integer_arg, string_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Thunk;
use crate::value::{format_date, format_number, Value};
use lazy_regex::regex_is_match;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters `URLENCODE` leaves alone besides ASCII alphanumerics
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const CASESAFE_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";

/// Longest string LPAD and RPAD will build
const MAX_PADDED_LENGTH: usize = 32_767;

/// Byte offset of the `index`-th character, or `text.len()` past the end
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map_or(text.len(), |(offset, _)| offset)
}

pub fn fn_len(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "LEN")?;
    Ok(Value::Number(text.chars().count() as f64))
}

/// TEXT(value), numbers as the language prints them, dates as ISO 8601
pub fn fn_text(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    match arg(args, 0)? {
        Value::Number(n) => Ok(Value::String(format_number(n))),
        Value::Date(d) => Ok(Value::String(format_date(&d))),
        _ => Err(FormulaError::type_mismatch(
            "Argument 1 of TEXT must be a number",
        )),
    }
}

pub fn fn_upper(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(string_arg(args, 0, "UPPER")?.to_uppercase()))
}

pub fn fn_lower(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(string_arg(args, 0, "LOWER")?.to_lowercase()))
}

pub fn fn_trim(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(string_arg(args, 0, "TRIM")?.trim().to_string()))
}

/// LEFT(text, n)
pub fn fn_left(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "LEFT")?;
    let n = non_negative_integer_arg(args, 1, "LEFT")?;
    Ok(Value::String(text.chars().take(n).collect()))
}

/// RIGHT(text, n)
pub fn fn_right(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "RIGHT")?;
    let n = non_negative_integer_arg(args, 1, "RIGHT")?;
    let skip = text.chars().count().saturating_sub(n);
    Ok(Value::String(text.chars().skip(skip).collect()))
}

/// MID(text, start, count)
pub fn fn_mid(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "MID")?;
    let start = positive_integer_arg(args, 1, "MID")?;
    let count = non_negative_integer_arg(args, 2, "MID")?;
    Ok(Value::String(text.chars().skip(start - 1).take(count).collect()))
}

/// FIND(search, text, start?)
///
/// 1-based position of the first match at or after `start`, 0 when absent.
pub fn fn_find(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let search = string_arg(args, 0, "FIND")?;
    let text = string_arg(args, 1, "FIND")?;
    let start = if args.len() > 2 {
        positive_integer_arg(args, 2, "FIND")?
    } else {
        1
    };

    if start > text.chars().count() {
        return Ok(Value::Number(0.0));
    }

    let from = byte_offset(&text, start - 1);
    let position = text[from..]
        .find(search.as_str())
        .map_or(0, |found| text[..from + found].chars().count() + 1);
    Ok(Value::Number(position as f64))
}

pub fn fn_contains(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "CONTAINS")?;
    let needle = string_arg(args, 1, "CONTAINS")?;
    Ok(Value::Boolean(text.contains(needle.as_str())))
}

pub fn fn_begins(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "BEGINS")?;
    let prefix = string_arg(args, 1, "BEGINS")?;
    Ok(Value::Boolean(text.starts_with(prefix.as_str())))
}

/// SUBSTITUTE(text, old, new, occurrence?)
///
/// Without an occurrence every match is replaced. An occurrence that is not
/// a positive integer leaves the text alone.
pub fn fn_substitute(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "SUBSTITUTE")?;
    let old = string_arg(args, 1, "SUBSTITUTE")?;
    let new = string_arg(args, 2, "SUBSTITUTE")?;

    if old.is_empty() {
        return Ok(Value::String(text));
    }

    if args.len() < 4 {
        return Ok(Value::String(text.replace(old.as_str(), &new)));
    }

    let occurrence = number_arg(args, 3, "SUBSTITUTE")?;
    if occurrence.fract() != 0.0 || occurrence < 1.0 {
        return Ok(Value::String(text));
    }

    let nth = occurrence as usize - 1;
    let result = match text.match_indices(old.as_str()).nth(nth) {
        Some((at, _)) => format!("{}{}{}", &text[..at], new, &text[at + old.len()..]),
        None => text,
    };
    Ok(Value::String(result))
}

fn pad_arguments(args: &[Thunk<'_>], name: &str) -> FormulaResult<(String, usize, String)> {
    let text = string_arg(args, 0, name)?;
    let length = non_negative_integer_arg(args, 1, name)?;
    if length > MAX_PADDED_LENGTH {
        return Err(FormulaError::argument(format!(
            "Argument 2 of {} is too large",
            name
        )));
    }
    let pad = if args.len() > 2 {
        string_arg(args, 2, name)?
    } else {
        String::new()
    };
    let pad = if pad.is_empty() { " ".to_string() } else { pad };
    Ok((text, length, pad))
}

/// Pad and text laid out to exactly `length` characters, text truncated
/// when it is already long enough
fn pad(text: &str, length: usize, pad: &str, left: bool) -> String {
    let text_len = text.chars().count();
    if text_len >= length {
        return text.chars().take(length).collect();
    }

    let fill: String = pad.chars().cycle().take(length - text_len).collect();
    if left {
        fill + text
    } else {
        format!("{}{}", text, fill)
    }
}

/// LPAD(text, length, pad?)
pub fn fn_lpad(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let (text, length, padding) = pad_arguments(args, "LPAD")?;
    Ok(Value::String(pad(&text, length, &padding, true)))
}

/// RPAD(text, length, pad?)
pub fn fn_rpad(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let (text, length, padding) = pad_arguments(args, "RPAD")?;
    Ok(Value::String(pad(&text, length, &padding, false)))
}

pub fn fn_reverse(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(string_arg(args, 0, "REVERSE")?.chars().rev().collect()))
}

/// INITCAP(text), first letter of each whitespace-separated word upper case
pub fn fn_initcap(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "INITCAP")?.to_lowercase();
    let mut result = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if word_start && !c.is_whitespace() {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
        word_start = c.is_whitespace();
    }
    Ok(Value::String(result))
}

fn html_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn js_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }
    out
}

pub fn fn_htmlencode(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(html_encode(&string_arg(args, 0, "HTMLENCODE")?)))
}

pub fn fn_jsencode(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String(js_encode(&string_arg(args, 0, "JSENCODE")?)))
}

/// JSINHTMLENCODE(text), HTML-encoded first, then JS-escaped
pub fn fn_jsinhtmlencode(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "JSINHTMLENCODE")?;
    Ok(Value::String(js_encode(&html_encode(&text))))
}

/// URLENCODE(text), percent-encoding UTF-8 bytes like a URI component
pub fn fn_urlencode(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "URLENCODE")?;
    Ok(Value::String(
        utf8_percent_encode(&text, URL_COMPONENT).to_string(),
    ))
}

/// VALUE(text)
///
/// Blank text is Null. Anything that is not a plain decimal number (or a
/// number written exactly as TEXT would print it) is NaN rather than an
/// error.
pub fn fn_value(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "VALUE")?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let decimal = regex_is_match!(r"^-?((\d+(\.\d*)?)|(\.\d+))$", trimmed);
    let number = match trimmed.parse::<f64>() {
        Ok(n) if decimal || format_number(n) == trimmed => n,
        _ => f64::NAN,
    };
    Ok(Value::Number(number))
}

/// ASCII(text), code point of the first character, Null for empty text
pub fn fn_ascii(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "ASCII")?;
    Ok(text
        .chars()
        .next()
        .map_or(Value::Null, |c| Value::Number(u32::from(c) as f64)))
}

pub fn fn_br(_args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(Value::String("\n".to_string()))
}

/// HYPERLINK(url, name, target?)
pub fn fn_hyperlink(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let url = string_arg(args, 0, "HYPERLINK")?;
    let name = string_arg(args, 1, "HYPERLINK")?;
    let target = if args.len() > 2 {
        format!(" target=\"{}\"", string_arg(args, 2, "HYPERLINK")?)
    } else {
        String::new()
    };
    Ok(Value::String(format!(
        "<a href=\"{}\"{}>{}</a>",
        url, target, name
    )))
}

/// IMAGE(url, alt, height?, width?)
pub fn fn_image(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let url = string_arg(args, 0, "IMAGE")?;
    let alt = string_arg(args, 1, "IMAGE")?;

    let mut tag = format!("<img src=\"{}\" alt=\"{}\"", url, alt);
    if args.len() > 2 {
        let height = number_arg(args, 2, "IMAGE")?;
        tag.push_str(&format!(" height=\"{}\"", format_number(height)));
    }
    if args.len() > 3 {
        let width = number_arg(args, 3, "IMAGE")?;
        tag.push_str(&format!(" width=\"{}\"", format_number(width)));
    }
    tag.push('>');
    Ok(Value::String(tag))
}

/// REGEX(text, pattern), true when the pattern matches anywhere in the text
pub fn fn_regex(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let text = string_arg(args, 0, "REGEX")?;
    let pattern = string_arg(args, 1, "REGEX")?;

    let re = regex::Regex::new(&pattern).map_err(|e| {
        FormulaError::InvalidRegex(format!(
            "Invalid regex pattern provided to REGEX function: {}",
            e
        ))
    })?;
    Ok(Value::Boolean(re.is_match(&text)))
}

/// CASESAFEID(id), 15-character record id extended with its
/// 3-character case checksum
pub fn fn_casesafeid(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let id = string_arg(args, 0, "CASESAFEID")?;
    let chars: Vec<char> = id.chars().collect();
    if chars.len() != 15 {
        return Err(FormulaError::argument(
            "Argument 1 of CASESAFEID must be a 15-character string",
        ));
    }

    let mut result = id;
    for chunk in chars.chunks(5) {
        // First character of the chunk is the lowest bit
        let index = chunk
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_ascii_uppercase())
            .fold(0usize, |acc, (bit, _)| acc | (1 << bit));
        result.push(CASESAFE_ALPHABET[index] as char);
    }
    Ok(Value::String(result))
}

/// INCLUDES(picklist, value), membership in a `;`-separated list
pub fn fn_includes(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let list = string_arg(args, 0, "INCLUDES")?;
    let value = string_arg(args, 1, "INCLUDES")?;
    Ok(Value::Boolean(list.split(';').any(|item| item == value)))
}

/// ISPICKVAL(field, value)
///
/// An empty field (Null or Undefined) never matches.
pub fn fn_ispickval(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let field = match arg(args, 0)? {
        Value::String(s) => Some(s),
        Value::Null | Value::Undefined => None,
        _ => {
            return Err(FormulaError::type_mismatch(
                "Argument 1 of ISPICKVAL must be a string",
            ))
        }
    };
    let value = string_arg(args, 1, "ISPICKVAL")?;
    Ok(Value::Boolean(field.as_deref() == Some(value.as_str())))
}
