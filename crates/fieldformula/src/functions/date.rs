//! Date and time functions
//!
//! Everything works in UTC. Date-valued arguments may be dates, ISO-8601
//! text or Unix seconds; anything unparseable makes the function return
//! Null instead of failing.

use super::{arg, integer_arg, is_integer, number_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Thunk;
use crate::value::Value;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use lazy_regex::{regex_captures, regex_is_match};

const DAY_MS: i64 = 86_400_000;

/// Largest instant distance from the epoch a date may have, in milliseconds
const MAX_MS: f64 = 8.64e15;

/// Interpret a value as an instant, if it looks like one
pub(crate) fn parse_date_expression(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date_text(s),
        Value::Number(n) => from_unix_seconds(*n),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if regex_is_match!(r"^\d{4}-\d{2}-\d{2}$", text) {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    if let Some((_, _, offset)) = regex_captures!(
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$",
        text
    ) {
        // Without an offset the time is taken as UTC
        return if offset.is_empty() {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        } else {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        };
    }

    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn from_unix_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    let ms = (seconds * 1000.0).trunc();
    if !ms.is_finite() || ms.abs() > MAX_MS {
        return None;
    }
    from_millis(ms as i64)
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Same day at 00:00:00.000
fn midnight(d: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    let ms = d.timestamp_millis();
    from_millis(ms - ms.rem_euclid(DAY_MS))
}

/// Same time of day on 1970-01-01
fn time_of_day(d: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    from_millis(d.timestamp_millis().rem_euclid(DAY_MS))
}

fn date_value(date: Option<DateTime<Utc>>) -> Value {
    date.map_or(Value::Null, Value::Date)
}

/// Apply `part` to the date argument, Null when it does not parse
fn date_part(args: &[Thunk<'_>], part: fn(&DateTime<Utc>) -> f64) -> FormulaResult<Value> {
    let value = arg(args, 0)?;
    Ok(parse_date_expression(&value).map_or(Value::Null, |d| Value::Number(part(&d))))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        2 => 28,
        _ => 31,
    }
}

/// DATE(year, month, day)
pub fn fn_date(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let mut parts = [0i64; 3];
    for (i, part) in parts.iter_mut().enumerate() {
        let n = number_arg(args, i, "DATE")?;
        if !is_integer(n) {
            return Err(FormulaError::type_mismatch(format!(
                "Argument {} of DATE must be an integer number",
                i + 1
            )));
        }
        *part = n as i64;
    }
    let [year, month, day] = parts;

    if !(1..=12).contains(&month) {
        return Err(FormulaError::argument(
            "Argument 2 of DATE (month) must be between 1 and 12",
        ));
    }
    if !(1..=31).contains(&day) {
        return Err(FormulaError::argument(
            "Argument 3 of DATE (day) must be between 1 and 31",
        ));
    }

    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month as u32, day as u32))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Value::Date(Utc.from_utc_datetime(&naive)))
        .ok_or_else(|| FormulaError::argument("Invalid date components for DATE function"))
}

/// DATEVALUE(expr), the date at midnight UTC
pub fn fn_datevalue(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let value = arg(args, 0)?;
    Ok(date_value(parse_date_expression(&value).and_then(|d| midnight(&d))))
}

pub fn fn_datetimevalue(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(date_value(parse_date_expression(&arg(args, 0)?)))
}

/// TIMEVALUE(expr)
///
/// Accepts `HH:MM:SS(.sss)` text besides the usual date forms. The result
/// keeps only the time of day, placed on 1970-01-01.
pub fn fn_timevalue(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let value = arg(args, 0)?;

    if let Value::String(text) = &value {
        if let Some((_, h, m, s, _, frac)) =
            regex_captures!(r"^(\d{2}):(\d{2}):(\d{2})(\.(\d{1,3}))?$", text)
        {
            let millis = if frac.is_empty() {
                Some(0)
            } else {
                format!("{:0<3}", frac).parse::<i64>().ok()
            };
            let clock = (h.parse::<i64>(), m.parse::<i64>(), s.parse::<i64>(), millis);
            if let (Ok(h @ 0..=23), Ok(m @ 0..=59), Ok(s @ 0..=59), Some(ms)) = clock {
                let total = ((h * 60 + m) * 60 + s) * 1000 + ms;
                return Ok(date_value(from_millis(total)));
            }
        }
    }

    Ok(date_value(
        parse_date_expression(&value).and_then(|d| time_of_day(&d)),
    ))
}

/// TODAY(), current date at midnight UTC
pub fn fn_today(_args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(date_value(midnight(&Utc::now())))
}

pub fn fn_now(_args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(date_value(from_millis(Utc::now().timestamp_millis())))
}

/// TIMENOW(), the current instant
pub fn fn_timenow(_args: &[Thunk<'_>]) -> FormulaResult<Value> {
    Ok(date_value(from_millis(Utc::now().timestamp_millis())))
}

pub fn fn_year(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.year() as f64)
}

pub fn fn_month(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.month() as f64)
}

pub fn fn_day(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.day() as f64)
}

pub fn fn_dayofyear(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.ordinal() as f64)
}

pub fn fn_hour(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.hour() as f64)
}

pub fn fn_minute(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.minute() as f64)
}

pub fn fn_second(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.second() as f64)
}

pub fn fn_millisecond(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.timestamp_subsec_millis() as f64)
}

/// WEEKDAY(date), 1 for Sunday through 7 for Saturday
pub fn fn_weekday(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| (d.weekday().num_days_from_sunday() + 1) as f64)
}

pub fn fn_isoweek(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.iso_week().week() as f64)
}

pub fn fn_isoyear(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.iso_week().year() as f64)
}

/// ADDMONTHS(date, months)
///
/// The last day of a month maps to the last day of the target month; other
/// days are clamped to the target month's length. Time of day is kept.
pub fn fn_addmonths(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let value = arg(args, 0)?;
    let months = integer_arg(args, 1, "ADDMONTHS")?;

    let Some(date) = parse_date_expression(&value) else {
        return Ok(Value::Null);
    };

    let (year, month, day) = (date.year(), date.month(), date.day());
    let Some(total) = (i64::from(year) * 12 + i64::from(month) - 1).checked_add(months) else {
        return Ok(Value::Null);
    };
    let Ok(target_year) = i32::try_from(total.div_euclid(12)) else {
        return Ok(Value::Null);
    };
    let target_month = total.rem_euclid(12) as u32 + 1;

    let target_last = days_in_month(target_year, target_month);
    let target_day = if day == days_in_month(year, month) {
        target_last
    } else {
        day.min(target_last)
    };

    Ok(date_value(
        NaiveDate::from_ymd_opt(target_year, target_month, target_day)
            .map(|d| Utc.from_utc_datetime(&d.and_time(date.time()))),
    ))
}

/// UNIXTIMESTAMP(date), whole seconds since the epoch
pub fn fn_unixtimestamp(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    date_part(args, |d| d.timestamp() as f64)
}

/// FORMATDURATION(seconds) as `HH:MM:SS`, hours not wrapping at 24
pub fn fn_formatduration(args: &[Thunk<'_>]) -> FormulaResult<Value> {
    let seconds = match arg(args, 0)? {
        Value::Number(n) => n,
        _ => {
            return Err(FormulaError::type_mismatch(
                "Argument 1 of FORMATDURATION must be a number (total seconds)",
            ))
        }
    };
    if seconds.is_nan() || seconds < 0.0 {
        return Err(FormulaError::argument(
            "Argument 1 of FORMATDURATION must be a non-negative number",
        ));
    }

    let total = seconds.floor() as u64;
    Ok(Value::String(format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        total % 3600 / 60,
        total % 60
    )))
}
