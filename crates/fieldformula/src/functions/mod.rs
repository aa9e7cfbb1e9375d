//! Built-in functions and the per-call function registry

pub mod date;
pub mod logical;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Thunk;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Built-in function signature
///
/// Arguments arrive unevaluated; the function pulls the ones it needs.
pub type FunctionImpl = fn(&[Thunk<'_>]) -> FormulaResult<Value>;

/// Caller-supplied function
pub type CustomFunction = Arc<dyn Fn(&[Thunk<'_>]) -> FormulaResult<Value> + Send + Sync>;

/// Built-in function definition
pub struct FunctionDef {
    /// Function name, matched exactly
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Result depends on the wall clock
    pub volatile: bool,
}

impl FunctionDef {
    pub fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
            volatile: false,
        }
    }

    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }
}

/// Table of built-in functions
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

/// Global built-in table (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared, immutable table of built-in functions
pub fn builtins() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_text_functions();
        registry.register_date_functions();

        registry
    }

    /// Look up a function by exact name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Whether calling `name` may give a different result each time
    pub fn is_volatile(&self, name: &str) -> bool {
        self.get(name).map_or(false, |def| def.volatile)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef::new("IF", 2, Some(3), logical::fn_if));
        self.register(FunctionDef::new("CASE", 3, None, logical::fn_case));
        self.register(FunctionDef::new("AND", 1, None, logical::fn_and));
        self.register(FunctionDef::new("OR", 1, None, logical::fn_or));
        self.register(FunctionDef::new("NOT", 1, Some(1), logical::fn_not));
        self.register(FunctionDef::new("ISBLANK", 0, Some(1), logical::fn_isblank));
        self.register(FunctionDef::new("ISNULL", 1, Some(1), logical::fn_isnull));
        self.register(FunctionDef::new("NULLVALUE", 2, Some(2), logical::fn_nullvalue));
        self.register(FunctionDef::new("BLANKVALUE", 2, None, logical::fn_blankvalue));
        self.register(FunctionDef::new("ISNUMBER", 1, Some(1), logical::fn_isnumber));
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::new("ABS", 1, Some(1), math::fn_abs));
        self.register(FunctionDef::new("ACOS", 1, Some(1), math::fn_acos));
        self.register(FunctionDef::new("ASIN", 1, Some(1), math::fn_asin));
        self.register(FunctionDef::new("ATAN", 1, Some(1), math::fn_atan));
        self.register(FunctionDef::new("ATAN2", 2, Some(2), math::fn_atan2));
        self.register(FunctionDef::new("COS", 1, Some(1), math::fn_cos));
        self.register(FunctionDef::new("SIN", 1, Some(1), math::fn_sin));
        self.register(FunctionDef::new("TAN", 1, Some(1), math::fn_tan));
        self.register(FunctionDef::new("EXP", 1, Some(1), math::fn_exp));
        self.register(FunctionDef::new("LN", 1, Some(1), math::fn_ln));
        self.register(FunctionDef::new("LOG", 1, Some(1), math::fn_log));
        self.register(FunctionDef::new("SQRT", 1, Some(1), math::fn_sqrt));
        self.register(FunctionDef::new("MAX", 1, None, math::fn_max));
        self.register(FunctionDef::new("MIN", 1, None, math::fn_min));
        self.register(FunctionDef::new("MOD", 2, Some(2), math::fn_mod));
        self.register(FunctionDef::new("PI", 0, Some(0), math::fn_pi));
        self.register(FunctionDef::new("ROUND", 2, Some(2), math::fn_round));
        self.register(FunctionDef::new("TRUNC", 1, Some(2), math::fn_trunc));
        self.register(FunctionDef::new("FLOOR", 1, Some(1), math::fn_floor));
        self.register(FunctionDef::new("CEILING", 1, Some(1), math::fn_ceiling));
        self.register(FunctionDef::new("MFLOOR", 1, Some(1), math::fn_mfloor));
        self.register(FunctionDef::new("MCEILING", 1, Some(1), math::fn_mceiling));
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef::new("LEN", 1, Some(1), text::fn_len));
        self.register(FunctionDef::new("TEXT", 1, Some(1), text::fn_text));
        self.register(FunctionDef::new("UPPER", 1, Some(1), text::fn_upper));
        self.register(FunctionDef::new("LOWER", 1, Some(1), text::fn_lower));
        self.register(FunctionDef::new("TRIM", 1, Some(1), text::fn_trim));
        self.register(FunctionDef::new("LEFT", 2, Some(2), text::fn_left));
        self.register(FunctionDef::new("RIGHT", 2, Some(2), text::fn_right));
        self.register(FunctionDef::new("MID", 3, Some(3), text::fn_mid));
        self.register(FunctionDef::new("FIND", 2, Some(3), text::fn_find));
        self.register(FunctionDef::new("CONTAINS", 2, Some(2), text::fn_contains));
        self.register(FunctionDef::new("BEGINS", 2, Some(2), text::fn_begins));
        self.register(FunctionDef::new("SUBSTITUTE", 3, Some(4), text::fn_substitute));
        self.register(FunctionDef::new("LPAD", 2, Some(3), text::fn_lpad));
        self.register(FunctionDef::new("RPAD", 2, Some(3), text::fn_rpad));
        self.register(FunctionDef::new("REVERSE", 1, Some(1), text::fn_reverse));
        self.register(FunctionDef::new("INITCAP", 1, Some(1), text::fn_initcap));
        self.register(FunctionDef::new("HTMLENCODE", 1, Some(1), text::fn_htmlencode));
        self.register(FunctionDef::new("JSENCODE", 1, Some(1), text::fn_jsencode));
        self.register(FunctionDef::new("JSINHTMLENCODE", 1, Some(1), text::fn_jsinhtmlencode));
        self.register(FunctionDef::new("URLENCODE", 1, Some(1), text::fn_urlencode));
        self.register(FunctionDef::new("VALUE", 1, Some(1), text::fn_value));
        self.register(FunctionDef::new("ASCII", 1, Some(1), text::fn_ascii));
        self.register(FunctionDef::new("BR", 0, Some(0), text::fn_br));
        self.register(FunctionDef::new("HYPERLINK", 2, Some(3), text::fn_hyperlink));
        self.register(FunctionDef::new("IMAGE", 2, Some(4), text::fn_image));
        self.register(FunctionDef::new("REGEX", 2, Some(2), text::fn_regex));
        self.register(FunctionDef::new("CASESAFEID", 1, Some(1), text::fn_casesafeid));
        self.register(FunctionDef::new("INCLUDES", 2, Some(2), text::fn_includes));
        self.register(FunctionDef::new("ISPICKVAL", 2, Some(2), text::fn_ispickval));
    }

    fn register_date_functions(&mut self) {
        self.register(FunctionDef::new("DATE", 3, Some(3), date::fn_date));
        self.register(FunctionDef::new("DATEVALUE", 1, Some(1), date::fn_datevalue));
        self.register(FunctionDef::new("DATETIMEVALUE", 1, Some(1), date::fn_datetimevalue));
        self.register(FunctionDef::new("TIMEVALUE", 1, Some(1), date::fn_timevalue));
        self.register(FunctionDef::new("TODAY", 0, Some(0), date::fn_today).volatile());
        self.register(FunctionDef::new("NOW", 0, Some(0), date::fn_now).volatile());
        self.register(FunctionDef::new("TIMENOW", 0, Some(0), date::fn_timenow).volatile());
        self.register(FunctionDef::new("YEAR", 1, Some(1), date::fn_year));
        self.register(FunctionDef::new("MONTH", 1, Some(1), date::fn_month));
        self.register(FunctionDef::new("DAY", 1, Some(1), date::fn_day));
        self.register(FunctionDef::new("DAYOFYEAR", 1, Some(1), date::fn_dayofyear));
        self.register(FunctionDef::new("HOUR", 1, Some(1), date::fn_hour));
        self.register(FunctionDef::new("MINUTE", 1, Some(1), date::fn_minute));
        self.register(FunctionDef::new("SECOND", 1, Some(1), date::fn_second));
        self.register(FunctionDef::new("MILLISECOND", 1, Some(1), date::fn_millisecond));
        self.register(FunctionDef::new("WEEKDAY", 1, Some(1), date::fn_weekday));
        self.register(FunctionDef::new("ISOWEEK", 1, Some(1), date::fn_isoweek));
        self.register(FunctionDef::new("ISOYEAR", 1, Some(1), date::fn_isoyear));
        self.register(FunctionDef::new("ADDMONTHS", 2, Some(2), date::fn_addmonths));
        self.register(FunctionDef::new("UNIXTIMESTAMP", 1, Some(1), date::fn_unixtimestamp));
        self.register(FunctionDef::new("FORMATDURATION", 1, Some(1), date::fn_formatduration));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluation options
///
/// Caller-supplied functions take precedence over built-ins of the same
/// name. `Options::default()` means built-ins only.
#[derive(Clone, Default)]
pub struct Options {
    functions: HashMap<String, CustomFunction>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override a function
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Thunk<'_>]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn function(&self, name: &str) -> Option<&CustomFunction> {
        self.functions.get(name)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Options").field("functions", &names).finish()
    }
}

/// Something a `Function` node can call
pub enum Callable<'r> {
    Custom(&'r CustomFunction),
    Builtin(&'r FunctionDef),
}

/// Built-ins layered under the caller's functions for one evaluation
pub struct Registry<'a> {
    builtins: &'static FunctionRegistry,
    options: &'a Options,
}

impl<'a> Registry<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            builtins: builtins(),
            options,
        }
    }

    pub fn get(&self, name: &str) -> Option<Callable<'_>> {
        self.options
            .function(name)
            .map(Callable::Custom)
            .or_else(|| self.builtins.get(name).map(Callable::Builtin))
    }
}

/// Check an argument count against optional bounds
///
/// Returns the arguments unchanged so calls can be chained.
pub fn validate_args<'t, 'e>(
    args: &'t [Thunk<'e>],
    min: Option<usize>,
    max: Option<usize>,
) -> FormulaResult<&'t [Thunk<'e>]> {
    if let Some(min) = min {
        if args.len() < min {
            return Err(FormulaError::NotEnoughArguments {
                actual: args.len(),
                min,
            });
        }
    }
    if let Some(max) = max {
        if args.len() > max {
            return Err(FormulaError::TooManyArguments {
                actual: args.len(),
                max,
            });
        }
    }
    Ok(args)
}

// === Argument helpers ===
//
// `index` is zero-based; messages use the one-based position.

/// Evaluate argument `index`, failing like a short call when it is missing
pub(crate) fn arg(args: &[Thunk<'_>], index: usize) -> FormulaResult<Value> {
    match args.get(index) {
        Some(thunk) => thunk.eval(),
        None => Err(FormulaError::NotEnoughArguments {
            actual: args.len(),
            min: index + 1,
        }),
    }
}

pub(crate) fn number_arg(args: &[Thunk<'_>], index: usize, name: &str) -> FormulaResult<f64> {
    match arg(args, index)? {
        Value::Number(n) => Ok(n),
        _ => Err(FormulaError::type_mismatch(format!(
            "Argument {} of {} must be a number",
            index + 1,
            name
        ))),
    }
}

pub(crate) fn string_arg(args: &[Thunk<'_>], index: usize, name: &str) -> FormulaResult<String> {
    match arg(args, index)? {
        Value::String(s) => Ok(s),
        _ => Err(FormulaError::type_mismatch(format!(
            "Argument {} of {} must be a string",
            index + 1,
            name
        ))),
    }
}

pub(crate) fn boolean_arg(args: &[Thunk<'_>], index: usize, name: &str) -> FormulaResult<bool> {
    match arg(args, index)? {
        Value::Boolean(b) => Ok(b),
        _ => Err(FormulaError::type_mismatch(format!(
            "Argument {} of {} must be a boolean",
            index + 1,
            name
        ))),
    }
}

/// A number with no fractional part
pub(crate) fn integer_arg(args: &[Thunk<'_>], index: usize, name: &str) -> FormulaResult<i64> {
    let n = number_arg(args, index, name)?;
    if !is_integer(n) {
        return Err(FormulaError::type_mismatch(format!(
            "Argument {} of {} must be an integer",
            index + 1,
            name
        )));
    }
    Ok(n as i64)
}

pub(crate) fn non_negative_integer_arg(
    args: &[Thunk<'_>],
    index: usize,
    name: &str,
) -> FormulaResult<usize> {
    let n = number_arg(args, index, name)?;
    if !is_integer(n) || n < 0.0 {
        return Err(FormulaError::argument(format!(
            "Argument {} of {} must be a non-negative integer",
            index + 1,
            name
        )));
    }
    Ok(n as usize)
}

pub(crate) fn positive_integer_arg(
    args: &[Thunk<'_>],
    index: usize,
    name: &str,
) -> FormulaResult<usize> {
    let n = number_arg(args, index, name)?;
    if !is_integer(n) || n < 1.0 {
        return Err(FormulaError::argument(format!(
            "Argument {} of {} must be a positive integer",
            index + 1,
            name
        )));
    }
    Ok(n as usize)
}

pub(crate) fn is_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}
