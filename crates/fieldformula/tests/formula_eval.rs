//! End-to-end tests through the public API

use fieldformula::{
    builtins, extract_variables, formula_eval, formula_eval_value, validate_args, Context,
    ErrorKind, FormulaError, FormulaResult, Options, Thunk, Value,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn eval(formula: &str) -> FormulaResult<Value> {
    formula_eval(formula, &Context::new(), &Options::default())
}

fn eval_with(formula: &str, context: serde_json::Value) -> FormulaResult<Value> {
    let context = Context::from_json(&context).unwrap();
    formula_eval(formula, &context, &Options::default())
}

/// Context that fails the whole evaluation if `Boom` is ever looked up
fn tripwire() -> Context {
    Context::dynamic(|path| match path {
        ["Boom"] => Err(FormulaError::evaluation("Boom must not be evaluated")),
        ["Flag"] => Ok(Value::Boolean(true)),
        _ => Ok(Value::Undefined),
    })
}

#[test]
fn test_scenario_addition() {
    assert_eq!(eval("11 + 1").unwrap(), Value::from(12));
}

#[test]
fn test_scenario_if_over_context() {
    assert_eq!(
        eval_with("IF(Amount > 1000, \"High\", \"Low\")", json!({ "Amount": 1500 })).unwrap(),
        Value::from("High")
    );
    assert_eq!(
        eval_with("IF(Amount > 1000, \"High\", \"Low\")", json!({ "Amount": 10 })).unwrap(),
        Value::from("Low")
    );
}

#[test]
fn test_scenario_concatenation() {
    let result = eval_with(
        "FirstName & \" \" & LastName",
        json!({ "FirstName": "John", "LastName": "Doe" }),
    )
    .unwrap();
    assert_eq!(result, Value::from("John Doe"));
}

#[test]
fn test_scenario_case() {
    assert_eq!(
        eval("CASE(3, 1, \"One\", 2, \"Two\", 3, \"Three\", \"Other\")").unwrap(),
        Value::from("Three")
    );
}

#[test]
fn test_scenario_blankvalue() {
    assert_eq!(eval("BLANKVALUE(\"\", \"Default\")").unwrap(), Value::from("Default"));
    assert_eq!(eval("BLANKVALUE(0, \"Default\")").unwrap(), Value::from(0));
}

#[test]
fn test_scenario_round_and_mod() {
    assert_eq!(eval("ROUND(3.14159, 2)").unwrap(), Value::from(3.14));
    let err = eval("MOD(10, 0)").unwrap_err();
    assert_eq!(err.root_cause().to_string(), "Argument 2 of MOD cannot be zero");
    assert_eq!(err.to_string(), "Argument 2 of MOD cannot be zero in MOD(10, 0)");
}

#[test]
fn test_nested_call_errors_carry_every_snippet() {
    let err = eval("ROUND(ABS(\"x\"), 2)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Argument 1 of ABS must be a number in ABS(\"x\") in ROUND(ABS(\"x\"), 2)"
    );
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.root_cause().kind(), ErrorKind::TypeMismatch);
    assert_eq!(
        err.root_cause(),
        &FormulaError::TypeMismatch("Argument 1 of ABS must be a number".to_string())
    );

    match &err {
        FormulaError::InCall { source, snippet } => {
            assert_eq!(snippet, "ROUND(ABS(\"x\"), 2)");
            assert_eq!(source.to_string(), "Argument 1 of ABS must be a number in ABS(\"x\")");
        }
        other => panic!("expected a call-site error, got {:?}", other),
    }
}

#[test]
fn test_nested_variables() {
    let context = json!({ "Account": { "Owner": { "Name": "Ada" } }, "Amount": 5 });
    assert_eq!(
        eval_with("Account.Owner.Name & \"!\"", context.clone()).unwrap(),
        Value::from("Ada!")
    );
    assert_eq!(eval_with("Account.Missing.Name", context.clone()).unwrap(), Value::Undefined);
    assert_eq!(
        eval_with("ISBLANK(Account.Missing)", context).unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_short_circuit_never_touches_untaken_arguments() {
    let ctx = tripwire();
    let opts = Options::default();
    for formula in [
        "IF(false, Boom, 1)",
        "AND(false, Boom)",
        "OR(true, Boom)",
        "false && Boom",
        "true || Boom",
        "BLANKVALUE(\"x\", Boom)",
        "NULLVALUE(1, Boom)",
        "CASE(1, 1, 2, Boom, Boom)",
    ] {
        assert!(formula_eval(formula, &ctx, &opts).is_ok(), "{}", formula);
    }
    assert!(formula_eval("IF(Flag, Boom, 1)", &ctx, &opts).is_err());
}

#[test]
fn test_infix_logic_keeps_operand_values() {
    assert_eq!(eval("1 && \"a\"").unwrap(), Value::from("a"));
    assert_eq!(eval("null || 5").unwrap(), Value::from(5));
    assert_eq!(eval("0 AND false").unwrap(), Value::Boolean(false));
    assert_eq!(eval("undefined OR null").unwrap(), Value::Null);
}

#[test]
fn test_arity_law_for_every_builtin() {
    let registry = builtins();
    for name in registry.names() {
        let def = registry.get(name).unwrap();
        let call = |count: usize| format!("{}({})", name, vec!["1"; count].join(", "));

        if def.min_args > 0 {
            let formula = call(def.min_args - 1);
            let err = eval(&formula).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Arity, "{}", formula);
            assert_eq!(
                err.root_cause(),
                &FormulaError::NotEnoughArguments {
                    actual: def.min_args - 1,
                    min: def.min_args
                },
                "{}",
                formula
            );
        }

        if let Some(max) = def.max_args {
            let formula = call(max + 1);
            let err = eval(&formula).unwrap_err();
            assert_eq!(
                err.root_cause(),
                &FormulaError::TooManyArguments {
                    actual: max + 1,
                    max
                },
                "{}",
                formula
            );
        }
    }
}

#[test]
fn test_unknown_function() {
    let err = eval("NOPE(1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFunction);
    assert!(err.to_string().starts_with("Unknown function: NOPE"));
}

#[test]
fn test_juxtaposed_operands_are_unknown_operator() {
    let err = eval("12 12").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownOperator);
}

#[test]
fn test_blank_law_examples() {
    for (formula, expected) in [
        ("ISBLANK(undefined)", true),
        ("ISBLANK(null)", true),
        ("ISBLANK(\"\")", true),
        ("ISBLANK(\"   \")", true),
        ("ISBLANK(0)", false),
        ("ISBLANK(false)", false),
        ("ISBLANK(\"x\")", false),
        ("ISBLANK(DATE(2024, 1, 1))", false),
    ] {
        assert_eq!(eval(formula).unwrap(), Value::Boolean(expected), "{}", formula);
    }
}

#[test]
fn test_custom_functions_receive_thunks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let options = Options::new().with_function("TWICE", move |args: &[Thunk<'_>]| {
        let args = validate_args(args, Some(1), Some(1))?;
        counter.fetch_add(1, Ordering::SeqCst);
        let first = args[0].eval()?;
        let second = args[0].eval()?;
        Ok(Value::String(format!("{}{}", first, second)))
    });

    let result = formula_eval("TWICE(\"ab\")", &Context::new(), &options).unwrap();
    assert_eq!(result, Value::from("abab"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let err = formula_eval("TWICE()", &Context::new(), &options).unwrap_err();
    assert_eq!(err.to_string(), "Not enough arguments 0/1 in TWICE()");
}

#[test]
fn test_host_functions_left_to_options() {
    assert_eq!(eval("ISNEW()").unwrap_err().kind(), ErrorKind::UnknownFunction);

    let options = Options::new().with_function("ISNEW", |args: &[Thunk<'_>]| {
        validate_args(args, None, Some(0))?;
        Ok(Value::Boolean(false))
    });
    assert_eq!(
        formula_eval("ISNEW()", &Context::new(), &options).unwrap(),
        Value::Boolean(false)
    );
}

#[test]
fn test_formula_eval_value() {
    let ctx = Context::new();
    let opts = Options::default();
    let err = formula_eval_value(&json!(["1 + 1"]), &ctx, &opts).unwrap_err();
    assert_eq!(err.to_string(), "Formula should be a string");
    assert_eq!(
        formula_eval_value(&json!("UPPER(\"a\")"), &ctx, &opts).unwrap(),
        Value::from("A")
    );
}

#[test]
fn test_extract_variables() {
    assert_eq!(
        extract_variables("IF(Account.Name = \"x\", Amount, Amount * 2)").unwrap(),
        vec!["Account.Name", "Amount", "Amount"]
    );
    assert_eq!(extract_variables("1 + 2").unwrap(), Vec::<String>::new());
}

#[test]
fn test_value_serializes_to_json() {
    let value = eval("DATE(2024, 1, 15)").unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!("2024-01-15T00:00:00.000Z")
    );
    assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
    assert_eq!(serde_json::to_value(Value::from("x")).unwrap(), json!("x"));
}

proptest! {
    #[test]
    fn prop_round_of_trunc_is_stable(x in -1.0e6f64..1.0e6) {
        let context = Context::from_fields([("x", Value::from(x))]);
        let opts = Options::default();
        let truncated = formula_eval("TRUNC(x, 2)", &context, &opts).unwrap();
        let rounded = formula_eval("ROUND(TRUNC(x, 2), 2)", &context, &opts).unwrap();
        prop_assert_eq!(rounded, truncated);
    }

    #[test]
    fn prop_isblank_matches_whitespace_only(s in "[ \\ta-c]{0,6}") {
        let context = Context::from_fields([("s", Value::from(s.as_str()))]);
        let result = formula_eval("ISBLANK(s)", &context, &Options::default()).unwrap();
        prop_assert_eq!(result, Value::Boolean(s.trim().is_empty()));
    }

    #[test]
    fn prop_evaluation_is_deterministic(a in 0u32..1000, b in 1u32..1000, s in "[a-z ]{0,10}") {
        let formula = format!(
            "IF({a} > {b}, LEN(\"{s}\") * {a}, UPPER(\"{s}\") & TEXT({b} / 3))"
        );
        let first = eval(&formula).unwrap();
        let second = eval(&formula).unwrap();
        prop_assert_eq!(first, second);
    }
}
