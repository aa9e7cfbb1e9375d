//! Formula evaluator
//!
//! Walks a [`ParseTree`] recursively. Function arguments are handed over as
//! [`Thunk`]s so each function decides whether, when and how often an
//! argument gets evaluated.

use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{validate_args, Callable, Options, Registry};
use crate::value::Value;
use fieldformula_syntax::{NodeId, NodeKind, ParseNode, ParseTree};
use tracing::trace;

/// Deferred evaluation of one function argument
///
/// Not memoized: every call to [`Thunk::eval`] walks the argument again.
#[derive(Clone, Copy)]
pub struct Thunk<'e> {
    evaluator: &'e Evaluator<'e>,
    node: NodeId,
}

impl<'e> Thunk<'e> {
    /// Evaluate the argument
    pub fn eval(&self) -> FormulaResult<Value> {
        self.evaluator.evaluate_node(self.node)
    }

    /// Source text of the argument
    pub fn source_text(&self) -> &'e str {
        self.evaluator.text(self.node)
    }
}

impl std::fmt::Debug for Thunk<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Thunk").field(&self.source_text()).finish()
    }
}

/// Evaluate a parse tree against a context
///
/// The context and options are only borrowed for the duration of the call.
pub fn evaluate(
    tree: &ParseTree,
    source: &str,
    context: &Context,
    options: &Options,
) -> FormulaResult<Value> {
    let registry = Registry::new(options);
    let evaluator = Evaluator {
        tree,
        source,
        context,
        registry: &registry,
    };
    evaluator.evaluate_node(tree.root())
}

/// State shared by every node of one evaluation
pub struct Evaluator<'a> {
    tree: &'a ParseTree,
    source: &'a str,
    context: &'a Context,
    registry: &'a Registry<'a>,
}

impl<'a> Evaluator<'a> {
    fn text(&self, id: NodeId) -> &'a str {
        self.tree.text(id, self.source)
    }

    fn evaluate_node(&self, id: NodeId) -> FormulaResult<Value> {
        let node = self.tree.node(id);

        match node.kind {
            // Pass-through wrappers
            NodeKind::Expression | NodeKind::Term | NodeKind::ParenExpr => {
                match node.children.first() {
                    Some(&child) => self.evaluate_node(child),
                    None => Ok(Value::Undefined),
                }
            }

            NodeKind::Expr
            | NodeKind::OrExpr
            | NodeKind::AndExpr
            | NodeKind::CompExpr
            | NodeKind::AddExpr
            | NodeKind::MulExpr => self.evaluate_chain(node),

            // === Literals ===
            NodeKind::Number => {
                let text = self.text(id);
                text.parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| FormulaError::Parse(format!("Invalid number literal '{}'", text)))
            }
            NodeKind::String => {
                let text = self.text(id);
                let mut chars = text.chars();
                chars.next();
                chars.next_back();
                Ok(Value::String(chars.as_str().to_string()))
            }
            NodeKind::Boolean => Ok(Value::Boolean(self.text(id) == "true")),

            NodeKind::Variable => self.evaluate_variable(node),
            NodeKind::Function => self.evaluate_function(id, node),

            // Operator tokens and bare identifiers only make sense inside
            // their parent
            other => Err(FormulaError::Evaluation(format!(
                "Unexpected {} node '{}'",
                other,
                self.text(id)
            ))),
        }
    }

    /// Left fold over `[operand, operator, operand, ...]`
    fn evaluate_chain(&self, node: &ParseNode) -> FormulaResult<Value> {
        let Some((&first, rest)) = node.children.split_first() else {
            return Ok(Value::Undefined);
        };

        let mut value = self.evaluate_node(first)?;
        for pair in rest.chunks_exact(2) {
            value = self.apply_operator(value, pair[0], pair[1])?;
        }

        Ok(value)
    }

    fn apply_operator(&self, left: Value, op: NodeId, operand: NodeId) -> FormulaResult<Value> {
        let kind = self.tree.node(op).kind;
        let token = self.text(op);

        match (kind, token) {
            // Logical operators keep the deciding operand's value
            (NodeKind::AndOperator, "&&" | "AND") => {
                if left.is_truthy() {
                    self.evaluate_node(operand)
                } else {
                    Ok(left)
                }
            }
            (NodeKind::OrOperator, "||" | "OR") => {
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.evaluate_node(operand)
                }
            }

            (NodeKind::CompOperator, "==" | "=") => {
                let right = self.evaluate_node(operand)?;
                Ok(Value::Boolean(left == right))
            }
            (NodeKind::CompOperator, "!=") => {
                let right = self.evaluate_node(operand)?;
                Ok(Value::Boolean(left != right))
            }
            (NodeKind::CompOperator, ">" | "<" | ">=" | "<=") => {
                let l = expect_number(&left)?;
                let r = expect_number(&self.evaluate_node(operand)?)?;
                let result = match token {
                    ">" => l > r,
                    "<" => l < r,
                    ">=" => l >= r,
                    _ => l <= r,
                };
                Ok(Value::Boolean(result))
            }

            (NodeKind::AddOperator, "+" | "&") => {
                let right = self.evaluate_node(operand)?;
                match (left, right) {
                    (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                    (Value::String(mut l), Value::String(r)) => {
                        l.push_str(&r);
                        Ok(Value::String(l))
                    }
                    _ => Err(FormulaError::type_mismatch("Incompatible types")),
                }
            }
            (NodeKind::AddOperator, "-") => {
                let right = self.evaluate_node(operand)?;
                let l = expect_number(&left)?;
                let r = expect_number(&right)?;
                Ok(Value::Number(l - r))
            }

            (NodeKind::MulOperator, "*" | "/") => {
                let l = expect_number(&left)?;
                let r = expect_number(&self.evaluate_node(operand)?)?;
                // Division by zero follows IEEE-754
                let result = if token == "*" { l * r } else { l / r };
                Ok(Value::Number(result))
            }

            _ => {
                let shown = if token.is_empty() { kind.name() } else { token };
                Err(FormulaError::UnknownOperator(shown.to_string()))
            }
        }
    }

    fn evaluate_variable(&self, node: &ParseNode) -> FormulaResult<Value> {
        let path: Vec<&str> = node.children.iter().map(|&c| self.text(c)).collect();
        trace!(path = %path.join("."), "resolving variable");
        self.context.resolve(&path)
    }

    fn evaluate_function(&self, id: NodeId, node: &ParseNode) -> FormulaResult<Value> {
        let Some((&name_id, arg_ids)) = node.children.split_first() else {
            return Err(FormulaError::Evaluation(format!(
                "Function node without a name '{}'",
                self.text(id)
            )));
        };
        let name = self.text(name_id);

        let args: Vec<Thunk<'_>> = arg_ids
            .iter()
            .map(|&node| Thunk {
                evaluator: self,
                node,
            })
            .collect();

        let callable = self
            .registry
            .get(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

        trace!(function = name, args = args.len(), "calling function");

        let result = match callable {
            Callable::Custom(f) => f(args.as_slice()),
            Callable::Builtin(def) => validate_args(&args, Some(def.min_args), def.max_args)
                .and_then(|args| (def.implementation)(args)),
        };

        result.map_err(|e| e.in_call(self.text(id)))
    }
}

fn expect_number(value: &Value) -> FormulaResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(FormulaError::type_mismatch("Value is not a number")),
    }
}
