//! Condition engine with compiled expression caching

use dashmap::DashMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ConditionError, Result};
use super::parser::{parse_condition, BinOp, Expr};
use super::value::Value;

/// Engine for compiling and evaluating rule conditions
///
/// Expressions are parsed once and the AST is shared across evaluations.
#[derive(Clone, Default)]
pub struct ConditionEngine {
    /// Compiled expression cache (thread-safe)
    program_cache: Arc<DashMap<String, Arc<Expr>>>,
}

impl ConditionEngine {
    /// Create a new condition engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile an expression and cache the result
    ///
    /// # Errors
    /// Returns error if the expression cannot be parsed
    pub fn compile(&self, expr: &str) -> Result<Arc<Expr>> {
        if let Some(program) = self.program_cache.get(expr) {
            return Ok(program.clone());
        }

        let program = Arc::new(parse_condition(expr)?);
        self.program_cache
            .insert(expr.to_string(), program.clone());

        Ok(program)
    }

    /// Evaluate a compiled expression against user attributes
    ///
    /// The result is the truthiness of the expression's value.
    pub fn evaluate(&self, program: &Expr, attributes: &HashMap<String, JsonValue>) -> Result<bool> {
        Ok(eval(program, attributes)?.truthy())
    }

    /// Compile and evaluate an expression in one call
    pub fn evaluate_expression(
        &self,
        expr: &str,
        attributes: &HashMap<String, JsonValue>,
    ) -> Result<bool> {
        let program = self.compile(expr)?;
        self.evaluate(&program, attributes)
    }

    /// Clear the compiled expression cache
    pub fn clear_cache(&self) {
        self.program_cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.program_cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached expressions
    pub size: usize,
}

fn eval(expr: &Expr, attributes: &HashMap<String, JsonValue>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Attr(name) => match attributes.get(name) {
            Some(json) => Value::from_json(name, json),
            None => Ok(Value::Null),
        },
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| eval(item, attributes))
                .collect::<Result<Vec<_>>>()?,
        )),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, attributes)?.truthy())),
        Expr::Neg(inner) => match eval(inner, attributes)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ConditionError::EvaluationError("integer overflow".into())),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| Value::Float(-f))
                .map_err(|_| ConditionError::EvaluationError(format!("cannot negate `{s}`"))),
            other => Err(ConditionError::EvaluationError(format!(
                "cannot negate {other:?}"
            ))),
        },
        Expr::And(operands) => {
            for operand in operands {
                if !eval(operand, attributes)?.truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(operands) => {
            for operand in operands {
                if eval(operand, attributes)?.truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::BinOp { op, left, right } => {
            let l = eval(left, attributes)?;
            let r = eval(right, attributes)?;
            let result = match op {
                BinOp::Eq => l.loose_eq(&r),
                BinOp::Ne => !l.loose_eq(&r),
                BinOp::StrictEq => l.strict_eq(&r),
                BinOp::StrictNe => !l.strict_eq(&r),
                BinOp::Gt => l.loose_cmp(&r)?.is_gt(),
                BinOp::Lt => l.loose_cmp(&r)?.is_lt(),
                BinOp::Ge => l.loose_cmp(&r)?.is_ge(),
                BinOp::Le => l.loose_cmp(&r)?.is_le(),
            };
            Ok(Value::Bool(result))
        }
        Expr::In { element, collection } => {
            let needle = eval(element, attributes)?;
            match eval(collection, attributes)? {
                Value::List(items) => Ok(Value::Bool(items.iter().any(|i| needle.loose_eq(i)))),
                Value::Null => Ok(Value::Bool(false)),
                other => Err(ConditionError::EvaluationError(format!(
                    "`in` expects a list, got {other:?}"
                ))),
            }
        }
    }
}
