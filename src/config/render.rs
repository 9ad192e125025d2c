//! Rendering of raw step configuration against the evaluation environment.
//!
//! Two substitution rules apply, per value:
//!
//! - A string that is *exactly* one `${{ ... }}` placeholder is replaced by
//!   the expression's native evaluated type, so booleans, numbers, and
//!   nested structures can be templated into non-string fields.
//! - A string containing expressions interspersed with literal text has each
//!   expression evaluated, coerced to its string form, and concatenated into
//!   the surrounding text.
//!
//! `quote(...)` forces the string form even in the whole-value case, for
//! fields whose schema semantically expects a string.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::expr::{parse_expr, parse_segments, Expr, PathSeg, Segment};
use crate::config::Config;
use crate::error::{CapstanError, Result};
use crate::state::State;

/// A declared promotion variable.
///
/// The value may itself contain expressions referencing earlier variables;
/// variables are resolved once, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Var {
    /// Variable name, referenced in expressions as `vars.<name>`.
    pub name: String,

    /// Raw value; any JSON value, possibly containing `${{ ... }}`.
    #[serde(default)]
    pub value: Value,
}

/// Per-run identifiers exposed to expressions as `ctx`.
#[derive(Debug, Clone, Copy)]
pub struct ExprContext<'a> {
    pub project: &'a str,
    pub stage: &'a str,
    /// Promotion id; absent for health check runs.
    pub promotion: Option<&'a str>,
}

/// The evaluation environment a step's config is rendered against.
#[derive(Debug, Clone, Copy)]
pub struct EvalEnv<'a> {
    pub ctx: ExprContext<'a>,
    /// Resolved promotion variables, in declaration order.
    pub vars: &'a IndexMap<String, Value>,
    /// Accumulated outputs of earlier steps, keyed by alias.
    pub outputs: Option<&'a State>,
}

/// Render a step's raw configuration into a concrete [`Config`].
///
/// The raw value must render to a mapping (or `null`, yielding an empty
/// config).
pub fn render_config(raw: &Value, env: &EvalEnv<'_>) -> Result<Config> {
    Config::from_value(render_value(raw, env)?)
}

/// Render one JSON value, applying the substitution rules recursively.
pub fn render_value(value: &Value, env: &EvalEnv<'_>) -> Result<Value> {
    match value {
        Value::String(s) => render_string(s, env),
        Value::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(render_value(item, env)?);
            }
            Ok(Value::Array(rendered))
        }
        Value::Object(map) => {
            let mut rendered = Map::new();
            for (key, item) in map {
                let key = match render_string(key, env)? {
                    Value::String(s) => s,
                    other => coerce_to_string(&other),
                };
                rendered.insert(key, render_value(item, env)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve declared variables in declaration order.
///
/// Each variable is evaluated against `ctx` plus all previously resolved
/// variables: a later variable may reference an earlier one by name, but
/// not vice versa. Step outputs are not visible here.
pub fn resolve_vars(ctx: &ExprContext<'_>, vars: &[Var]) -> Result<IndexMap<String, Value>> {
    let mut resolved = IndexMap::with_capacity(vars.len());

    for var in vars {
        let env = EvalEnv {
            ctx: *ctx,
            vars: &resolved,
            outputs: None,
        };
        let value = render_value(&var.value, &env)?;
        resolved.insert(var.name.clone(), value);
    }

    Ok(resolved)
}

fn render_string(input: &str, env: &EvalEnv<'_>) -> Result<Value> {
    let segments = parse_segments(input);

    // A value that is exactly one expression keeps its native type
    if let [Segment::Expr(source)] = segments.as_slice() {
        return eval(&parse_expr(source)?, env);
    }

    let mut result = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Expr(source) => {
                let value = eval(&parse_expr(&source)?, env)?;
                result.push_str(&coerce_to_string(&value));
            }
        }
    }

    Ok(Value::String(result))
}

fn eval(expr: &Expr, env: &EvalEnv<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Quote(inner) => Ok(Value::String(coerce_to_string(&eval(inner, env)?))),
        Expr::Path(segments) => eval_path(segments, env),
    }
}

fn eval_path(segments: &[PathSeg], env: &EvalEnv<'_>) -> Result<Value> {
    let root = match segments.first() {
        Some(PathSeg::Key(name)) => name.as_str(),
        _ => return Err(unresolved(segments)),
    };

    match root {
        "ctx" => eval_ctx(segments, env),
        "vars" => {
            let Some(PathSeg::Key(name)) = segments.get(1) else {
                return Err(unresolved(segments));
            };
            let value = env.vars.get(name).ok_or_else(|| unresolved(segments))?;
            walk(value, &segments[2..]).ok_or_else(|| unresolved(segments))
        }
        "outputs" => {
            let Some(PathSeg::Key(alias)) = segments.get(1) else {
                return Err(unresolved(segments));
            };
            let output = env
                .outputs
                .and_then(|state| state.get(alias))
                .ok_or_else(|| unresolved(segments))?;
            walk(&output.to_value(), &segments[2..]).ok_or_else(|| unresolved(segments))
        }
        _ => Err(unresolved(segments)),
    }
}

fn eval_ctx(segments: &[PathSeg], env: &EvalEnv<'_>) -> Result<Value> {
    let value = match segments.get(1) {
        Some(PathSeg::Key(field)) => match field.as_str() {
            "project" => Some(Value::String(env.ctx.project.to_string())),
            "stage" => Some(Value::String(env.ctx.stage.to_string())),
            "promotion" => env
                .ctx
                .promotion
                .map(|p| Value::String(p.to_string())),
            _ => None,
        },
        _ => None,
    };

    match value {
        Some(v) if segments.len() == 2 => Ok(v),
        _ => Err(unresolved(segments)),
    }
}

/// Walk accessors over a value, returning an owned clone of the result.
fn walk(value: &Value, segments: &[PathSeg]) -> Option<Value> {
    let mut current = value;
    for segment in segments {
        current = match segment {
            PathSeg::Key(key) => current.get(key.as_str())?,
            PathSeg::Index(index) => current.get(index)?,
        };
    }
    Some(current.clone())
}

fn unresolved(segments: &[PathSeg]) -> CapstanError {
    let mut path = String::new();
    for segment in segments {
        match segment {
            PathSeg::Key(key) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
            }
            PathSeg::Index(index) => {
                path.push_str(&format!("[{index}]"));
            }
        }
    }
    CapstanError::Expression {
        message: format!("unresolved reference '{path}'"),
    }
}

/// The string form of a value: strings verbatim, scalars via their JSON
/// text, `null` empty, structures as compact JSON.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
