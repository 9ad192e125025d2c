//! Step configuration model and templated rendering.
//!
//! A step's configuration is declared as YAML/JSON, may contain
//! `${{ ... }}` expressions, and is rendered into a concrete [`Config`]
//! immediately before the step's runner is invoked. See [`expr`] for the
//! expression language and [`render`] for the substitution rules.

pub mod expr;
pub mod render;

pub use render::{render_config, render_value, resolve_vars, EvalEnv, ExprContext, Var};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CapstanError, Result};

/// A step's concrete configuration: a string-keyed mapping to arbitrary
/// JSON-representable values.
///
/// Configs are never aliased across steps: every hand-off is a deep copy
/// (the derived `Clone`), because a runner is allowed to mutate the map it
/// receives without affecting siblings or the original declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a JSON value.
    ///
    /// `null` yields an empty config; anything other than a mapping is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(CapstanError::InvalidConfig {
                message: format!("config must be a mapping, got {}", value_kind(&other)),
            }),
        }
    }

    /// Parse a config from YAML source.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(source).map_err(|e| CapstanError::InvalidConfig {
                message: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// Canonical JSON serialization.
    ///
    /// An empty config serializes to an empty byte sequence, not `"{}"`;
    /// callers needing `"{}"` must special-case emptiness.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        if self.0.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::to_vec(&self.0).map_err(|e| CapstanError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// The config as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Consume the config, yielding its JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level key, returning any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Whether the config has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over top-level entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Config {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Config {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
