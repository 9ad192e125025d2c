//! Shared state threaded between promotion steps.
//!
//! `State` accumulates each step's output under its alias, in execution
//! order, and is exposed to later steps' templated configuration as the
//! `outputs` environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Insertion-ordered mapping from step alias to that step's output.
///
/// Owned exclusively by the engine for the duration of one run; appended
/// after each successful step. Concurrent use is disallowed by contract:
/// a run drives its steps strictly in order, so no synchronization is
/// needed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(IndexMap<String, Config>);

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a step's output by alias.
    pub fn get(&self, alias: &str) -> Option<&Config> {
        self.0.get(alias)
    }

    /// Record a step's output under its alias.
    ///
    /// Re-running an alias overwrites its previous output while keeping
    /// its original position.
    pub fn set(&mut self, alias: impl Into<String>, output: Config) {
        self.0.insert(alias.into(), output);
    }

    /// Whether no step has recorded output yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded outputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over recorded outputs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Config)> {
        self.0.iter()
    }
}
