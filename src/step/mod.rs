//! Step declarations, result types, and the runner contract.

pub mod compose_output;
pub mod runner;

pub use compose_output::ComposeOutput;
pub use runner::{
    HealthCheckStepContext, HealthCheckStepRunner, PromotionStepContext, PromotionStepRunner,
    StepRunnerPermissions,
};

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;

/// One declared unit of promotion work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PromotionStep {
    /// Name under which the step's runner is registered.
    pub kind: String,

    /// Key under which the step's output is stored in shared state;
    /// defaults to `kind` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Raw configuration, possibly containing `${{ ... }}` expressions.
    #[serde(default)]
    pub config: Value,
}

impl PromotionStep {
    /// The alias under which this step's output is stored.
    pub fn alias_or_kind(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.kind)
    }
}

/// One declared health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthCheckStep {
    /// Name under which the check's runner is registered.
    pub kind: String,

    /// Optional display name used in issue messages; health output is
    /// positional, so the alias never keys anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Raw configuration, possibly containing `${{ ... }}` expressions.
    #[serde(default)]
    pub config: Value,
}

impl HealthCheckStep {
    /// The name used for this check in issue messages.
    pub fn alias_or_kind(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.kind)
    }
}

/// Status of a promotion or of one promotion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PromotionStatus {
    /// Waiting to run.
    Pending,

    /// In progress; the caller should re-invoke the promotion later.
    Running,

    /// Completed successfully.
    Succeeded,

    /// Failed permanently; requires manual action.
    Failed,

    /// Stopped on a transient error; will be retried automatically.
    Errored,
}

impl PromotionStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PromotionStatus::Succeeded | PromotionStatus::Failed | PromotionStatus::Errored
        )
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PromotionStatus::Pending => "pending",
            PromotionStatus::Running => "running",
            PromotionStatus::Succeeded => "succeeded",
            PromotionStatus::Failed => "failed",
            PromotionStatus::Errored => "errored",
        };
        write!(f, "{}", s)
    }
}

/// Health of a Stage as reported by one check or by the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
    NotApplicable,
}

impl HealthStatus {
    /// Reduce two statuses to the more severe one.
    ///
    /// Severity: `Unhealthy` > `Unknown` > `Healthy` > `NotApplicable`;
    /// `NotApplicable` is the identity of the merge.
    pub fn merge(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    fn severity(self) -> u8 {
        match self {
            HealthStatus::NotApplicable => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Unknown => 2,
            HealthStatus::Unhealthy => 3,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
            HealthStatus::NotApplicable => "not applicable",
        };
        write!(f, "{}", s)
    }
}

/// Result of executing one promotion step.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionStepResult {
    /// Step status; `Succeeded` merges the output into shared state,
    /// `Running` suspends the whole promotion until the next
    /// reconciliation.
    pub status: PromotionStatus,

    /// Values published for consumption by later steps.
    pub output: Config,
}

impl PromotionStepResult {
    /// Create a success result with the given output.
    pub fn succeeded(output: Config) -> Self {
        Self {
            status: PromotionStatus::Succeeded,
            output,
        }
    }

    /// Create a still-in-progress result.
    pub fn running() -> Self {
        Self {
            status: PromotionStatus::Running,
            output: Config::new(),
        }
    }
}

/// Result of executing one health check step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckStepResult {
    pub status: HealthStatus,

    /// Check-specific details, collected positionally by the engine.
    pub output: Config,

    /// Human-readable problems found by the check.
    pub issues: Vec<String>,
}

impl HealthCheckStepResult {
    /// Create a healthy result with the given output.
    pub fn healthy(output: Config) -> Self {
        Self {
            status: HealthStatus::Healthy,
            output,
            issues: Vec::new(),
        }
    }

    /// Create an unhealthy result from the given issues.
    pub fn unhealthy(issues: Vec<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            output: Config::new(),
            issues,
        }
    }

    /// Create an unknown result carrying a single issue.
    pub fn unknown(issue: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unknown,
            output: Config::new(),
            issues: vec![issue.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_defaults_to_kind() {
        let step = PromotionStep {
            kind: "git-clone".to_string(),
            alias: None,
            config: Value::Null,
        };
        assert_eq!(step.alias_or_kind(), "git-clone");

        let step = PromotionStep {
            alias: Some("clone".to_string()),
            ..step
        };
        assert_eq!(step.alias_or_kind(), "clone");
    }

    #[test]
    fn promotion_status_is_terminal() {
        assert!(!PromotionStatus::Pending.is_terminal());
        assert!(!PromotionStatus::Running.is_terminal());
        assert!(PromotionStatus::Succeeded.is_terminal());
        assert!(PromotionStatus::Failed.is_terminal());
        assert!(PromotionStatus::Errored.is_terminal());
    }

    #[test]
    fn promotion_status_display() {
        assert_eq!(format!("{}", PromotionStatus::Running), "running");
        assert_eq!(format!("{}", PromotionStatus::Errored), "errored");
    }

    #[test]
    fn health_merge_severity_ordering() {
        use HealthStatus::*;

        assert_eq!(Healthy.merge(Unhealthy), Unhealthy);
        assert_eq!(Unhealthy.merge(Unknown), Unhealthy);
        assert_eq!(Healthy.merge(Unknown), Unknown);
        assert_eq!(Unknown.merge(Healthy), Unknown);
        assert_eq!(Healthy.merge(Healthy), Healthy);
    }

    #[test]
    fn health_merge_not_applicable_is_identity() {
        use HealthStatus::*;

        assert_eq!(NotApplicable.merge(Healthy), Healthy);
        assert_eq!(Healthy.merge(NotApplicable), Healthy);
        assert_eq!(NotApplicable.merge(Unhealthy), Unhealthy);
        assert_eq!(NotApplicable.merge(NotApplicable), NotApplicable);
    }

    #[test]
    fn step_parses_from_yaml() {
        let step: PromotionStep = serde_yaml::from_str(
            "kind: git-clone\nalias: clone\nconfig:\n  repoURL: ${{ vars.repo }}\n",
        )
        .unwrap();
        assert_eq!(step.kind, "git-clone");
        assert_eq!(step.alias.as_deref(), Some("clone"));
        assert_eq!(step.config, json!({"repoURL": "${{ vars.repo }}"}));
    }

    #[test]
    fn step_config_defaults_to_null() {
        let step: PromotionStep = serde_yaml::from_str("kind: git-wait\n").unwrap();
        assert_eq!(step.config, Value::Null);
    }

    #[test]
    fn step_result_constructors() {
        let output = Config::from_value(json!({"commit": "abc123"})).unwrap();
        let result = PromotionStepResult::succeeded(output.clone());
        assert_eq!(result.status, PromotionStatus::Succeeded);
        assert_eq!(result.output, output);

        let result = PromotionStepResult::running();
        assert_eq!(result.status, PromotionStatus::Running);
        assert!(result.output.is_empty());
    }

    #[test]
    fn health_result_constructors() {
        let result = HealthCheckStepResult::unknown("no runner");
        assert_eq!(result.status, HealthStatus::Unknown);
        assert_eq!(result.issues, vec!["no runner".to_string()]);

        let result = HealthCheckStepResult::unhealthy(vec!["app degraded".to_string()]);
        assert_eq!(result.status, HealthStatus::Unhealthy);
    }
}
