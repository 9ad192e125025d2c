//! The pluggable step runner contract.
//!
//! A runner implements the promotion capability, the health-check
//! capability, or both. The engine constructs a narrowly-scoped execution
//! context per step: collaborator handles are present only when the
//! runner's registration was granted the corresponding permission.
//!
//! Runners are expected to validate their rendered config (the
//! declaration-shaped types in this crate derive `schemars::JsonSchema`
//! for that purpose) before decoding it, and to report violations as
//! plain errors; re-reconciling will not change an invalid declaration.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clients::{ApiClient, ArgoCDClient, CredentialsDatabase};
use crate::config::Config;
use crate::freight::{FreightCollection, FreightRequest};
use crate::state::State;
use crate::step::{HealthCheckStepResult, PromotionStepResult};

/// Collaborators a runner's registration grants access to.
///
/// The engine consults this record when constructing each step's
/// execution context; a runner never reaches for a client it was not
/// granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepRunnerPermissions {
    #[serde(default)]
    pub allow_credentials_db: bool,

    #[serde(default)]
    pub allow_api_client: bool,

    #[serde(default)]
    pub allow_argocd_client: bool,
}

/// Everything a promotion step runner may act on.
pub struct PromotionStepContext<'a> {
    /// Working directory shared by the promotion's steps.
    pub work_dir: &'a Path,

    pub project: &'a str,
    pub stage: &'a str,
    pub promotion: &'a str,

    /// The alias under which this step's output will be stored.
    pub alias: &'a str,

    /// Rendered configuration. The runner owns it and may mutate it
    /// freely; it is a deep copy, never shared with other steps.
    pub config: Config,

    /// Outputs of earlier steps, keyed by alias.
    pub state: &'a State,

    /// Freight originally requested by the Stage.
    pub freight_requests: &'a [FreightRequest],

    /// Freight actually resolved for this run.
    pub freight: &'a FreightCollection,

    /// Present only when the registration allows credential lookups.
    pub credentials_db: Option<&'a dyn CredentialsDatabase>,

    /// Present only when the registration allows control plane reads.
    pub api_client: Option<&'a dyn ApiClient>,

    /// Present only when the registration allows Argo CD access.
    pub argocd_client: Option<&'a dyn ArgoCDClient>,
}

/// Everything a health check step runner may act on.
pub struct HealthCheckStepContext<'a> {
    pub project: &'a str,
    pub stage: &'a str,

    /// Rendered configuration; owned by the runner, as in promotion.
    pub config: Config,

    /// Freight originally requested by the Stage.
    pub freight_requests: &'a [FreightRequest],

    /// Freight the Stage currently runs.
    pub freight: &'a FreightCollection,

    /// Present only when the registration allows credential lookups.
    pub credentials_db: Option<&'a dyn CredentialsDatabase>,

    /// Present only when the registration allows control plane reads.
    pub api_client: Option<&'a dyn ApiClient>,

    /// Present only when the registration allows Argo CD access.
    pub argocd_client: Option<&'a dyn ArgoCDClient>,
}

/// The promotion capability.
///
/// An unwrapped error signals "retry the whole promotion on the next
/// reconciliation"; an error wrapped with [`crate::error::terminal`]
/// signals "do not retry; this requires human intervention".
pub trait PromotionStepRunner: Send + Sync {
    /// The kind under which this runner is looked up.
    fn name(&self) -> &str;

    /// Execute one step.
    fn run(&self, ctx: PromotionStepContext<'_>) -> anyhow::Result<PromotionStepResult>;
}

/// The health-check capability.
///
/// No error return: failures are expressed through status and issues.
pub trait HealthCheckStepRunner: Send + Sync {
    /// The kind under which this runner is looked up.
    fn name(&self) -> &str;

    /// Execute one check.
    fn run(&self, ctx: HealthCheckStepContext<'_>) -> HealthCheckStepResult;
}
