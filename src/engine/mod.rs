//! Promotion and health check execution engines.
//!
//! One [`Engine`] instance holds the runner registry and the optional
//! collaborator handles. [`Engine::promote`] drives an ordered list of
//! promotion steps to one overall status; [`Engine::check_health`] runs
//! every declared health check and aggregates the results. Both are
//! single-threaded cooperative loops; see [`CancelToken`] for the only
//! concurrency-relevant primitive.

mod cancel;
mod health;
mod promote;

pub use cancel::CancelToken;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::clients::{ApiClient, ArgoCDClient, CredentialsDatabase};
use crate::config::{Config, Var};
use crate::freight::{FreightCollection, FreightRequest};
use crate::registry::StepRunnerRegistry;
use crate::state::State;
use crate::step::{HealthStatus, PromotionStatus};

/// Read-only metadata for one promotion run.
#[derive(Debug, Clone)]
pub struct PromotionContext {
    pub project: String,
    pub stage: String,

    /// Unique promotion identifier, exposed to expressions as
    /// `ctx.promotion`.
    pub promotion: String,

    /// Working directory shared by the promotion's steps.
    pub work_dir: PathBuf,

    /// Freight originally requested by the Stage.
    pub freight_requests: Vec<FreightRequest>,

    /// Freight actually resolved for this run.
    pub freight: FreightCollection,

    /// Declared variables, resolved once per run in declaration order.
    pub vars: Vec<Var>,
}

/// Read-only metadata for one health check run.
#[derive(Debug, Clone)]
pub struct HealthCheckContext {
    pub project: String,
    pub stage: String,

    /// Freight originally requested by the Stage.
    pub freight_requests: Vec<FreightRequest>,

    /// Freight the Stage currently runs.
    pub freight: FreightCollection,

    /// Declared variables, resolved once per run in declaration order.
    pub vars: Vec<Var>,
}

/// Outcome of one [`Engine::promote`] invocation.
///
/// The precise error always travels with the coarse status: callers
/// branch on `status` and log `error`. `Failed` requires manual action;
/// `Errored` will be retried by re-invoking the whole promotion;
/// `Running` means "in progress, check back later".
#[derive(Debug)]
pub struct PromotionResult {
    pub status: PromotionStatus,

    /// Outputs of the steps that succeeded, keyed by alias.
    pub state: State,

    /// The underlying cause when `status` is `Failed` or `Errored`.
    pub error: Option<anyhow::Error>,
}

/// Outcome of one [`Engine::check_health`] invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthState {
    pub status: HealthStatus,

    /// Every step's issues, in step order.
    pub issues: Vec<String>,

    /// Every step's output, positionally: one entry per step, in order.
    pub output: Vec<Config>,
}

/// The execution core: drives steps through registered runners.
#[derive(Clone, Default)]
pub struct Engine {
    registry: StepRunnerRegistry,
    credentials_db: Option<Arc<dyn CredentialsDatabase>>,
    api_client: Option<Arc<dyn ApiClient>>,
    argocd_client: Option<Arc<dyn ArgoCDClient>>,
}

impl Engine {
    /// Create an engine over a runner registry, with no collaborators.
    pub fn new(registry: StepRunnerRegistry) -> Self {
        Self {
            registry,
            credentials_db: None,
            api_client: None,
            argocd_client: None,
        }
    }

    /// Attach a credentials database, handed to permitted runners only.
    pub fn with_credentials_db(mut self, db: Arc<dyn CredentialsDatabase>) -> Self {
        self.credentials_db = Some(db);
        self
    }

    /// Attach a control plane client, handed to permitted runners only.
    pub fn with_api_client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.api_client = Some(client);
        self
    }

    /// Attach an Argo CD client, handed to permitted runners only.
    pub fn with_argocd_client(mut self, client: Arc<dyn ArgoCDClient>) -> Self {
        self.argocd_client = Some(client);
        self
    }

    /// The registry this engine resolves step kinds against.
    pub fn registry(&self) -> &StepRunnerRegistry {
        &self.registry
    }
}
