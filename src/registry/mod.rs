//! Step runner registry.
//!
//! Runners are registered under their self-reported name with zero, one,
//! or both capabilities. Lookup is capability-scoped: asking for a
//! promotion runner under a name registered only for health checks
//! yields nothing, exactly like an unknown name; the engine treats both
//! as "no usable runner".

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::step::compose_output::ComposeOutput;
use crate::step::runner::{HealthCheckStepRunner, PromotionStepRunner, StepRunnerPermissions};

/// A runner plus the permission grants its steps execute under.
///
/// One concrete runner may carry both capability handles; capability is
/// determined by which handles are present, never by the concrete type.
#[derive(Clone)]
pub struct RunnerRegistration {
    name: String,
    permissions: StepRunnerPermissions,
    promoter: Option<Arc<dyn PromotionStepRunner>>,
    health_checker: Option<Arc<dyn HealthCheckStepRunner>>,
}

impl RunnerRegistration {
    /// Register a promotion-capable runner.
    pub fn promoter(runner: Arc<dyn PromotionStepRunner>) -> Self {
        Self {
            name: runner.name().to_string(),
            permissions: StepRunnerPermissions::default(),
            promoter: Some(runner),
            health_checker: None,
        }
    }

    /// Register a health-check-capable runner.
    pub fn health_checker(runner: Arc<dyn HealthCheckStepRunner>) -> Self {
        Self {
            name: runner.name().to_string(),
            permissions: StepRunnerPermissions::default(),
            promoter: None,
            health_checker: Some(runner),
        }
    }

    /// Add the health-check capability to this registration.
    pub fn with_health_checker(mut self, runner: Arc<dyn HealthCheckStepRunner>) -> Self {
        self.health_checker = Some(runner);
        self
    }

    /// Grant permissions to this registration's steps.
    pub fn with_permissions(mut self, permissions: StepRunnerPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// The name this registration is keyed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The permission grants for this registration.
    pub fn permissions(&self) -> &StepRunnerPermissions {
        &self.permissions
    }

    /// The promotion capability, if registered.
    pub fn promotion_runner(&self) -> Option<Arc<dyn PromotionStepRunner>> {
        self.promoter.clone()
    }

    /// The health-check capability, if registered.
    pub fn health_check_runner(&self) -> Option<Arc<dyn HealthCheckStepRunner>> {
        self.health_checker.clone()
    }
}

/// Name-keyed lookup of pluggable step runners.
#[derive(Clone, Default)]
pub struct StepRunnerRegistry {
    runners: HashMap<String, RunnerRegistration>,
}

impl StepRunnerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the built-in runners
    /// (currently [`ComposeOutput`], with both capabilities and no
    /// permissions).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let compose = Arc::new(ComposeOutput);
        registry.register(
            RunnerRegistration::promoter(compose.clone()).with_health_checker(compose),
        );
        registry
    }

    /// Store a registration under its runner's name.
    ///
    /// Re-registering a name overwrites the prior entry; last write
    /// wins.
    pub fn register(&mut self, registration: RunnerRegistration) {
        let name = registration.name().to_string();
        if self.runners.insert(name.clone(), registration).is_some() {
            debug!(kind = %name, "step runner re-registered, previous entry replaced");
        }
    }

    /// Look up a registration by name.
    pub fn get(&self, name: &str) -> Option<&RunnerRegistration> {
        self.runners.get(name)
    }

    /// Look up the promotion-capable runner registered under `name`.
    ///
    /// `None` both when nothing is registered under that name and when
    /// the registration lacks the promotion capability.
    pub fn promotion_step_runner(&self, name: &str) -> Option<Arc<dyn PromotionStepRunner>> {
        self.runners.get(name)?.promotion_runner()
    }

    /// Look up the health-check-capable runner registered under `name`.
    pub fn health_check_step_runner(&self, name: &str) -> Option<Arc<dyn HealthCheckStepRunner>> {
        self.runners.get(name)?.health_check_runner()
    }
}
