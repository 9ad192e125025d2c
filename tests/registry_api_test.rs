//! Integration tests for the step runner registry public API.

use std::sync::Arc;

use capstan::config::Config;
use capstan::registry::{RunnerRegistration, StepRunnerRegistry};
use capstan::step::{
    ComposeOutput, HealthCheckStepContext, HealthCheckStepResult, HealthCheckStepRunner,
    PromotionStepContext, PromotionStepResult, PromotionStepRunner, StepRunnerPermissions,
};

struct Promoter(&'static str);

impl PromotionStepRunner for Promoter {
    fn name(&self) -> &str {
        self.0
    }

    fn run(&self, ctx: PromotionStepContext<'_>) -> anyhow::Result<PromotionStepResult> {
        Ok(PromotionStepResult::succeeded(ctx.config))
    }
}

struct Checker(&'static str);

impl HealthCheckStepRunner for Checker {
    fn name(&self) -> &str {
        self.0
    }

    fn run(&self, _ctx: HealthCheckStepContext<'_>) -> HealthCheckStepResult {
        HealthCheckStepResult::healthy(Config::new())
    }
}

#[test]
fn capability_scoped_lookup() {
    let mut registry = StepRunnerRegistry::new();
    registry.register(RunnerRegistration::promoter(Arc::new(Promoter("git-clone"))));
    registry.register(RunnerRegistration::health_checker(Arc::new(Checker(
        "argocd-health",
    ))));

    // Each name resolves only under its registered capability
    assert!(registry.promotion_step_runner("git-clone").is_some());
    assert!(registry.health_check_step_runner("git-clone").is_none());
    assert!(registry.health_check_step_runner("argocd-health").is_some());
    assert!(registry.promotion_step_runner("argocd-health").is_none());

    // Unknown names resolve to nothing under either capability
    assert!(registry.promotion_step_runner("unknown").is_none());
    assert!(registry.health_check_step_runner("unknown").is_none());
}

#[test]
fn last_registration_wins() {
    struct Loud;
    impl PromotionStepRunner for Loud {
        fn name(&self) -> &str {
            "notify"
        }
        fn run(&self, _: PromotionStepContext<'_>) -> anyhow::Result<PromotionStepResult> {
            anyhow::bail!("should have been replaced")
        }
    }

    let mut registry = StepRunnerRegistry::new();
    registry.register(RunnerRegistration::promoter(Arc::new(Loud)));
    registry.register(RunnerRegistration::promoter(Arc::new(Promoter("notify"))));

    let runner = registry.promotion_step_runner("notify").unwrap();
    assert_eq!(runner.name(), "notify");

    // No duplicate-registration error: exactly one entry remains and it
    // is the most recently registered one
    let registration = registry.get("notify").unwrap();
    assert!(registration.promotion_runner().is_some());
}

#[test]
fn one_concrete_runner_can_register_both_capabilities() {
    let compose = Arc::new(ComposeOutput);
    let mut registry = StepRunnerRegistry::new();
    registry.register(
        RunnerRegistration::promoter(compose.clone()).with_health_checker(compose),
    );

    assert!(registry
        .promotion_step_runner(ComposeOutput::KIND)
        .is_some());
    assert!(registry
        .health_check_step_runner(ComposeOutput::KIND)
        .is_some());
}

#[test]
fn permissions_are_part_of_the_registration() {
    let mut registry = StepRunnerRegistry::new();
    registry.register(
        RunnerRegistration::promoter(Arc::new(Promoter("argocd-update"))).with_permissions(
            StepRunnerPermissions {
                allow_argocd_client: true,
                ..Default::default()
            },
        ),
    );

    let registration = registry.get("argocd-update").unwrap();
    assert!(registration.permissions().allow_argocd_client);
    assert!(!registration.permissions().allow_credentials_db);
    assert!(!registration.permissions().allow_api_client);
}

#[test]
fn builtin_registry_carries_compose_output() {
    let registry = StepRunnerRegistry::with_builtins();

    assert!(registry.promotion_step_runner("compose-output").is_some());
    assert!(registry.health_check_step_runner("compose-output").is_some());
    assert_eq!(
        registry.get("compose-output").unwrap().permissions(),
        &StepRunnerPermissions::default()
    );
}
