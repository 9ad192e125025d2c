//! The compose-output step.
//!
//! Copies its rendered configuration into its output verbatim. Because
//! config is rendered through the templating resolver first, this is the
//! canonical way to compute derived values once and publish them into
//! shared state for later steps (or into a health check's output list).
//!
//! Registered with both capabilities and no permissions: it touches no
//! external collaborator.

use crate::step::runner::{
    HealthCheckStepContext, HealthCheckStepRunner, PromotionStepContext, PromotionStepRunner,
};
use crate::step::{HealthCheckStepResult, PromotionStepResult};

/// Pure runner publishing its rendered config as its output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOutput;

impl ComposeOutput {
    pub const KIND: &'static str = "compose-output";
}

impl PromotionStepRunner for ComposeOutput {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn run(&self, ctx: PromotionStepContext<'_>) -> anyhow::Result<PromotionStepResult> {
        Ok(PromotionStepResult::succeeded(ctx.config))
    }
}

impl HealthCheckStepRunner for ComposeOutput {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn run(&self, ctx: HealthCheckStepContext<'_>) -> HealthCheckStepResult {
        HealthCheckStepResult::healthy(ctx.config)
    }
}
