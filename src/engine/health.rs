//! The health check loop.

use tracing::{debug, warn};

use crate::config::{render_config, resolve_vars, Config, EvalEnv, ExprContext};
use crate::error::CapstanError;
use crate::step::runner::HealthCheckStepContext;
use crate::step::{HealthCheckStep, HealthStatus};

use super::promote::gated;
use super::{CancelToken, Engine, HealthCheckContext, HealthState};

impl Engine {
    /// Run every declared health check and aggregate the results.
    ///
    /// Unlike [`promote`](Engine::promote), an unhealthy result does not
    /// stop the loop; every check runs so the complete health picture
    /// is surfaced. The overall status is the most severe status seen;
    /// issues are concatenated in step order and outputs collected
    /// positionally. Only cancellation stops the loop early: the result
    /// is then `Unknown` with the cancellation message as the sole issue
    /// and any collected output discarded.
    pub fn check_health(
        &self,
        ctx: &HealthCheckContext,
        steps: &[HealthCheckStep],
        cancel: &CancelToken,
    ) -> HealthState {
        let expr_ctx = ExprContext {
            project: &ctx.project,
            stage: &ctx.stage,
            promotion: None,
        };

        let vars = match resolve_vars(&expr_ctx, &ctx.vars) {
            Ok(vars) => vars,
            Err(err) => {
                return HealthState {
                    status: HealthStatus::Unknown,
                    issues: vec![format!("failed to resolve variables: {err}")],
                    output: Vec::new(),
                }
            }
        };

        let mut status = HealthStatus::Healthy;
        let mut issues = Vec::new();
        let mut output = Vec::with_capacity(steps.len());

        for step in steps {
            if cancel.is_cancelled() {
                return cancelled(&ctx.project, &ctx.stage);
            }

            let name = step.alias_or_kind();

            let Some(runner) = self.registry().health_check_step_runner(&step.kind) else {
                status = status.merge(HealthStatus::Unknown);
                issues.push(format!(
                    "no health check step runner found for kind '{}'",
                    step.kind
                ));
                output.push(Config::new());
                continue;
            };

            let env = EvalEnv {
                ctx: expr_ctx,
                vars: &vars,
                outputs: None,
            };
            let config = match render_config(&step.config, &env) {
                Ok(config) => config,
                Err(err) => {
                    status = status.merge(HealthStatus::Unknown);
                    issues.push(format!(
                        "failed to render config for health check step '{name}': {err}"
                    ));
                    output.push(Config::new());
                    continue;
                }
            };

            debug!(
                project = %ctx.project,
                stage = %ctx.stage,
                step = name,
                kind = %step.kind,
                "running health check step"
            );

            let permissions = self
                .registry()
                .get(&step.kind)
                .map(|registration| *registration.permissions())
                .unwrap_or_default();
            let step_ctx = HealthCheckStepContext {
                project: &ctx.project,
                stage: &ctx.stage,
                config,
                freight_requests: &ctx.freight_requests,
                freight: &ctx.freight,
                credentials_db: gated(&self.credentials_db, permissions.allow_credentials_db),
                api_client: gated(&self.api_client, permissions.allow_api_client),
                argocd_client: gated(&self.argocd_client, permissions.allow_argocd_client),
            };

            let result = runner.run(step_ctx);

            // Cancellation during a step discards everything collected
            if cancel.is_cancelled() {
                return cancelled(&ctx.project, &ctx.stage);
            }

            status = status.merge(result.status);
            issues.extend(result.issues);
            output.push(result.output);
        }

        HealthState {
            status,
            issues,
            output,
        }
    }
}

fn cancelled(project: &str, stage: &str) -> HealthState {
    warn!(project, stage, "health check cancelled");
    HealthState {
        status: HealthStatus::Unknown,
        issues: vec![CapstanError::Cancelled.to_string()],
        output: Vec::new(),
    }
}
