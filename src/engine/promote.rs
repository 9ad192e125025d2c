//! The promotion loop.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{render_config, resolve_vars, EvalEnv, ExprContext};
use crate::error::{is_terminal, CapstanError};
use crate::state::State;
use crate::step::runner::PromotionStepContext;
use crate::step::{PromotionStatus, PromotionStep};

use super::{CancelToken, Engine, PromotionContext, PromotionResult};

impl Engine {
    /// Execute `steps` in declared order and reduce the outcomes into one
    /// promotion status.
    ///
    /// The loop stops at the first step that does not succeed: a missing
    /// runner or a terminal error yields `Failed`, a transient error or
    /// cancellation yields `Errored`, and a step still in progress yields
    /// `Running` with no error, and the caller re-invokes the whole
    /// promotion later. Earlier steps' side effects are expected to be
    /// idempotent or self-detecting on re-entry; the engine holds no
    /// per-step checkpoint.
    pub fn promote(
        &self,
        ctx: &PromotionContext,
        steps: &[PromotionStep],
        cancel: &CancelToken,
    ) -> PromotionResult {
        let mut state = State::new();
        let expr_ctx = ExprContext {
            project: &ctx.project,
            stage: &ctx.stage,
            promotion: Some(&ctx.promotion),
        };

        let vars = match resolve_vars(&expr_ctx, &ctx.vars) {
            Ok(vars) => vars,
            Err(err) => {
                return PromotionResult {
                    status: PromotionStatus::Failed,
                    state,
                    error: Some(err.into()),
                }
            }
        };

        for step in steps {
            let alias = step.alias_or_kind();

            if cancel.is_cancelled() {
                warn!(
                    project = %ctx.project,
                    stage = %ctx.stage,
                    step = alias,
                    "promotion cancelled before step dispatch"
                );
                return PromotionResult {
                    status: PromotionStatus::Errored,
                    state,
                    error: Some(CapstanError::Cancelled.into()),
                };
            }

            let Some(registration) = self.registry().get(&step.kind) else {
                return self.fail_not_found(step, state);
            };
            let Some(runner) = registration.promotion_runner() else {
                return self.fail_not_found(step, state);
            };

            let env = EvalEnv {
                ctx: expr_ctx,
                vars: &vars,
                outputs: Some(&state),
            };
            let config = match render_config(&step.config, &env) {
                Ok(config) => config,
                Err(err) => {
                    return PromotionResult {
                        status: PromotionStatus::Failed,
                        state,
                        error: Some(
                            CapstanError::ConfigRender {
                                alias: alias.to_string(),
                                message: err.to_string(),
                            }
                            .into(),
                        ),
                    }
                }
            };

            debug!(
                project = %ctx.project,
                stage = %ctx.stage,
                step = alias,
                kind = %step.kind,
                "running promotion step"
            );

            let permissions = registration.permissions();
            let step_ctx = PromotionStepContext {
                work_dir: &ctx.work_dir,
                project: &ctx.project,
                stage: &ctx.stage,
                promotion: &ctx.promotion,
                alias,
                config,
                state: &state,
                freight_requests: &ctx.freight_requests,
                freight: &ctx.freight,
                credentials_db: gated(&self.credentials_db, permissions.allow_credentials_db),
                api_client: gated(&self.api_client, permissions.allow_api_client),
                argocd_client: gated(&self.argocd_client, permissions.allow_argocd_client),
            };

            match runner.run(step_ctx) {
                Err(err) => {
                    let err = err.context(format!("step '{alias}' failed"));
                    let status = if is_terminal(&err) {
                        PromotionStatus::Failed
                    } else {
                        PromotionStatus::Errored
                    };
                    warn!(step = alias, status = %status, "promotion step failed");
                    return PromotionResult {
                        status,
                        state,
                        error: Some(err),
                    };
                }
                Ok(result) => match result.status {
                    PromotionStatus::Succeeded => {
                        state.set(alias, result.output);
                    }
                    PromotionStatus::Running => {
                        debug!(step = alias, "promotion step still in progress");
                        return PromotionResult {
                            status: PromotionStatus::Running,
                            state,
                            error: None,
                        };
                    }
                    other => {
                        return PromotionResult {
                            status: PromotionStatus::Failed,
                            state,
                            error: Some(
                                CapstanError::UnexpectedStepStatus {
                                    alias: alias.to_string(),
                                    status: other.to_string(),
                                }
                                .into(),
                            ),
                        }
                    }
                },
            }
        }

        PromotionResult {
            status: PromotionStatus::Succeeded,
            state,
            error: None,
        }
    }

    fn fail_not_found(&self, step: &PromotionStep, state: State) -> PromotionResult {
        PromotionResult {
            status: PromotionStatus::Failed,
            state,
            error: Some(
                CapstanError::RunnerNotFound {
                    kind: step.kind.clone(),
                }
                .into(),
            ),
        }
    }
}

/// A collaborator handle, narrowed by the registration's grant.
pub(super) fn gated<T: ?Sized>(handle: &Option<Arc<T>>, allowed: bool) -> Option<&T> {
    if allowed {
        handle.as_deref()
    } else {
        None
    }
}
