//! Capstan - GitOps promotion engine core.
//!
//! Capstan executes ordered lists of declarative steps that move Freight
//! (immutable artifact sets) through deployment Stages: it renders each
//! step's templated configuration, dispatches to a pluggable runner,
//! threads outputs between steps, and reduces the outcomes into one
//! promotion status. A parallel, non-aborting variant runs declarative
//! health checks.
//!
//! # Modules
//!
//! - [`clients`] - Collaborator interfaces (credentials, control plane, Argo CD)
//! - [`config`] - Configuration model, expression language, and rendering
//! - [`engine`] - Promotion and health check execution engines
//! - [`error`] - Error types and the terminal-error classifier
//! - [`freight`] - Freight domain model and origin resolution
//! - [`registry`] - Capability-scoped step runner registry
//! - [`state`] - Shared state threaded between steps
//! - [`step`] - Step declarations, results, and the runner contract
//!
//! # Example
//!
//! ```
//! use capstan::config::{render_config, resolve_vars, EvalEnv, ExprContext, Var};
//! use serde_json::json;
//!
//! // Resolve declared variables, then render a step's config
//! let ctx = ExprContext {
//!     project: "demo-project",
//!     stage: "staging",
//!     promotion: Some("demo-project.staging.abc123"),
//! };
//! let vars = resolve_vars(
//!     &ctx,
//!     &[Var { name: "tag".to_string(), value: json!("v1.2.3") }],
//! )
//! .unwrap();
//! let env = EvalEnv { ctx, vars: &vars, outputs: None };
//!
//! let config = render_config(&json!({"tag": "${{ vars.tag }}"}), &env).unwrap();
//! assert_eq!(config.get("tag"), Some(&json!("v1.2.3")));
//! ```
//!
//! For end-to-end promotion runs, see the integration tests.

pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod freight;
pub mod registry;
pub mod state;
pub mod step;

pub use error::{is_terminal, terminal, CapstanError, Result, TerminalError};
