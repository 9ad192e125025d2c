//! Error types for Capstan operations.
//!
//! This module defines [`CapstanError`], the primary error type used throughout
//! the crate, a [`Result`] type alias, and the terminal-error classifier that
//! separates retryable from non-retryable step failures.
//!
//! # Error Handling Strategy
//!
//! - Use `CapstanError` for engine-level errors that need distinct handling
//! - Step runners return plain `anyhow::Error` for transient failures
//!   (network blips, resources not yet ready); the caller retries the whole
//!   promotion on the next reconciliation
//! - Step runners wrap permanent failures with [`terminal`]; the caller
//!   surfaces them for operator intervention and never auto-retries

use std::fmt;

use thiserror::Error;

/// Core error type for Capstan operations.
#[derive(Debug, Error)]
pub enum CapstanError {
    /// No runner with the required capability is registered for a step kind.
    #[error("step runner for kind '{kind}' not found")]
    RunnerNotFound { kind: String },

    /// Failed to render a step's templated configuration.
    #[error("failed to render config for step '{alias}': {message}")]
    ConfigRender { alias: String, message: String },

    /// An expression inside `${{ ... }}` could not be parsed or evaluated.
    #[error("invalid expression: {message}")]
    Expression { message: String },

    /// A step's raw configuration is not usable as declared.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A runner returned success with a status the engine cannot act on.
    #[error("step '{alias}' returned unexpected status '{status}'")]
    UnexpectedStepStatus { alias: String, status: String },

    /// The run's cancellation signal fired.
    #[error("promotion cancelled")]
    Cancelled,

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Capstan operations.
pub type Result<T> = std::result::Result<T, CapstanError>;

/// Marker wrapper for errors that must not be retried automatically.
///
/// A runner wraps an error with [`terminal`] to signal that re-running the
/// promotion will not help (e.g., a pull request was closed without merging)
/// and an operator has to intervene. Detection works through arbitrary levels
/// of wrapping: [`is_terminal`] walks the full error chain.
#[derive(Debug)]
pub struct TerminalError {
    inner: anyhow::Error,
}

impl TerminalError {
    /// Wrap an error as terminal.
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self { inner: err.into() }
    }
}

impl fmt::Display for TerminalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for TerminalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Wrap an error as terminal, preserving it as the cause.
pub fn terminal(err: impl Into<anyhow::Error>) -> anyhow::Error {
    anyhow::Error::new(TerminalError::new(err))
}

/// Whether `err` is, or wraps at any depth, a [`TerminalError`].
///
/// A plain error returns false; context layers added with
/// [`anyhow::Context`] do not hide the marker.
pub fn is_terminal(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<TerminalError>().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn runner_not_found_displays_kind() {
        let err = CapstanError::RunnerNotFound {
            kind: "git-clone".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("git-clone"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn config_render_displays_alias_and_message() {
        let err = CapstanError::ConfigRender {
            alias: "update-image".into(),
            message: "unresolved reference 'vars.tag'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("update-image"));
        assert!(msg.contains("vars.tag"));
    }

    #[test]
    fn expression_displays_message() {
        let err = CapstanError::Expression {
            message: "unterminated string literal".into(),
        };
        assert!(err.to_string().contains("unterminated string literal"));
    }

    #[test]
    fn unexpected_step_status_displays_alias_and_status() {
        let err = CapstanError::UnexpectedStepStatus {
            alias: "wait-for-pr".into(),
            status: "pending".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wait-for-pr"));
        assert!(msg.contains("pending"));
    }

    #[test]
    fn plain_error_is_not_terminal() {
        let err = anyhow!("connection refused");
        assert!(!is_terminal(&err));
    }

    #[test]
    fn wrapped_terminal_error_is_terminal() {
        let err = terminal(anyhow!("pull request was closed without merging"));
        assert!(is_terminal(&err));
    }

    #[test]
    fn terminal_detected_through_context_layers() {
        let err = terminal(anyhow!("pull request was closed without merging"))
            .context("updating stage manifests")
            .context("promoting freight");
        assert!(is_terminal(&err));
    }

    #[test]
    fn terminal_preserves_cause_message() {
        let err = terminal(anyhow!("branch diverged"));
        assert!(err.to_string().contains("branch diverged"));
    }

    #[test]
    fn context_on_plain_error_stays_non_terminal() {
        let err = anyhow!("timeout").context("fetching chart");
        assert!(!is_terminal(&err));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(CapstanError::InvalidConfig {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
