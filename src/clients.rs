//! Collaborator interfaces consumed by step runners.
//!
//! These are boundary traits only; implementations (credential stores,
//! control plane clients, Argo CD clients) live in the embedding
//! application. The engine hands a runner a handle only when its
//! registration was granted the matching permission.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of repository a credential unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Git,
    Helm,
    Image,
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialType::Git => "git",
            CredentialType::Helm => "helm",
            CredentialType::Image => "image",
        };
        write!(f, "{}", s)
    }
}

/// A credential pair for a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Credential lookup keyed by project, credential type, and repository
/// URL.
pub trait CredentialsDatabase: Send + Sync {
    /// Find credentials for a repository; `Ok(None)` means none are
    /// configured.
    fn get(
        &self,
        project: &str,
        credential_type: CredentialType,
        repo_url: &str,
    ) -> anyhow::Result<Option<Credentials>>;
}

/// Read access to the promotion engine's control plane objects.
pub trait ApiClient: Send + Sync {
    /// Read a raw object by kind, namespace, and name.
    fn get_raw(&self, kind: &str, namespace: &str, name: &str) -> anyhow::Result<Value>;
}

/// Access to Argo CD applications.
pub trait ArgoCDClient: Send + Sync {
    /// Read an application manifest.
    fn get_application(&self, namespace: &str, name: &str) -> anyhow::Result<Value>;

    /// Apply a merge patch to an application.
    fn patch_application(&self, namespace: &str, name: &str, patch: &Value) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_type_display() {
        assert_eq!(CredentialType::Git.to_string(), "git");
        assert_eq!(CredentialType::Image.to_string(), "image");
    }

    #[test]
    fn credential_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CredentialType::Helm).unwrap(),
            "\"helm\""
        );
    }
}
