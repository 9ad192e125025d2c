//! Freight origin resolution over nested update declarations.
//!
//! Update steps (application updates, Kustomize image edits, Helm
//! parameter edits) are declared as deeply nested configuration. Any node
//! may pin the Freight origin its subtree should draw artifacts from via
//! `fromOrigin`; descendants inherit the nearest ancestor's choice unless
//! they override it. [`resolve_freight_origin`] answers "which origin
//! applies to this node" for runners decoding such declarations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::FreightOrigin;

/// Root of an application-update declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,

    #[serde(default)]
    pub apps: Vec<AppUpdate>,
}

/// Update declaration for one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdate {
    /// Application name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,

    #[serde(default)]
    pub sources: Vec<SourceUpdate>,
}

/// Update declaration for one application source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceUpdate {
    pub repo_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeImageUpdate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmParameterUpdate>,
}

/// Kustomize image edits within one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KustomizeImageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,

    #[serde(default)]
    pub images: Vec<KustomizeImage>,
}

/// One Kustomize image edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KustomizeImage {
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,
}

/// Helm value edits within one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmParameterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,

    #[serde(default)]
    pub images: Vec<HelmImageUpdate>,
}

/// One Helm image value edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmImageUpdate {
    pub image: String,

    /// Values-file key to set.
    #[serde(default)]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_origin: Option<FreightOrigin>,
}

/// A borrowed handle to one node of an update declaration.
///
/// Target matching compares handles by address, so the target must be a
/// reference into the same tree that is being resolved.
#[derive(Debug, Clone, Copy)]
pub enum OriginRef<'a> {
    Config(&'a AppUpdateConfig),
    App(&'a AppUpdate),
    Source(&'a SourceUpdate),
    Kustomize(&'a KustomizeImageUpdate),
    KustomizeImage(&'a KustomizeImage),
    Helm(&'a HelmParameterUpdate),
    HelmImage(&'a HelmImageUpdate),
}

impl<'a> OriginRef<'a> {
    /// The origin this node declares itself, if any.
    fn declared(&self) -> Option<&'a FreightOrigin> {
        match self {
            OriginRef::Config(node) => node.from_origin.as_ref(),
            OriginRef::App(node) => node.from_origin.as_ref(),
            OriginRef::Source(node) => node.from_origin.as_ref(),
            OriginRef::Kustomize(node) => node.from_origin.as_ref(),
            OriginRef::KustomizeImage(node) => node.from_origin.as_ref(),
            OriginRef::Helm(node) => node.from_origin.as_ref(),
            OriginRef::HelmImage(node) => node.from_origin.as_ref(),
        }
    }

    /// Address identity: same variant, same node.
    fn is(&self, other: &OriginRef<'a>) -> bool {
        match (self, other) {
            (OriginRef::Config(a), OriginRef::Config(b)) => std::ptr::eq(*a, *b),
            (OriginRef::App(a), OriginRef::App(b)) => std::ptr::eq(*a, *b),
            (OriginRef::Source(a), OriginRef::Source(b)) => std::ptr::eq(*a, *b),
            (OriginRef::Kustomize(a), OriginRef::Kustomize(b)) => std::ptr::eq(*a, *b),
            (OriginRef::KustomizeImage(a), OriginRef::KustomizeImage(b)) => std::ptr::eq(*a, *b),
            (OriginRef::Helm(a), OriginRef::Helm(b)) => std::ptr::eq(*a, *b),
            (OriginRef::HelmImage(a), OriginRef::HelmImage(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    /// Child nodes, in declaration order.
    fn children(&self) -> Vec<OriginRef<'a>> {
        match self {
            OriginRef::Config(node) => node.apps.iter().map(OriginRef::App).collect(),
            OriginRef::App(node) => node.sources.iter().map(OriginRef::Source).collect(),
            OriginRef::Source(node) => {
                let mut children = Vec::new();
                if let Some(kustomize) = &node.kustomize {
                    children.push(OriginRef::Kustomize(kustomize));
                }
                if let Some(helm) = &node.helm {
                    children.push(OriginRef::Helm(helm));
                }
                children
            }
            OriginRef::Kustomize(node) => {
                node.images.iter().map(OriginRef::KustomizeImage).collect()
            }
            OriginRef::Helm(node) => node.images.iter().map(OriginRef::HelmImage).collect(),
            OriginRef::KustomizeImage(_) | OriginRef::HelmImage(_) => Vec::new(),
        }
    }
}

/// Resolve the Freight origin that applies to `target` within the tree
/// rooted at `root`.
///
/// Depth-first pre-order walk: a node declaring `fromOrigin` sets the
/// default for its subtree; the target receives the nearest declared
/// default on its path from the root. Returns `None` if no origin is
/// declared on that path, or if `target` is not reachable from `root`;
/// callers must pass a target that is actually part of the tree.
pub fn resolve_freight_origin<'a>(
    root: OriginRef<'a>,
    target: OriginRef<'a>,
) -> Option<&'a FreightOrigin> {
    walk(root, &target, None)
}

fn walk<'a>(
    node: OriginRef<'a>,
    target: &OriginRef<'a>,
    inherited: Option<&'a FreightOrigin>,
) -> Option<&'a FreightOrigin> {
    let current = node.declared().or(inherited);

    if node.is(target) {
        return current;
    }

    for child in node.children() {
        if let Some(found) = walk(child, target, current) {
            return Some(found);
        }
    }

    None
}
