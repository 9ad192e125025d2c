//! Freight domain model.
//!
//! A *Freight* is an immutable reference to a promotable artifact set
//! (container images, Helm charts, Git commits) produced by one origin.
//! Steps receive the collection of Freight resolved for the current run
//! and use [`origin`] resolution to disambiguate when more than one
//! requested Freight could satisfy the same reference.

pub mod origin;

pub use origin::{resolve_freight_origin, OriginRef};

use std::fmt;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The kind of source that produces Freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum OriginKind {
    Warehouse,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginKind::Warehouse => write!(f, "Warehouse"),
        }
    }
}

/// The named source that produced a piece of Freight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FreightOrigin {
    pub kind: OriginKind,
    pub name: String,
}

impl FreightOrigin {
    /// Convenience constructor for a warehouse origin.
    pub fn warehouse(name: impl Into<String>) -> Self {
        Self {
            kind: OriginKind::Warehouse,
            name: name.into(),
        }
    }
}

impl fmt::Display for FreightOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A Git commit carried by a piece of Freight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitCommit {
    pub repo_url: String,
    pub id: String,
}

/// A container image carried by a piece of Freight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub repo_url: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A Helm chart carried by a piece of Freight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartRef {
    pub repo_url: String,
    pub name: String,
    pub version: String,
}

/// An immutable reference to one promotable artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FreightReference {
    /// Opaque Freight name (content-addressed upstream).
    pub name: String,

    /// The origin that produced this Freight.
    pub origin: FreightOrigin,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<GitCommit>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<ChartRef>,
}

/// A Stage's request for Freight from one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FreightRequest {
    pub origin: FreightOrigin,
}

/// The Freight actually resolved and available to one run, keyed by
/// origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreightCollection(IndexMap<String, FreightReference>);

impl FreightCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference, keyed by its origin. A reference from the same
    /// origin replaces the previous one.
    pub fn add(&mut self, reference: FreightReference) {
        self.0.insert(reference.origin.to_string(), reference);
    }

    /// Look up the Freight produced by an origin.
    pub fn get_by_origin(&self, origin: &FreightOrigin) -> Option<&FreightReference> {
        self.0.get(&origin.to_string())
    }

    /// Iterate over references in insertion order.
    pub fn references(&self) -> impl Iterator<Item = &FreightReference> {
        self.0.values()
    }

    /// Whether the collection holds no Freight.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of references held.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(origin: &str, name: &str) -> FreightReference {
        FreightReference {
            name: name.to_string(),
            origin: FreightOrigin::warehouse(origin),
            commits: vec![],
            images: vec![],
            charts: vec![],
        }
    }

    #[test]
    fn origin_display_includes_kind_and_name() {
        let origin = FreightOrigin::warehouse("images");
        assert_eq!(origin.to_string(), "Warehouse/images");
    }

    #[test]
    fn collection_lookup_by_origin() {
        let mut collection = FreightCollection::new();
        collection.add(reference("images", "f-abc"));
        collection.add(reference("charts", "f-def"));

        let found = collection
            .get_by_origin(&FreightOrigin::warehouse("charts"))
            .unwrap();
        assert_eq!(found.name, "f-def");
        assert!(collection
            .get_by_origin(&FreightOrigin::warehouse("missing"))
            .is_none());
    }

    #[test]
    fn collection_same_origin_replaces() {
        let mut collection = FreightCollection::new();
        collection.add(reference("images", "f-old"));
        collection.add(reference("images", "f-new"));

        assert_eq!(collection.len(), 1);
        let found = collection
            .get_by_origin(&FreightOrigin::warehouse("images"))
            .unwrap();
        assert_eq!(found.name, "f-new");
    }

    #[test]
    fn freight_reference_serializes_camel_case() {
        let mut reference = reference("images", "f-abc");
        reference.images.push(ImageRef {
            repo_url: "example/app".to_string(),
            tag: "v1.2.3".to_string(),
            digest: None,
        });

        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["images"][0]["repoUrl"], "example/app");
        assert!(json["images"][0].get("digest").is_none());
    }
}
