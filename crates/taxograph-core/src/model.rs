//! Core data structures for the taxonomy graph

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifier of the synthetic node sitting on top of every hierarchy.
///
/// It is registered as a graph node but never fetched from storage.
pub const ROOT_ID: &str = "-1";

/// An is-a edge: `source` is a kind of every node in `destinations`.
///
/// The edge ID is usually the source node ID; registering the same edge ID
/// again replaces the previous destination set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub destinations: BTreeSet<String>,
}

impl Edge {
    pub fn new<I, S>(id: impl Into<String>, source: impl Into<String>, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Edge {
            id: id.into(),
            source: source.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
        }
    }
}

/// Edge IDs that differ between two graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDifference {
    /// Edges present in this graph but not in the other one.
    pub added: Vec<String>,
    /// Edges present in the other graph but not in this one.
    pub removed: Vec<String>,
}

impl EdgeDifference {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A persisted document that takes part in the hierarchy.
///
/// Only the direct parent set and the indirect ancestor set are derived by
/// this workspace; every other field is carried through untouched.
pub trait TaxonomyEntity: Clone {
    fn id(&self) -> &str;

    /// Direct parents, as declared by the document.
    fn parent_ids(&self) -> &BTreeSet<String>;

    /// Indirect ancestors, as last derived for the document.
    fn ancestor_ids(&self) -> &BTreeSet<String>;

    /// Copy of this entity with the two derived fields replaced.
    fn with_parentage(&self, parents: BTreeSet<String>, ancestors: BTreeSet<String>) -> Self;
}

/// A concept of a terminology, the document kind the CLI works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parents: BTreeSet<String>,
    #[serde(default)]
    pub ancestors: BTreeSet<String>,
}

impl Concept {
    pub fn new(id: impl Into<String>) -> Self {
        Concept {
            id: id.into(),
            label: None,
            parents: BTreeSet::new(),
            ancestors: BTreeSet::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }
}

impl TaxonomyEntity for Concept {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_ids(&self) -> &BTreeSet<String> {
        &self.parents
    }

    fn ancestor_ids(&self) -> &BTreeSet<String> {
        &self.ancestors
    }

    fn with_parentage(&self, parents: BTreeSet<String>, ancestors: BTreeSet<String>) -> Self {
        Concept {
            parents,
            ancestors,
            ..self.clone()
        }
    }
}
