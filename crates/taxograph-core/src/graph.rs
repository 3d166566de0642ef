//! Taxonomy graph with bit-set backed transitive closure

use std::collections::{BTreeSet, HashMap};

use fixedbitset::FixedBitSet;
use tracing::{debug, warn};

use crate::closure::Closure;
use crate::cycles::{nodes_in_cycles, CycleCheck};
use crate::error::GraphError;
use crate::issue::{Issue, IssueLog, DEFAULT_ISSUE_CAPACITY};
use crate::model::{Edge, EdgeDifference};

/// An is-a hierarchy over string node IDs.
///
/// Nodes live in an arena (registration order plus an ID → slot map) that is
/// compacted into dense positions on every `build()`. Any mutation drops the
/// closure; queries fail with [`GraphError::NotBuilt`] until the next build.
///
/// A built graph is only read, so it can be shared between reader threads.
pub struct TaxonomyGraph {
    nodes: Vec<Option<String>>,
    node_index: HashMap<String, usize>,
    edges: HashMap<String, Edge>,
    cycle_check: CycleCheck,
    issues: IssueLog,
    closure: Option<Closure>,
}

impl std::fmt::Debug for TaxonomyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxonomyGraph")
            .field("node_count", &self.node_count())
            .field("edge_count", &self.edge_count())
            .field("built", &self.is_built())
            .finish()
    }
}

impl TaxonomyGraph {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create an empty graph pre-sized for the expected node and edge counts.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        TaxonomyGraph {
            nodes: Vec::with_capacity(nodes),
            node_index: HashMap::with_capacity(nodes),
            edges: HashMap::with_capacity(edges),
            cycle_check: CycleCheck::default(),
            issues: IssueLog::new(DEFAULT_ISSUE_CAPACITY),
            closure: None,
        }
    }

    /// Unbuilt copy of another graph's nodes and edges.
    pub fn copy_of(other: &TaxonomyGraph) -> Self {
        TaxonomyGraph {
            nodes: other.nodes.clone(),
            node_index: other.node_index.clone(),
            edges: other.edges.clone(),
            cycle_check: other.cycle_check,
            issues: IssueLog::new(other.issues.capacity()),
            closure: None,
        }
    }

    pub fn with_cycle_check(mut self, cycle_check: CycleCheck) -> Self {
        self.cycle_check = cycle_check;
        self
    }

    /// Size of the window of most recent issues kept by `build()`.
    pub fn with_issue_capacity(mut self, capacity: usize) -> Self {
        self.issues = IssueLog::new(capacity);
        self
    }

    // ── Mutators ────────────────────────────────────────────

    /// Register a node. Registering a known node is a no-op.
    pub fn add_node(&mut self, id: impl Into<String>) {
        self.closure = None;
        let id = id.into();
        if self.node_index.contains_key(&id) {
            return;
        }
        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Some(id));
    }

    /// Remove a node. Edges that reference it are kept and reported on the
    /// next build unless they are removed as well.
    pub fn remove_node(&mut self, id: &str) -> bool {
        self.closure = None;
        match self.node_index.remove(id) {
            Some(slot) => {
                self.nodes[slot] = None;
                true
            }
            None => false,
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Register an edge, replacing any edge previously registered under the
    /// same edge ID.
    pub fn add_edge<I, S>(&mut self, edge_id: impl Into<String>, source: impl Into<String>, destinations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.closure = None;
        let edge = Edge::new(edge_id, source, destinations);
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Register an edge with a single destination.
    pub fn add_edge_to(&mut self, edge_id: impl Into<String>, source: impl Into<String>, destination: impl Into<String>) {
        self.add_edge(edge_id, source, [destination.into()]);
    }

    /// Register the parents of `source`, using the source ID as edge ID.
    pub fn set_parents<I, S>(&mut self, source: impl Into<String>, destinations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = source.into();
        self.add_edge(source.clone(), source, destinations);
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Option<Edge> {
        self.closure = None;
        self.edges.remove(edge_id)
    }

    pub fn contains_edge(&self, edge_id: &str) -> bool {
        self.edges.contains_key(edge_id)
    }

    /// Source node of a registered edge.
    pub fn source_node_id(&self, edge_id: &str) -> Option<&str> {
        self.edges.get(edge_id).map(|edge| edge.source.as_str())
    }

    /// Drop all nodes, edges and closure state.
    pub fn clear(&mut self) {
        self.closure = None;
        self.nodes.clear();
        self.node_index.clear();
        self.edges.clear();
        self.issues.clear();
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Registered node IDs in registration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|slot| slot.as_deref())
    }

    pub fn is_built(&self) -> bool {
        self.closure.is_some()
    }

    /// Issues reported by the last build.
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    /// Edge IDs registered here but not in `other`, and the reverse.
    pub fn difference(&self, other: &TaxonomyGraph) -> EdgeDifference {
        let ours: BTreeSet<&String> = self.edges.keys().collect();
        let theirs: BTreeSet<&String> = other.edges.keys().collect();
        EdgeDifference {
            added: ours.difference(&theirs).map(|id| id.to_string()).collect(),
            removed: theirs.difference(&ours).map(|id| id.to_string()).collect(),
        }
    }

    // ── Build ───────────────────────────────────────────────

    /// Recompute every closure from scratch and return the structural issues
    /// found. Issues never abort the build.
    pub fn build(&mut self) -> Vec<Issue> {
        self.compact();

        let node_count = self.nodes.len();
        let mut closure = Closure::new(node_count);
        let mut issues = IssueLog::new(self.issues.capacity());

        let mut edges: Vec<&Edge> = self.edges.values().collect();
        edges.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        for edge in edges {
            let source = self.node_index.get(&edge.source).copied();
            if source.is_none() {
                issues.push(Issue::MissingSource(edge.source.clone()));
            }
            for destination in &edge.destinations {
                match (source, self.node_index.get(destination)) {
                    (_, None) => issues.push(Issue::MissingDestination(destination.clone())),
                    (Some(source), Some(&destination)) => closure.link(source, destination),
                    (None, Some(_)) => {}
                }
            }
        }

        for index in nodes_in_cycles(&closure, self.cycle_check) {
            if let Some(id) = &self.nodes[index] {
                issues.push(Issue::NodePartOfCycle(id.clone()));
            }
        }

        closure.propagate_ancestors();
        closure.propagate_descendants();

        debug!(
            nodes = node_count,
            edges = self.edges.len(),
            issues = issues.len() + issues.evicted(),
            "taxonomy graph built"
        );
        for issue in issues.iter() {
            warn!(issue = issue.kind(), id = issue.id(), "{}", issue);
        }
        if issues.evicted() > 0 {
            warn!(dropped = issues.evicted(), "older taxonomy issues were dropped from the report");
        }

        self.issues = issues;
        self.closure = Some(closure);
        self.issues.to_vec()
    }

    /// Close the gaps left by removed nodes so positions are dense.
    fn compact(&mut self) {
        if self.nodes.len() == self.node_index.len() {
            return;
        }
        self.nodes.retain(Option::is_some);
        for (slot, id) in self.nodes.iter().enumerate() {
            if let Some(id) = id {
                self.node_index.insert(id.clone(), slot);
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────

    fn closure(&self) -> Result<&Closure, GraphError> {
        self.closure.as_ref().ok_or(GraphError::NotBuilt)
    }

    fn position(&self, id: &str) -> Result<usize, GraphError> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    fn lookup<'a>(
        &'a self,
        id: &str,
        select: impl Fn(&'a Closure, usize) -> Option<&'a FixedBitSet>,
    ) -> Result<BTreeSet<String>, GraphError> {
        let closure = self.closure()?;
        let index = self.position(id)?;
        Ok(self.to_ids(select(closure, index)))
    }

    fn to_ids(&self, bits: Option<&FixedBitSet>) -> BTreeSet<String> {
        bits.map(|bits| {
            bits.ones()
                .filter_map(|index| self.nodes[index].clone())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Direct parents of a node.
    pub fn parent_ids(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.lookup(id, Closure::parents)
    }

    /// Direct children of a node.
    pub fn child_ids(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.lookup(id, Closure::children)
    }

    /// Ancestors reachable through at least one hop beyond the direct parents.
    ///
    /// With multiple inheritance paths this set may overlap the parent set.
    pub fn indirect_ancestor_ids(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.lookup(id, Closure::indirect_ancestors)
    }

    /// Direct parents and indirect ancestors together.
    pub fn ancestor_ids(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        let mut ancestors = self.parent_ids(id)?;
        ancestors.extend(self.indirect_ancestor_ids(id)?);
        Ok(ancestors)
    }

    /// Direct and indirect descendants of a node.
    pub fn descendant_ids(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.lookup(id, Closure::descendants)
    }

    /// Whether `descendant_id` is below `ancestor_id`. A node does not
    /// subsume itself unless it sits on a cycle.
    pub fn subsumes(&self, descendant_id: &str, ancestor_id: &str) -> Result<bool, GraphError> {
        let closure = self.closure()?;
        let descendant = self.position(descendant_id)?;
        let ancestor = self.position(ancestor_id)?;
        Ok(closure
            .descendants(ancestor)
            .is_some_and(|bits| bits.contains(descendant)))
    }
}

impl Default for TaxonomyGraph {
    fn default() -> Self {
        Self::new()
    }
}
