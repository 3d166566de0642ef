//! Structural issues reported by `TaxonomyGraph::build`

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default size of the issue window kept per graph.
pub const DEFAULT_ISSUE_CAPACITY: usize = 100;

/// A structural problem found while building the closure.
///
/// Issues are advisory: the build completes and the closure stays usable for
/// the parts of the graph the issue does not touch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum Issue {
    /// An edge names a source node that was never registered.
    MissingSource(String),
    /// An edge names a destination node that was never registered.
    MissingDestination(String),
    /// The node can reach itself through its parents.
    NodePartOfCycle(String),
}

impl Issue {
    /// The node ID the issue is about.
    pub fn id(&self) -> &str {
        match self {
            Issue::MissingSource(id) | Issue::MissingDestination(id) | Issue::NodePartOfCycle(id) => {
                id.as_str()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Issue::MissingSource(_) => "missing_source",
            Issue::MissingDestination(_) => "missing_destination",
            Issue::NodePartOfCycle(_) => "node_part_of_cycle",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingSource(id) => write!(f, "missing source node '{}'", id),
            Issue::MissingDestination(id) => write!(f, "missing destination node '{}'", id),
            Issue::NodePartOfCycle(id) => write!(f, "node '{}' is part of a cycle", id),
        }
    }
}

/// Sliding window over the most recent issues; the oldest entry is evicted
/// first once the window is full.
#[derive(Debug, Clone)]
pub struct IssueLog {
    capacity: usize,
    entries: VecDeque<Issue>,
    evicted: usize,
}

impl IssueLog {
    pub fn new(capacity: usize) -> Self {
        IssueLog {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_ISSUE_CAPACITY)),
            evicted: 0,
        }
    }

    /// Record an issue, evicting the oldest one if the window is full.
    pub fn push(&mut self, issue: Issue) {
        if self.capacity == 0 {
            self.evicted += 1;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(issue);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of issues that fell out of the window.
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Issue> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }
}

impl Default for IssueLog {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUE_CAPACITY)
    }
}
