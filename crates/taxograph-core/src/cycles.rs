//! Cycle detection over the direct-parent relation

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use fixedbitset::FixedBitSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::closure::Closure;

/// How `build()` looks for nodes that are their own ancestor.
///
/// `Scan` and `StronglyConnected` report the same set of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleCheck {
    /// Breadth-first walk over the parents of every node, one walk per node.
    #[default]
    Scan,
    /// One pass of Tarjan's strongly connected components.
    StronglyConnected,
    /// No cycle detection; `NodePartOfCycle` is never reported.
    Skip,
}

impl fmt::Display for CycleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleCheck::Scan => "scan",
            CycleCheck::StronglyConnected => "strongly_connected",
            CycleCheck::Skip => "skip",
        };
        f.write_str(name)
    }
}

impl FromStr for CycleCheck {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(CycleCheck::Scan),
            "strongly_connected" | "scc" => Ok(CycleCheck::StronglyConnected),
            "skip" | "off" => Ok(CycleCheck::Skip),
            other => Err(format!("unknown cycle check strategy: {}", other)),
        }
    }
}

/// Dense indices of all nodes that are part of a cycle, ascending.
pub(crate) fn nodes_in_cycles(closure: &Closure, check: CycleCheck) -> Vec<usize> {
    let mut found = match check {
        CycleCheck::Scan => (0..closure.len())
            .into_par_iter()
            .filter(|&start| reaches_itself(closure, start))
            .collect::<Vec<_>>(),
        CycleCheck::StronglyConnected => strongly_connected(closure),
        CycleCheck::Skip => Vec::new(),
    };
    found.sort_unstable();
    found
}

fn reaches_itself(closure: &Closure, start: usize) -> bool {
    let mut visited = FixedBitSet::with_capacity(closure.len());
    let mut queue = VecDeque::from([start]);
    visited.insert(start);

    while let Some(current) = queue.pop_front() {
        let Some(parents) = closure.parents(current) else {
            continue;
        };
        if parents.contains(start) {
            return true;
        }
        for parent in parents.ones() {
            if !visited.put(parent) {
                queue.push_back(parent);
            }
        }
    }

    false
}

fn strongly_connected(closure: &Closure) -> Vec<usize> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(closure.len(), closure.len());
    for _ in 0..closure.len() {
        graph.add_node(());
    }
    for child in 0..closure.len() {
        if let Some(parents) = closure.parents(child) {
            for parent in parents.ones() {
                graph.add_edge(NodeIndex::new(child), NodeIndex::new(parent), ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => closure
                .parents(single.index())
                .is_some_and(|parents| parents.contains(single.index())),
            _ => true,
        })
        .flatten()
        .map(|node| node.index())
        .collect()
}
