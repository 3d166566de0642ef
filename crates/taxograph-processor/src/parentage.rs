//! Derived parent and ancestor fields

use std::collections::BTreeSet;

use taxograph_core::{GraphError, TaxonomyEntity, TaxonomyGraph, ROOT_ID};
use taxograph_store::MemoryStore;
use tracing::info;

use crate::config::ProcessorConfig;
use crate::error::ChangeError;

/// The two fields the processor writes back to an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parentage {
    pub parents: BTreeSet<String>,
    pub ancestors: BTreeSet<String>,
}

impl Parentage {
    pub fn matches<E: TaxonomyEntity>(&self, entity: &E) -> bool {
        entity.parent_ids() == &self.parents && entity.ancestor_ids() == &self.ancestors
    }

    pub fn apply<E: TaxonomyEntity>(self, entity: &E) -> E {
        entity.with_parentage(self.parents, self.ancestors)
    }
}

/// Read the parentage of `id` from a built graph.
///
/// A node without parents hangs below the root. A node without indirect
/// ancestors that is not directly below the root gets the root as its only
/// indirect ancestor, so every node stays transitively rooted.
pub fn derive_parentage(graph: &TaxonomyGraph, id: &str) -> Result<Parentage, GraphError> {
    let mut parents = graph.parent_ids(id)?;
    if parents.is_empty() {
        parents.insert(ROOT_ID.to_string());
    }

    let mut ancestors = graph.indirect_ancestor_ids(id)?;
    if ancestors.is_empty() && !parents.contains(ROOT_ID) {
        ancestors.insert(ROOT_ID.to_string());
    }

    Ok(Parentage { parents, ancestors })
}

/// Register the root, every entity as a node and one edge per entity.
///
/// Parents in `excluded` are left out of the edges; an entity left without
/// parents is attached to the root, the same default `derive_parentage`
/// writes back.
pub(crate) fn graph_from_entities<'a, E, I>(
    entities: I,
    excluded: &BTreeSet<String>,
    config: &ProcessorConfig,
) -> TaxonomyGraph
where
    E: TaxonomyEntity + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let entities: Vec<&E> = entities.into_iter().collect();
    let mut graph = TaxonomyGraph::with_capacity(entities.len() + 1, entities.len())
        .with_cycle_check(config.cycle_check)
        .with_issue_capacity(config.issue_capacity);

    graph.add_node(ROOT_ID);
    for entity in &entities {
        graph.add_node(entity.id());
    }
    for entity in &entities {
        let mut parents: Vec<String> = entity
            .parent_ids()
            .iter()
            .filter(|parent| !excluded.contains(*parent))
            .cloned()
            .collect();
        if parents.is_empty() {
            parents.push(ROOT_ID.to_string());
        }
        graph.set_parents(entity.id(), parents);
    }
    graph
}

/// Build `graph`, failing on any issue it found, including issues the
/// report window did not keep.
pub(crate) fn build_consistent(graph: &mut TaxonomyGraph) -> Result<(), ChangeError> {
    let issues = graph.build();
    let dropped = graph.issues().evicted();
    if issues.is_empty() && dropped == 0 {
        return Ok(());
    }
    Err(ChangeError::InconsistentGraph { issues, dropped })
}

/// Rebuild the parentage of every stored entity from scratch.
///
/// Returns all entities ordered by ID with their derived fields replaced.
/// The store itself is not modified.
pub fn reindex_all<E: TaxonomyEntity>(
    store: &MemoryStore<E>,
    config: &ProcessorConfig,
) -> Result<Vec<E>, ChangeError> {
    let entities = store.entities();
    let mut graph = graph_from_entities(&entities, &BTreeSet::new(), config);

    build_consistent(&mut graph)?;

    let mut changed = 0;
    let mut reindexed = Vec::with_capacity(entities.len());
    for entity in &entities {
        let parentage = derive_parentage(&graph, entity.id())?;
        if !parentage.matches(entity) {
            changed += 1;
        }
        reindexed.push(parentage.apply(entity));
    }

    info!(entities = reindexed.len(), changed, "taxonomy reindexed");
    Ok(reindexed)
}
