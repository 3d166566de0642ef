//! Incremental parentage maintenance for one transaction

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use taxograph_core::{TaxonomyEntity, ROOT_ID};
use taxograph_store::{DocumentLookup, ParentageField, Staging};
use tracing::{debug, info};

use crate::config::ProcessorConfig;
use crate::error::ChangeError;
use crate::parentage::{build_consistent, derive_parentage, graph_from_entities};

/// Fields whose change makes a revision relevant to the hierarchy.
const WATCHED_FIELDS: [ParentageField; 2] = [ParentageField::Parents, ParentageField::Ancestors];

/// What one `process` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Entities fetched from storage.
    pub loaded: usize,
    /// Entities handed to staging with updated parentage.
    pub staged: usize,
    /// Entities removed by the transaction.
    pub deleted: usize,
    /// Ancestor lookup rounds needed to close the loaded set.
    pub lookup_rounds: usize,
}

/// Keeps the parent and ancestor fields of a document kind consistent while
/// the hierarchy changes, rebuilding the closure only for the part of the
/// hierarchy a transaction touches.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyChangeProcessor {
    config: ProcessorConfig,
}

impl TaxonomyChangeProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        TaxonomyChangeProcessor { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Stage updated parentage for every live entity affected by the pending
    /// changes in `staging`.
    ///
    /// Nothing is staged when an error is returned.
    pub fn process<E, L, S>(&self, lookup: &L, staging: &mut S) -> Result<ProcessReport, ChangeError>
    where
        E: TaxonomyEntity,
        L: DocumentLookup<E> + ?Sized,
        S: Staging<E> + ?Sized,
    {
        let new_objects = staging.new_objects();
        let changed = staging.changed_revisions(&WATCHED_FIELDS);
        let removed = staging.removed_objects();
        if new_objects.is_empty() && changed.is_empty() && removed.is_empty() {
            debug!("no hierarchy changes to process");
            return Ok(ProcessReport::default());
        }

        let new_ids: BTreeSet<String> = new_objects.iter().map(|e| e.id().to_string()).collect();
        let changed_ids: BTreeSet<&str> = changed.iter().map(|r| r.new.id()).collect();
        let mut with_ancestors = BTreeSet::new();
        let mut with_descendants = BTreeSet::new();
        let mut deleted = BTreeSet::new();

        for entity in &new_objects {
            with_ancestors.extend(entity.parent_ids().iter().cloned());
        }
        for revision in &changed {
            let id = revision.new.id().to_string();
            with_ancestors.insert(id.clone());
            with_ancestors.extend(revision.old.parent_ids().iter().cloned());
            with_ancestors.extend(revision.old.ancestor_ids().iter().cloned());
            with_ancestors.extend(revision.new.parent_ids().iter().cloned());
            with_descendants.insert(id);
        }
        for entity in &removed {
            let id = entity.id().to_string();
            with_ancestors.insert(id.clone());
            with_descendants.insert(id.clone());
            deleted.insert(id);
        }

        let family = if with_descendants.is_empty() {
            HashMap::new()
        } else {
            lookup.get_entity_and_descendants(&with_descendants)?
        };
        for member in family.values() {
            with_ancestors.extend(member.parent_ids().iter().cloned());
            with_ancestors.extend(member.ancestor_ids().iter().cloned());
        }

        let mut loaded: BTreeMap<String, E> = family.iter().map(|(id, e)| (id.clone(), e.clone())).collect();
        let lookup_rounds = self.load_ancestors(lookup, with_ancestors, &new_ids, &mut loaded)?;
        let loaded_count = loaded.len();

        // Pending revisions replace what storage returned, including edits
        // that leave the hierarchy alone.
        let mut current = loaded;
        for (id, entity) in current.iter_mut() {
            if let Some(pending) = staging.pending_revision(id) {
                *entity = pending;
            }
        }
        for revision in &changed {
            current.insert(revision.new.id().to_string(), revision.new.clone());
        }
        for entity in &new_objects {
            current.insert(entity.id().to_string(), entity.clone());
        }

        let mut graph = graph_from_entities(current.values(), &deleted, &self.config);
        for id in &deleted {
            graph.remove_edge(id);
        }
        build_consistent(&mut graph)?;

        let mut family_ids: Vec<&String> = family.keys().filter(|id| !deleted.contains(*id)).collect();
        family_ids.sort();

        let mut updates = Vec::new();
        for id in family_ids.into_iter().chain(&new_ids) {
            let Some(entity) = current.get(id) else {
                continue;
            };
            if staging.is_removed(entity) {
                continue;
            }
            let parentage = derive_parentage(&graph, id)?;
            let pending = new_ids.contains(id) || changed_ids.contains(id.as_str());
            if !pending && parentage.matches(entity) {
                continue;
            }
            updates.push((family.get(id), parentage.apply(entity)));
        }

        let staged = updates.len();
        for (old, new) in updates {
            staging.stage_change(old, new);
        }

        let report = ProcessReport {
            loaded: loaded_count,
            staged,
            deleted: deleted.len(),
            lookup_rounds,
        };
        info!(
            new = new_objects.len(),
            changed = changed.len(),
            deleted = report.deleted,
            loaded = report.loaded,
            staged = report.staged,
            rounds = report.lookup_rounds,
            "taxonomy changes processed"
        );
        Ok(report)
    }

    /// Fetch `pending` and, transitively, every parent and ancestor of what
    /// was fetched. Returns the number of lookup rounds.
    fn load_ancestors<E, L>(
        &self,
        lookup: &L,
        pending: BTreeSet<String>,
        new_ids: &BTreeSet<String>,
        loaded: &mut BTreeMap<String, E>,
    ) -> Result<usize, ChangeError>
    where
        E: TaxonomyEntity,
        L: DocumentLookup<E> + ?Sized,
    {
        let mut missing = BTreeSet::new();
        let needs_lookup = |id: &String, loaded: &BTreeMap<String, E>, missing: &BTreeSet<String>| {
            id != ROOT_ID && !new_ids.contains(id) && !loaded.contains_key(id) && !missing.contains(id)
        };

        let mut pending: BTreeSet<String> = pending
            .into_iter()
            .filter(|id| needs_lookup(id, &*loaded, &missing))
            .collect();
        let mut rounds = 0;

        while !pending.is_empty() {
            if rounds == self.config.max_lookup_rounds {
                return Err(ChangeError::LookupLimitExceeded(rounds));
            }
            rounds += 1;

            let found = lookup.get(&pending)?;
            debug!(round = rounds, requested = pending.len(), found = found.len(), "ancestor lookup");

            let mut next = BTreeSet::new();
            for entity in found {
                next.extend(entity.parent_ids().iter().cloned());
                next.extend(entity.ancestor_ids().iter().cloned());
                loaded.insert(entity.id().to_string(), entity);
            }
            missing.extend(pending.into_iter().filter(|id| !loaded.contains_key(id)));
            pending = next
                .into_iter()
                .filter(|id| needs_lookup(id, &*loaded, &missing))
                .collect();
        }

        if !missing.is_empty() {
            return Err(ChangeError::MissingReferences(missing.into_iter().collect()));
        }
        Ok(rounds)
    }
}
