//! Transaction staging: the pending changes of one commit

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taxograph_core::TaxonomyEntity;
use tracing::debug;

use crate::error::StoreError;
use crate::memory::MemoryStore;

/// A hierarchy field whose change makes a revision relevant to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentageField {
    Parents,
    Ancestors,
}

impl ParentageField {
    pub fn differs<E: TaxonomyEntity>(self, old: &E, new: &E) -> bool {
        match self {
            ParentageField::Parents => old.parent_ids() != new.parent_ids(),
            ParentageField::Ancestors => old.ancestor_ids() != new.ancestor_ids(),
        }
    }
}

/// The committed and the pending version of a changed entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision<E> {
    pub old: E,
    pub new: E,
}

/// Write side of a transaction, as seen by the change processor.
pub trait Staging<E> {
    /// Entities created in this transaction.
    fn new_objects(&self) -> Vec<E>;

    /// Changed entities where at least one of `fields` differs between the
    /// committed and the pending revision.
    fn changed_revisions(&self, fields: &[ParentageField]) -> Vec<Revision<E>>;

    /// Committed state of the entities removed in this transaction.
    fn removed_objects(&self) -> Vec<E>;

    fn is_removed(&self, entity: &E) -> bool;

    /// Pending version of `id` if it is new or changed in this transaction,
    /// whichever fields differ.
    fn pending_revision(&self, id: &str) -> Option<E>;

    /// Record an insert (`old == None`) or an update of `new`. Only the parent
    /// and ancestor fields of `new` replace a pending revision of the entity.
    fn stage_change(&mut self, old: Option<&E>, new: E);
}

/// Serialized form of a transaction, as read by the `apply` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct ChangeSet<E> {
    #[serde(default)]
    pub new: Vec<E>,
    /// Pending revisions of stored entities.
    #[serde(default)]
    pub changed: Vec<E>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl<E> Default for ChangeSet<E> {
    fn default() -> Self {
        ChangeSet {
            new: Vec::new(),
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub removed: usize,
    pub written: usize,
}

/// In-process transaction buffer. Nothing reaches the store before `commit`.
pub struct StagingArea<E> {
    new: BTreeMap<String, E>,
    changed: BTreeMap<String, Revision<E>>,
    removed: BTreeMap<String, E>,
    staged: BTreeMap<String, E>,
}

impl<E> std::fmt::Debug for StagingArea<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("new", &self.new.len())
            .field("changed", &self.changed.len())
            .field("removed", &self.removed.len())
            .field("staged", &self.staged.len())
            .finish()
    }
}

impl<E: TaxonomyEntity> StagingArea<E> {
    pub fn new() -> Self {
        StagingArea {
            new: BTreeMap::new(),
            changed: BTreeMap::new(),
            removed: BTreeMap::new(),
            staged: BTreeMap::new(),
        }
    }

    /// Resolve a change set against the committed documents.
    ///
    /// Changed and removed entities must exist in `store`.
    pub fn from_change_set(store: &MemoryStore<E>, change_set: ChangeSet<E>) -> Result<Self, StoreError> {
        let mut staging = Self::new();
        for entity in change_set.new {
            staging.add_new(entity);
        }
        for entity in change_set.changed {
            let old = store
                .get_one(entity.id())
                .ok_or_else(|| StoreError::UnknownEntity(entity.id().to_string()))?;
            staging.add_changed(old, entity);
        }
        for id in change_set.removed {
            let old = store.get_one(&id).ok_or(StoreError::UnknownEntity(id))?;
            staging.add_removed(old);
        }
        Ok(staging)
    }

    pub fn add_new(&mut self, entity: E) {
        self.new.insert(entity.id().to_string(), entity);
    }

    pub fn add_changed(&mut self, old: E, new: E) {
        self.changed.insert(new.id().to_string(), Revision { old, new });
    }

    pub fn add_removed(&mut self, entity: E) {
        self.removed.insert(entity.id().to_string(), entity);
    }

    /// Entities staged by the processor, ordered by ID.
    pub fn staged(&self) -> impl Iterator<Item = &E> {
        self.staged.values()
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Apply removals, then new and changed entities, then staged updates.
    pub fn commit(self, store: &MemoryStore<E>) -> CommitSummary {
        let mut summary = CommitSummary::default();
        for id in self.removed.keys() {
            if store.remove(id).is_some() {
                summary.removed += 1;
            }
        }

        let mut writes: BTreeMap<String, E> = BTreeMap::new();
        writes.extend(self.new);
        writes.extend(self.changed.into_iter().map(|(id, revision)| (id, revision.new)));
        writes.extend(self.staged);
        summary.written = writes.len();
        for entity in writes.into_values() {
            store.insert(entity);
        }

        debug!(removed = summary.removed, written = summary.written, "transaction committed");
        summary
    }
}

impl<E: TaxonomyEntity> Staging<E> for StagingArea<E> {
    fn new_objects(&self) -> Vec<E> {
        self.new.values().cloned().collect()
    }

    fn changed_revisions(&self, fields: &[ParentageField]) -> Vec<Revision<E>> {
        self.changed
            .values()
            .filter(|revision| fields.iter().any(|field| field.differs(&revision.old, &revision.new)))
            .cloned()
            .collect()
    }

    fn removed_objects(&self) -> Vec<E> {
        self.removed.values().cloned().collect()
    }

    fn is_removed(&self, entity: &E) -> bool {
        self.removed.contains_key(entity.id())
    }

    fn pending_revision(&self, id: &str) -> Option<E> {
        self.changed
            .get(id)
            .map(|revision| revision.new.clone())
            .or_else(|| self.new.get(id).cloned())
    }

    fn stage_change(&mut self, _old: Option<&E>, new: E) {
        let id = new.id().to_string();
        let staged = match self.pending_revision(&id) {
            Some(pending) => pending.with_parentage(new.parent_ids().clone(), new.ancestor_ids().clone()),
            None => new,
        };
        self.staged.insert(id, staged);
    }
}

impl<E: TaxonomyEntity> Default for StagingArea<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use taxograph_core::{Concept, ROOT_ID};

    fn store() -> MemoryStore<Concept> {
        MemoryStore::from_entities([
            Concept::new("A").with_parents([ROOT_ID]),
            Concept::new("B").with_parents(["A"]).with_ancestors([ROOT_ID]),
        ])
    }

    #[test]
    fn test_changed_revisions_filter_on_watched_fields() {
        let store = store();
        let change_set = ChangeSet {
            changed: vec![
                Concept::new("A").with_parents([ROOT_ID]).with_label("relabelled"),
                Concept::new("B").with_parents([ROOT_ID]).with_ancestors([ROOT_ID]),
            ],
            ..ChangeSet::default()
        };
        let staging = StagingArea::from_change_set(&store, change_set).unwrap();

        let revisions = staging.changed_revisions(&[ParentageField::Parents, ParentageField::Ancestors]);
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].old.parents, BTreeSet::from(["A".to_string()]));
        assert!(staging.changed_revisions(&[ParentageField::Ancestors]).is_empty());
    }

    #[test]
    fn test_unknown_entities_are_rejected() {
        let store = store();
        let change_set: ChangeSet<Concept> = ChangeSet {
            removed: vec!["Z".to_string()],
            ..ChangeSet::default()
        };
        let err = StagingArea::from_change_set(&store, change_set).unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntity(id) if id == "Z"));
    }

    #[test]
    fn test_commit_applies_removals_then_writes() {
        let store = store();
        let mut staging = StagingArea::new();
        staging.add_removed(store.get_one("B").unwrap());
        staging.add_new(Concept::new("C").with_parents(["A"]));
        staging.stage_change(None, Concept::new("C").with_parents(["A"]).with_ancestors([ROOT_ID]));

        assert!(staging.is_removed(&Concept::new("B")));
        assert_eq!(store.len(), 2);

        let summary = staging.commit(&store);
        assert_eq!(summary, CommitSummary { removed: 1, written: 1 });
        assert!(!store.contains("B"));
        assert_eq!(store.get_one("C").unwrap().ancestors, BTreeSet::from([ROOT_ID.to_string()]));
    }

    #[test]
    fn test_staged_parentage_keeps_pending_edits() {
        let store = store();
        let mut staging = StagingArea::new();
        staging.add_changed(store.get_one("B").unwrap(), store.get_one("B").unwrap().with_label("Renamed"));
        staging.stage_change(
            store.get_one("B").as_ref(),
            Concept::new("B").with_parents([ROOT_ID]),
        );

        let staged: Vec<&Concept> = staging.staged().collect();
        assert_eq!(staged[0].label.as_deref(), Some("Renamed"));
        assert_eq!(staged[0].parents, BTreeSet::from([ROOT_ID.to_string()]));
        assert!(staged[0].ancestors.is_empty());

        staging.commit(&store);
        let b = store.get_one("B").unwrap();
        assert_eq!(b.label.as_deref(), Some("Renamed"));
        assert_eq!(b.parents, BTreeSet::from([ROOT_ID.to_string()]));
    }

    #[test]
    fn test_change_set_fields_default_to_empty() {
        let change_set: ChangeSet<Concept> =
            serde_json::from_str(r#"{"removed": ["A"]}"#).unwrap();
        assert!(change_set.new.is_empty());
        assert!(change_set.changed.is_empty());
        assert_eq!(change_set.removed, vec!["A"]);
    }
}
