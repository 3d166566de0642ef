//! In-memory document store

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use taxograph_core::TaxonomyEntity;

use crate::error::StoreError;
use crate::lookup::DocumentLookup;

/// Committed documents keyed by ID. Thread-safe for concurrent access.
pub struct MemoryStore<E> {
    documents: DashMap<String, E>,
    /// Number of lookup calls served, for diagnostics
    lookups: AtomicUsize,
}

impl<E> std::fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("documents", &self.documents.len())
            .field("lookups", &self.lookup_count())
            .finish()
    }
}

impl<E: TaxonomyEntity> MemoryStore<E> {
    pub fn new() -> Self {
        MemoryStore {
            documents: DashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn from_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let store = Self::new();
        for entity in entities {
            store.insert(entity);
        }
        store
    }

    /// Insert or replace a document.
    pub fn insert(&self, entity: E) {
        self.documents.insert(entity.id().to_string(), entity);
    }

    pub fn remove(&self, id: &str) -> Option<E> {
        self.documents.remove(id).map(|(_, entity)| entity)
    }

    pub fn get_one(&self, id: &str) -> Option<E> {
        self.documents.get(id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents ordered by ID.
    pub fn entities(&self) -> Vec<E> {
        let mut entities: Vec<E> = self.documents.iter().map(|r| r.value().clone()).collect();
        entities.sort_by(|a, b| a.id().cmp(b.id()));
        entities
    }
}

impl<E> MemoryStore<E> {
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn count_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }
}

impl<E: TaxonomyEntity> DocumentLookup<E> for MemoryStore<E> {
    fn get(&self, ids: &BTreeSet<String>) -> Result<Vec<E>, StoreError> {
        self.count_lookup();
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id).map(|r| r.value().clone()))
            .collect())
    }

    fn get_entity_and_descendants(&self, ids: &BTreeSet<String>) -> Result<HashMap<String, E>, StoreError> {
        self.count_lookup();
        let mut found = HashMap::new();
        for entry in self.documents.iter() {
            let entity = entry.value();
            let related = ids.contains(entity.id())
                || entity.parent_ids().iter().any(|id| ids.contains(id))
                || entity.ancestor_ids().iter().any(|id| ids.contains(id));
            if related {
                found.insert(entry.key().clone(), entity.clone());
            }
        }
        Ok(found)
    }
}

impl<E: TaxonomyEntity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}
