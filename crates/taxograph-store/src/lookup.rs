//! Document lookup collaborator

use std::collections::{BTreeSet, HashMap};

use crate::error::StoreError;

/// Read access to the persisted documents of one kind.
pub trait DocumentLookup<E> {
    /// Bulk fetch by ID. Unknown IDs are skipped; callers check completeness.
    fn get(&self, ids: &BTreeSet<String>) -> Result<Vec<E>, StoreError>;

    /// The requested entities plus every entity that has one of them as a
    /// parent or ancestor, keyed by ID.
    fn get_entity_and_descendants(&self, ids: &BTreeSet<String>) -> Result<HashMap<String, E>, StoreError>;
}
