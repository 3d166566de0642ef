//! Document lookup, transaction staging and snapshots
//!
//! The change processor only talks to the [`DocumentLookup`] and [`Staging`]
//! traits. [`MemoryStore`] and [`StagingArea`] are the in-process
//! implementations used by the CLI and the tests.

pub mod error;
pub mod lookup;
pub mod memory;
pub mod snapshot;
pub mod staging;

pub use error::StoreError;
pub use lookup::DocumentLookup;
pub use memory::MemoryStore;
pub use snapshot::{load_snapshot, save_snapshot, SnapshotFormat, SnapshotHeader, SNAPSHOT_VERSION};
pub use staging::{ChangeSet, CommitSummary, ParentageField, Revision, Staging, StagingArea};
